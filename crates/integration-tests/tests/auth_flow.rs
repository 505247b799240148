//! Session lifecycle tests against the in-process mock backend.

use bramble_client::StoreError;
use bramble_client::deeplink::parse_reset_password_link;
use bramble_core::EmailError;
use bramble_integration_tests::TestApp;

// ============================================================================
// Sign In
// ============================================================================

#[tokio::test]
async fn test_sign_in_persists_token_and_loads_profile() {
    let app = TestApp::spawn().await;

    let user = app
        .session
        .sign_in("shopper@example.com", "hunter2")
        .await
        .expect("sign in");

    assert_eq!(user.email, "shopper@example.com");
    assert!(app.session.is_authenticated());
    assert!(app.api.tokens().has_token());
    assert_eq!(app.backend.count_requests("GET", "/store/customers/me"), 1);
}

#[tokio::test]
async fn test_sign_in_without_token_fails_and_stores_nothing() {
    let app = TestApp::spawn().await;
    app.backend.omit_login_token();

    let result = app.session.sign_in("shopper@example.com", "hunter2").await;
    assert!(matches!(result, Err(StoreError::MissingToken)));

    // No credential was written and the profile was never fetched.
    assert!(!app.api.tokens().has_token());
    assert!(!app.session.is_authenticated());
    assert_eq!(app.backend.count_requests("GET", "/store/customers/me"), 0);
}

#[tokio::test]
async fn test_invalid_credentials_surface_server_message() {
    let app = TestApp::spawn().await;
    app.backend.reject_credentials();

    // A bad-password 401 is not an expired session; the server's message
    // comes through.
    let result = app.session.sign_in("shopper@example.com", "wrong").await;
    match result {
        Err(StoreError::Api { status, message }) => {
            assert_eq!(status, 401);
            assert!(message.contains("Invalid email or password"));
        }
        other => panic!("expected Api error, got {other:?}"),
    }
    assert!(!app.api.tokens().has_token());
    assert!(!app.session.is_authenticated());
}

#[tokio::test]
async fn test_sign_in_rejects_malformed_email_locally() {
    let app = TestApp::spawn().await;

    let result = app.session.sign_in("not-an-email", "hunter2").await;
    assert!(matches!(
        result,
        Err(StoreError::InvalidEmail(EmailError::MissingAtSymbol))
    ));
    // Rejected before any request went out.
    assert!(app.backend.requests().is_empty());
}

// ============================================================================
// Sign Up
// ============================================================================

#[tokio::test]
async fn test_sign_up_registers_then_creates_customer() {
    let app = TestApp::spawn().await;

    let user = app
        .session
        .sign_up("new@example.com", "hunter2", Some("Ada"), Some("Lovelace"))
        .await
        .expect("sign up");

    assert_eq!(user.email, "new@example.com");
    assert_eq!(user.first_name.as_deref(), Some("Ada"));
    assert!(app.api.tokens().has_token());
    assert_eq!(
        app.backend
            .count_requests("POST", "/auth/customer/emailpass/register"),
        1
    );
    assert_eq!(app.backend.count_requests("POST", "/store/customers"), 1);
}

// ============================================================================
// Session Expiry
// ============================================================================

#[tokio::test]
async fn test_revoked_token_surfaces_session_expired() {
    let app = TestApp::spawn().await;
    app.session
        .sign_in("shopper@example.com", "hunter2")
        .await
        .expect("sign in");

    app.backend.revoke_tokens();
    let result = app.session.refresh_user().await;
    assert!(matches!(result, Err(StoreError::SessionExpired)));

    app.session.handle_session_expired();
    assert!(!app.session.is_authenticated());
    assert!(!app.api.tokens().has_token());
}

#[tokio::test]
async fn test_initialize_discards_stale_token() {
    let app = TestApp::spawn().await;
    app.api.tokens().set_token("token_from_old_install").expect("seed token");

    // The backend only honors its own token, so bootstrap gets a 401.
    app.session.initialize().await;
    assert!(!app.session.is_authenticated());
    assert!(!app.api.tokens().has_token());
}

#[tokio::test]
async fn test_initialize_restores_valid_session() {
    let app = TestApp::spawn().await;
    app.session
        .sign_in("shopper@example.com", "hunter2")
        .await
        .expect("sign in");

    // A second container over the same credential store, as after relaunch.
    let relaunched = bramble_client::state::Session::new(app.api.clone());
    relaunched.initialize().await;
    assert!(relaunched.is_authenticated());
}

// ============================================================================
// Sign Out
// ============================================================================

#[tokio::test]
async fn test_sign_out_clears_local_state() {
    let app = TestApp::spawn().await;
    app.session
        .sign_in("shopper@example.com", "hunter2")
        .await
        .expect("sign in");

    app.session.sign_out().await.expect("sign out");
    assert!(!app.session.is_authenticated());
    assert!(!app.api.tokens().has_token());
    assert_eq!(
        app.backend
            .count_requests("POST", "/auth/customer/emailpass/logout"),
        1
    );
}

// ============================================================================
// Password Reset
// ============================================================================

#[tokio::test]
async fn test_reset_password_via_deep_link() {
    let app = TestApp::spawn().await;

    app.session
        .request_password_reset("shopper@example.com")
        .await
        .expect("request reset");

    let link = parse_reset_password_link(
        "brambleapp://reset-password?token=reset_tok&email=shopper%40example.com",
    )
    .expect("parse link");

    app.session
        .reset_password(&link.email, &link.token, "new-password")
        .await
        .expect("reset password");
    assert_eq!(
        app.backend
            .count_requests("POST", "/auth/customer/emailpass/update"),
        1
    );
}
