//! Auth endpoint wrappers (email/password scheme).

use serde_json::json;
use tracing::debug;

use bramble_core::Email;

use crate::error::Result;
use crate::http::ApiClient;
use crate::types::AuthTokenResponse;

/// Log in with email and password.
///
/// Returns the raw token response; the session container decides whether a
/// missing token is an error.
///
/// # Errors
///
/// Returns an error if the request fails or the server rejects the
/// credentials.
pub async fn login(api: &ApiClient, email: &Email, password: &str) -> Result<AuthTokenResponse> {
    let response: AuthTokenResponse = api
        .post(
            "/auth/customer/emailpass",
            &json!({ "email": email.as_str(), "password": password }),
        )
        .await?;
    debug!(token_returned = response.token.is_some(), "login response");
    Ok(response)
}

/// Register auth-only credentials.
///
/// A store-customer record must be created separately afterwards.
///
/// # Errors
///
/// Returns an error if the request fails or the email is already taken.
pub async fn register(api: &ApiClient, email: &Email, password: &str) -> Result<AuthTokenResponse> {
    api.post(
        "/auth/customer/emailpass/register",
        &json!({ "email": email.as_str(), "password": password }),
    )
    .await
}

/// Server-side logout. Callers treat failure as best-effort.
///
/// # Errors
///
/// Returns an error if the request fails.
pub async fn logout(api: &ApiClient) -> Result<()> {
    let _: serde_json::Value = api.post_empty("/auth/customer/emailpass/logout").await?;
    Ok(())
}

/// Request a password-reset email for the given identifier.
///
/// # Errors
///
/// Returns an error if the request fails.
pub async fn request_password_reset(api: &ApiClient, identifier: &str) -> Result<()> {
    let _: serde_json::Value = api
        .post(
            "/auth/customer/emailpass/reset-password",
            &json!({ "identifier": identifier }),
        )
        .await?;
    Ok(())
}

/// Update the password using a reset token from a deep link.
///
/// The reset token is sent as the bearer credential for this one call; the
/// stored session token (if any) is not used.
///
/// # Errors
///
/// Returns an error if the request fails or the token is invalid.
pub async fn update_password(
    api: &ApiClient,
    email: &Email,
    new_password: &str,
    reset_token: &str,
) -> Result<()> {
    let _: serde_json::Value = api
        .post_with_token(
            "/auth/customer/emailpass/update",
            &json!({ "email": email.as_str(), "password": new_password }),
            reset_token,
        )
        .await?;
    Ok(())
}
