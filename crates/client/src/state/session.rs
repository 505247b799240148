//! Credential & session lifecycle.
//!
//! Holds the authenticated customer and drives the token's
//! read/write/delete lifecycle through the credential store. There is no
//! token refresh: tokens are treated as long-lived, and any 401 surfaces as
//! [`StoreError::SessionExpired`] for [`Session::handle_session_expired`]
//! to act on.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::warn;

use bramble_core::Email;

use crate::error::{Result, StoreError};
use crate::http::ApiClient;
use crate::services::{auth, customers};
use crate::storage::TokenStore;
use crate::types::{Customer, ProfileUpdate};

/// Authenticated-user state container.
///
/// Cheaply cloneable; clones share the same user state.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    api: ApiClient,
    tokens: TokenStore,
    user: Mutex<Option<Customer>>,
}

impl Session {
    /// Create a session container over the shared API client.
    ///
    /// The credential store is the one the client attaches bearer tokens
    /// from, so a token persisted here is picked up by every request.
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        let tokens = api.tokens().clone();
        Self {
            inner: Arc::new(SessionInner {
                api,
                tokens,
                user: Mutex::new(None),
            }),
        }
    }

    /// The authenticated customer, if any.
    #[must_use]
    pub fn user(&self) -> Option<Customer> {
        self.lock_user().clone()
    }

    /// Whether a customer is signed in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.lock_user().is_some()
    }

    /// App-start bootstrap: if a token is persisted, fetch the profile.
    ///
    /// Failure is logged, not surfaced - the user is simply left unset. A
    /// `SessionExpired` failure additionally deletes the stale token.
    pub async fn initialize(&self) {
        if !self.inner.tokens.has_token() {
            return;
        }

        match customers::get_profile(&self.inner.api).await {
            Ok(user) => {
                *self.lock_user() = Some(user);
            }
            Err(StoreError::SessionExpired) => {
                warn!("persisted token rejected by backend, clearing it");
                if let Err(err) = self.inner.tokens.clear() {
                    warn!(error = %err, "failed to clear stale token");
                }
            }
            Err(err) => {
                warn!(error = %err, "auth init failed, continuing signed out");
            }
        }
    }

    /// Sign in with email and password.
    ///
    /// Persists the returned token, fetches the profile, and sets the user.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingToken`] if the login response omits a
    /// token (nothing is written to storage in that case), or another error
    /// if the credentials are rejected or the profile fetch fails.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Customer> {
        let email = Email::parse(email)?;

        let response = auth::login(&self.inner.api, &email, password).await?;
        let token = response.token.ok_or(StoreError::MissingToken)?;
        self.inner.tokens.set_token(&token)?;

        let user = customers::get_profile(&self.inner.api).await?;
        *self.lock_user() = Some(user.clone());
        Ok(user)
    }

    /// Sign up: register auth credentials, then create the store-customer
    /// record, and set the user from that response.
    ///
    /// # Errors
    ///
    /// Returns an error if either backend call fails.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<Customer> {
        let email = Email::parse(email)?;

        let response = auth::register(&self.inner.api, &email, password).await?;
        if let Some(token) = response.token {
            self.inner.tokens.set_token(&token)?;
        }

        let user =
            customers::create_store_customer(&self.inner.api, &email, first_name, last_name)
                .await?;
        *self.lock_user() = Some(user.clone());
        Ok(user)
    }

    /// Sign out: best-effort server logout, then unconditionally delete the
    /// local token and clear the user.
    ///
    /// # Errors
    ///
    /// Returns an error only if the local token cannot be deleted. The
    /// in-memory user is cleared before that can happen.
    pub async fn sign_out(&self) -> Result<()> {
        if let Err(err) = auth::logout(&self.inner.api).await {
            warn!(error = %err, "server logout failed, clearing local session anyway");
        }

        *self.lock_user() = None;
        self.inner.tokens.clear()?;
        Ok(())
    }

    /// Refetch the profile and replace the user.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile fetch fails; the user is left as-is.
    pub async fn refresh_user(&self) -> Result<Customer> {
        let user = customers::get_profile(&self.inner.api).await?;
        *self.lock_user() = Some(user.clone());
        Ok(user)
    }

    /// Update the profile and replace the user with the server response.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Customer> {
        let user = customers::update_profile(&self.inner.api, update).await?;
        *self.lock_user() = Some(user.clone());
        Ok(user)
    }

    /// React to a [`StoreError::SessionExpired`] observed anywhere: delete
    /// the token and clear the user so the app can route to sign-in.
    pub fn handle_session_expired(&self) {
        *self.lock_user() = None;
        if let Err(err) = self.inner.tokens.clear() {
            warn!(error = %err, "failed to clear token after session expiry");
        }
    }

    /// Request a password-reset email.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn request_password_reset(&self, identifier: &str) -> Result<()> {
        auth::request_password_reset(&self.inner.api, identifier).await
    }

    /// Complete a password reset using a token from a deep link.
    ///
    /// # Errors
    ///
    /// Returns an error if the email is invalid or the backend rejects the
    /// token.
    pub async fn reset_password(
        &self,
        email: &str,
        reset_token: &str,
        new_password: &str,
    ) -> Result<()> {
        let email = Email::parse(email)?;
        auth::update_password(&self.inner.api, &email, new_password, reset_token).await
    }

    fn lock_user(&self) -> std::sync::MutexGuard<'_, Option<Customer>> {
        self.inner.user.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
