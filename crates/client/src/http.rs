//! Outbound HTTP adapter for the commerce backend.
//!
//! Every request carries the `x-publishable-api-key` header; requests made
//! while a token is persisted additionally carry `Authorization: Bearer`.
//! One fixed client-wide timeout, no retries, no backoff.

use std::sync::Arc;

use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use crate::config::StoreConfig;
use crate::error::{StoreError, extract_message};
use crate::storage::TokenStore;

/// Header carrying the publishable API key on every store request.
const PUBLISHABLE_KEY_HEADER: &str = "x-publishable-api-key";

/// Client for the commerce backend's store and auth APIs.
///
/// Cheaply cloneable via `Arc`; services share one instance.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: String,
    publishable_key: String,
    tokens: TokenStore,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(config: &StoreConfig, tokens: TokenStore) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
                publishable_key: config.publishable_key.clone(),
                tokens,
            }),
        })
    }

    /// The credential store this client reads bearer tokens from.
    #[must_use]
    pub fn tokens(&self) -> &TokenStore {
        &self.inner.tokens
    }

    /// GET a JSON resource.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SessionExpired`] on a 401 to a request that
    /// carried the stored bearer token, [`StoreError::Api`] for other
    /// non-success statuses, and transport/parse errors otherwise.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, StoreError> {
        let request = self
            .inner
            .client
            .get(self.url(path))
            .query(query);
        self.execute(path, request, None).await
    }

    /// POST a JSON body and parse a JSON response.
    ///
    /// # Errors
    ///
    /// Same as [`ApiClient::get`].
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, StoreError> {
        let request = self.inner.client.post(self.url(path)).json(body);
        self.execute(path, request, None).await
    }

    /// POST without a body.
    ///
    /// # Errors
    ///
    /// Same as [`ApiClient::get`].
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, StoreError> {
        let request = self.inner.client.post(self.url(path));
        self.execute(path, request, None).await
    }

    /// POST with an explicit bearer token instead of the stored one.
    ///
    /// Used by the password-reset flow, where the token arrives in a deep
    /// link rather than from the credential store.
    ///
    /// # Errors
    ///
    /// Same as [`ApiClient::get`].
    pub async fn post_with_token<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        token: &str,
    ) -> Result<T, StoreError> {
        let request = self.inner.client.post(self.url(path)).json(body);
        self.execute(path, request, Some(token)).await
    }

    /// DELETE a resource, discarding the response body.
    ///
    /// The cart flow never trusts delete response bodies; it refetches the
    /// parent resource instead.
    ///
    /// # Errors
    ///
    /// Same as [`ApiClient::get`].
    pub async fn delete(&self, path: &str) -> Result<(), StoreError> {
        let request = self.inner.client.delete(self.url(path));
        let _: serde_json::Value = self.execute(path, request, None).await?;
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        path: &str,
        request: reqwest::RequestBuilder,
        token_override: Option<&str>,
    ) -> Result<T, StoreError> {
        let mut request = request.header(PUBLISHABLE_KEY_HEADER, &self.inner.publishable_key);

        let mut sent_stored_token = false;
        if let Some(token) = token_override {
            request = request.bearer_auth(token);
        } else if let Some(token) = self.inner.tokens.token() {
            request = request.bearer_auth(token.expose_secret());
            sent_stored_token = true;
        }

        let response = request.send().await?;
        let status = response.status();

        // A 401 only means the session is gone when the stored token was
        // on the request. A 401 without it (bad login credentials, bad
        // reset token) is an ordinary API error with a server message.
        if status == reqwest::StatusCode::UNAUTHORIZED && sent_stored_token {
            debug!(path, "backend rejected stored credentials");
            return Err(StoreError::SessionExpired);
        }

        // Read the body as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            error!(
                path,
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "backend returned non-success status"
            );
            return Err(StoreError::Api {
                status: status.as_u16(),
                message: extract_message(status.as_u16(), &body),
            });
        }

        match serde_json::from_str(&body) {
            Ok(value) => Ok(value),
            Err(e) => {
                error!(
                    path,
                    error = %e,
                    body = %body.chars().take(500).collect::<String>(),
                    "failed to parse backend response"
                );
                Err(StoreError::Parse(e))
            }
        }
    }
}
