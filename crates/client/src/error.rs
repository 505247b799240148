//! Unified error handling for the storefront client.
//!
//! All services and containers return `Result<T, StoreError>`. Server error
//! bodies are mined for a human-readable message before being surfaced.

use thiserror::Error;

use crate::storage::StorageError;

/// Application-level error type for the storefront client.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport-level HTTP failure (connectivity, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server-reported error (4xx/5xx) with a best-effort extracted message.
    #[error("server error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response body, or the raw body.
        message: String,
    },

    /// The backend rejected the stored credentials (HTTP 401).
    #[error("session expired")]
    SessionExpired,

    /// Login response did not include a token.
    #[error("login response did not return token")]
    MissingToken,

    /// Response body could not be deserialized.
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// On-device storage failure.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Invalid email supplied to an auth operation.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] bramble_core::EmailError),

    /// A required piece of local state is missing for this operation.
    #[error("precondition not met: {0}")]
    Precondition(String),

    /// Another cart mutation is already in flight.
    #[error("a cart mutation is already in flight")]
    CartBusy,

    /// The backend declined to complete the cart into an order.
    #[error("order not placed: {0}")]
    OrderRejected(String),
}

impl StoreError {
    /// Shorthand for a [`StoreError::Precondition`].
    #[must_use]
    pub fn precondition(what: impl Into<String>) -> Self {
        Self::Precondition(what.into())
    }
}

/// Result type alias for `StoreError`.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Maximum number of raw-body characters carried into an error message.
const MAX_MESSAGE_LENGTH: usize = 200;

/// Extract a display message from a server error body.
///
/// Prefers the body's `message` field, falls back to the truncated raw body,
/// then to the status code alone.
#[must_use]
pub fn extract_message(status: u16, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body)
        && let Some(message) = value.get("message").and_then(|m| m.as_str())
        && !message.is_empty()
    {
        return message.to_string();
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return format!("HTTP {status}");
    }

    trimmed.chars().take(MAX_MESSAGE_LENGTH).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_message_from_json_body() {
        let body = r#"{"message":"Invalid email or password","type":"unauthorized"}"#;
        assert_eq!(extract_message(401, body), "Invalid email or password");
    }

    #[test]
    fn test_extract_message_falls_back_to_raw_body() {
        assert_eq!(extract_message(500, "upstream exploded"), "upstream exploded");
    }

    #[test]
    fn test_extract_message_empty_body() {
        assert_eq!(extract_message(502, ""), "HTTP 502");
        assert_eq!(extract_message(502, "   "), "HTTP 502");
    }

    #[test]
    fn test_extract_message_truncates_long_body() {
        let body = "x".repeat(5000);
        assert_eq!(extract_message(500, &body).len(), MAX_MESSAGE_LENGTH);
    }

    #[test]
    fn test_missing_token_display() {
        let err = StoreError::MissingToken;
        assert!(err.to_string().contains("did not return token"));
    }

    #[test]
    fn test_api_error_display() {
        let err = StoreError::Api {
            status: 422,
            message: "quantity must be positive".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "server error (422): quantity must be positive"
        );
    }
}
