//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BRAMBLE_BASE_URL` - Base URL of the commerce backend (e.g., <https://store.example.com>)
//! - `BRAMBLE_PUBLISHABLE_KEY` - Publishable API key sent on every store request
//!
//! ## Optional
//! - `BRAMBLE_REQUEST_TIMEOUT_SECS` - Client-wide request timeout (default: 15)
//! - `BRAMBLE_STORAGE_DIR` - Directory for on-device key-value files
//!   (default: in-memory storage only)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Default client-wide request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Placeholder value in {0}: {1}")]
    Placeholder(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Base URL of the commerce backend.
    pub base_url: Url,
    /// Publishable API key identifying this client to the store endpoints.
    /// Non-secret by definition, but must not be a placeholder.
    pub publishable_key: String,
    /// Client-wide request timeout.
    pub request_timeout: Duration,
    /// Directory for persisted key-value files. `None` means in-memory only.
    pub storage_dir: Option<PathBuf>,
}

impl StoreConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid,
    /// or if the publishable key looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let base_url = parse_base_url(&get_required_env("BRAMBLE_BASE_URL")?)?;

        let publishable_key = get_required_env("BRAMBLE_PUBLISHABLE_KEY")?;
        validate_not_placeholder(&publishable_key, "BRAMBLE_PUBLISHABLE_KEY")?;

        let request_timeout = get_env_or_default(
            "BRAMBLE_REQUEST_TIMEOUT_SECS",
            &DEFAULT_TIMEOUT_SECS.to_string(),
        )
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| {
            ConfigError::InvalidEnvVar("BRAMBLE_REQUEST_TIMEOUT_SECS".to_string(), e.to_string())
        })?;

        let storage_dir = get_optional_env("BRAMBLE_STORAGE_DIR").map(PathBuf::from);

        Ok(Self {
            base_url,
            publishable_key,
            request_timeout,
            storage_dir,
        })
    }

    /// Build a configuration directly, for tests and embedding.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `base_url` does not parse as an HTTP URL.
    pub fn new(base_url: &str, publishable_key: impl Into<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            publishable_key: publishable_key.into(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            storage_dir: None,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidEnvVar("BRAMBLE_BASE_URL".to_string(), e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidEnvVar(
            "BRAMBLE_BASE_URL".to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }

    Ok(url)
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Validate that a configured value is not an obvious placeholder.
fn validate_not_placeholder(value: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = value.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::Placeholder(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_base_url_valid() {
        let url = parse_base_url("https://store.test:9000").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("store.test"));
    }

    #[test]
    fn test_parse_base_url_rejects_non_http() {
        let result = parse_base_url("ftp://store.test");
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(_, _))));
    }

    #[test]
    fn test_parse_base_url_rejects_garbage() {
        assert!(parse_base_url("not a url").is_err());
    }

    #[test]
    fn test_validate_not_placeholder_rejects() {
        let result = validate_not_placeholder("your-publishable-key-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::Placeholder(_, _))));
    }

    #[test]
    fn test_validate_not_placeholder_accepts_real_key() {
        let result = validate_not_placeholder("pk_01J8G2V9M3N4P5Q6R7S8T9U0V1", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_new_defaults() {
        let config = StoreConfig::new("http://localhost:9000", "pk_123").unwrap();
        assert_eq!(config.request_timeout, Duration::from_secs(15));
        assert!(config.storage_dir.is_none());
    }
}
