//! On-device key-value persistence.
//!
//! Devices offer two stores: a secure enclave for the auth token and a
//! general store for everything else. Both reduce to the same string
//! key-value contract, so a single [`KeyValueStore`] trait keeps the seam
//! injectable; callers decide which implementation backs which concern.
//!
//! Keys are fixed string constants. There is no versioning or migration.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use secrecy::SecretString;
use thiserror::Error;
use tracing::warn;

/// Storage key for the persisted auth token.
pub const TOKEN_KEY: &str = "auth_token";

/// Storage key for the active cart identifier.
pub const CART_ID_KEY: &str = "active_cart_id";

/// Storage key for the cached region object (JSON).
pub const REGION_KEY: &str = "active_region";

/// Errors raised by the key-value stores.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file held invalid JSON.
    #[error("storage file corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    /// The store's lock was poisoned by a panicking writer.
    #[error("storage lock poisoned")]
    Poisoned,
}

/// String key-value store contract.
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `None` if the key is absent.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backing store cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a key. Deleting an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backing store cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

// =============================================================================
// MemoryStore
// =============================================================================

/// In-memory store, used in tests and as a fallback when no storage
/// directory is configured.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let values = self.values.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().map_err(|_| StorageError::Poisoned)?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().map_err(|_| StorageError::Poisoned)?;
        values.remove(key);
        Ok(())
    }
}

// =============================================================================
// FileStore
// =============================================================================

/// JSON-file-backed store.
///
/// The whole map is rewritten on every change via a temp-file rename, so a
/// crash mid-write leaves the previous file intact.
pub struct FileStore {
    path: PathBuf,
    values: Mutex<HashMap<String, String>>,
}

impl FileStore {
    /// Open a store at `path`, loading existing contents if the file exists.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the file exists but cannot be read or
    /// parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let values = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw)?
        } else {
            HashMap::new()
        };

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    fn flush(&self, values: &HashMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("tmp");
        {
            let mut file = std::fs::File::create(&tmp)?;
            let raw = serde_json::to_string_pretty(values)?;
            file.write_all(raw.as_bytes())?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let values = self.values.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().map_err(|_| StorageError::Poisoned)?;
        values.insert(key.to_string(), value.to_string());
        self.flush(&values)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().map_err(|_| StorageError::Poisoned)?;
        values.remove(key);
        self.flush(&values)
    }
}

// =============================================================================
// TokenStore
// =============================================================================

/// Credential store: the auth token's read/write/delete lifecycle.
///
/// Wraps whichever [`KeyValueStore`] plays the part of secure storage and
/// keeps the token wrapped in [`SecretString`] in memory.
#[derive(Clone)]
pub struct TokenStore {
    store: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    /// Create a token store over the given backing store.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Read the persisted token, if any.
    ///
    /// Storage failures are logged and treated as "no token": a broken
    /// secure store must never take a request down with it.
    #[must_use]
    pub fn token(&self) -> Option<SecretString> {
        match self.store.get(TOKEN_KEY) {
            Ok(token) => token.map(SecretString::from),
            Err(err) => {
                warn!(error = %err, "failed to read auth token from storage");
                None
            }
        }
    }

    /// Whether a token is currently persisted.
    #[must_use]
    pub fn has_token(&self) -> bool {
        self.token().is_some()
    }

    /// Persist a token.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backing store cannot be written.
    pub fn set_token(&self, token: &str) -> Result<(), StorageError> {
        self.store.set(TOKEN_KEY, token)
    }

    /// Delete the persisted token.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backing store cannot be written.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.store.remove(TOKEN_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        assert!(store.get("k").expect("get").is_none());

        store.set("k", "v").expect("set");
        assert_eq!(store.get("k").expect("get").as_deref(), Some("v"));

        store.remove("k").expect("remove");
        assert!(store.get("k").expect("get").is_none());
    }

    #[test]
    fn test_memory_store_remove_absent_key_is_ok() {
        let store = MemoryStore::new();
        store.remove("never-set").expect("remove");
    }

    #[test]
    fn test_file_store_persists_across_opens() {
        let path = std::env::temp_dir().join(format!(
            "bramble-storage-test-{}-{:?}.json",
            std::process::id(),
            std::thread::current().id()
        ));
        let _ = std::fs::remove_file(&path);

        {
            let store = FileStore::open(&path).expect("open");
            store.set(CART_ID_KEY, "cart_01H").expect("set");
        }
        {
            let store = FileStore::open(&path).expect("reopen");
            assert_eq!(
                store.get(CART_ID_KEY).expect("get").as_deref(),
                Some("cart_01H")
            );
            store.remove(CART_ID_KEY).expect("remove");
        }
        {
            let store = FileStore::open(&path).expect("reopen");
            assert!(store.get(CART_ID_KEY).expect("get").is_none());
        }

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_token_store_lifecycle() {
        let tokens = TokenStore::new(Arc::new(MemoryStore::new()));
        assert!(!tokens.has_token());

        tokens.set_token("jwt-abc").expect("set");
        let token = tokens.token().expect("token present");
        assert_eq!(token.expose_secret(), "jwt-abc");

        tokens.clear().expect("clear");
        assert!(!tokens.has_token());
    }
}
