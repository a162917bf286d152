//! Persisted client state.
//!
//! A [`KeyValueStore`] backend holds raw strings; [`LocalStorage`] layers the
//! `{value, expiration, hasExpiration}` envelope on top so individual keys can
//! carry an optional time-to-live. Reads never fail loudly: unavailable
//! storage or a corrupt entry is logged and reads as absent.

pub mod file;
pub mod memory;

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};

pub use file::FileStorage;
pub use memory::MemoryStorage;

/// Well-known storage keys.
pub mod keys {
    /// Refresh token exchanged for new bearer tokens.
    pub const REFRESH_TOKEN: &str = "apm-refresh-token";
    /// Backend base URL the stored session belongs to.
    pub const SERVER: &str = "apm-server";
    /// Client preferences blob.
    pub const PREFERENCES: &str = "apm-client-preferences";
}

/// Key used to check backend availability.
const AVAILABILITY_KEY: &str = "apm-storage-test";

/// Storage errors.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Storage IO error: {0}")]
    Io(String),

    #[error("Storage serialization error: {0}")]
    Serialization(String),
}

/// Raw string key/value backend.
pub trait KeyValueStore: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove_item(&self, key: &str) -> Result<(), StorageError>;

    fn clear(&self) -> Result<(), StorageError>;

    /// Check the backend with a write/remove cycle.
    fn is_available(&self) -> bool {
        self.set_item(AVAILABILITY_KEY, AVAILABILITY_KEY).is_ok() && self.remove_item(AVAILABILITY_KEY).is_ok()
    }
}

/// Envelope persisted for every key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredItem {
    /// JSON-encoded value.
    value: String,
    /// Expiry as unix milliseconds.
    expiration: Option<i64>,
    has_expiration: bool,
}

impl StoredItem {
    fn is_expired(&self, now_ms: i64) -> bool {
        self.has_expiration && self.expiration.is_some_and(|exp| exp <= now_ms)
    }
}

/// Typed, TTL-aware view over a [`KeyValueStore`].
#[derive(Clone)]
pub struct LocalStorage {
    backend: Arc<dyn KeyValueStore>,
}

impl LocalStorage {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// In-memory storage, mostly for tests and ephemeral clients.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// Read and decode the value stored under `key`.
    ///
    /// Returns `None` when the key is missing, expired, corrupt, or the
    /// backend is unavailable.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.backend.get_item(key) {
            Ok(raw) => raw?,
            Err(e) => {
                error!(key, error = %e, "storage read failed");
                return None;
            }
        };

        let item: StoredItem = match serde_json::from_str(&raw) {
            Ok(item) => item,
            Err(e) => {
                warn!(key, error = %e, "discarding malformed storage entry");
                return None;
            }
        };

        if item.is_expired(Utc::now().timestamp_millis()) {
            debug!(key, "storage entry expired");
            return None;
        }

        match serde_json::from_str(&item.value) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "storage value has unexpected shape");
                None
            }
        }
    }

    /// Store `value` under `key`, optionally expiring after `ttl`.
    pub fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), StorageError> {
        let value =
            serde_json::to_string(value).map_err(|e| StorageError::Serialization(e.to_string()))?;
        // A TTL past the end of the calendar never expires.
        let expiration = ttl
            .filter(|ttl| *ttl > Duration::zero())
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .map(|at| at.timestamp_millis());
        let item = StoredItem {
            value,
            has_expiration: expiration.is_some(),
            expiration,
        };
        let raw =
            serde_json::to_string(&item).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.backend.set_item(key, &raw).inspect_err(|e| {
            error!(key, error = %e, "storage write failed");
        })
    }

    /// Remove `key`. Removing a missing key is not an error.
    pub fn unset(&self, key: &str) -> Result<(), StorageError> {
        self.backend.remove_item(key).inspect_err(|e| {
            error!(key, error = %e, "storage remove failed");
        })
    }

    /// True if a live (non-expired, decodable) value exists under `key`.
    pub fn check(&self, key: &str) -> bool {
        self.get::<serde_json::Value>(key).is_some()
    }

    /// Remove every key.
    pub fn drop_all(&self) -> Result<(), StorageError> {
        self.backend.clear().inspect_err(|e| {
            error!(error = %e, "storage clear failed");
        })
    }

    /// True if the backend currently accepts writes.
    pub fn test(&self) -> bool {
        let available = self.backend.is_available();
        if !available {
            error!("local storage is unavailable");
        }
        available
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_string_value() {
        let storage = LocalStorage::in_memory();
        storage.set(keys::REFRESH_TOKEN, "rt1", None).unwrap();
        assert_eq!(
            storage.get::<String>(keys::REFRESH_TOKEN),
            Some("rt1".to_string())
        );
    }

    #[test]
    fn envelope_shape_matches_wire_format() {
        let backend = Arc::new(MemoryStorage::new());
        let storage = LocalStorage::new(backend.clone());
        storage.set("k", &42, None).unwrap();

        let raw = backend.get_item("k").unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["value"], "42");
        assert_eq!(json["expiration"], serde_json::Value::Null);
        assert_eq!(json["hasExpiration"], false);
    }

    #[test]
    fn ttl_sets_expiration() {
        let backend = Arc::new(MemoryStorage::new());
        let storage = LocalStorage::new(backend.clone());
        storage.set("k", "v", Some(Duration::hours(2))).unwrap();

        let raw = backend.get_item("k").unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["hasExpiration"], true);
        assert!(json["expiration"].as_i64().unwrap() > Utc::now().timestamp_millis());
        assert!(storage.check("k"));
    }

    #[test]
    fn ttl_beyond_calendar_never_expires() {
        let backend = Arc::new(MemoryStorage::new());
        let storage = LocalStorage::new(backend.clone());
        storage
            .set("k", "v", Some(Duration::hours(2_500_000_000)))
            .unwrap();

        let raw = backend.get_item("k").unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["hasExpiration"], false);
        assert_eq!(storage.get::<String>("k").as_deref(), Some("v"));
    }

    #[test]
    fn expired_entry_reads_as_absent() {
        let backend = Arc::new(MemoryStorage::new());
        let storage = LocalStorage::new(backend.clone());
        let expired = r#"{"value":"\"old\"","expiration":1,"hasExpiration":true}"#;
        backend.set_item("k", expired).unwrap();

        assert!(storage.get::<String>("k").is_none());
        assert!(!storage.check("k"));
    }

    #[test]
    fn corrupt_entry_reads_as_absent() {
        let backend = Arc::new(MemoryStorage::new());
        let storage = LocalStorage::new(backend.clone());
        backend.set_item("k", "not json at all").unwrap();

        assert!(storage.get::<String>("k").is_none());
    }

    #[test]
    fn unavailable_backend_degrades_to_none() {
        let storage = LocalStorage::new(Arc::new(MemoryStorage::unavailable()));
        assert!(!storage.test());
        assert!(storage.get::<String>("k").is_none());
        assert!(storage.set("k", "v", None).is_err());
    }

    #[test]
    fn unset_is_idempotent() {
        let storage = LocalStorage::in_memory();
        storage.set("k", "v", None).unwrap();
        storage.unset("k").unwrap();
        storage.unset("k").unwrap();
        assert!(!storage.check("k"));
    }

    #[test]
    fn drop_all_clears_every_key() {
        let storage = LocalStorage::in_memory();
        storage.set("a", "1", None).unwrap();
        storage.set("b", "2", None).unwrap();
        storage.drop_all().unwrap();
        assert!(!storage.check("a"));
        assert!(!storage.check("b"));
    }
}
