//! In-memory storage backend.

use dashmap::DashMap;

use super::{KeyValueStore, StorageError};

/// Process-local key/value store.
///
/// `unavailable()` builds a store that rejects every operation, standing in
/// for a disabled or full storage area.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: DashMap<String, String>,
    unavailable: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unavailable() -> Self {
        Self {
            items: DashMap::new(),
            unavailable: true,
        }
    }

    fn ensure_available(&self) -> Result<(), StorageError> {
        if self.unavailable {
            return Err(StorageError::Unavailable("memory storage disabled".into()));
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.ensure_available()?;
        Ok(self.items.get(key).map(|v| v.value().clone()))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.ensure_available()?;
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.ensure_available()?;
        self.items.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.ensure_available()?;
        self.items.clear();
        Ok(())
    }
}
