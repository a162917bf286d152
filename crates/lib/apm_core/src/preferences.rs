//! Client preferences persisted under [`keys::PREFERENCES`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

use crate::error::{ClientError, ClientResult};
use crate::storage::{LocalStorage, StorageError, keys};

const INVALID_PREFERENCE: &str = "Invalid preference property or value.";

/// Stored preferences blob.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Preferences {
    pub map_center_latitude: Option<f64>,
    pub map_center_longitude: Option<f64>,
    pub use_legacy_details_view: bool,
    /// Skip the local response cache for every request.
    pub disable_client_side_caching: bool,
}

#[derive(Clone)]
pub struct PreferencesService {
    storage: LocalStorage,
}

impl PreferencesService {
    pub fn new(storage: LocalStorage) -> Self {
        Self { storage }
    }

    /// Set one preference by its camelCase property name.
    ///
    /// Defaults are written first when nothing is stored yet. Unknown
    /// properties and values of the wrong type are rejected.
    pub fn set_preference(&self, property: &str, value: Value) -> ClientResult<()> {
        if !self.storage.test() {
            error!("local storage is not supported, preferences can not be applied");
            return Err(StorageError::Unavailable("preferences can not be applied".into()).into());
        }

        let current = match self.storage.get::<Preferences>(keys::PREFERENCES) {
            Some(preferences) => preferences,
            None => {
                let defaults = Preferences::default();
                self.storage.set(keys::PREFERENCES, &defaults, None)?;
                info!("default preferences initialized");
                defaults
            }
        };

        let mut fields = serde_json::to_value(&current)?;
        let Some(slot) = fields.as_object_mut().and_then(|map| map.get_mut(property)) else {
            error!(property, "invalid preference property");
            return Err(ClientError::Validation(INVALID_PREFERENCE.into()));
        };
        *slot = value;

        let updated: Preferences = serde_json::from_value(fields).map_err(|e| {
            error!(property, error = %e, "invalid preference value");
            ClientError::Validation(INVALID_PREFERENCE.into())
        })?;
        self.storage.set(keys::PREFERENCES, &updated, None)?;
        info!(property, "preference applied");
        Ok(())
    }

    /// Value of one preference; `None` when storage is unavailable, nothing is
    /// stored, or the property is unknown or unset.
    pub fn get_preference(&self, property: &str) -> Option<Value> {
        if !self.storage.test() {
            error!("local storage is not supported, preferences can not be read");
            return None;
        }

        let Some(preferences) = self.storage.get::<Preferences>(keys::PREFERENCES) else {
            info!("preferences not initialized");
            return None;
        };

        serde_json::to_value(preferences)
            .ok()?
            .get(property)
            .filter(|value| !value.is_null())
            .cloned()
    }

    /// All preferences, defaults when none are stored.
    pub fn preferences(&self) -> Preferences {
        self.storage
            .get(keys::PREFERENCES)
            .unwrap_or_default()
    }

    pub fn caching_disabled(&self) -> bool {
        self.preferences().disable_client_side_caching
    }
}
