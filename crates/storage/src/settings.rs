use std::sync::Arc;

use exam_core::model::{EngineSettings, EngineSettingsDraft};

use crate::keys;
use crate::repository::{KeyValueStore, StorageError};

/// Persisted engine settings, stored as one JSON document.
#[derive(Clone)]
pub struct SettingsStore {
    kv: Arc<dyn KeyValueStore>,
}

impl SettingsStore {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Load stored settings, or `None` if nothing was saved yet.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the stored document is invalid.
    pub async fn load(&self) -> Result<Option<EngineSettings>, StorageError> {
        let Some(raw) = self.kv.get(keys::ENGINE_SETTINGS).await? else {
            return Ok(None);
        };
        let draft: EngineSettingsDraft = serde_json::from_str(&raw)
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        EngineSettings::from_persisted(draft)
            .map(Some)
            .map_err(|err| StorageError::Serialization(err.to_string()))
    }

    /// Replace the stored settings.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if encoding or the backend write fails.
    pub async fn save(&self, settings: &EngineSettings) -> Result<(), StorageError> {
        let raw = serde_json::to_string(&settings.to_draft())
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        self.kv.set(keys::ENGINE_SETTINGS, &raw).await
    }
}
