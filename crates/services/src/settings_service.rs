use exam_core::model::{EngineSettings, EngineSettingsDraft};
use storage::settings::SettingsStore;

use crate::error::SettingsServiceError;

#[derive(Clone)]
pub struct SettingsService {
    store: SettingsStore,
}

impl SettingsService {
    #[must_use]
    pub fn new(store: SettingsStore) -> Self {
        Self { store }
    }

    /// Load persisted settings (or defaults if missing).
    ///
    /// # Errors
    ///
    /// Returns `SettingsServiceError` on storage failures.
    pub async fn load(&self) -> Result<EngineSettings, SettingsServiceError> {
        let settings = self.store.load().await?;
        Ok(settings.unwrap_or_default())
    }

    /// Validate and persist new settings.
    ///
    /// # Errors
    ///
    /// Returns `SettingsServiceError` if validation fails or persistence fails.
    pub async fn save(
        &self,
        draft: EngineSettingsDraft,
    ) -> Result<EngineSettings, SettingsServiceError> {
        let settings = draft.validate()?;
        self.store.save(&settings).await?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::QuestionOrder;
    use storage::repository::Storage;

    #[tokio::test]
    async fn defaults_until_saved() {
        let storage = Storage::in_memory();
        let service = SettingsService::new(storage.settings());
        assert_eq!(service.load().await.unwrap(), EngineSettings::default());

        let saved = service
            .save(EngineSettingsDraft {
                exam_order: Some(QuestionOrder::Sequential),
                ..EngineSettingsDraft::default()
            })
            .await
            .unwrap();
        assert_eq!(service.load().await.unwrap(), saved);
    }

    #[tokio::test]
    async fn invalid_draft_is_not_persisted() {
        let storage = Storage::in_memory();
        let service = SettingsService::new(storage.settings());
        let err = service
            .save(EngineSettingsDraft {
                practice_passing_score: Some(101),
                ..EngineSettingsDraft::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SettingsServiceError::Settings(_)));
        assert_eq!(service.load().await.unwrap(), EngineSettings::default());
    }
}
