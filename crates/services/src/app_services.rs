use std::path::Path;
use std::sync::Arc;

use exam_core::model::{EngineSettings, EngineSettingsDraft};
use exam_core::{BankDraft, QuestionBank};
use storage::bank_file::read_bank_file;
use storage::repository::Storage;

use crate::Clock;
use crate::error::{AppServicesError, SettingsServiceError};
use crate::sessions::SessionController;
use crate::settings_service::SettingsService;
use crate::timer::{TickScheduler, TokioTickScheduler};
use crate::wrong_questions::WrongQuestionTracker;

/// Assembles the engine: validated bank, persisted settings, loaded tracker
/// and a session controller wired to a `tokio` ticker.
pub struct AppServices {
    storage: Storage,
    bank: Arc<QuestionBank>,
    settings: SettingsService,
    controller: SessionController,
}

impl AppServices {
    /// Build services over an existing storage backend.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the bank is invalid.
    pub async fn new(
        storage: Storage,
        bank: BankDraft,
        clock: Clock,
    ) -> Result<Self, AppServicesError> {
        Self::with_scheduler(storage, bank, clock, Arc::new(TokioTickScheduler)).await
    }

    /// Same as `new` with a caller-provided tick scheduler.
    ///
    /// Unreadable settings fall back to defaults and an unreachable store
    /// leaves the tracker in memory only; both are logged.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the bank is invalid.
    pub async fn with_scheduler(
        storage: Storage,
        bank: BankDraft,
        clock: Clock,
        scheduler: Arc<dyn TickScheduler>,
    ) -> Result<Self, AppServicesError> {
        let bank = Arc::new(QuestionBank::load(bank)?);
        let settings = SettingsService::new(storage.settings());
        let engine_settings = match settings.load().await {
            Ok(loaded) => loaded,
            Err(err) => {
                tracing::warn!(error = %err, "engine settings unavailable; using defaults");
                EngineSettings::default()
            }
        };
        let tracker = WrongQuestionTracker::load(&storage, engine_settings.mastered_policy()).await;
        tracing::info!(
            questions = bank.len(),
            profiles = bank.profiles().len(),
            tracked = tracker.stats().total(),
            "engine ready"
        );
        let controller = SessionController::new(
            clock,
            Arc::clone(&bank),
            tracker,
            engine_settings,
            scheduler,
        );
        Ok(Self {
            storage,
            bank,
            settings,
            controller,
        })
    }

    /// Build services backed by `SQLite` storage and a bank file on disk.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the bank file cannot be read or is
    /// invalid.
    pub async fn new_sqlite(
        db_url: &str,
        bank_path: impl AsRef<Path>,
        clock: Clock,
    ) -> Result<Self, AppServicesError> {
        let bank = read_bank_file(bank_path)?;
        let storage = Self::open_storage(db_url).await;
        Self::new(storage, bank, clock).await
    }

    /// Open `SQLite` storage, falling back to an in-memory store when the
    /// database cannot be opened or migrated.
    pub async fn open_storage(db_url: &str) -> Storage {
        match Storage::sqlite(db_url).await {
            Ok(storage) => storage,
            Err(err) => {
                tracing::warn!(error = %err, db_url, "database unavailable; progress will not be saved");
                Storage::in_memory()
            }
        }
    }

    /// Validate, persist and apply new engine settings. Runs started
    /// afterwards use them.
    ///
    /// # Errors
    ///
    /// Returns `SettingsServiceError` if validation or persistence fails;
    /// the active settings are then left unchanged.
    pub async fn save_settings(
        &mut self,
        draft: EngineSettingsDraft,
    ) -> Result<EngineSettings, SettingsServiceError> {
        let settings = self.settings.save(draft).await?;
        self.controller.apply_settings(settings.clone());
        Ok(settings)
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    #[must_use]
    pub fn bank(&self) -> Arc<QuestionBank> {
        Arc::clone(&self.bank)
    }

    #[must_use]
    pub fn settings(&self) -> &SettingsService {
        &self.settings
    }

    #[must_use]
    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut SessionController {
        &mut self.controller
    }
}
