#![forbid(unsafe_code)]

pub mod bank_file;
pub mod flags;
pub mod keys;
pub mod repository;
pub mod settings;
pub mod sqlite;
pub mod wrong_questions;

pub use bank_file::{parse_bank_json, read_bank_file};
pub use flags::ReviewFlagStore;
pub use repository::{InMemoryStore, KeyValueStore, Storage, StorageError};
pub use settings::SettingsStore;
pub use sqlite::{SqliteInitError, SqliteRepository};
pub use wrong_questions::{LoadedRecords, WrongQuestionRow, WrongQuestionStore};
