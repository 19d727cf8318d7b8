use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use exam_core::model::{QuestionId, Selection, WrongQuestionRecord, WrongStatus};

use crate::keys;
use crate::repository::{KeyValueStore, StorageError};

/// Persisted shape of a wrong-question record.
///
/// Mirrors the domain record so the store can serialize it without leaking
/// storage concerns into the domain layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrongQuestionRow {
    pub question_id: QuestionId,
    pub user_answer: Selection,
    pub correct_answer: Selection,
    pub wrong_date: DateTime<Utc>,
    pub wrong_count: u32,
    pub status: WrongStatus,
    pub is_reviewed: bool,
    pub review_count: u32,
    pub last_review_date: Option<DateTime<Utc>>,
    pub mastered_date: Option<DateTime<Utc>>,
}

impl WrongQuestionRow {
    #[must_use]
    pub fn from_record(record: &WrongQuestionRecord) -> Self {
        Self {
            question_id: record.question_id(),
            user_answer: record.user_answer().clone(),
            correct_answer: record.correct_answer().clone(),
            wrong_date: record.wrong_date(),
            wrong_count: record.wrong_count(),
            status: record.status(),
            is_reviewed: record.is_reviewed(),
            review_count: record.review_count(),
            last_review_date: record.last_review_date(),
            mastered_date: record.mastered_date(),
        }
    }

    /// Convert back into a domain record, re-validating its invariants.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the row violates record invariants.
    pub fn into_record(self) -> Result<WrongQuestionRecord, StorageError> {
        WrongQuestionRecord::from_persisted(
            self.question_id,
            self.user_answer,
            self.correct_answer,
            self.wrong_date,
            self.wrong_count,
            self.status,
            self.is_reviewed,
            self.review_count,
            self.last_review_date,
            self.mastered_date,
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Result of a bulk load.
#[derive(Debug, Default)]
pub struct LoadedRecords {
    pub records: Vec<WrongQuestionRecord>,
    /// Ids whose stored row could not be turned back into a record.
    pub skipped: Vec<(QuestionId, StorageError)>,
}

/// Typed access to wrong-question records in a key-value store.
///
/// Each record lives under its own key, so one update is one write. An index
/// key lists every tracked id for bulk loading.
#[derive(Clone)]
pub struct WrongQuestionStore {
    kv: Arc<dyn KeyValueStore>,
}

impl WrongQuestionStore {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    async fn read_index(&self) -> Result<Vec<QuestionId>, StorageError> {
        match self.kv.get(keys::WRONG_QUESTION_INDEX).await? {
            Some(raw) => serde_json::from_str(&raw).map_err(ser),
            None => Ok(Vec::new()),
        }
    }

    /// Fetch one record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend or decoding failures.
    pub async fn get(&self, id: QuestionId) -> Result<Option<WrongQuestionRecord>, StorageError> {
        let Some(raw) = self.kv.get(&keys::wrong_question(id)).await? else {
            return Ok(None);
        };
        let row: WrongQuestionRow = serde_json::from_str(&raw).map_err(ser)?;
        row.into_record().map(Some)
    }

    /// Load every indexed record.
    ///
    /// Index entries without a stored record are dropped silently. Rows that
    /// fail to decode or re-validate are left out of `records` and reported
    /// in `skipped`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend fails or the index itself cannot
    /// be decoded.
    pub async fn load_all(&self) -> Result<LoadedRecords, StorageError> {
        let ids = self.read_index().await?;
        let mut loaded = LoadedRecords::default();
        for id in ids {
            match self.get(id).await {
                Ok(Some(record)) => loaded.records.push(record),
                Ok(None) => {}
                Err(err @ StorageError::Serialization(_)) => loaded.skipped.push((id, err)),
                Err(err) => return Err(err),
            }
        }
        Ok(loaded)
    }

    /// Upsert one record and make sure it is indexed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if either write fails.
    pub async fn save(&self, record: &WrongQuestionRecord) -> Result<(), StorageError> {
        let row = WrongQuestionRow::from_record(record);
        let raw = serde_json::to_string(&row).map_err(ser)?;
        self.kv
            .set(&keys::wrong_question(record.question_id()), &raw)
            .await?;

        let mut ids = self.read_index().await?;
        if !ids.contains(&record.question_id()) {
            ids.push(record.question_id());
            let raw = serde_json::to_string(&ids).map_err(ser)?;
            self.kv.set(keys::WRONG_QUESTION_INDEX, &raw).await?;
        }
        Ok(())
    }
}
