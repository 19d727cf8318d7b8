use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap, HashSet};

use exam_core::model::{ExamResult, MasteredPolicy, QuestionId, WrongQuestionRecord, WrongStatus};
use storage::flags::ReviewFlagStore;
use storage::repository::{Storage, StorageError};
use storage::wrong_questions::WrongQuestionStore;

use crate::error::TrackerError;

/// Counts per wrong-question status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WrongQuestionStats {
    pub new: usize,
    pub reviewed: usize,
    pub mastered: usize,
}

impl WrongQuestionStats {
    #[must_use]
    pub fn total(&self) -> usize {
        self.new + self.reviewed + self.mastered
    }
}

/// Tracks previously missed questions across sessions.
///
/// State lives in memory and every change is written through to the
/// key-value store. The first failed write logs a warning and switches the
/// tracker to in-memory only; later writes are skipped.
pub struct WrongQuestionTracker {
    records: HashMap<QuestionId, WrongQuestionRecord>,
    reviewed_sets: HashSet<String>,
    store: Option<WrongQuestionStore>,
    flags: Option<ReviewFlagStore>,
    policy: MasteredPolicy,
    degraded: bool,
}

impl WrongQuestionTracker {
    /// Tracker with no backing store.
    #[must_use]
    pub fn in_memory(policy: MasteredPolicy) -> Self {
        Self {
            records: HashMap::new(),
            reviewed_sets: HashSet::new(),
            store: None,
            flags: None,
            policy,
            degraded: false,
        }
    }

    /// Load every persisted record.
    ///
    /// Rows that cannot be decoded are skipped with a warning and the store
    /// stays attached. A failing backend yields an empty, in-memory-only
    /// tracker.
    pub async fn load(storage: &Storage, policy: MasteredPolicy) -> Self {
        let store = storage.wrong_questions();
        let mut tracker = Self {
            store: None,
            flags: Some(storage.review_flags()),
            ..Self::in_memory(policy)
        };
        match store.load_all().await {
            Ok(loaded) => {
                for (id, err) in &loaded.skipped {
                    tracing::warn!(question = %id, error = %err, "skipping unreadable wrong-question record");
                }
                tracing::debug!(count = loaded.records.len(), "loaded wrong-question records");
                tracker.records = loaded
                    .records
                    .into_iter()
                    .map(|r| (r.question_id(), r))
                    .collect();
                tracker.store = Some(store);
            }
            Err(err) => tracker.degrade(&err),
        }
        tracker
    }

    fn degrade(&mut self, err: &StorageError) {
        if !self.degraded {
            tracing::warn!(error = %err, "wrong-question persistence failed; continuing in memory");
        }
        self.degraded = true;
    }

    async fn persist(&mut self, id: QuestionId) {
        if self.degraded {
            return;
        }
        let (Some(store), Some(record)) = (self.store.as_ref(), self.records.get(&id)) else {
            return;
        };
        if let Err(err) = store.save(record).await {
            self.degrade(&err);
        }
    }

    #[must_use]
    pub fn policy(&self) -> MasteredPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: MasteredPolicy) {
        self.policy = policy;
    }

    /// True once a persistence failure has been seen.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    #[must_use]
    pub fn get(&self, id: QuestionId) -> Option<&WrongQuestionRecord> {
        self.records.get(&id)
    }

    #[must_use]
    pub fn status_of(&self, id: QuestionId) -> Option<WrongStatus> {
        self.records.get(&id).map(WrongQuestionRecord::status)
    }

    #[must_use]
    pub fn is_tracked(&self, id: QuestionId) -> bool {
        self.records.contains_key(&id)
    }

    /// All records, most recently missed first.
    #[must_use]
    pub fn records(&self) -> Vec<&WrongQuestionRecord> {
        let mut out: Vec<&WrongQuestionRecord> = self.records.values().collect();
        out.sort_by(|a, b| {
            b.wrong_date()
                .cmp(&a.wrong_date())
                .then_with(|| a.question_id().cmp(&b.question_id()))
        });
        out
    }

    #[must_use]
    pub fn stats(&self) -> WrongQuestionStats {
        self.records
            .values()
            .fold(WrongQuestionStats::default(), |mut acc, r| {
                match r.status() {
                    WrongStatus::New => acc.new += 1,
                    WrongStatus::Reviewed => acc.reviewed += 1,
                    WrongStatus::Mastered => acc.mastered += 1,
                }
                acc
            })
    }

    /// Fold a finished run into the tracker.
    ///
    /// Every incorrect evaluation counts as a miss. With `as_review`, every
    /// answered question that is tracked also counts as a review, whatever
    /// the outcome. Each touched record is written once.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::Record` if an evaluation cannot be applied; no
    /// record is changed in that case.
    pub async fn apply_result(
        &mut self,
        result: &ExamResult,
        as_review: bool,
        now: DateTime<Utc>,
    ) -> Result<Vec<QuestionId>, TrackerError> {
        let mut staged: HashMap<QuestionId, WrongQuestionRecord> = HashMap::new();

        for eval in result.evaluations.iter().filter(|e| !e.is_correct) {
            let record = match self.records.get(&eval.question_id) {
                Some(existing) => {
                    let mut next = existing.clone();
                    next.record_miss(eval, now, self.policy)?;
                    next
                }
                None => WrongQuestionRecord::first_miss(eval, now)?,
            };
            staged.insert(eval.question_id, record);
        }

        if as_review {
            for eval in result.evaluations.iter().filter(|e| !e.is_unanswered()) {
                if let Some(record) = staged.get_mut(&eval.question_id) {
                    record.record_review(now);
                } else if let Some(existing) = self.records.get(&eval.question_id) {
                    let mut next = existing.clone();
                    next.record_review(now);
                    staged.insert(eval.question_id, next);
                }
            }
        }

        let touched: BTreeSet<QuestionId> = staged.keys().copied().collect();
        self.records.extend(staged);
        for id in &touched {
            self.persist(*id).await;
        }
        tracing::debug!(
            touched = touched.len(),
            wrong = result.wrong_questions.len(),
            "applied session result to wrong-question tracker"
        );
        Ok(touched.into_iter().collect())
    }

    /// Explicit review of one tracked question.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::NotTracked` for a question that was never missed.
    pub async fn record_review(
        &mut self,
        id: QuestionId,
        now: DateTime<Utc>,
    ) -> Result<WrongQuestionRecord, TrackerError> {
        let record = self.records.get_mut(&id).ok_or(TrackerError::NotTracked(id))?;
        record.record_review(now);
        let snapshot = record.clone();
        self.persist(id).await;
        Ok(snapshot)
    }

    /// Mark one tracked question as mastered.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::NotTracked` for a question that was never missed.
    pub async fn mark_mastered(
        &mut self,
        id: QuestionId,
        now: DateTime<Utc>,
    ) -> Result<WrongQuestionRecord, TrackerError> {
        let record = self.records.get_mut(&id).ok_or(TrackerError::NotTracked(id))?;
        record.mark_mastered(now);
        let snapshot = record.clone();
        self.persist(id).await;
        Ok(snapshot)
    }

    /// Remember that a course or question set has been reviewed.
    pub async fn mark_set_reviewed(&mut self, set_key: &str) {
        let key = set_key.trim().to_string();
        if key.is_empty() {
            return;
        }
        self.reviewed_sets.insert(key.clone());
        if self.degraded {
            return;
        }
        if let Some(flags) = self.flags.as_ref() {
            if let Err(err) = flags.mark_reviewed(&key).await {
                self.degrade(&err);
            }
        }
    }

    /// Whether a course or question set has been reviewed.
    pub async fn is_set_reviewed(&mut self, set_key: &str) -> bool {
        let key = set_key.trim();
        if self.reviewed_sets.contains(key) {
            return true;
        }
        if self.degraded {
            return false;
        }
        let Some(flags) = self.flags.as_ref() else {
            return false;
        };
        match flags.is_reviewed(key).await {
            Ok(true) => {
                self.reviewed_sets.insert(key.to_string());
                true
            }
            Ok(false) => false,
            Err(err) => {
                self.degrade(&err);
                false
            }
        }
    }
}
