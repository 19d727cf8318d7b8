use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::evaluator::Evaluation;
use crate::model::ids::QuestionId;
use crate::model::selection::Selection;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum WrongQuestionError {
    #[error("question {0} has never been answered incorrectly")]
    NotTracked(QuestionId),

    #[error("evaluation for question {0} was correct")]
    EvaluationCorrect(QuestionId),

    #[error("evaluation belongs to question {found}, expected {expected}")]
    QuestionMismatch {
        expected: QuestionId,
        found: QuestionId,
    },

    #[error("wrong count must be at least 1")]
    InvalidWrongCount,

    #[error("mastered record is missing mastered date or review")]
    InconsistentMastery,

    #[error("unknown wrong-question status: {0}")]
    UnknownStatus(String),
}

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Lifecycle of a previously missed question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WrongStatus {
    New,
    Reviewed,
    Mastered,
}

impl WrongStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            WrongStatus::New => "new",
            WrongStatus::Reviewed => "reviewed",
            WrongStatus::Mastered => "mastered",
        }
    }
}

impl fmt::Display for WrongStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WrongStatus {
    type Err = WrongQuestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(WrongStatus::New),
            "reviewed" => Ok(WrongStatus::Reviewed),
            "mastered" => Ok(WrongStatus::Mastered),
            other => Err(WrongQuestionError::UnknownStatus(other.to_string())),
        }
    }
}

/// What happens when a mastered question is answered incorrectly again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MasteredPolicy {
    /// Reopen as `Reviewed`, clear the mastered date and count the miss.
    #[default]
    Demote,
    /// Stay `Mastered`; only the miss is counted.
    Sticky,
}

//
// ─── RECORD ────────────────────────────────────────────────────────────────────
//

/// Tracking state for one missed question, shared across sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrongQuestionRecord {
    question_id: QuestionId,
    user_answer: Selection,
    correct_answer: Selection,
    wrong_date: DateTime<Utc>,
    wrong_count: u32,
    status: WrongStatus,
    is_reviewed: bool,
    review_count: u32,
    last_review_date: Option<DateTime<Utc>>,
    mastered_date: Option<DateTime<Utc>>,
}

impl WrongQuestionRecord {
    /// Start tracking a question after its first incorrect evaluation.
    ///
    /// # Errors
    ///
    /// Returns `WrongQuestionError::EvaluationCorrect` if the evaluation was correct.
    pub fn first_miss(
        evaluation: &Evaluation,
        at: DateTime<Utc>,
    ) -> Result<Self, WrongQuestionError> {
        if evaluation.is_correct {
            return Err(WrongQuestionError::EvaluationCorrect(evaluation.question_id));
        }
        Ok(Self {
            question_id: evaluation.question_id,
            user_answer: evaluation.selected.clone(),
            correct_answer: evaluation.correct_ids.iter().cloned().collect(),
            wrong_date: at,
            wrong_count: 1,
            status: WrongStatus::New,
            is_reviewed: false,
            review_count: 0,
            last_review_date: None,
            mastered_date: None,
        })
    }

    /// Rehydrate a record from persisted storage, re-checking invariants.
    ///
    /// # Errors
    ///
    /// Returns `WrongQuestionError::InvalidWrongCount` or
    /// `WrongQuestionError::InconsistentMastery` when the stored data is corrupt.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        question_id: QuestionId,
        user_answer: Selection,
        correct_answer: Selection,
        wrong_date: DateTime<Utc>,
        wrong_count: u32,
        status: WrongStatus,
        is_reviewed: bool,
        review_count: u32,
        last_review_date: Option<DateTime<Utc>>,
        mastered_date: Option<DateTime<Utc>>,
    ) -> Result<Self, WrongQuestionError> {
        if wrong_count == 0 {
            return Err(WrongQuestionError::InvalidWrongCount);
        }
        if status == WrongStatus::Mastered
            && (mastered_date.is_none() || review_count == 0 || !is_reviewed)
        {
            return Err(WrongQuestionError::InconsistentMastery);
        }
        Ok(Self {
            question_id,
            user_answer,
            correct_answer,
            wrong_date,
            wrong_count,
            status,
            is_reviewed,
            review_count,
            last_review_date,
            mastered_date,
        })
    }

    /// Count another incorrect evaluation of this question.
    ///
    /// `Reviewed` never regresses to `New`. `Mastered` follows `policy`.
    ///
    /// # Errors
    ///
    /// Returns an error if the evaluation is correct or belongs to another question.
    pub fn record_miss(
        &mut self,
        evaluation: &Evaluation,
        at: DateTime<Utc>,
        policy: MasteredPolicy,
    ) -> Result<(), WrongQuestionError> {
        if evaluation.question_id != self.question_id {
            return Err(WrongQuestionError::QuestionMismatch {
                expected: self.question_id,
                found: evaluation.question_id,
            });
        }
        if evaluation.is_correct {
            return Err(WrongQuestionError::EvaluationCorrect(evaluation.question_id));
        }

        self.wrong_count = self.wrong_count.saturating_add(1);
        self.user_answer = evaluation.selected.clone();
        self.wrong_date = at;

        if self.status == WrongStatus::Mastered && policy == MasteredPolicy::Demote {
            self.status = WrongStatus::Reviewed;
            self.mastered_date = None;
        }
        Ok(())
    }

    /// Explicit review: explanation opened, or re-attempted in a review session.
    pub fn record_review(&mut self, at: DateTime<Utc>) {
        self.review_count = self.review_count.saturating_add(1);
        self.is_reviewed = true;
        self.last_review_date = Some(at);
        if self.status == WrongStatus::New {
            self.status = WrongStatus::Reviewed;
        }
    }

    /// Explicit "mark as mastered". Idempotent on an already mastered record.
    pub fn mark_mastered(&mut self, at: DateTime<Utc>) {
        if self.status == WrongStatus::Mastered {
            return;
        }
        self.is_reviewed = true;
        if self.last_review_date.is_none() {
            self.last_review_date = Some(at);
        }
        if self.review_count == 0 {
            self.review_count = 1;
        }
        self.mastered_date = Some(at);
        self.status = WrongStatus::Mastered;
    }

    #[must_use]
    pub fn question_id(&self) -> QuestionId {
        self.question_id
    }

    #[must_use]
    pub fn user_answer(&self) -> &Selection {
        &self.user_answer
    }

    #[must_use]
    pub fn correct_answer(&self) -> &Selection {
        &self.correct_answer
    }

    #[must_use]
    pub fn wrong_date(&self) -> DateTime<Utc> {
        self.wrong_date
    }

    #[must_use]
    pub fn wrong_count(&self) -> u32 {
        self.wrong_count
    }

    #[must_use]
    pub fn status(&self) -> WrongStatus {
        self.status
    }

    #[must_use]
    pub fn is_reviewed(&self) -> bool {
        self.is_reviewed
    }

    #[must_use]
    pub fn review_count(&self) -> u32 {
        self.review_count
    }

    #[must_use]
    pub fn last_review_date(&self) -> Option<DateTime<Utc>> {
        self.last_review_date
    }

    #[must_use]
    pub fn mastered_date(&self) -> Option<DateTime<Utc>> {
        self.mastered_date
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
