use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::wrong_question::MasteredPolicy;

/// How drawn questions are ordered when a run starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionOrder {
    /// Stable bank order.
    #[default]
    Sequential,
    /// Fresh uniform permutation on every start.
    Shuffled,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EngineSettingsError {
    #[error("practice passing score must be between 0 and 100, got {0}")]
    InvalidPassingScore(u32),

    #[error("practice question limit must be > 0")]
    InvalidQuestionLimit,
}

/// Validated engine configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineSettings {
    exam_order: QuestionOrder,
    practice_order: QuestionOrder,
    practice_passing_score: u32,
    practice_question_limit: Option<u32>,
    mastered_policy: MasteredPolicy,
}

/// Unvalidated settings as read from configuration or storage.
///
/// Missing fields fall back to the defaults of `EngineSettings`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettingsDraft {
    pub exam_order: Option<QuestionOrder>,
    pub practice_order: Option<QuestionOrder>,
    pub practice_passing_score: Option<u32>,
    pub practice_question_limit: Option<u32>,
    pub mastered_policy: Option<MasteredPolicy>,
}

impl EngineSettingsDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and fill defaults.
    ///
    /// # Errors
    ///
    /// Returns `EngineSettingsError` when a provided value is out of range.
    pub fn validate(self) -> Result<EngineSettings, EngineSettingsError> {
        let defaults = EngineSettings::default();

        let practice_passing_score = self
            .practice_passing_score
            .unwrap_or(defaults.practice_passing_score);
        if practice_passing_score > 100 {
            return Err(EngineSettingsError::InvalidPassingScore(
                practice_passing_score,
            ));
        }
        if self.practice_question_limit == Some(0) {
            return Err(EngineSettingsError::InvalidQuestionLimit);
        }

        Ok(EngineSettings {
            exam_order: self.exam_order.unwrap_or(defaults.exam_order),
            practice_order: self.practice_order.unwrap_or(defaults.practice_order),
            practice_passing_score,
            practice_question_limit: self.practice_question_limit,
            mastered_policy: self.mastered_policy.unwrap_or(defaults.mastered_policy),
        })
    }
}

impl EngineSettings {
    /// Rehydrate persisted settings.
    ///
    /// # Errors
    ///
    /// Returns `EngineSettingsError` if the stored values are out of range.
    pub fn from_persisted(draft: EngineSettingsDraft) -> Result<Self, EngineSettingsError> {
        draft.validate()
    }

    /// Draft carrying every value of these settings, for persistence.
    #[must_use]
    pub fn to_draft(&self) -> EngineSettingsDraft {
        EngineSettingsDraft {
            exam_order: Some(self.exam_order),
            practice_order: Some(self.practice_order),
            practice_passing_score: Some(self.practice_passing_score),
            practice_question_limit: self.practice_question_limit,
            mastered_policy: Some(self.mastered_policy),
        }
    }

    #[must_use]
    pub fn exam_order(&self) -> QuestionOrder {
        self.exam_order
    }

    #[must_use]
    pub fn practice_order(&self) -> QuestionOrder {
        self.practice_order
    }

    #[must_use]
    pub fn practice_passing_score(&self) -> u32 {
        self.practice_passing_score
    }

    #[must_use]
    pub fn practice_question_limit(&self) -> Option<u32> {
        self.practice_question_limit
    }

    #[must_use]
    pub fn mastered_policy(&self) -> MasteredPolicy {
        self.mastered_policy
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            exam_order: QuestionOrder::Shuffled,
            practice_order: QuestionOrder::Sequential,
            practice_passing_score: 60,
            practice_question_limit: None,
            mastered_policy: MasteredPolicy::Demote,
        }
    }
}
