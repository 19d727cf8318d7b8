//! Shared error types for the services crate.

use thiserror::Error;

use exam_core::BankError;
use exam_core::model::{
    EngineSettingsError, ExamProfileId, OptionId, QuestionId, WrongQuestionError,
};
use storage::repository::StorageError;

use crate::sessions::SessionState;

/// Why an answer mutation was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum SelectionIssue {
    #[error("session is not active")]
    NotActive,
    #[error("session has already been submitted")]
    Submitted,
    #[error("question {0} is not the question on screen")]
    NotCurrent(QuestionId),
    #[error("option {option} does not belong to question {question}")]
    UnknownOption {
        question: QuestionId,
        option: OptionId,
    },
}

/// Why an otherwise well-formed request cannot be honoured.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum OperationIssue {
    #[error("no submit request is pending")]
    NoPendingSubmit,
    #[error("question {0} is not tracked as a wrong question")]
    NotTracked(QuestionId),
    #[error("question {0} is not in the bank")]
    UnknownQuestion(QuestionId),
    #[error("question index {index} is out of range for {len} questions")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Errors emitted by `WrongQuestionTracker`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TrackerError {
    #[error("question {0} is not tracked")]
    NotTracked(QuestionId),
    #[error(transparent)]
    Record(#[from] WrongQuestionError),
}

/// Errors emitted by tick schedulers.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TimerError {
    #[error("tick scheduler unavailable: {0}")]
    Unavailable(String),
}

/// Errors emitted by session services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("invalid selection: {0}")]
    InvalidSelection(#[from] SelectionIssue),
    #[error("invalid operation: {0}")]
    InvalidOperation(#[from] OperationIssue),
    #[error("exam profile {0} does not exist")]
    ExamConfigMissing(ExamProfileId),
    #[error("no questions available for session")]
    Empty,
    #[error("cannot {action} while session is {from:?}")]
    InvalidTransition {
        from: SessionState,
        action: &'static str,
    },
    #[error(transparent)]
    Tracker(TrackerError),
}

impl From<TrackerError> for SessionError {
    fn from(err: TrackerError) -> Self {
        match err {
            TrackerError::NotTracked(id) => {
                SessionError::InvalidOperation(OperationIssue::NotTracked(id))
            }
            other => SessionError::Tracker(other),
        }
    }
}

/// Errors emitted by `SettingsService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SettingsServiceError {
    #[error(transparent)]
    Settings(#[from] EngineSettingsError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Bank(#[from] BankError),
}
