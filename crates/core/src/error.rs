use thiserror::Error;

use crate::bank::BankError;
use crate::model::{EngineSettingsError, ExamProfileError, QuestionError, WrongQuestionError};

/// Umbrella error for callers that do not care which core validation failed.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    ExamProfile(#[from] ExamProfileError),
    #[error(transparent)]
    Bank(#[from] BankError),
    #[error(transparent)]
    WrongQuestion(#[from] WrongQuestionError),
    #[error(transparent)]
    Settings(#[from] EngineSettingsError),
}
