#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod sessions;
pub mod settings_service;
pub mod timer;
pub mod wrong_questions;

pub use exam_core::Clock;
pub use sessions as session;

pub use app_services::AppServices;
pub use error::{
    AppServicesError, OperationIssue, SelectionIssue, SessionError, SettingsServiceError,
    TimerError, TrackerError,
};
pub use settings_service::SettingsService;
pub use timer::{TickHandle, TickReceiver, TickScheduler, TickSubscription, TokioTickScheduler};
pub use wrong_questions::{WrongQuestionStats, WrongQuestionTracker};

pub use sessions::{
    AnswerSheetItem, BeginOutcome, ExplanationView, PracticeSession, QuestionView,
    SessionController, SessionKind, SessionProgress, SessionRules, SessionScope, SessionState,
    SubmitRequest, TickEffect, TimeDisplay,
};
