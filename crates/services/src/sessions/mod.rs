mod plan;
mod progress;
mod service;
mod view;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use plan::{SessionPlan, SessionPlanner};
pub use progress::SessionProgress;
pub use service::{PracticeSession, SessionKind, SessionScope, SessionState, TickEffect};
pub use view::{
    AnswerSheetItem, OptionView, QuestionView, SessionRules, SubmitRequest, TimeDisplay,
};
pub use workflow::{BeginOutcome, ExplanationView, SessionController};
