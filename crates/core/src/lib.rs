#![forbid(unsafe_code)]

pub mod bank;
pub mod error;
pub mod evaluator;
pub mod model;
pub mod scoring;
pub mod time;
pub mod timer;

pub use bank::{BankDraft, BankError, QuestionBank, QuestionFilter};
pub use error::Error;
pub use evaluator::{Evaluation, evaluate};
pub use scoring::ScoreAggregator;
pub use time::Clock;
pub use timer::{SessionTimer, TickOutcome};
