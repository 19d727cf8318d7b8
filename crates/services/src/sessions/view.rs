//! Presentation-agnostic view models for a running session.
//!
//! Nothing here is pre-rendered; the caller decides layout and wording.
//! `TimeDisplay` is the one exception and offers a `mm:ss` string for
//! convenience.

use std::fmt;

use exam_core::model::{ExamProfileId, ImageRef, OptionId, QuestionId, QuestionKind};
use exam_core::timer::format_clock;

use super::service::SessionKind;

/// One option of the question on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionView {
    pub id: OptionId,
    pub text: String,
    pub selected: bool,
    /// Only revealed once the session is submitted.
    pub is_correct: Option<bool>,
}

/// The question on screen with its selection state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionView {
    pub question_id: QuestionId,
    /// Zero-based position in the session.
    pub index: usize,
    pub total: usize,
    pub kind: QuestionKind,
    pub content: String,
    pub image: Option<ImageRef>,
    pub options: Vec<OptionView>,
    pub answered: bool,
    pub has_explanation: bool,
}

/// Clock shown next to the question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeDisplay {
    Remaining(u32),
    Elapsed(u32),
}

impl TimeDisplay {
    #[must_use]
    pub fn seconds(self) -> u32 {
        match self {
            TimeDisplay::Remaining(s) | TimeDisplay::Elapsed(s) => s,
        }
    }

    #[must_use]
    pub fn is_countdown(self) -> bool {
        matches!(self, TimeDisplay::Remaining(_))
    }
}

impl fmt::Display for TimeDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_clock(self.seconds()))
    }
}

/// One cell of the answer sheet grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerSheetItem {
    pub index: usize,
    pub question_id: QuestionId,
    pub answered: bool,
    pub is_current: bool,
    /// Only known once the session is submitted.
    pub is_correct: Option<bool>,
}

/// Rules shown before a run starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRules {
    pub kind: SessionKind,
    pub profile_id: Option<ExamProfileId>,
    pub title: String,
    /// Zero for untimed runs.
    pub duration_seconds: u32,
    /// Upper bound on drawn questions, when one applies.
    pub question_limit: Option<u32>,
    pub passing_score: u32,
}

/// Counts shown in the submit confirmation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitRequest {
    pub answered: usize,
    pub unanswered: usize,
    pub total: usize,
}
