use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::evaluator::Evaluation;
use crate::model::ids::QuestionId;

/// Weighted score for one subject (knowledge point).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectScore {
    pub subject: String,
    pub correct_weight_sum: u64,
    pub total_weight_sum: u64,
    pub question_count: u32,
    pub correct_count: u32,
    pub percentage: u32,
}

/// How a session reached `Submitted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionKind {
    /// Learner requested and confirmed submission.
    Manual,
    /// Countdown reached zero.
    TimeExpired,
    /// The tick scheduler could not be started; the run was closed immediately.
    ForcedTimerFailure,
}

/// Final outcome of a practice or exam run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamResult {
    pub overall_percentage: u32,
    pub passed: bool,
    pub passing_score: u32,
    pub subject_scores: Vec<SubjectScore>,
    /// Incorrectly answered questions, in session order.
    pub wrong_questions: Vec<QuestionId>,
    /// One evaluation per session question, in session order.
    pub evaluations: Vec<Evaluation>,
    pub answered_count: u32,
    pub time_used_seconds: u32,
    pub submitted_at: DateTime<Utc>,
    pub submission: SubmissionKind,
}

impl ExamResult {
    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.evaluations.len()
    }

    #[must_use]
    pub fn correct_count(&self) -> usize {
        self.evaluations.iter().filter(|e| e.is_correct).count()
    }

    #[must_use]
    pub fn evaluation(&self, id: QuestionId) -> Option<&Evaluation> {
        self.evaluations.iter().find(|e| e.question_id == id)
    }

    #[must_use]
    pub fn subject(&self, subject: &str) -> Option<&SubjectScore> {
        self.subject_scores.iter().find(|s| s.subject == subject)
    }
}
