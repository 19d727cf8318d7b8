use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::ids::ExamProfileId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExamProfileError {
    #[error("exam must contain at least one question")]
    InvalidTotalQuestions,

    #[error("passing score must be between 0 and 100, got {0}")]
    InvalidPassingScore(u32),

    #[error("subject list contains a blank entry")]
    EmptySubject,

    #[error("subject {0} is listed more than once")]
    DuplicateSubject(String),
}

/// Raw exam profile record as supplied by the bank provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamProfileDraft {
    pub id: ExamProfileId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub duration_seconds: u32,
    pub total_questions: u32,
    pub passing_score: u32,
    #[serde(default)]
    pub subjects: Vec<String>,
}

impl ExamProfileDraft {
    /// Validate into an `ExamProfile`.
    ///
    /// # Errors
    ///
    /// Returns `ExamProfileError` for a zero question count, an out-of-range
    /// passing score, or a malformed subject list.
    pub fn validate(self) -> Result<ExamProfile, ExamProfileError> {
        if self.total_questions == 0 {
            return Err(ExamProfileError::InvalidTotalQuestions);
        }
        if self.passing_score > 100 {
            return Err(ExamProfileError::InvalidPassingScore(self.passing_score));
        }

        let mut seen = HashSet::new();
        let mut subjects = Vec::with_capacity(self.subjects.len());
        for raw in self.subjects {
            let subject = raw.trim().to_string();
            if subject.is_empty() {
                return Err(ExamProfileError::EmptySubject);
            }
            if !seen.insert(subject.clone()) {
                return Err(ExamProfileError::DuplicateSubject(subject));
            }
            subjects.push(subject);
        }

        let name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("Exam {}", self.id));

        Ok(ExamProfile {
            id: self.id,
            name,
            duration_seconds: self.duration_seconds,
            total_questions: self.total_questions,
            passing_score: self.passing_score,
            subjects,
        })
    }
}

/// Configuration of one exam: duration, size, pass mark and subject scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamProfile {
    id: ExamProfileId,
    name: String,
    duration_seconds: u32,
    total_questions: u32,
    passing_score: u32,
    subjects: Vec<String>,
}

impl ExamProfile {
    #[must_use]
    pub fn id(&self) -> ExamProfileId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Zero means untimed.
    #[must_use]
    pub fn duration_seconds(&self) -> u32 {
        self.duration_seconds
    }

    #[must_use]
    pub fn is_timed(&self) -> bool {
        self.duration_seconds > 0
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn passing_score(&self) -> u32 {
        self.passing_score
    }

    /// Ordered subject scope. Empty means every subject in the bank.
    #[must_use]
    pub fn subjects(&self) -> &[String] {
        &self.subjects
    }

    #[must_use]
    pub fn covers_subject(&self, subject: &str) -> bool {
        self.subjects.is_empty() || self.subjects.iter().any(|s| s == subject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> ExamProfileDraft {
        ExamProfileDraft {
            id: ExamProfileId::new(1),
            name: None,
            duration_seconds: 3600,
            total_questions: 50,
            passing_score: 70,
            subjects: vec!["regulations".into(), "meteorology".into()],
        }
    }

    #[test]
    fn valid_profile_gets_default_name() {
        let p = draft().validate().unwrap();
        assert_eq!(p.name(), "Exam 1");
        assert!(p.is_timed());
        assert!(p.covers_subject("meteorology"));
        assert!(!p.covers_subject("navigation"));
    }

    #[test]
    fn rejects_out_of_range_passing_score() {
        let mut d = draft();
        d.passing_score = 101;
        assert_eq!(
            d.validate().unwrap_err(),
            ExamProfileError::InvalidPassingScore(101)
        );
    }

    #[test]
    fn rejects_duplicate_subjects_and_zero_questions() {
        let mut d = draft();
        d.subjects.push(" regulations ".into());
        assert!(matches!(
            d.validate().unwrap_err(),
            ExamProfileError::DuplicateSubject(_)
        ));

        let mut d = draft();
        d.total_questions = 0;
        assert_eq!(
            d.validate().unwrap_err(),
            ExamProfileError::InvalidTotalQuestions
        );
    }

    #[test]
    fn untimed_profile_with_empty_scope_covers_everything() {
        let mut d = draft();
        d.duration_seconds = 0;
        d.subjects.clear();
        let p = d.validate().unwrap();
        assert!(!p.is_timed());
        assert!(p.covers_subject("anything"));
    }
}
