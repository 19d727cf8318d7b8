//! Read-only question bank: validated once at load, then shared immutably.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::model::{
    Difficulty, ExamProfile, ExamProfileDraft, ExamProfileError, ExamProfileId, Question,
    QuestionDraft, QuestionError, QuestionId, WrongStatus,
};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BankError {
    #[error("invalid question at record {index} (id {id}): {source}")]
    InvalidQuestion {
        index: usize,
        id: QuestionId,
        #[source]
        source: QuestionError,
    },

    #[error("question id {0} appears more than once")]
    DuplicateQuestion(QuestionId),

    #[error("invalid exam profile at record {index}: {source}")]
    InvalidProfile {
        index: usize,
        #[source]
        source: ExamProfileError,
    },

    #[error("exam profile id {0} appears more than once")]
    DuplicateProfile(ExamProfileId),
}

//
// ─── RAW INPUT ─────────────────────────────────────────────────────────────────
//

/// Raw bank contents as delivered by a content provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankDraft {
    #[serde(default)]
    pub questions: Vec<QuestionDraft>,
    #[serde(default)]
    pub profiles: Vec<ExamProfileDraft>,
}

//
// ─── FILTER ────────────────────────────────────────────────────────────────────
//

/// Compound predicate over bank questions. Every populated field must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionFilter {
    pub subject: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub status: Option<WrongStatus>,
    /// Case-insensitive substring matched against content and subject.
    pub search: Option<String>,
}

impl QuestionFilter {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    #[must_use]
    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = Some(difficulty);
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: WrongStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn with_search(mut self, needle: impl Into<String>) -> Self {
        let needle = needle.into();
        let trimmed = needle.trim();
        self.search = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    /// Test one question. `status` is the wrong-question status of the
    /// question, `None` when it is not tracked.
    #[must_use]
    pub fn matches(&self, question: &Question, status: Option<WrongStatus>) -> bool {
        if let Some(subject) = &self.subject {
            if question.subject() != subject {
                return false;
            }
        }
        if let Some(difficulty) = self.difficulty {
            if question.difficulty() != difficulty {
                return false;
            }
        }
        if let Some(wanted) = self.status {
            if status != Some(wanted) {
                return false;
            }
        }
        if let Some(needle) = &self.search {
            let needle = needle.to_lowercase();
            let hit = question.content().to_lowercase().contains(&needle)
                || question.subject().to_lowercase().contains(&needle);
            if !hit {
                return false;
            }
        }
        true
    }
}

//
// ─── BANK ──────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Default)]
pub struct QuestionBank {
    questions: Vec<Question>,
    index: HashMap<QuestionId, usize>,
    profiles: Vec<ExamProfile>,
}

impl QuestionBank {
    /// Validate every raw record. The whole batch is rejected on the first
    /// malformed record; nothing is coerced.
    ///
    /// # Errors
    ///
    /// Returns `BankError` naming the offending record.
    pub fn load(draft: BankDraft) -> Result<Self, BankError> {
        let mut questions = Vec::with_capacity(draft.questions.len());
        let mut index = HashMap::with_capacity(draft.questions.len());
        for (i, raw) in draft.questions.into_iter().enumerate() {
            let id = raw.id;
            let question = raw
                .validate()
                .map_err(|source| BankError::InvalidQuestion {
                    index: i,
                    id,
                    source,
                })?;
            if index.insert(id, questions.len()).is_some() {
                return Err(BankError::DuplicateQuestion(id));
            }
            questions.push(question);
        }

        let mut seen = HashSet::new();
        let mut profiles = Vec::with_capacity(draft.profiles.len());
        for (i, raw) in draft.profiles.into_iter().enumerate() {
            let profile = raw
                .validate()
                .map_err(|source| BankError::InvalidProfile { index: i, source })?;
            if !seen.insert(profile.id()) {
                return Err(BankError::DuplicateProfile(profile.id()));
            }
            profiles.push(profile);
        }

        Ok(Self {
            questions,
            index,
            profiles,
        })
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.index.get(&id).map(|&i| &self.questions[i])
    }

    #[must_use]
    pub fn profiles(&self) -> &[ExamProfile] {
        &self.profiles
    }

    #[must_use]
    pub fn profile(&self, id: ExamProfileId) -> Option<&ExamProfile> {
        self.profiles.iter().find(|p| p.id() == id)
    }

    /// Distinct subjects in order of first appearance.
    #[must_use]
    pub fn subjects(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for q in &self.questions {
            if !out.contains(&q.subject()) {
                out.push(q.subject());
            }
        }
        out
    }

    /// Questions a profile draws from, in bank order.
    #[must_use]
    pub fn questions_for_profile(&self, profile: &ExamProfile) -> Vec<&Question> {
        self.questions
            .iter()
            .filter(|q| profile.covers_subject(q.subject()))
            .collect()
    }

    /// Questions matching `filter`, in bank order.
    ///
    /// `status_of` resolves the wrong-question status of a question; untracked
    /// questions never satisfy a status predicate.
    pub fn filter<F>(&self, filter: &QuestionFilter, status_of: F) -> Vec<&Question>
    where
        F: Fn(QuestionId) -> Option<WrongStatus>,
    {
        self.questions
            .iter()
            .filter(|q| filter.matches(q, status_of(q.id())))
            .collect()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnswerOptionDraft, OptionId, QuestionKind};

    fn raw(id: u64, subject: &str, difficulty: Difficulty, content: &str) -> QuestionDraft {
        QuestionDraft {
            id: QuestionId::new(id),
            kind: QuestionKind::Single,
            content: content.into(),
            image: None,
            explanation: None,
            options: vec![
                AnswerOptionDraft {
                    id: OptionId::new("A").unwrap(),
                    text: "yes".into(),
                    is_correct: true,
                },
                AnswerOptionDraft {
                    id: OptionId::new("B").unwrap(),
                    text: "no".into(),
                    is_correct: false,
                },
            ],
            subject: subject.into(),
            difficulty,
            score_weight: 1,
        }
    }

    fn fixture() -> QuestionBank {
        QuestionBank::load(BankDraft {
            questions: vec![
                raw(1, "regulations", Difficulty::Easy, "Registration of UAS above 250 g"),
                raw(2, "meteorology", Difficulty::Easy, "Effect of gusts on hover"),
                raw(3, "regulations", Difficulty::Medium, "Night flight lighting"),
                raw(4, "navigation", Difficulty::Hard, "Reading a VFR chart"),
                raw(5, "meteorology", Difficulty::Easy, "Icing conditions"),
            ],
            profiles: Vec::new(),
        })
        .unwrap()
    }

    fn status_fixture(id: QuestionId) -> Option<WrongStatus> {
        match id.value() {
            1 => Some(WrongStatus::New),
            2 => Some(WrongStatus::Reviewed),
            3 => Some(WrongStatus::New),
            4 => Some(WrongStatus::Mastered),
            5 => Some(WrongStatus::New),
            _ => None,
        }
    }

    #[test]
    fn filter_combines_predicates_with_and() {
        let bank = fixture();
        let filter = QuestionFilter::all()
            .with_difficulty(Difficulty::Easy)
            .with_status(WrongStatus::New);
        let ids: Vec<u64> = bank
            .filter(&filter, status_fixture)
            .iter()
            .map(|q| q.id().value())
            .collect();
        assert_eq!(ids, vec![1, 5]);
    }

    #[test]
    fn search_is_case_insensitive_over_content_and_subject() {
        let bank = fixture();
        let by_content = bank.filter(&QuestionFilter::all().with_search("ICING"), |_| None);
        assert_eq!(by_content.len(), 1);

        let by_subject = bank.filter(&QuestionFilter::all().with_search("Meteo"), |_| None);
        assert_eq!(by_subject.len(), 2);
    }

    #[test]
    fn untracked_questions_never_match_status() {
        let bank = fixture();
        let hits = bank.filter(&QuestionFilter::all().with_status(WrongStatus::New), |_| None);
        assert!(hits.is_empty());
    }

    #[test]
    fn malformed_record_rejects_whole_batch() {
        let mut bad = raw(2, "law", Difficulty::Easy, "broken");
        for o in &mut bad.options {
            o.is_correct = false;
        }
        let err = QuestionBank::load(BankDraft {
            questions: vec![raw(1, "law", Difficulty::Easy, "fine"), bad],
            profiles: Vec::new(),
        })
        .unwrap_err();
        assert!(matches!(
            err,
            BankError::InvalidQuestion {
                index: 1,
                source: QuestionError::SingleCorrectCount { count: 0 },
                ..
            }
        ));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = QuestionBank::load(BankDraft {
            questions: vec![
                raw(1, "law", Difficulty::Easy, "a"),
                raw(1, "law", Difficulty::Easy, "b"),
            ],
            profiles: Vec::new(),
        })
        .unwrap_err();
        assert_eq!(err, BankError::DuplicateQuestion(QuestionId::new(1)));
    }

    #[test]
    fn profiles_scope_questions_by_subject() {
        let draft = BankDraft {
            questions: vec![
                raw(1, "regulations", Difficulty::Easy, "a"),
                raw(2, "meteorology", Difficulty::Easy, "b"),
                raw(5, "meteorology", Difficulty::Hard, "c"),
            ],
            profiles: vec![ExamProfileDraft {
                id: ExamProfileId::new(10),
                name: Some("Theory".into()),
                duration_seconds: 600,
                total_questions: 3,
                passing_score: 70,
                subjects: vec!["meteorology".into()],
            }],
        };
        let bank = QuestionBank::load(draft).unwrap();
        let profile = bank.profile(ExamProfileId::new(10)).unwrap();
        let ids: Vec<u64> = bank
            .questions_for_profile(profile)
            .iter()
            .map(|q| q.id().value())
            .collect();
        assert_eq!(ids, vec![2, 5]);
        assert_eq!(bank.subjects(), vec!["regulations", "meteorology"]);
        assert!(bank.question(QuestionId::new(5)).is_some());
    }
}
