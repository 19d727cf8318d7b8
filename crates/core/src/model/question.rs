use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{OptionId, QuestionId};
use crate::model::media::{ImageRef, MediaValidationError};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question content cannot be empty")]
    EmptyContent,

    #[error("question subject cannot be empty")]
    EmptySubject,

    #[error("a question needs at least 2 options, got {count}")]
    TooFewOptions { count: usize },

    #[error("option {0} appears more than once")]
    DuplicateOption(OptionId),

    #[error("option {0} has no text")]
    EmptyOptionText(OptionId),

    #[error("single-choice question must have exactly one correct option, got {count}")]
    SingleCorrectCount { count: usize },

    #[error("multiple-choice question must have at least one correct option")]
    NoCorrectOption,

    #[error("score weight must be a positive integer")]
    InvalidScoreWeight,

    #[error(transparent)]
    Image(#[from] MediaValidationError),
}

//
// ─── ENUMS ─────────────────────────────────────────────────────────────────────
//

/// Answer shape of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    /// Radio semantics: exactly one correct option, at most one selected.
    Single,
    /// Checkbox semantics: one or more correct options, selections toggle.
    Multiple,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown difficulty: {0}")]
pub struct ParseDifficultyError(String);

impl FromStr for Difficulty {
    type Err = ParseDifficultyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(ParseDifficultyError(other.to_string())),
        }
    }
}

//
// ─── DRAFTS (raw bank records) ─────────────────────────────────────────────────
//

/// Raw option record as supplied by the bank provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOptionDraft {
    pub id: OptionId,
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

/// Raw question record as supplied by the bank provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDraft {
    pub id: QuestionId,
    pub kind: QuestionKind,
    pub content: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
    pub options: Vec<AnswerOptionDraft>,
    pub subject: String,
    pub difficulty: Difficulty,
    #[serde(default = "default_score_weight")]
    pub score_weight: u32,
}

fn default_score_weight() -> u32 {
    1
}

impl QuestionDraft {
    /// Validate the record into an immutable `Question`.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` describing the first violated invariant.
    pub fn validate(self) -> Result<Question, QuestionError> {
        let content = self.content.trim().to_string();
        if content.is_empty() {
            return Err(QuestionError::EmptyContent);
        }
        let subject = self.subject.trim().to_string();
        if subject.is_empty() {
            return Err(QuestionError::EmptySubject);
        }
        if self.score_weight == 0 {
            return Err(QuestionError::InvalidScoreWeight);
        }
        if self.options.len() < 2 {
            return Err(QuestionError::TooFewOptions {
                count: self.options.len(),
            });
        }

        let mut seen = HashSet::with_capacity(self.options.len());
        let mut options = Vec::with_capacity(self.options.len());
        for opt in self.options {
            if !seen.insert(opt.id.clone()) {
                return Err(QuestionError::DuplicateOption(opt.id));
            }
            let text = opt.text.trim().to_string();
            if text.is_empty() {
                return Err(QuestionError::EmptyOptionText(opt.id));
            }
            options.push(AnswerOption {
                id: opt.id,
                text,
                is_correct: opt.is_correct,
            });
        }

        let correct: BTreeSet<OptionId> = options
            .iter()
            .filter(|o| o.is_correct)
            .map(|o| o.id.clone())
            .collect();
        match self.kind {
            QuestionKind::Single if correct.len() != 1 => {
                return Err(QuestionError::SingleCorrectCount {
                    count: correct.len(),
                });
            }
            QuestionKind::Multiple if correct.is_empty() => {
                return Err(QuestionError::NoCorrectOption);
            }
            _ => {}
        }

        let image = self.image.map(ImageRef::parse).transpose()?;
        let explanation = self
            .explanation
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());

        Ok(Question {
            id: self.id,
            kind: self.kind,
            content,
            image,
            explanation,
            options,
            correct,
            subject,
            difficulty: self.difficulty,
            score_weight: self.score_weight,
        })
    }
}

//
// ─── VALIDATED QUESTION ────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOption {
    id: OptionId,
    text: String,
    is_correct: bool,
}

impl AnswerOption {
    #[must_use]
    pub fn id(&self) -> &OptionId {
        &self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.is_correct
    }
}

/// A validated multiple-choice question. Only obtainable through
/// `QuestionDraft::validate`, so every instance satisfies the option invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    kind: QuestionKind,
    content: String,
    image: Option<ImageRef>,
    explanation: Option<String>,
    options: Vec<AnswerOption>,
    correct: BTreeSet<OptionId>,
    subject: String,
    difficulty: Difficulty,
    score_weight: u32,
}

impl Question {
    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        self.kind
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn image(&self) -> Option<&ImageRef> {
        self.image.as_ref()
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    #[must_use]
    pub fn options(&self) -> &[AnswerOption] {
        &self.options
    }

    #[must_use]
    pub fn correct_ids(&self) -> &BTreeSet<OptionId> {
        &self.correct
    }

    #[must_use]
    pub fn has_option(&self, id: &OptionId) -> bool {
        self.options.iter().any(|o| &o.id == id)
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn score_weight(&self) -> u32 {
        self.score_weight
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
