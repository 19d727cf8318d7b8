//! Answer evaluation: strict set equality, no partial credit.

use std::collections::BTreeSet;

use crate::model::{OptionId, Question, QuestionId, Selection};

/// Outcome of evaluating one selection against one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub question_id: QuestionId,
    pub is_correct: bool,
    pub selected: Selection,
    pub correct_ids: BTreeSet<OptionId>,
}

impl Evaluation {
    #[must_use]
    pub fn is_unanswered(&self) -> bool {
        self.selected.is_empty()
    }
}

/// Compare `selected` with the question's correct-option set.
///
/// The answer is correct only if both sets are equal. A multi-select answer
/// missing a single correct id scores the same as a fully wrong one, and an
/// empty selection is never correct because every valid question has at
/// least one correct option.
#[must_use]
pub fn evaluate(question: &Question, selected: &Selection) -> Evaluation {
    let correct_ids = question.correct_ids().clone();
    let is_correct = selected.ids() == &correct_ids;
    Evaluation {
        question_id: question.id(),
        is_correct,
        selected: selected.clone(),
        correct_ids,
    }
}
