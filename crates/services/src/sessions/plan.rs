use rand::Rng;
use rand::seq::SliceRandom;

use exam_core::model::{Question, QuestionOrder};

/// Selection result for a session build.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionPlan {
    pub questions: Vec<Question>,
    /// Candidates that matched the scope before truncation.
    pub available: usize,
}

impl SessionPlan {
    /// Total number of questions in this plan.
    #[must_use]
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    /// Returns true when no questions were selected for this session.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Orders and truncates the questions a scope drew from the bank.
#[derive(Debug, Clone, Copy)]
pub struct SessionPlanner {
    order: QuestionOrder,
    limit: Option<usize>,
}

impl SessionPlanner {
    #[must_use]
    pub fn new(order: QuestionOrder) -> Self {
        Self { order, limit: None }
    }

    /// Keep at most `limit` questions after ordering.
    #[must_use]
    pub fn with_limit(mut self, limit: Option<u32>) -> Self {
        self.limit = limit.map(|l| usize::try_from(l).unwrap_or(usize::MAX));
        self
    }

    /// Build a plan from candidates in bank order.
    ///
    /// - `Sequential` keeps bank order.
    /// - `Shuffled` draws a fresh uniform permutation from `rng` on every call.
    ///
    /// Truncation happens after ordering, so a shuffled exam samples the
    /// whole candidate pool.
    pub fn build<'a, R>(
        self,
        candidates: impl IntoIterator<Item = &'a Question>,
        rng: &mut R,
    ) -> SessionPlan
    where
        R: Rng + ?Sized,
    {
        let mut questions: Vec<Question> = candidates.into_iter().cloned().collect();
        let available = questions.len();

        if self.order == QuestionOrder::Shuffled {
            questions.as_mut_slice().shuffle(rng);
        }
        if let Some(limit) = self.limit {
            questions.truncate(limit);
        }

        SessionPlan {
            questions,
            available,
        }
    }
}
