use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::model::ids::OptionId;
use crate::model::question::QuestionKind;

/// Set of option ids a learner has selected for one question.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selection(BTreeSet<OptionId>);

impl Selection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a click on `option` using the selection semantics of `kind`.
    ///
    /// `Single` replaces the prior choice (radio), `Multiple` toggles
    /// membership (checkbox).
    pub fn apply(&mut self, kind: QuestionKind, option: OptionId) {
        match kind {
            QuestionKind::Single => {
                self.0.clear();
                self.0.insert(option);
            }
            QuestionKind::Multiple => {
                if !self.0.remove(&option) {
                    self.0.insert(option);
                }
            }
        }
    }

    #[must_use]
    pub fn contains(&self, option: &OptionId) -> bool {
        self.0.contains(option)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn ids(&self) -> &BTreeSet<OptionId> {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &OptionId> {
        self.0.iter()
    }
}

impl FromIterator<OptionId> for Selection {
    fn from_iter<I: IntoIterator<Item = OptionId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
