use std::sync::Arc;

use crate::keys;
use crate::repository::{KeyValueStore, StorageError};

const REVIEWED: &str = "true";

/// Per-set "already reviewed" markers, keyed by a caller-chosen set key.
#[derive(Clone)]
pub struct ReviewFlagStore {
    kv: Arc<dyn KeyValueStore>,
}

impl ReviewFlagStore {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Whether `set_key` has been marked reviewed. Unknown keys are not.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend read fails.
    pub async fn is_reviewed(&self, set_key: &str) -> Result<bool, StorageError> {
        let raw = self.kv.get(&keys::reviewed_set(set_key)).await?;
        Ok(raw.as_deref() == Some(REVIEWED))
    }

    /// Mark `set_key` reviewed. Repeating the call is harmless.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend write fails.
    pub async fn mark_reviewed(&self, set_key: &str) -> Result<(), StorageError> {
        self.kv.set(&keys::reviewed_set(set_key), REVIEWED).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryStore;

    #[tokio::test]
    async fn marks_are_scoped_per_set() {
        let flags = ReviewFlagStore::new(Arc::new(InMemoryStore::new()));
        assert!(!flags.is_reviewed("exam-1").await.unwrap());

        flags.mark_reviewed("exam-1").await.unwrap();
        flags.mark_reviewed("exam-1").await.unwrap();
        assert!(flags.is_reviewed("exam-1").await.unwrap());
        assert!(flags.is_reviewed(" exam-1 ").await.unwrap());
        assert!(!flags.is_reviewed("exam-2").await.unwrap());
    }
}
