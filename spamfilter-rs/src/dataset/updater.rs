//! Dataset updater
//!
//! Applies human-confirmed spam labels to the dataset. Writes for the same
//! text are serialized so two racing corrections cannot interleave.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

use super::store::DatasetStore;
use super::types::{LabelSource, UpsertOutcome};
use crate::config::DatasetConfig;
use crate::error::Result;

/// Per-key async mutexes, dropped once nobody holds them
#[derive(Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `fut` while holding the lock for `key`.
    ///
    /// The map entry is released even if the returned future is dropped
    /// before completion.
    pub async fn with_key<F, T>(&self, key: &str, fut: F) -> T
    where
        F: Future<Output = T>,
    {
        let entry = KeyEntry {
            locks: &self.locks,
            key: key.to_string(),
            lock: {
                let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
                locks.entry(key.to_string()).or_default().clone()
            },
        };

        let _held = entry.lock.lock().await;
        fut.await
    }

    /// Number of keys currently locked or waited on
    pub fn active_keys(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Claim on one key of `KeyedLocks`; cleans the map up on drop
struct KeyEntry<'a> {
    locks: &'a Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    key: String,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl Drop for KeyEntry<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference lives in the map, one is ours
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.key);
        }
    }
}

/// Inserts or overwrites labelled examples
pub struct DatasetUpdater {
    store: Arc<dyn DatasetStore>,
    locks: KeyedLocks,
    record_predictions: bool,
}

impl DatasetUpdater {
    /// Create a new updater
    pub fn new(store: Arc<dyn DatasetStore>, config: &DatasetConfig) -> Self {
        Self {
            store,
            locks: KeyedLocks::new(),
            record_predictions: config.record_predictions,
        }
    }

    /// Underlying store
    pub fn store(&self) -> Arc<dyn DatasetStore> {
        Arc::clone(&self.store)
    }

    /// Overwrite the label of `text`, or append it if unseen.
    ///
    /// Matching is exact: texts differing only in case or whitespace are
    /// separate examples.
    pub async fn upsert(&self, text: &str, is_spam: bool, source: LabelSource) -> Result<UpsertOutcome> {
        let outcome = self
            .locks
            .with_key(text, self.store.upsert(text, is_spam, source))
            .await;

        match &outcome {
            Ok(result) => info!(
                text_len = text.len(),
                is_spam,
                %source,
                outcome = ?result,
                "Dataset label recorded"
            ),
            Err(e) => warn!(text_len = text.len(), is_spam, %source, "Dataset write failed: {}", e),
        }

        outcome
    }

    /// Record a human-confirmed label only when it differs from `previous`
    pub async fn record_correction(
        &self,
        text: &str,
        previous: bool,
        corrected: bool,
        source: LabelSource,
    ) -> Result<Option<UpsertOutcome>> {
        if previous == corrected {
            debug!(text_len = text.len(), "Spam status unchanged, dataset untouched");
            return Ok(None);
        }

        self.upsert(text, corrected, source).await.map(Some)
    }

    /// Append a freshly classified submission when enabled.
    ///
    /// Never overwrites an existing label: a human verdict always wins.
    pub async fn record_prediction(&self, text: &str, is_spam: bool) -> Result<Option<UpsertOutcome>> {
        if !self.record_predictions || text.trim().is_empty() {
            return Ok(None);
        }

        let store = &self.store;
        self.locks
            .with_key(text, async move {
                if store.get(text).await?.is_some() {
                    return Ok(Some(UpsertOutcome::Unchanged));
                }
                store
                    .upsert(text, is_spam, LabelSource::Classifier)
                    .await
                    .map(Some)
            })
            .await
    }

    /// Number of texts with writes in flight
    pub fn pending_writes(&self) -> usize {
        self.locks.active_keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::MemoryDatasetStore;

    fn updater(record_predictions: bool) -> DatasetUpdater {
        DatasetUpdater::new(
            Arc::new(MemoryDatasetStore::new()),
            &DatasetConfig { record_predictions },
        )
    }

    #[tokio::test]
    async fn test_record_correction_skips_unchanged_label() {
        let updater = updater(false);

        let result = updater
            .record_correction("hello", false, false, LabelSource::Author)
            .await
            .unwrap();
        assert!(result.is_none());
        assert_eq!(updater.store().stats().await.unwrap().total, 0);

        let result = updater
            .record_correction("hello", false, true, LabelSource::Moderator)
            .await
            .unwrap();
        assert_eq!(result, Some(UpsertOutcome::Inserted));
    }

    #[tokio::test]
    async fn test_record_prediction_disabled_by_default() {
        let updater = updater(false);
        assert!(updater.record_prediction("cheap pills", true).await.unwrap().is_none());
        assert_eq!(updater.store().stats().await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_record_prediction_never_overrides_human_label() {
        let updater = updater(true);
        updater.upsert("cheap pills", false, LabelSource::Moderator).await.unwrap();

        let result = updater.record_prediction("cheap pills", true).await.unwrap();
        assert_eq!(result, Some(UpsertOutcome::Unchanged));

        let stored = updater.store().get("cheap pills").await.unwrap().unwrap();
        assert!(!stored.is_spam);
        assert_eq!(stored.source, LabelSource::Moderator);
    }

    #[tokio::test]
    async fn test_keyed_locks_are_released() {
        let updater = updater(false);
        updater.upsert("a", true, LabelSource::Moderator).await.unwrap();
        updater.upsert("b", false, LabelSource::Moderator).await.unwrap();
        assert_eq!(updater.pending_writes(), 0);
    }

    #[tokio::test]
    async fn test_keyed_locks_serialize_same_key() {
        let locks = Arc::new(KeyedLocks::new());
        let counter = Arc::new(tokio::sync::Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for i in 0..8 {
            let locks = Arc::clone(&locks);
            let counter = Arc::clone(&counter);
            handles.push(tokio::spawn(async move {
                locks
                    .with_key("same", async {
                        counter.lock().await.push(("start", i));
                        tokio::task::yield_now().await;
                        counter.lock().await.push(("end", i));
                    })
                    .await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // Every start is immediately followed by its own end
        let events = counter.lock().await;
        for pair in events.chunks(2) {
            assert_eq!(pair[0].0, "start");
            assert_eq!(pair[1].0, "end");
            assert_eq!(pair[0].1, pair[1].1);
        }
        assert_eq!(locks.active_keys(), 0);
    }

    #[tokio::test]
    async fn test_keyed_locks_released_on_cancel() {
        let locks = KeyedLocks::new();

        let timed_out = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            locks.with_key("stuck", std::future::pending::<()>()),
        )
        .await;

        assert!(timed_out.is_err());
        assert_eq!(locks.active_keys(), 0);
    }

    #[tokio::test]
    async fn test_keyed_locks_cancelled_waiter_keeps_holder_entry() {
        let locks = Arc::new(KeyedLocks::new());
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

        let holder = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                locks
                    .with_key("busy", async {
                        let _ = release_rx.await;
                    })
                    .await;
            })
        };
        tokio::task::yield_now().await;
        assert_eq!(locks.active_keys(), 1);

        let waited = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            locks.with_key("busy", async {}),
        )
        .await;
        assert!(waited.is_err());
        // The holder still owns the entry
        assert_eq!(locks.active_keys(), 1);

        release_tx.send(()).unwrap();
        holder.await.unwrap();
        assert_eq!(locks.active_keys(), 0);
    }
}
