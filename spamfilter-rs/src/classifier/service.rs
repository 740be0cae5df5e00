//! Classifier service
//!
//! Owns the active model and swaps it wholesale on retrain. Predictions
//! clone the current `Arc<SpamModel>` and never wait on training.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::model::SpamModel;
use super::types::{Label, ModelStats, RetrainOutcome, Verdict};
use crate::config::ClassifierConfig;
use crate::dataset::{DatasetStore, LabeledExample};
use crate::error::{Result, SpamError};

/// Spam classifier with an atomically replaceable model
pub struct SpamClassifier {
    active: RwLock<Arc<SpamModel>>,
    threshold: f64,
    next_version: AtomicU64,
    retrain_lock: tokio::sync::Mutex<()>,
}

impl SpamClassifier {
    /// Create an untrained classifier
    pub fn new(threshold: f64) -> Self {
        Self {
            active: RwLock::new(Arc::new(SpamModel::untrained())),
            threshold,
            next_version: AtomicU64::new(1),
            retrain_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self::new(config.spam_threshold)
    }

    /// Current model
    pub fn model(&self) -> Arc<SpamModel> {
        let active = self.active.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&active)
    }

    /// Classify text against the current model
    pub fn classify(&self, text: &str) -> Verdict {
        let verdict = self.model().classify(text, self.threshold);
        debug!(
            text_len = text.len(),
            label = %verdict.label,
            probability = verdict.spam_probability,
            model_version = verdict.model_version,
            "Classified text"
        );
        verdict
    }

    /// Label text as spam or not-spam
    pub fn predict(&self, text: &str) -> Label {
        self.classify(text).label
    }

    /// Stats of the active model
    pub fn stats(&self) -> ModelStats {
        self.model().stats()
    }

    /// Replace the active model
    fn install(&self, model: SpamModel) {
        let model = Arc::new(model);
        let mut active = self.active.write().unwrap_or_else(PoisonError::into_inner);
        *active = model;
    }

    /// Train on `examples` off the async runtime and install the result.
    ///
    /// On failure the previous model stays active.
    pub async fn train_from(&self, examples: Vec<LabeledExample>) -> Result<ModelStats> {
        let version = self.next_version.fetch_add(1, Ordering::SeqCst);

        let model = tokio::task::spawn_blocking(move || SpamModel::train(&examples, version))
            .await
            .map_err(|e| SpamError::Task(e.to_string()))??;

        let stats = model.stats();
        self.install(model);
        info!(
            version = stats.version,
            spam = stats.spam_examples,
            ham = stats.ham_examples,
            vocabulary = stats.vocabulary,
            "Spam model retrained"
        );
        Ok(stats)
    }

    /// Retrain from the full dataset.
    ///
    /// A request arriving while another retrain runs is coalesced into it.
    pub async fn retrain(&self, store: &dyn DatasetStore) -> Result<RetrainOutcome> {
        let _guard = match self.retrain_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!("Retrain already in progress");
                return Ok(RetrainOutcome::AlreadyRunning);
            }
        };

        match self.train_from_store(store).await {
            Ok(stats) => Ok(RetrainOutcome::Retrained(stats)),
            Err(e) => {
                warn!("Retrain failed, keeping model v{}: {}", self.model().version(), e);
                Err(e)
            }
        }
    }

    async fn train_from_store(&self, store: &dyn DatasetStore) -> Result<ModelStats> {
        let examples: Vec<LabeledExample> = store
            .all()
            .await?
            .into_iter()
            .map(LabeledExample::from)
            .collect();
        self.train_from(examples).await
    }

    /// Dispatch a retrain to a background task
    pub fn spawn_retrain(
        self: &Arc<Self>,
        store: Arc<dyn DatasetStore>,
    ) -> JoinHandle<Result<RetrainOutcome>> {
        let classifier = Arc::clone(self);
        tokio::spawn(async move { classifier.retrain(store.as_ref()).await })
    }
}
