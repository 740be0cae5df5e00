//! Wiring of the pipeline components from configuration

use std::sync::Arc;
use tracing::{info, warn};

use crate::api::AppState;
use crate::classifier::{RetrainOutcome, SpamClassifier};
use crate::config::Config;
use crate::dataset::{DatasetStore, DatasetUpdater, SqliteDatasetStore};
use crate::error::{Result, SpamError};
use crate::schedule::{DigestNotifier, LoggingDigestNotifier, ScheduleGate, ScheduleStore};

/// All pipeline components sharing one database
pub struct Pipeline {
    pub dataset: Arc<dyn DatasetStore>,
    pub updater: Arc<DatasetUpdater>,
    pub classifier: Arc<SpamClassifier>,
    pub gate: Arc<ScheduleGate>,
}

impl Pipeline {
    /// Open the database and build every component, with the logging notifier
    pub async fn open(config: &Config) -> Result<Self> {
        Self::open_with_notifier(config, Arc::new(LoggingDigestNotifier)).await
    }

    /// Same as `open` with a custom digest notifier
    pub async fn open_with_notifier(
        config: &Config,
        notifier: Arc<dyn DigestNotifier>,
    ) -> Result<Self> {
        let pool = crate::db::connect(&config.storage.database_url).await?;

        let sqlite_store = SqliteDatasetStore::new(pool.clone());
        sqlite_store.init_db().await?;
        let schedule_store = ScheduleStore::new(pool);
        schedule_store.init_db().await?;

        let dataset: Arc<dyn DatasetStore> = Arc::new(sqlite_store);
        let updater = Arc::new(DatasetUpdater::new(Arc::clone(&dataset), &config.dataset));
        let classifier = Arc::new(SpamClassifier::from_config(&config.classifier));
        let gate = Arc::new(ScheduleGate::new(
            &config.schedule,
            schedule_store,
            notifier,
            Arc::clone(&classifier),
            Arc::clone(&dataset),
        ));

        info!(database = %config.storage.database_url, "Spam pipeline opened");

        Ok(Self {
            dataset,
            updater,
            classifier,
            gate,
        })
    }

    /// Train once if the dataset allows it; an untrainable dataset is not an error
    pub async fn warm_up(&self) -> Result<()> {
        match self.classifier.retrain(self.dataset.as_ref()).await {
            Ok(RetrainOutcome::Retrained(stats)) => {
                info!(version = stats.version, "Initial spam model trained");
                Ok(())
            }
            Ok(RetrainOutcome::AlreadyRunning) => Ok(()),
            Err(SpamError::EmptyDataset { spam, ham }) => {
                warn!(spam, ham, "Dataset not trainable yet, every text is not-spam until retrain");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Shared state for the HTTP API
    pub fn app_state(&self) -> Arc<AppState> {
        Arc::new(AppState {
            classifier: Arc::clone(&self.classifier),
            updater: Arc::clone(&self.updater),
            gate: Arc::clone(&self.gate),
        })
    }
}
