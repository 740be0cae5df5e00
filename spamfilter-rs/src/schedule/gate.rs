//! Schedule gate
//!
//! Runs the digest + retrain job at most once per eligible calendar day, no
//! matter how often it is invoked (typically on every entry-page request).

use chrono::{Datelike, Local, NaiveDate, Weekday};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::digest::DigestNotifier;
use super::store::ScheduleStore;
use super::types::{GateOutcome, GateReport, ScheduleState, StepStatus};
use crate::classifier::{RetrainOutcome, SpamClassifier};
use crate::config::{RetrainMode, ScheduleConfig};
use crate::dataset::DatasetStore;
use crate::error::Result;

/// At-most-once-per-day guard around the scheduled job
pub struct ScheduleGate {
    weekdays: Vec<Weekday>,
    retrain_mode: RetrainMode,
    store: ScheduleStore,
    notifier: Arc<dyn DigestNotifier>,
    classifier: Arc<SpamClassifier>,
    dataset: Arc<dyn DatasetStore>,
    background: Mutex<Vec<JoinHandle<Result<RetrainOutcome>>>>,
}

impl ScheduleGate {
    /// Create a new gate
    pub fn new(
        config: &ScheduleConfig,
        store: ScheduleStore,
        notifier: Arc<dyn DigestNotifier>,
        classifier: Arc<SpamClassifier>,
        dataset: Arc<dyn DatasetStore>,
    ) -> Self {
        Self {
            weekdays: config.weekdays.clone(),
            retrain_mode: config.retrain_mode,
            store,
            notifier,
            classifier,
            dataset,
            background: Mutex::new(Vec::new()),
        }
    }

    /// Whether `date` falls on a trigger weekday
    pub fn is_eligible(&self, date: NaiveDate) -> bool {
        self.weekdays.contains(&date.weekday())
    }

    /// Persisted state, defaulted before the first run
    pub async fn state(&self) -> Result<ScheduleState> {
        Ok(self.store.load().await?.unwrap_or_default())
    }

    /// Pause or resume the gate
    pub async fn set_active(&self, active: bool) -> Result<()> {
        self.store.set_active(active).await?;
        info!(active, "Schedule gate toggled");
        Ok(())
    }

    /// Evaluate the gate for the server's local date
    pub async fn check(&self) -> Result<GateReport> {
        self.check_on(Local::now().date_naive()).await
    }

    /// Evaluate the gate for `today`
    pub async fn check_on(&self, today: NaiveDate) -> Result<GateReport> {
        if !self.is_eligible(today) {
            debug!(%today, "Not a scheduled day, digest not sent");
            return Ok(GateReport::skipped(today, GateOutcome::NotSent));
        }

        if !self.store.try_claim(today).await? {
            let state = self.state().await?;
            let outcome = if state.is_active {
                GateOutcome::AlreadySent
            } else {
                GateOutcome::Paused
            };
            debug!(%today, ?outcome, "Scheduled job not run");
            return Ok(GateReport::skipped(today, outcome));
        }

        info!(%today, "Scheduled job claimed");
        Ok(self.run_job(today).await)
    }

    /// Run the job now, recording `today` so the gate does not repeat it
    pub async fn force_run(&self, today: NaiveDate) -> Result<GateReport> {
        self.store.record_run(today).await?;
        info!(%today, "Scheduled job forced");
        Ok(self.run_job(today).await)
    }

    async fn run_job(&self, today: NaiveDate) -> GateReport {
        let digest = match self.notifier.send_digest(today).await {
            Ok(()) => match self.store.mark_sent(today).await {
                Ok(()) => StepStatus::Completed,
                Err(e) => {
                    error!(%today, "Digest sent but state not updated: {}", e);
                    StepStatus::failed(e)
                }
            },
            Err(e) => {
                error!(%today, "Digest notification failed: {:#}", e);
                StepStatus::failed(e)
            }
        };

        // Retraining never affects the digest result
        let retrain = self.run_retrain().await;

        info!(%today, ?digest, ?retrain, "Scheduled job finished");
        GateReport {
            date: today,
            outcome: GateOutcome::Sent,
            digest: Some(digest),
            retrain: Some(retrain),
        }
    }

    async fn run_retrain(&self) -> StepStatus {
        match self.retrain_mode {
            RetrainMode::Background => {
                let handle = self.classifier.spawn_retrain(Arc::clone(&self.dataset));
                let mut background = self.background.lock().unwrap_or_else(PoisonError::into_inner);
                background.retain(|h| !h.is_finished());
                background.push(handle);
                StepStatus::Dispatched
            }
            RetrainMode::Inline => retrain_status(self.classifier.retrain(self.dataset.as_ref()).await),
        }
    }

    /// Wait for every dispatched background retrain and report how each ended.
    ///
    /// Callers that exit after `check_on` must await this, or shutting down
    /// the runtime cancels the retrain of a day that is already claimed.
    pub async fn wait_for_retrains(&self) -> Vec<StepStatus> {
        let mut statuses = Vec::new();
        loop {
            let pending = std::mem::take(
                &mut *self.background.lock().unwrap_or_else(PoisonError::into_inner),
            );
            if pending.is_empty() {
                return statuses;
            }
            for handle in pending {
                let status = match handle.await {
                    Ok(result) => retrain_status(result),
                    Err(e) => {
                        warn!("Background retrain task did not finish: {}", e);
                        StepStatus::failed(e)
                    }
                };
                statuses.push(status);
            }
        }
    }
}

fn retrain_status(result: Result<RetrainOutcome>) -> StepStatus {
    match result {
        Ok(RetrainOutcome::Retrained(_)) => StepStatus::Completed,
        Ok(RetrainOutcome::AlreadyRunning) => StepStatus::Skipped,
        Err(e) => StepStatus::failed(e),
    }
}
