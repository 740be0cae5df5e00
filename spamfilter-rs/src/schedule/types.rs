//! Schedule gate types

use chrono::NaiveDate;
use serde::Serialize;

/// Date format used for the persisted last-run day
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Persisted singleton state of the scheduled job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleState {
    /// Day the job last ran (claimed), if ever
    pub last_run_date: Option<NaiveDate>,
    /// The digest for `last_run_date` went out
    pub is_sent: bool,
    /// The gate may run the job at all
    pub is_active: bool,
}

impl Default for ScheduleState {
    fn default() -> Self {
        Self {
            last_run_date: None,
            is_sent: false,
            is_active: true,
        }
    }
}

/// What the gate decided for one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateOutcome {
    /// Today is not a trigger weekday
    NotSent,
    /// The gate is switched off
    Paused,
    /// The job already ran today
    AlreadySent,
    /// This invocation ran the job
    Sent,
}

/// Status of one step of the scheduled job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    /// Handed to a background task
    Dispatched,
    /// Another run of this step was already in progress
    Skipped,
    Failed { error: String },
}

impl StepStatus {
    pub fn failed(err: impl std::fmt::Display) -> Self {
        StepStatus::Failed {
            error: err.to_string(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, StepStatus::Failed { .. })
    }
}

/// Report of one gate invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateReport {
    pub date: NaiveDate,
    pub outcome: GateOutcome,
    /// Present only when the job ran
    pub digest: Option<StepStatus>,
    pub retrain: Option<StepStatus>,
}

impl GateReport {
    pub fn skipped(date: NaiveDate, outcome: GateOutcome) -> Self {
        Self {
            date,
            outcome,
            digest: None,
            retrain: None,
        }
    }

    pub fn ran(&self) -> bool {
        self.outcome == GateOutcome::Sent
    }
}
