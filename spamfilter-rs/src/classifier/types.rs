//! Classifier types and data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Label {
    Spam,
    NotSpam,
}

impl Label {
    pub fn is_spam(&self) -> bool {
        matches!(self, Label::Spam)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Spam => "spam",
            Label::NotSpam => "not-spam",
        }
    }
}

impl From<bool> for Label {
    fn from(is_spam: bool) -> Self {
        if is_spam {
            Label::Spam
        } else {
            Label::NotSpam
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification result
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Verdict {
    /// Final label
    pub label: Label,
    /// Posterior spam probability (0.0 when there was no evidence)
    pub spam_probability: f64,
    /// Version of the model that produced this verdict
    pub model_version: u64,
}

/// Snapshot of a trained model
#[derive(Debug, Clone, Serialize)]
pub struct ModelStats {
    /// 0 for the untrained placeholder
    pub version: u64,
    pub trained_at: Option<DateTime<Utc>>,
    /// Spam examples trained on
    pub spam_examples: usize,
    /// Ham examples trained on
    pub ham_examples: usize,
    /// Distinct tokens seen across both classes
    pub vocabulary: usize,
}

/// What a retrain request did
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RetrainOutcome {
    /// A new model is active
    Retrained(ModelStats),
    /// Another retrain was in progress; this request was coalesced into it
    AlreadyRunning,
}
