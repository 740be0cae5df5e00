//! Labelled dataset types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SpamError;

/// A `(text, is_spam)` pair used for training.
///
/// The text is the uniqueness key and is matched byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledExample {
    pub text: String,
    pub is_spam: bool,
}

impl LabeledExample {
    pub fn new(text: impl Into<String>, is_spam: bool) -> Self {
        Self {
            text: text.into(),
            is_spam,
        }
    }
}

/// Who wrote the current label of an example
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelSource {
    /// A moderator marked or unmarked the post as spam
    Moderator,
    /// The author's edit changed the spam status
    Author,
    /// Recorded straight from a classifier verdict
    Classifier,
    /// Bulk-loaded from an exported data set
    Import,
}

impl LabelSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LabelSource::Moderator => "moderator",
            LabelSource::Author => "author",
            LabelSource::Classifier => "classifier",
            LabelSource::Import => "import",
        }
    }
}

impl fmt::Display for LabelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LabelSource {
    type Err = SpamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "moderator" => Ok(LabelSource::Moderator),
            "author" => Ok(LabelSource::Author),
            "classifier" => Ok(LabelSource::Classifier),
            "import" => Ok(LabelSource::Import),
            other => Err(SpamError::Parse(format!("Unknown label source: {}", other))),
        }
    }
}

/// An example as persisted by a store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredExample {
    pub text: String,
    pub is_spam: bool,
    pub source: LabelSource,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<StoredExample> for LabeledExample {
    fn from(stored: StoredExample) -> Self {
        LabeledExample {
            text: stored.text,
            is_spam: stored.is_spam,
        }
    }
}

/// Result of an upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertOutcome {
    /// No example had this text; one was appended
    Inserted,
    /// The existing example's label was overwritten
    Updated,
    /// The existing example already carried this label
    Unchanged,
}

/// Dataset counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DatasetStats {
    pub total: usize,
    pub spam: usize,
    pub ham: usize,
}

impl DatasetStats {
    /// Both classes are present, so a model can be trained
    pub fn is_trainable(&self) -> bool {
        self.spam > 0 && self.ham > 0
    }
}
