//! JSON Lines import/export of the labelled dataset
//!
//! One `{"text": "...", "is_spam": true}` object per line.

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use super::store::DatasetStore;
use super::types::{LabelSource, LabeledExample, UpsertOutcome};
use super::updater::DatasetUpdater;
use crate::error::{Result, SpamError};

/// Counts from an import run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl ImportSummary {
    pub fn total(&self) -> usize {
        self.inserted + self.updated + self.unchanged
    }
}

/// Upsert every line of `reader` through the updater
pub async fn import_jsonl<R>(updater: &DatasetUpdater, reader: R) -> Result<ImportSummary>
where
    R: AsyncBufRead + Unpin,
{
    let mut summary = ImportSummary::default();
    let mut lines = reader.lines();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }

        let example: LabeledExample = serde_json::from_str(&line)
            .map_err(|e| SpamError::Parse(format!("line {}: {}", line_no, e)))?;

        match updater
            .upsert(&example.text, example.is_spam, LabelSource::Import)
            .await?
        {
            UpsertOutcome::Inserted => summary.inserted += 1,
            UpsertOutcome::Updated => summary.updated += 1,
            UpsertOutcome::Unchanged => summary.unchanged += 1,
        }
    }

    Ok(summary)
}

/// Write every example to `writer`, returning how many were written
pub async fn export_jsonl<W>(store: &dyn DatasetStore, mut writer: W) -> Result<usize>
where
    W: AsyncWrite + Unpin,
{
    let examples = store.all().await?;
    let count = examples.len();

    for stored in examples {
        let mut line = serde_json::to_string(&LabeledExample::from(stored))?;
        line.push('\n');
        writer.write_all(line.as_bytes()).await?;
    }
    writer.flush().await?;

    Ok(count)
}
