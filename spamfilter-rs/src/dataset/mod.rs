//! Labelled dataset module
//!
//! Durable store of `(text, is_spam)` examples plus the updater applying
//! human-confirmed labels to it.

pub mod store;
pub mod transfer;
pub mod types;
pub mod updater;

pub use store::{DatasetStore, MemoryDatasetStore, SqliteDatasetStore};
pub use transfer::{export_jsonl, import_jsonl, ImportSummary};
pub use types::*;
pub use updater::{DatasetUpdater, KeyedLocks};
