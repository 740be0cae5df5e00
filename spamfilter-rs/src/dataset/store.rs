//! Labelled dataset storage backends

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::types::{DatasetStats, LabelSource, StoredExample, UpsertOutcome};
use crate::error::{Result, SpamError};

/// Durable `text -> is_spam` mapping, iterable in full for training
#[async_trait]
pub trait DatasetStore: Send + Sync {
    /// Overwrite the label of `text` if present, append it otherwise
    async fn upsert(&self, text: &str, is_spam: bool, source: LabelSource) -> Result<UpsertOutcome>;

    /// Look up a single example by exact text
    async fn get(&self, text: &str) -> Result<Option<StoredExample>>;

    /// Every example, oldest first
    async fn all(&self) -> Result<Vec<StoredExample>>;

    /// Class counts
    async fn stats(&self) -> Result<DatasetStats>;

    /// Delete an example, returning whether it existed
    async fn remove(&self, text: &str) -> Result<bool>;
}

/// SQLite-backed dataset (table `spam_dataset`)
#[derive(Clone)]
pub struct SqliteDatasetStore {
    db: SqlitePool,
}

impl SqliteDatasetStore {
    /// Create a new store over an existing pool
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Initialize database tables
    pub async fn init_db(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS spam_dataset (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                text TEXT NOT NULL UNIQUE,
                is_spam INTEGER NOT NULL,
                source TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        Ok(())
    }

    fn row_to_example(
        (text, is_spam, source, created_at, updated_at): (String, i64, String, String, String),
    ) -> Result<StoredExample> {
        Ok(StoredExample {
            is_spam: is_spam != 0,
            source: source.parse()?,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
            text,
        })
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| SpamError::Parse(format!("timestamp {:?}: {}", value, e)))
}

#[async_trait]
impl DatasetStore for SqliteDatasetStore {
    async fn upsert(&self, text: &str, is_spam: bool, source: LabelSource) -> Result<UpsertOutcome> {
        let now = Utc::now().to_rfc3339();

        let inserted = sqlx::query(
            r#"
            INSERT INTO spam_dataset (text, is_spam, source, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(text) DO NOTHING
            "#,
        )
        .bind(text)
        .bind(is_spam as i64)
        .bind(source.as_str())
        .bind(&now)
        .bind(&now)
        .execute(&self.db)
        .await
        .map_err(SpamError::store_write)?;

        if inserted.rows_affected() == 1 {
            return Ok(UpsertOutcome::Inserted);
        }

        let updated = sqlx::query(
            "UPDATE spam_dataset SET is_spam = ?, source = ?, updated_at = ? WHERE text = ? AND is_spam <> ?",
        )
        .bind(is_spam as i64)
        .bind(source.as_str())
        .bind(&now)
        .bind(text)
        .bind(is_spam as i64)
        .execute(&self.db)
        .await
        .map_err(SpamError::store_write)?;

        if updated.rows_affected() == 1 {
            Ok(UpsertOutcome::Updated)
        } else {
            Ok(UpsertOutcome::Unchanged)
        }
    }

    async fn get(&self, text: &str) -> Result<Option<StoredExample>> {
        let row = sqlx::query_as::<_, (String, i64, String, String, String)>(
            "SELECT text, is_spam, source, created_at, updated_at FROM spam_dataset WHERE text = ?",
        )
        .bind(text)
        .fetch_optional(&self.db)
        .await?;

        row.map(Self::row_to_example).transpose()
    }

    async fn all(&self) -> Result<Vec<StoredExample>> {
        let rows = sqlx::query_as::<_, (String, i64, String, String, String)>(
            "SELECT text, is_spam, source, created_at, updated_at FROM spam_dataset ORDER BY id",
        )
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Self::row_to_example).collect()
    }

    async fn stats(&self) -> Result<DatasetStats> {
        let (total, spam): (i64, Option<i64>) =
            sqlx::query_as("SELECT COUNT(*), SUM(is_spam) FROM spam_dataset")
                .fetch_one(&self.db)
                .await?;

        let total = total as usize;
        let spam = spam.unwrap_or(0) as usize;
        Ok(DatasetStats {
            total,
            spam,
            ham: total - spam,
        })
    }

    async fn remove(&self, text: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM spam_dataset WHERE text = ?")
            .bind(text)
            .execute(&self.db)
            .await
            .map_err(SpamError::store_write)?;

        Ok(result.rows_affected() > 0)
    }
}

/// In-process dataset, used by tests and throwaway deployments
#[derive(Default)]
pub struct MemoryDatasetStore {
    entries: RwLock<HashMap<String, (u64, StoredExample)>>,
    next_seq: RwLock<u64>,
}

impl MemoryDatasetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored examples
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl DatasetStore for MemoryDatasetStore {
    async fn upsert(&self, text: &str, is_spam: bool, source: LabelSource) -> Result<UpsertOutcome> {
        let mut entries = self.entries.write().await;
        let now = Utc::now();

        if let Some((_, existing)) = entries.get_mut(text) {
            if existing.is_spam == is_spam {
                return Ok(UpsertOutcome::Unchanged);
            }
            existing.is_spam = is_spam;
            existing.source = source;
            existing.updated_at = now;
            return Ok(UpsertOutcome::Updated);
        }

        let seq = {
            let mut next = self.next_seq.write().await;
            *next += 1;
            *next
        };
        entries.insert(
            text.to_string(),
            (
                seq,
                StoredExample {
                    text: text.to_string(),
                    is_spam,
                    source,
                    created_at: now,
                    updated_at: now,
                },
            ),
        );
        Ok(UpsertOutcome::Inserted)
    }

    async fn get(&self, text: &str) -> Result<Option<StoredExample>> {
        let entries = self.entries.read().await;
        Ok(entries.get(text).map(|(_, example)| example.clone()))
    }

    async fn all(&self) -> Result<Vec<StoredExample>> {
        let entries = self.entries.read().await;
        let mut ordered: Vec<&(u64, StoredExample)> = entries.values().collect();
        ordered.sort_by_key(|(seq, _)| *seq);
        Ok(ordered.into_iter().map(|(_, example)| example.clone()).collect())
    }

    async fn stats(&self) -> Result<DatasetStats> {
        let entries = self.entries.read().await;
        let spam = entries.values().filter(|(_, e)| e.is_spam).count();
        Ok(DatasetStats {
            total: entries.len(),
            spam,
            ham: entries.len() - spam,
        })
    }

    async fn remove(&self, text: &str) -> Result<bool> {
        let mut entries = self.entries.write().await;
        Ok(entries.remove(text).is_some())
    }
}
