//! Persisted schedule state (table `schedule_state`, single row `id = 1`)

use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;

use super::types::{ScheduleState, DATE_FORMAT};
use crate::error::{Result, SpamError};

/// SQLite-backed schedule state
#[derive(Clone)]
pub struct ScheduleStore {
    db: SqlitePool,
}

impl ScheduleStore {
    /// Create a new schedule store
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Initialize database tables
    pub async fn init_db(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS schedule_state (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                last_run_date TEXT,
                is_sent INTEGER NOT NULL DEFAULT 0,
                is_active INTEGER NOT NULL DEFAULT 1,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Current state, or `None` before the first run
    pub async fn load(&self) -> Result<Option<ScheduleState>> {
        let row = sqlx::query_as::<_, (Option<String>, i64, i64)>(
            "SELECT last_run_date, is_sent, is_active FROM schedule_state WHERE id = 1",
        )
        .fetch_optional(&self.db)
        .await?;

        let Some((last_run_date, is_sent, is_active)) = row else {
            return Ok(None);
        };

        let last_run_date = match last_run_date {
            Some(d) => Some(
                NaiveDate::parse_from_str(&d, DATE_FORMAT)
                    .map_err(|e| SpamError::Parse(format!("last_run_date {:?}: {}", d, e)))?,
            ),
            None => None,
        };

        Ok(Some(ScheduleState {
            last_run_date,
            is_sent: is_sent != 0,
            is_active: is_active != 0,
        }))
    }

    /// Atomically claim `date` for a run.
    ///
    /// Returns `true` for exactly one caller per day: the row is created or
    /// moved to `date` only if the gate is active and has not run that day.
    pub async fn try_claim(&self, date: NaiveDate) -> Result<bool> {
        let day = date.format(DATE_FORMAT).to_string();

        let result = sqlx::query(
            r#"
            INSERT INTO schedule_state (id, last_run_date, is_sent, is_active, updated_at)
            VALUES (1, ?, 0, 1, ?)
            ON CONFLICT(id) DO UPDATE SET
                last_run_date = excluded.last_run_date,
                is_sent = 0,
                updated_at = excluded.updated_at
            WHERE schedule_state.is_active = 1
              AND (schedule_state.last_run_date IS NULL
                   OR schedule_state.last_run_date <> excluded.last_run_date)
            "#,
        )
        .bind(&day)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Mark the digest for `date` as sent
    pub async fn mark_sent(&self, date: NaiveDate) -> Result<()> {
        sqlx::query(
            "UPDATE schedule_state SET is_sent = 1, updated_at = ? WHERE id = 1 AND last_run_date = ?",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(date.format(DATE_FORMAT).to_string())
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Record a forced run for `date` regardless of previous state
    pub async fn record_run(&self, date: NaiveDate) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO schedule_state (id, last_run_date, is_sent, is_active, updated_at)
            VALUES (1, ?, 0, 1, ?)
            ON CONFLICT(id) DO UPDATE SET
                last_run_date = excluded.last_run_date,
                is_sent = 0,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(date.format(DATE_FORMAT).to_string())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Pause or resume the gate
    pub async fn set_active(&self, active: bool) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO schedule_state (id, last_run_date, is_sent, is_active, updated_at)
            VALUES (1, NULL, 0, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                is_active = excluded.is_active,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(active as i64)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.db)
        .await?;

        Ok(())
    }
}
