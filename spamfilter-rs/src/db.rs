//! SQLite pool setup shared by the dataset store and the schedule gate

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;

use crate::error::Result;

/// Open a pool for `database_url`, creating the database file if needed.
///
/// In-memory databases are pinned to a single connection, otherwise every
/// pooled connection would see its own empty database.
pub async fn connect(database_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(5));

    let max_connections = if database_url.contains(":memory:") { 1 } else { 8 };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    Ok(pool)
}
