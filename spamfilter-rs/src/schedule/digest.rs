//! Digest notification hook
//!
//! The scheduled job sends the "unanswered questions" digest before
//! retraining. Building and mailing the digest belongs to the forum's mail
//! layer, which plugs in through `DigestNotifier`.

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::info;

/// Sends the periodic digest
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DigestNotifier: Send + Sync {
    /// Send the digest for `date`
    async fn send_digest(&self, date: NaiveDate) -> anyhow::Result<()>;
}

/// Notifier that only emits a log event, for deployments without mail
#[derive(Debug, Default, Clone)]
pub struct LoggingDigestNotifier;

#[async_trait]
impl DigestNotifier for LoggingDigestNotifier {
    async fn send_digest(&self, date: NaiveDate) -> anyhow::Result<()> {
        info!(%date, digest = "unanswered_questions", "Digest notification due");
        Ok(())
    }
}
