//! spamfilter-rs: spam classification service
//!
//! Serves the classifier, dataset updater and schedule gate over HTTP.
//! Usage: `spamfilter-rs [config.toml]`

use spamfilter_rs::app::Pipeline;
use spamfilter_rs::config::Config;
use std::path::PathBuf;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration: explicit path, SPAMFILTER_CONFIG, or ./spamfilter.toml if present
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("SPAMFILTER_CONFIG").ok())
        .map(PathBuf::from)
        .or_else(|| {
            let default = PathBuf::from("spamfilter.toml");
            default.exists().then_some(default)
        });
    let config = Config::load(config_path.as_deref())?;

    spamfilter_rs::logging::init(&config.logging);
    info!("Starting spamfilter-rs v{}", env!("CARGO_PKG_VERSION"));
    match &config_path {
        Some(path) => info!("Configuration loaded from {}", path.display()),
        None => info!("No config file found, using defaults and environment"),
    }
    info!("  Listening on: {}", config.server.listen_addr);
    info!("  Database: {}", config.storage.database_url);
    info!("  Schedule weekdays: {:?}", config.schedule.weekdays);

    let pipeline = Pipeline::open(&config).await?;
    if config.classifier.train_on_startup {
        pipeline.warm_up().await?;
    }

    spamfilter_rs::api::serve(&config.server.listen_addr, pipeline.app_state()).await?;

    // Let a scheduled retrain dispatched before shutdown finish
    for status in pipeline.gate.wait_for_retrains().await {
        info!(?status, "Background retrain finished");
    }

    Ok(())
}
