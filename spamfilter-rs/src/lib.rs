//! spamfilter-rs: spam classification pipeline for the Q&A forum
//!
//! Labels new questions and answers as spam or not, keeps the labelled
//! dataset up to date with moderator corrections, and retrains the model
//! from a digest job that runs at most once per scheduled day.
//!
//! # Example
//!
//! ```no_run
//! use spamfilter_rs::app::Pipeline;
//! use spamfilter_rs::config::Config;
//! use spamfilter_rs::dataset::LabelSource;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = Pipeline::open(&Config::default()).await?;
//!
//!     pipeline.updater.upsert("buy now!!!", true, LabelSource::Moderator).await?;
//!     pipeline.updater.upsert("thanks for the tip", false, LabelSource::Moderator).await?;
//!     pipeline.classifier.retrain(pipeline.dataset.as_ref()).await?;
//!
//!     println!("{}", pipeline.classifier.predict("buy now!!!"));
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`classifier`]: naive Bayes model and the atomically swapped service
//! - [`dataset`]: labelled example stores and the updater
//! - [`schedule`]: once-per-day digest + retrain gate
//! - [`api`]: HTTP consumer interface
//! - [`config`]: configuration management
//! - [`error`]: error types and handling

pub mod api;
pub mod app;
pub mod classifier;
pub mod config;
pub mod dataset;
pub mod db;
pub mod error;
pub mod logging;
pub mod schedule;

// Re-export commonly used types
pub use config::Config;
pub use error::{Result, SpamError};
