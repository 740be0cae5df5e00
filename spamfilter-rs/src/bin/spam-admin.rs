//! CLI tool for operating the spam pipeline
//!
//! # Usage
//!
//! ```bash
//! # Label a text as spam (moderator override)
//! spam-admin label "buy now!!!" --spam
//!
//! # Retrain and classify
//! spam-admin train
//! spam-admin predict "thanks for the tip"
//!
//! # Bulk load / dump the dataset as JSON Lines
//! spam-admin import dataset.jsonl
//! spam-admin export dataset.jsonl
//!
//! # Inspect or drive the schedule gate
//! spam-admin schedule status
//! spam-admin schedule pause
//! spam-admin schedule run --force
//! ```

use chrono::Local;
use clap::{Parser, Subcommand};
use spamfilter_rs::app::Pipeline;
use spamfilter_rs::classifier::RetrainOutcome;
use spamfilter_rs::config::Config;
use spamfilter_rs::dataset::{self, LabelSource};
use std::path::PathBuf;
use tokio::io::BufReader;

#[derive(Parser)]
#[command(name = "spam-admin")]
#[command(about = "Operate the forum spam classifier", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Database URL, overrides the configuration (e.g. sqlite://spamfilter.db)
    #[arg(short, long)]
    db: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Retrain the model from the full dataset
    Train,
    /// Classify a text
    Predict {
        text: String,
    },
    /// Insert or overwrite a label
    Label {
        text: String,
        /// Label as spam
        #[arg(long, conflicts_with = "ham")]
        spam: bool,
        /// Label as not spam
        #[arg(long)]
        ham: bool,
    },
    /// Import examples from a JSON Lines file
    Import {
        file: PathBuf,
    },
    /// Export examples as JSON Lines (stdout when no file is given)
    Export {
        file: Option<PathBuf>,
    },
    /// Show model and dataset statistics
    Stats,
    /// Schedule gate operations
    Schedule {
        #[command(subcommand)]
        action: ScheduleAction,
    },
}

#[derive(Subcommand)]
enum ScheduleAction {
    /// Show the persisted schedule state
    Status,
    /// Stop the gate from running the job
    Pause,
    /// Let the gate run the job again
    Resume,
    /// Evaluate the gate for today
    Run {
        /// Run even if today is not eligible or already done
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        config.storage.database_url = db;
    }
    spamfilter_rs::logging::init(&config.logging);

    let pipeline = Pipeline::open(&config).await?;

    match cli.command {
        Commands::Train => match pipeline.classifier.retrain(pipeline.dataset.as_ref()).await? {
            RetrainOutcome::Retrained(stats) => println!(
                "✓ Model v{} trained on {} spam / {} ham examples ({} tokens)",
                stats.version, stats.spam_examples, stats.ham_examples, stats.vocabulary
            ),
            RetrainOutcome::AlreadyRunning => println!("Retrain already in progress"),
        },
        Commands::Predict { text } => {
            pipeline.warm_up().await?;
            let verdict = pipeline.classifier.classify(&text);
            println!(
                "{} (p_spam = {:.3}, model v{})",
                verdict.label, verdict.spam_probability, verdict.model_version
            );
        }
        Commands::Label { text, spam, ham } => {
            if spam == ham {
                anyhow::bail!("pass exactly one of --spam or --ham");
            }
            let outcome = pipeline
                .updater
                .upsert(&text, spam, LabelSource::Moderator)
                .await?;
            println!("✓ {:?}", outcome);
        }
        Commands::Import { file } => {
            let reader = BufReader::new(tokio::fs::File::open(&file).await?);
            let summary = dataset::import_jsonl(&pipeline.updater, reader).await?;
            println!(
                "✓ Imported {} examples ({} new, {} relabelled, {} unchanged)",
                summary.total(),
                summary.inserted,
                summary.updated,
                summary.unchanged
            );
        }
        Commands::Export { file } => {
            let count = match file {
                Some(path) => {
                    let out = tokio::fs::File::create(&path).await?;
                    dataset::export_jsonl(pipeline.dataset.as_ref(), out).await?
                }
                None => dataset::export_jsonl(pipeline.dataset.as_ref(), tokio::io::stdout()).await?,
            };
            eprintln!("✓ Exported {} examples", count);
        }
        Commands::Stats => {
            pipeline.warm_up().await?;
            let dataset = pipeline.dataset.stats().await?;
            let model = pipeline.classifier.stats();
            println!("Dataset: {} examples ({} spam, {} ham)", dataset.total, dataset.spam, dataset.ham);
            println!("Model:   v{}, vocabulary {}", model.version, model.vocabulary);
        }
        Commands::Schedule { action } => match action {
            ScheduleAction::Status => {
                let state = pipeline.gate.state().await?;
                println!("{}", serde_json::to_string_pretty(&state)?);
            }
            ScheduleAction::Pause => {
                pipeline.gate.set_active(false).await?;
                println!("✓ Schedule gate paused");
            }
            ScheduleAction::Resume => {
                pipeline.gate.set_active(true).await?;
                println!("✓ Schedule gate resumed");
            }
            ScheduleAction::Run { force } => {
                let today = Local::now().date_naive();
                let report = if force {
                    pipeline.gate.force_run(today).await?
                } else {
                    pipeline.gate.check_on(today).await?
                };
                println!("{}", serde_json::to_string_pretty(&report)?);

                // The runtime goes away with `main`, so finish the retrain here
                for status in pipeline.gate.wait_for_retrains().await {
                    println!("Background retrain: {:?}", status);
                }
            }
        },
    }

    Ok(())
}
