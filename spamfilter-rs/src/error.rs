use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpamError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot train on dataset with {spam} spam and {ham} ham examples")]
    EmptyDataset { spam: usize, ham: usize },

    #[error("Dataset store write failed: {0}")]
    StoreWrite(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SpamError {
    /// Wrap a database failure that happened while writing a label.
    pub fn store_write(err: impl std::fmt::Display) -> Self {
        SpamError::StoreWrite(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SpamError>;
