//! Spam classifier module
//!
//! Naive Bayes text classification with an atomically swapped model.

pub mod model;
pub mod service;
pub mod types;

pub use model::{SpamModel, Tokenizer};
pub use service::SpamClassifier;
pub use types::*;
