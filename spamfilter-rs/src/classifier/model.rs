//! Naive Bayes spam model
//!
//! A model is built in one go from a dataset snapshot and never mutated
//! afterwards; retraining builds a fresh one.

use chrono::{DateTime, Utc};
use regex::{Captures, Regex};
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use super::types::{Label, ModelStats, Verdict};
use crate::dataset::LabeledExample;
use crate::error::{Result, SpamError};

/// Marker token emitted for every link in a text
pub const URL_TOKEN: &str = "__url__";

/// Upper bound on tokens looked at per text, keeps prediction time bounded
pub const MAX_TOKENS: usize = 5_000;

const MIN_TOKEN_LEN: usize = 3;
const MAX_TOKEN_LEN: usize = 25;

fn url_regex() -> &'static Regex {
    static URL_RE: OnceLock<Regex> = OnceLock::new();
    URL_RE.get_or_init(|| {
        Regex::new(r"(?:https?://|www\.)(?P<host>[a-z0-9.-]+)[^\s]*").expect("URL pattern is valid")
    })
}

/// Lower-cases, extracts links and stems words
pub struct Tokenizer {
    stemmer: Stemmer,
}

impl Tokenizer {
    pub fn new() -> Self {
        Self {
            stemmer: Stemmer::create(Algorithm::English),
        }
    }

    /// Tokenize text into stemmed words plus link markers
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let lower = text.to_lowercase();
        let mut tokens = Vec::new();

        let without_urls = url_regex().replace_all(&lower, |caps: &Captures| {
            tokens.push(URL_TOKEN.to_string());
            if let Some(host) = caps.name("host") {
                tokens.push(format!("host:{}", host.as_str().trim_end_matches('.')));
            }
            " "
        });

        tokens.extend(
            without_urls
                .split(|c: char| !c.is_alphanumeric())
                .filter(|s| (MIN_TOKEN_LEN..=MAX_TOKEN_LEN).contains(&s.chars().count()))
                .map(|s| self.stemmer.stem(s).to_string()),
        );
        tokens.truncate(MAX_TOKENS);
        tokens
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Trained multinomial naive Bayes model
pub struct SpamModel {
    version: u64,
    trained_at: Option<DateTime<Utc>>,
    spam_docs: usize,
    ham_docs: usize,
    spam_tokens: HashMap<String, u32>,
    ham_tokens: HashMap<String, u32>,
    spam_total: u64,
    ham_total: u64,
    vocabulary: usize,
    known: HashMap<String, bool>,
    tokenizer: Tokenizer,
}

impl SpamModel {
    /// Placeholder used before the first successful training
    pub fn untrained() -> Self {
        Self {
            version: 0,
            trained_at: None,
            spam_docs: 0,
            ham_docs: 0,
            spam_tokens: HashMap::new(),
            ham_tokens: HashMap::new(),
            spam_total: 0,
            ham_total: 0,
            vocabulary: 0,
            known: HashMap::new(),
            tokenizer: Tokenizer::new(),
        }
    }

    /// Train a model from labelled examples.
    ///
    /// Fails with `EmptyDataset` unless both classes are present.
    pub fn train(examples: &[LabeledExample], version: u64) -> Result<Self> {
        let spam = examples.iter().filter(|e| e.is_spam).count();
        let ham = examples.len() - spam;
        if spam == 0 || ham == 0 {
            return Err(SpamError::EmptyDataset { spam, ham });
        }

        let mut model = Self::untrained();
        model.version = version;
        model.spam_docs = spam;
        model.ham_docs = ham;

        for example in examples {
            let tokens = model.tokenizer.tokenize(&example.text);
            let (counts, total) = if example.is_spam {
                (&mut model.spam_tokens, &mut model.spam_total)
            } else {
                (&mut model.ham_tokens, &mut model.ham_total)
            };
            *total += tokens.len() as u64;
            for token in tokens {
                *counts.entry(token).or_insert(0) += 1;
            }
            model.known.insert(example.text.clone(), example.is_spam);
        }

        model.vocabulary = model
            .spam_tokens
            .keys()
            .chain(model.ham_tokens.keys())
            .collect::<HashSet<_>>()
            .len();
        model.trained_at = Some(Utc::now());

        Ok(model)
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_trained(&self) -> bool {
        self.spam_docs > 0 && self.ham_docs > 0
    }

    /// Posterior spam probability, `None` when the model has no evidence
    pub fn spam_probability(&self, text: &str) -> Option<f64> {
        if !self.is_trained() || text.trim().is_empty() {
            return None;
        }

        if let Some(&is_spam) = self.known.get(text) {
            return Some(if is_spam { 1.0 } else { 0.0 });
        }

        let total_docs = (self.spam_docs + self.ham_docs) as f64;
        let mut spam_score = (self.spam_docs as f64 / total_docs).ln();
        let mut ham_score = (self.ham_docs as f64 / total_docs).ln();
        let vocab = self.vocabulary as f64;
        let mut evidence = 0usize;

        for token in self.tokenizer.tokenize(text) {
            let spam_count = self.spam_tokens.get(&token).copied().unwrap_or(0) as f64;
            let ham_count = self.ham_tokens.get(&token).copied().unwrap_or(0) as f64;

            // Words never seen in training carry no signal
            if spam_count == 0.0 && ham_count == 0.0 {
                continue;
            }

            // Laplace smoothing
            spam_score += ((spam_count + 1.0) / (self.spam_total as f64 + vocab)).ln();
            ham_score += ((ham_count + 1.0) / (self.ham_total as f64 + vocab)).ln();
            evidence += 1;
        }

        if evidence == 0 {
            return None;
        }

        Some(1.0 / (1.0 + (ham_score - spam_score).exp()))
    }

    /// Classify text; missing evidence fails open to `NotSpam`
    pub fn classify(&self, text: &str, threshold: f64) -> Verdict {
        let probability = self.spam_probability(text);
        let label = match probability {
            Some(p) if p >= threshold => Label::Spam,
            _ => Label::NotSpam,
        };

        Verdict {
            label,
            spam_probability: probability.unwrap_or(0.0),
            model_version: self.version,
        }
    }

    pub fn stats(&self) -> ModelStats {
        ModelStats {
            version: self.version,
            trained_at: self.trained_at,
            spam_examples: self.spam_docs,
            ham_examples: self.ham_docs,
            vocabulary: self.vocabulary,
        }
    }
}

impl Default for SpamModel {
    fn default() -> Self {
        Self::untrained()
    }
}
