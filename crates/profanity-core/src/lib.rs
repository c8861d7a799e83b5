//! Core types, traits, and errors for the profanity classifier.
//!
//! This crate holds the data model shared by the training pipeline, the
//! inference wrapper, and the HTTP service: labelled examples, the error
//! type, configuration, and the [`ProfanityClassifier`] seam the server
//! depends on.

use serde::{Deserialize, Serialize};

pub mod config;
pub mod window;

pub use config::{DataConfig, DevicePreference, ModelConfig, ServerConfig, TrainingConfig};
pub use window::{extract_words, keep_last_words, score_words, sliding_windows, WordScore};

// ---------------------------------------------------------------------------
// Labels and examples
// ---------------------------------------------------------------------------

/// Number of output classes of the sequence classifier.
pub const NUM_CLASSES: usize = 2;

/// Binary target of the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    /// Inoffensive text (class index 0).
    Clean,
    /// Profane or offensive text (class index 1).
    Offensive,
}

impl Label {
    /// Class index used by the classification head.
    #[must_use]
    pub fn index(self) -> u32 {
        match self {
            Self::Clean => 0,
            Self::Offensive => 1,
        }
    }

    /// Inverse of [`Label::index`].
    #[must_use]
    pub fn from_index(index: u32) -> Option<Self> {
        match index {
            0 => Some(Self::Clean),
            1 => Some(Self::Offensive),
            _ => None,
        }
    }

    /// Parse a raw dataset cell (`0`, `1`, `0.0`, `1.0`, `true`, `false`).
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "0" | "0.0" | "false" => Ok(Self::Clean),
            "1" | "1.0" | "true" => Ok(Self::Offensive),
            other => Err(ProfanityError::Data(format!(
                "Invalid label '{other}', expected 0 or 1"
            ))),
        }
    }

    /// Both labels in class-index order.
    #[must_use]
    pub fn all() -> [Self; NUM_CLASSES] {
        [Self::Clean, Self::Offensive]
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Clean => write!(f, "clean"),
            Self::Offensive => write!(f, "offensive"),
        }
    }
}

/// A single labelled training example.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    /// Raw text. Empty when the source cell was missing.
    pub text: String,
    /// Target label.
    pub label: Label,
}

impl Example {
    /// Create a new example.
    pub fn new(text: impl Into<String>, label: Label) -> Self {
        Self {
            text: text.into(),
            label,
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Core error types.
#[derive(thiserror::Error, Debug)]
pub enum ProfanityError {
    /// Model construction, weight loading, or forward pass failure.
    #[error("Model error: {0}")]
    Model(String),

    /// Tokenizer loading or encoding failure.
    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    /// Malformed or unusable dataset.
    #[error("Data error: {0}")]
    Data(String),

    /// Optimiser, loss, or checkpoint failure during training.
    #[error("Training error: {0}")]
    Training(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization / deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience alias for `std::result::Result<T, ProfanityError>`.
pub type Result<T> = std::result::Result<T, ProfanityError>;

// ---------------------------------------------------------------------------
// Classifier trait
// ---------------------------------------------------------------------------

/// Scores text for profanity.
///
/// Implemented by the fine-tuned transformer in `profanity-model`; the HTTP
/// service only sees this trait.
#[async_trait::async_trait]
pub trait ProfanityClassifier: Send + Sync {
    /// Probability in `[0, 1]` that `text` is offensive.
    async fn score(&self, text: &str) -> Result<f64>;

    /// Get the classifier name.
    fn name(&self) -> &'static str;

    /// Check that the classifier is ready to serve.
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }

    /// One-line latency summary of recent calls, if the classifier keeps one.
    fn latency_summary(&self) -> Option<String> {
        None
    }
}
