//! Configuration types for training, inference, and serving.
//!
//! Every struct carries the hyperparameters of the reference fine-tuning
//! recipe as its `Default`, so an empty YAML document reproduces it.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{ProfanityError, Result};

/// Default pretrained encoder on the Hugging Face Hub.
pub const DEFAULT_MODEL_ID: &str = "bert-base-uncased";

/// Default maximum sequence length (tokens) for padding and truncation.
pub const DEFAULT_MAX_LENGTH: usize = 128;

/// Default sliding-window size, in words, for per-word scoring.
pub const DEFAULT_WINDOW_SIZE: usize = 8;

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// Which compute device to run the encoder on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePreference {
    /// First usable accelerator compiled in, else CPU.
    #[default]
    Auto,
    /// Always the CPU.
    Cpu,
    /// CUDA device 0; requires the `cuda` feature.
    Cuda,
    /// Metal device 0; requires the `metal` feature.
    Metal,
}

/// Where the encoder comes from and how inputs are shaped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// HuggingFace model ID used for `config.json`, `tokenizer.json`, and
    /// (when training) the pretrained `model.safetensors`.
    pub model_id: String,
    /// Optional Hub revision (branch, tag, or commit).
    pub revision: Option<String>,
    /// Optional cache directory for downloaded models.
    pub cache_dir: Option<String>,
    /// Local directory containing `config.json` and `tokenizer.json`.
    /// When set, the Hub is not contacted.
    pub model_dir: Option<PathBuf>,
    /// Fine-tuned weights loaded for inference.
    pub checkpoint_path: PathBuf,
    /// Fixed padding / truncation length.
    pub max_length: usize,
    /// Dropout probability applied to the pooler output during training.
    pub dropout: f32,
    /// Compute device.
    pub device: DevicePreference,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL_ID.to_string(),
            revision: None,
            cache_dir: None,
            model_dir: None,
            checkpoint_path: PathBuf::from("data/bert_classifier.safetensors"),
            max_length: DEFAULT_MAX_LENGTH,
            dropout: 0.1,
            device: DevicePreference::Auto,
        }
    }
}

// ---------------------------------------------------------------------------
// Data
// ---------------------------------------------------------------------------

/// Location and shape of the labelled CSV dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Path to the CSV file.
    pub path: PathBuf,
    /// Header name of the text column.
    pub text_column: String,
    /// Header name of the binary label column.
    pub label_column: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/data.csv"),
            text_column: "text".to_string(),
            label_column: "is_offensive".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Training
// ---------------------------------------------------------------------------

/// Fine-tuning hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Encoder and tokenizer settings.
    pub model: ModelConfig,
    /// Dataset settings.
    pub data: DataConfig,
    /// Directory receiving per-epoch and final checkpoints.
    pub output_dir: PathBuf,
    /// Mini-batch size.
    pub batch_size: usize,
    /// Number of passes over the training split.
    pub epochs: usize,
    /// Peak AdamW learning rate.
    pub learning_rate: f64,
    /// AdamW decoupled weight decay.
    pub weight_decay: f64,
    /// Linear warm-up steps before the decay starts.
    pub warmup_steps: usize,
    /// Fraction of examples held out for validation.
    pub validation_ratio: f64,
    /// Seed for the split and the per-epoch shuffles.
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            data: DataConfig::default(),
            output_dir: PathBuf::from("data"),
            batch_size: 16,
            epochs: 4,
            learning_rate: 2e-5,
            weight_decay: 0.01,
            warmup_steps: 0,
            validation_ratio: 0.2,
            seed: 42,
        }
    }
}

impl TrainingConfig {
    /// Reject hyperparameters the training loop cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(ProfanityError::Config("batch_size must be > 0".to_string()));
        }
        if self.model.max_length == 0 {
            return Err(ProfanityError::Config("max_length must be > 0".to_string()));
        }
        let ratio = self.validation_ratio;
        if ratio.is_nan() || ratio <= 0.0 || ratio >= 1.0 {
            return Err(ProfanityError::Config(format!(
                "validation_ratio must be in (0, 1), got {ratio}"
            )));
        }
        if self.learning_rate <= 0.0 || self.learning_rate.is_nan() {
            return Err(ProfanityError::Config(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// Configuration for the HTTP service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address and port to bind to.
    pub listen_addr: String,
    /// Allow cross-origin requests from any origin.
    pub cors_enabled: bool,
    /// Default window size for `/profanity/words`.
    pub window_size: usize,
    /// Score only the last `max_words` words on `/profanity/words`, like the
    /// rolling transcript buffer of a live session. Unbounded when unset.
    pub max_words: Option<usize>,
    /// Model to serve.
    pub model: ModelConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            cors_enabled: true,
            window_size: DEFAULT_WINDOW_SIZE,
            max_words: None,
            model: ModelConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_training_defaults_match_recipe() {
        let cfg = TrainingConfig::default();
        assert_eq!(cfg.batch_size, 16);
        assert_eq!(cfg.epochs, 4);
        assert!((cfg.learning_rate - 2e-5).abs() < 1e-12);
        assert_eq!(cfg.warmup_steps, 0);
        assert!((cfg.validation_ratio - 0.2).abs() < f64::EPSILON);
        assert_eq!(cfg.seed, 42);
        assert_eq!(cfg.model.max_length, 128);
        assert_eq!(cfg.data.label_column, "is_offensive");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cfg = TrainingConfig {
            batch_size: 0,
            ..TrainingConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = TrainingConfig {
            validation_ratio: 1.0,
            ..TrainingConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = TrainingConfig {
            learning_rate: 0.0,
            ..TrainingConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_server_partial_yaml_fills_defaults() {
        let yaml = r#"
listen_addr: "127.0.0.1:9000"
model:
  checkpoint_path: "/models/final.safetensors"
"#;
        let cfg: ServerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.listen_addr, "127.0.0.1:9000");
        assert!(cfg.cors_enabled);
        assert_eq!(cfg.window_size, DEFAULT_WINDOW_SIZE);
        assert_eq!(
            cfg.model.checkpoint_path,
            PathBuf::from("/models/final.safetensors")
        );
        assert_eq!(cfg.model.model_id, DEFAULT_MODEL_ID);
        assert_eq!(cfg.model.device, DevicePreference::Auto);
    }

    #[test]
    fn test_device_preference_lowercase() {
        let cfg: ModelConfig = serde_yaml::from_str("device: cpu").unwrap();
        assert_eq!(cfg.device, DevicePreference::Cpu);
        assert!(serde_yaml::from_str::<ModelConfig>("device: tpu").is_err());
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let cfg: TrainingConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(cfg, TrainingConfig::default());
    }
}
