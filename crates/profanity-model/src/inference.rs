//! Inference wrapper around a fine-tuned checkpoint.
//!
//! [`ProfanityModel`] is constructed once at startup and then only read, so
//! the server shares it behind an `Arc`. Each call tokenizes a single string
//! and runs one forward pass.

use std::time::Instant;

use async_trait::async_trait;
use candle_core::{Device, Tensor, D};
use profanity_core::{ModelConfig, ProfanityClassifier, ProfanityError, Result, NUM_CLASSES};
use tokenizers::Tokenizer;

use crate::classifier::{parse_bert_config, BertSequenceClassifier};
use crate::device::select_device;
use crate::files::resolve_model_files;
use crate::inference_stats::{InferenceStats, InferenceStatsTracker};
use crate::tokenizer::{encode_fixed, load_tokenizer};

/// Fine-tuned BERT classifier ready to score text.
pub struct ProfanityModel {
    tokenizer: Tokenizer,
    classifier: BertSequenceClassifier,
    device: Device,
    max_length: usize,
    stats: InferenceStatsTracker,
}

impl ProfanityModel {
    /// Resolve the encoder files, then load the tokenizer and the checkpoint.
    ///
    /// # Errors
    ///
    /// Fails when any file cannot be found or parsed, or when the checkpoint
    /// does not match the encoder configuration.
    pub async fn load(config: &ModelConfig) -> Result<Self> {
        let files = resolve_model_files(config, false).await?;
        let bert_config = parse_bert_config(&files.config)?;
        let tokenizer = load_tokenizer(&files.tokenizer, config.max_length)?;
        let device = select_device(config.device)?;

        if !config.checkpoint_path.is_file() {
            return Err(ProfanityError::Config(format!(
                "Checkpoint {} does not exist",
                config.checkpoint_path.display()
            )));
        }
        let classifier = BertSequenceClassifier::from_checkpoint(
            &config.checkpoint_path,
            &bert_config,
            NUM_CLASSES,
            &device,
        )?;

        tracing::info!(
            model_id = %config.model_id,
            checkpoint = %config.checkpoint_path.display(),
            max_length = config.max_length,
            device = ?device,
            "Profanity model loaded"
        );

        Ok(Self::from_parts(tokenizer, classifier, device, config.max_length))
    }

    /// Assemble a model from already-loaded components.
    ///
    /// The tokenizer is expected to pad and truncate to `max_length`.
    #[must_use]
    pub fn from_parts(
        tokenizer: Tokenizer,
        classifier: BertSequenceClassifier,
        device: Device,
        max_length: usize,
    ) -> Self {
        Self {
            tokenizer,
            classifier,
            device,
            max_length,
            stats: InferenceStatsTracker::default(),
        }
    }

    /// Probability that `text` is offensive.
    pub fn predict(&self, text: &str) -> Result<f64> {
        let start = Instant::now();

        let encoding = encode_fixed(&self.tokenizer, text)?;
        let to_row = |values: &[u32]| -> Result<Tensor> {
            Tensor::new(values, &self.device)
                .and_then(|t| t.unsqueeze(0))
                .map_err(|e| ProfanityError::Model(format!("Failed to create input tensor: {e}")))
        };
        let input_ids = to_row(&encoding.input_ids)?;
        let token_type_ids = to_row(&encoding.token_type_ids)?;
        let attention_mask = to_row(&encoding.attention_mask)?;

        let logits = self
            .classifier
            .forward_t(&input_ids, &token_type_ids, &attention_mask, false)?;
        let probs: Vec<f32> = candle_nn::ops::softmax(&logits, D::Minus1)
            .and_then(|p| p.squeeze(0))
            .and_then(|p| p.to_vec1())
            .map_err(|e| ProfanityError::Model(format!("Failed to read probabilities: {e}")))?;

        let score = probs
            .get(1)
            .copied()
            .map(f64::from)
            .ok_or_else(|| ProfanityError::Model(format!("Expected 2 logits, got {}", probs.len())))?;

        let elapsed = start.elapsed();
        self.stats.record(elapsed);
        tracing::debug!(score, elapsed_ms = elapsed.as_secs_f64() * 1000.0, "Scored text");

        Ok(score)
    }

    /// Latency summary of recent [`predict`](Self::predict) calls.
    #[must_use]
    pub fn inference_stats(&self) -> Option<InferenceStats> {
        self.stats.stats()
    }

    /// Fixed sequence length fed to the encoder.
    #[must_use]
    pub fn max_length(&self) -> usize {
        self.max_length
    }
}

#[async_trait]
impl ProfanityClassifier for ProfanityModel {
    async fn score(&self, text: &str) -> Result<f64> {
        self.predict(text)
    }

    fn name(&self) -> &'static str {
        "ProfanityModel"
    }

    async fn health_check(&self) -> Result<()> {
        self.predict("").map(|_| ())
    }

    fn latency_summary(&self) -> Option<String> {
        self.inference_stats().map(|stats| stats.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{random_classifier, tiny_profanity_model, write_tiny_model_dir};

    #[test]
    fn test_score_is_probability() {
        let model = tiny_profanity_model(8);
        for text in ["hello friend", "you are a stupid idiot", "", "zebra crossing"] {
            let score = model.predict(text).unwrap();
            assert!((0.0..=1.0).contains(&score), "{text}: {score}");
        }
    }

    #[test]
    fn test_predict_is_deterministic() {
        let model = tiny_profanity_model(8);
        let a = model.predict("shut up you fool").unwrap();
        let b = model.predict("shut up you fool").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_predict_records_latency() {
        let model = tiny_profanity_model(8);
        assert!(model.inference_stats().is_none());
        model.predict("nice day").unwrap();
        model.predict("great").unwrap();
        assert_eq!(model.inference_stats().unwrap().total_calls, 2);
        assert_eq!(model.max_length(), 8);
    }

    #[tokio::test]
    async fn test_classifier_trait() {
        let model = tiny_profanity_model(8);
        let classifier: &dyn ProfanityClassifier = &model;
        assert_eq!(classifier.name(), "ProfanityModel");
        assert!(classifier.health_check().await.is_ok());
        let direct = model.predict("hello").unwrap();
        assert_eq!(classifier.score("hello").await.unwrap(), direct);
    }

    #[tokio::test]
    async fn test_latency_summary_through_trait() {
        let model = tiny_profanity_model(8);
        let classifier: &dyn ProfanityClassifier = &model;
        assert!(classifier.latency_summary().is_none());

        classifier.score("good morning").await.unwrap();
        classifier.score("you idiot").await.unwrap();
        let summary = classifier.latency_summary().unwrap();
        assert!(summary.starts_with("calls=2 "), "{summary}");
        assert!(summary.contains("p95="));
    }

    #[tokio::test]
    async fn test_load_from_local_dir_and_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        write_tiny_model_dir(dir.path());
        let checkpoint = dir.path().join("bert_classifier.safetensors");
        let (varmap, _) = random_classifier(&Device::Cpu);
        varmap.save(&checkpoint).unwrap();

        let config = ModelConfig {
            model_dir: Some(dir.path().to_path_buf()),
            checkpoint_path: checkpoint,
            max_length: 8,
            ..ModelConfig::default()
        };
        let model = ProfanityModel::load(&config).await.unwrap();
        let score = model.predict("hello you").unwrap();
        assert!((0.0..=1.0).contains(&score));
    }

    #[tokio::test]
    async fn test_load_missing_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        write_tiny_model_dir(dir.path());
        let config = ModelConfig {
            model_dir: Some(dir.path().to_path_buf()),
            checkpoint_path: dir.path().join("missing.safetensors"),
            max_length: 8,
            ..ModelConfig::default()
        };
        let err = ProfanityModel::load(&config).await.err().unwrap();
        assert!(matches!(err, ProfanityError::Config(_)));
    }
}
