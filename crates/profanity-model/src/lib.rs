//! Transformer sequence classification for profanity scoring.
//!
//! A pretrained BERT encoder with a linear head over the `[CLS]` state,
//! run locally through the Candle framework. [`ProfanityModel`] is the
//! inference wrapper the HTTP service serves; [`BertSequenceClassifier`] is
//! shared with the training pipeline.
//!
//! # Features
//!
//! * `cuda` / `metal`: accelerator backends, chosen through [`select_device`].
//! * `fixtures`: tiny random models for tests in dependent crates.

pub mod classifier;
pub mod device;
pub mod files;
pub mod inference;
pub mod inference_stats;
pub mod tokenizer;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

pub use classifier::{init_from_pretrained, parse_bert_config, BertSequenceClassifier, PretrainedInit};
pub use device::select_device;
pub use files::{resolve_model_files, ModelFiles};
pub use inference::ProfanityModel;
pub use inference_stats::{InferenceStats, InferenceStatsTracker};
pub use tokenizer::{configure_fixed_length, encode_fixed, load_tokenizer, FixedEncoding};
