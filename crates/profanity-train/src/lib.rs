//! Fine-tuning pipeline for the profanity classifier.
//!
//! Loads a labelled CSV, splits it, tokenizes on the fly, and fine-tunes a
//! pretrained BERT encoder with a linear head. Per-epoch checkpoints and a
//! validation report are produced along the way.

pub mod checkpoint;
pub mod config;
pub mod data;
pub mod dataset;
pub mod metrics;
pub mod schedule;
pub mod trainer;

pub use checkpoint::CheckpointStore;
pub use config::load_config;
pub use data::{load_csv, train_test_split, Split};
pub use dataset::{Batch, BatchIterator, EncodedExample, TextClassificationDataset};
pub use metrics::{ClassMetrics, ClassificationReport};
pub use schedule::LinearSchedule;
pub use trainer::{evaluate, evaluate_checkpoint, fit, run, train_epoch, Evaluation, TrainingOutcome};
