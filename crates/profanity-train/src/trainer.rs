//! Fine-tuning loop for the BERT sequence classifier.
//!
//! [`run`] reproduces the full recipe: resolve the pretrained encoder, load
//! and split the CSV, train for a fixed number of epochs with AdamW under a
//! linear schedule, checkpoint after every epoch and report validation
//! metrics. There is no early stopping and no resume.

use std::path::{Path, PathBuf};

use candle_core::{Device, D};
use candle_nn::{AdamW, Optimizer, ParamsAdamW, VarMap};
use profanity_core::{ProfanityError, Result, TrainingConfig, NUM_CLASSES};
use profanity_model::{
    init_from_pretrained, load_tokenizer, parse_bert_config, resolve_model_files, select_device,
    BertSequenceClassifier,
};

use crate::checkpoint::CheckpointStore;
use crate::data::{load_csv, train_test_split, Split};
use crate::dataset::{Batch, BatchIterator, TextClassificationDataset};
use crate::metrics::ClassificationReport;
use crate::schedule::LinearSchedule;

/// Mean training loss over one pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochLoss {
    pub mean_loss: f64,
    pub steps: usize,
}

/// Accuracy and report of a validation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub accuracy: f64,
    pub report: ClassificationReport,
}

/// What happened in one epoch.
#[derive(Debug, Clone)]
pub struct EpochSummary {
    /// 0-based.
    pub epoch: usize,
    pub loss: EpochLoss,
    pub evaluation: Evaluation,
    pub checkpoint: PathBuf,
}

/// Result of a complete training run.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub epochs: Vec<EpochSummary>,
    pub final_checkpoint: PathBuf,
}

fn training_err(what: &str) -> impl Fn(candle_core::Error) -> ProfanityError + '_ {
    move |e| ProfanityError::Training(format!("{what}: {e}"))
}

/// One optimiser step per batch; the learning rate for step `n` is
/// `schedule.lr_at(n)` and `step` is advanced past the last batch.
pub fn train_epoch<I>(
    model: &BertSequenceClassifier,
    optimizer: &mut AdamW,
    schedule: &LinearSchedule,
    step: &mut usize,
    batches: I,
) -> Result<EpochLoss>
where
    I: IntoIterator<Item = Result<Batch>>,
{
    let mut total_loss = 0.0;
    let mut steps = 0usize;

    for batch in batches {
        let batch = batch?;
        let logits = model.forward_t(
            &batch.input_ids,
            &batch.token_type_ids,
            &batch.attention_mask,
            true,
        )?;
        let loss = candle_nn::loss::cross_entropy(&logits, &batch.labels)
            .map_err(training_err("Loss computation failed"))?;

        optimizer.set_learning_rate(schedule.lr_at(*step));
        optimizer
            .backward_step(&loss)
            .map_err(training_err("Backward step failed"))?;
        *step += 1;

        let loss_val = loss
            .to_scalar::<f32>()
            .map_err(training_err("Loss scalar failed"))?;
        total_loss += f64::from(loss_val);
        steps += 1;

        tracing::debug!(step = *step, loss = loss_val, "Training step");
    }

    Ok(EpochLoss {
        mean_loss: if steps > 0 {
            total_loss / steps as f64
        } else {
            0.0
        },
        steps,
    })
}

/// Predict every batch with dropout disabled and score against the labels.
pub fn evaluate<I>(model: &BertSequenceClassifier, batches: I) -> Result<Evaluation>
where
    I: IntoIterator<Item = Result<Batch>>,
{
    let mut predictions: Vec<u32> = Vec::new();
    let mut labels: Vec<u32> = Vec::new();

    for batch in batches {
        let batch = batch?;
        let logits = model
            .forward_t(
                &batch.input_ids,
                &batch.token_type_ids,
                &batch.attention_mask,
                false,
            )?
            .detach();
        let preds: Vec<u32> = logits
            .argmax(D::Minus1)
            .and_then(|p| p.to_vec1())
            .map_err(training_err("argmax failed"))?;
        let truth: Vec<u32> = batch
            .labels
            .to_vec1()
            .map_err(training_err("Failed to read labels"))?;
        predictions.extend(preds);
        labels.extend(truth);
    }

    let report = ClassificationReport::from_predictions(&predictions, &labels)?;
    Ok(Evaluation {
        accuracy: report.accuracy,
        report,
    })
}

/// Train `model` (whose parameters live in `varmap`) for `config.epochs`.
///
/// Writes `model_checkpoint_{epoch}.safetensors` after every epoch and the
/// final weights after the last, all under `config.output_dir`.
pub fn fit(
    model: &BertSequenceClassifier,
    varmap: &VarMap,
    train: &TextClassificationDataset,
    validation: &TextClassificationDataset,
    config: &TrainingConfig,
    device: &Device,
) -> Result<TrainingOutcome> {
    let mut train_batches = BatchIterator::new(train, config.batch_size, device);
    let mut val_batches = BatchIterator::new(validation, config.batch_size, device);

    let total_steps = train_batches.num_batches() * config.epochs;
    let schedule = LinearSchedule::new(config.learning_rate, config.warmup_steps, total_steps);
    let mut optimizer = AdamW::new(
        varmap.all_vars(),
        ParamsAdamW {
            lr: schedule.lr_at(0),
            weight_decay: config.weight_decay,
            ..Default::default()
        },
    )
    .map_err(training_err("Failed to create optimizer"))?;

    let store = CheckpointStore::new(&config.output_dir);
    tracing::info!(
        train = train.len(),
        validation = validation.len(),
        epochs = config.epochs,
        batch_size = config.batch_size,
        total_steps,
        lr = config.learning_rate,
        "Starting fine-tuning"
    );

    let mut step = 0usize;
    let mut epochs = Vec::with_capacity(config.epochs);
    for epoch in 0..config.epochs {
        train_batches.reshuffle(config.seed, epoch);
        let loss = train_epoch(model, &mut optimizer, &schedule, &mut step, &mut train_batches)?;
        let checkpoint = store.save_epoch(varmap, epoch)?;

        val_batches.reset();
        let evaluation = evaluate(model, &mut val_batches)?;
        tracing::info!(
            epoch = epoch + 1,
            train_loss = loss.mean_loss,
            steps = loss.steps,
            accuracy = evaluation.accuracy,
            "Epoch complete"
        );
        tracing::info!("Classification report:\n{}", evaluation.report);

        epochs.push(EpochSummary {
            epoch,
            loss,
            evaluation,
            checkpoint,
        });
    }

    let final_checkpoint = store.save_final(varmap)?;
    Ok(TrainingOutcome {
        epochs,
        final_checkpoint,
    })
}

fn load_split(config: &TrainingConfig) -> Result<Split> {
    let examples = load_csv(&config.data.path, &config.data)?;
    train_test_split(examples, config.validation_ratio, config.seed)
}

/// Run the full fine-tuning recipe described by `config`.
pub async fn run(config: &TrainingConfig) -> Result<TrainingOutcome> {
    config.validate()?;

    let files = resolve_model_files(&config.model, true).await?;
    let weights = files.weights.as_deref().ok_or_else(|| {
        ProfanityError::Config("Pretrained weights were not resolved".to_string())
    })?;
    let bert_config = parse_bert_config(&files.config)?;
    let tokenizer = load_tokenizer(&files.tokenizer, config.model.max_length)?;
    let device = select_device(config.model.device)?;

    let split = load_split(config)?;
    let train = TextClassificationDataset::new(split.train, tokenizer.clone());
    let validation = TextClassificationDataset::new(split.validation, tokenizer);

    let varmap = VarMap::new();
    let model = BertSequenceClassifier::new_trainable(
        &varmap,
        &bert_config,
        NUM_CLASSES,
        config.model.dropout,
        &device,
    )?;
    let init = init_from_pretrained(&varmap, weights, &device)?;
    if !init.missing.is_empty() {
        tracing::info!(missing = ?init.missing, "Newly initialised parameters");
    }

    fit(&model, &varmap, &train, &validation, config, &device)
}

/// Score a saved checkpoint on the validation split of `config`.
pub async fn evaluate_checkpoint(config: &TrainingConfig, checkpoint: &Path) -> Result<Evaluation> {
    config.validate()?;

    let files = resolve_model_files(&config.model, false).await?;
    let bert_config = parse_bert_config(&files.config)?;
    let tokenizer = load_tokenizer(&files.tokenizer, config.model.max_length)?;
    let device = select_device(config.model.device)?;

    let split = load_split(config)?;
    let validation = TextClassificationDataset::new(split.validation, tokenizer);
    let model = BertSequenceClassifier::from_checkpoint(checkpoint, &bert_config, NUM_CLASSES, &device)?;

    let evaluation = evaluate(
        &model,
        BatchIterator::new(&validation, config.batch_size, &device),
    )?;
    tracing::info!(
        checkpoint = %checkpoint.display(),
        accuracy = evaluation.accuracy,
        "Evaluation complete"
    );
    Ok(evaluation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use profanity_core::{Example, Label};
    use profanity_model::fixtures::{random_classifier, tiny_tokenizer, write_tiny_model_dir};
    use std::collections::HashMap;

    fn examples(n: usize) -> Vec<Example> {
        (0..n)
            .map(|i| {
                if i % 2 == 0 {
                    Example::new("thanks friend nice day", Label::Clean)
                } else {
                    Example::new("shut up you stupid idiot", Label::Offensive)
                }
            })
            .collect()
    }

    fn dataset(n: usize) -> TextClassificationDataset {
        TextClassificationDataset::new(examples(n), tiny_tokenizer(8))
    }

    fn snapshot(varmap: &VarMap) -> HashMap<String, Vec<f32>> {
        varmap
            .data()
            .lock()
            .unwrap()
            .iter()
            .map(|(name, var)| {
                let values: Vec<f32> = var.as_tensor().flatten_all().unwrap().to_vec1().unwrap();
                (name.clone(), values)
            })
            .collect()
    }

    fn optimizer(varmap: &VarMap, lr: f64) -> AdamW {
        AdamW::new(
            varmap.all_vars(),
            ParamsAdamW {
                lr,
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_train_epoch_updates_parameters() {
        let device = Device::Cpu;
        let (varmap, model) = random_classifier(&device);
        let ds = dataset(8);
        let before = snapshot(&varmap);

        let schedule = LinearSchedule::new(1e-2, 0, 4);
        let mut opt = optimizer(&varmap, schedule.lr_at(0));
        let mut step = 0;
        let loss = train_epoch(
            &model,
            &mut opt,
            &schedule,
            &mut step,
            BatchIterator::new(&ds, 4, &device),
        )
        .unwrap();

        assert_eq!(loss.steps, 2);
        assert_eq!(step, 2);
        assert!(loss.mean_loss.is_finite() && loss.mean_loss > 0.0);
        assert_ne!(before, snapshot(&varmap));
    }

    #[test]
    fn test_train_epoch_without_batches_changes_nothing() {
        let device = Device::Cpu;
        let (varmap, model) = random_classifier(&device);
        let before = snapshot(&varmap);

        let schedule = LinearSchedule::new(1e-2, 0, 0);
        let mut opt = optimizer(&varmap, 1e-2);
        let mut step = 0;
        let loss = train_epoch(&model, &mut opt, &schedule, &mut step, std::iter::empty()).unwrap();

        assert_eq!(loss.steps, 0);
        assert_eq!(loss.mean_loss, 0.0);
        assert_eq!(before, snapshot(&varmap));
    }

    #[test]
    fn test_evaluate_counts_every_example() {
        let device = Device::Cpu;
        let (_varmap, model) = random_classifier(&device);
        let ds = dataset(5);
        let eval = evaluate(&model, BatchIterator::new(&ds, 2, &device)).unwrap();

        assert_eq!(eval.report.total(), 5);
        assert_eq!(eval.report.class(Label::Clean).support, 3);
        assert_eq!(eval.report.class(Label::Offensive).support, 2);
        assert!((0.0..=1.0).contains(&eval.accuracy));
    }

    #[test]
    fn test_evaluate_is_deterministic() {
        let device = Device::Cpu;
        let (_varmap, model) = random_classifier(&device);
        let ds = dataset(6);
        let a = evaluate(&model, BatchIterator::new(&ds, 4, &device)).unwrap();
        let b = evaluate(&model, BatchIterator::new(&ds, 3, &device)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_fit_writes_checkpoints_per_epoch() {
        let device = Device::Cpu;
        let dir = tempfile::tempdir().unwrap();
        let (varmap, model) = random_classifier(&device);
        let config = TrainingConfig {
            output_dir: dir.path().to_path_buf(),
            epochs: 2,
            batch_size: 4,
            learning_rate: 1e-3,
            ..TrainingConfig::default()
        };

        let outcome = fit(&model, &varmap, &dataset(8), &dataset(4), &config, &device).unwrap();
        assert_eq!(outcome.epochs.len(), 2);
        assert_eq!(outcome.epochs[1].epoch, 1);
        assert_eq!(outcome.epochs[0].loss.steps, 2);
        assert!(dir.path().join("model_checkpoint_0.safetensors").is_file());
        assert!(dir.path().join("model_checkpoint_1.safetensors").is_file());
        assert_eq!(
            outcome.final_checkpoint,
            dir.path().join("bert_classifier.safetensors")
        );
        assert!(outcome.final_checkpoint.is_file());
    }

    #[test]
    fn test_fit_zero_epochs_keeps_parameters() {
        let device = Device::Cpu;
        let dir = tempfile::tempdir().unwrap();
        let (varmap, model) = random_classifier(&device);
        let before = snapshot(&varmap);
        let config = TrainingConfig {
            output_dir: dir.path().to_path_buf(),
            epochs: 0,
            ..TrainingConfig::default()
        };

        let outcome = fit(&model, &varmap, &dataset(4), &dataset(2), &config, &device).unwrap();
        assert!(outcome.epochs.is_empty());
        assert_eq!(before, snapshot(&varmap));
        assert!(outcome.final_checkpoint.is_file());
    }

    #[tokio::test]
    async fn test_run_and_evaluate_checkpoint_end_to_end() {
        let device = Device::Cpu;
        let dir = tempfile::tempdir().unwrap();
        let model_dir = dir.path().join("encoder");
        std::fs::create_dir_all(&model_dir).unwrap();
        write_tiny_model_dir(&model_dir);
        let (pretrained, _) = random_classifier(&device);
        pretrained
            .save(model_dir.join(profanity_model::files::WEIGHTS_FILE))
            .unwrap();

        let csv_path = dir.path().join("data.csv");
        let mut csv = String::from("text,is_offensive\n");
        for e in examples(10) {
            csv.push_str(&format!("{},{}\n", e.text, e.label.index()));
        }
        std::fs::write(&csv_path, csv).unwrap();

        let mut config = TrainingConfig {
            output_dir: dir.path().join("out"),
            epochs: 1,
            batch_size: 4,
            ..TrainingConfig::default()
        };
        config.model.model_dir = Some(model_dir);
        config.model.max_length = 8;
        config.data.path = csv_path;

        let outcome = run(&config).await.unwrap();
        assert_eq!(outcome.epochs.len(), 1);
        assert_eq!(outcome.epochs[0].evaluation.report.total(), 2);

        let eval = evaluate_checkpoint(&config, &outcome.final_checkpoint)
            .await
            .unwrap();
        assert_eq!(eval.report.total(), 2);
    }

    #[tokio::test]
    async fn test_run_rejects_invalid_config() {
        let config = TrainingConfig {
            batch_size: 0,
            ..TrainingConfig::default()
        };
        assert!(matches!(
            run(&config).await,
            Err(ProfanityError::Config(_))
        ));
    }
}
