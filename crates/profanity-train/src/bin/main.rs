//! CLI entry point for fine-tuning and evaluating the profanity classifier.
//!
//! Subcommands:
//!   train     -- Fine-tune the encoder and write checkpoints (default)
//!   evaluate  -- Score a checkpoint on the validation split

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use profanity_core::TrainingConfig;
use profanity_train::trainer;

#[derive(Parser)]
#[command(name = "profanity-train", about = "Profanity classifier training pipeline")]
struct Cli {
    /// YAML training configuration. Defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Fine-tune the pretrained encoder on the labelled CSV.
    Train {
        #[command(flatten)]
        overrides: Overrides,
    },

    /// Report accuracy and per-class metrics of a checkpoint.
    Evaluate {
        /// Checkpoint to score. Defaults to the final checkpoint in the output directory.
        #[arg(long)]
        checkpoint: Option<PathBuf>,

        #[command(flatten)]
        overrides: Overrides,
    },
}

/// Command-line values that take precedence over the config file.
#[derive(Args, Default)]
struct Overrides {
    /// Labelled CSV dataset.
    #[arg(long)]
    data: Option<PathBuf>,

    /// Directory for per-epoch and final checkpoints.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// HuggingFace model ID of the pretrained encoder.
    #[arg(long)]
    model_id: Option<String>,

    /// Local directory with config.json, tokenizer.json and model.safetensors.
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Number of epochs.
    #[arg(long)]
    epochs: Option<usize>,

    /// Mini-batch size.
    #[arg(long)]
    batch_size: Option<usize>,

    /// Peak learning rate.
    #[arg(long)]
    learning_rate: Option<f64>,

    /// Padding / truncation length in tokens.
    #[arg(long)]
    max_length: Option<usize>,

    /// Random seed for the split and shuffles.
    #[arg(long)]
    seed: Option<u64>,
}

impl Overrides {
    fn apply(self, config: &mut TrainingConfig) {
        if let Some(path) = self.data {
            config.data.path = path;
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        if let Some(id) = self.model_id {
            config.model.model_id = id;
        }
        if let Some(dir) = self.model_dir {
            config.model.model_dir = Some(dir);
        }
        if let Some(epochs) = self.epochs {
            config.epochs = epochs;
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(lr) = self.learning_rate {
            config.learning_rate = lr;
        }
        if let Some(max_length) = self.max_length {
            config.model.max_length = max_length;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading configuration from file");
            profanity_train::load_config(path)?
        }
        None => TrainingConfig::default(),
    };

    match cli.command.unwrap_or(Command::Train {
        overrides: Overrides::default(),
    }) {
        Command::Train { overrides } => {
            overrides.apply(&mut config);
            let outcome = trainer::run(&config).await?;
            if let Some(last) = outcome.epochs.last() {
                tracing::info!(
                    epoch = last.epoch + 1,
                    accuracy = last.evaluation.accuracy,
                    "Training finished"
                );
            }
            tracing::info!(path = %outcome.final_checkpoint.display(), "Final model saved");
        }
        Command::Evaluate {
            checkpoint,
            overrides,
        } => {
            overrides.apply(&mut config);
            let checkpoint = checkpoint.unwrap_or_else(|| {
                profanity_train::CheckpointStore::new(&config.output_dir).final_path()
            });
            let evaluation = trainer::evaluate_checkpoint(&config, &checkpoint).await?;
            println!("Accuracy: {:.4}", evaluation.accuracy);
            println!("{}", evaluation.report);
        }
    }

    Ok(())
}
