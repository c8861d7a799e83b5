//! Safetensors checkpoints written during and after training.

use std::path::{Path, PathBuf};

use candle_nn::VarMap;
use profanity_core::{ProfanityError, Result};

/// File name of the weights written after the last epoch.
pub const FINAL_CHECKPOINT: &str = "bert_classifier.safetensors";

/// Output directory for per-epoch and final checkpoints.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    /// Store rooted at `dir`; the directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `model_checkpoint_{epoch}.safetensors`, `epoch` 0-based.
    pub fn epoch_path(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("model_checkpoint_{epoch}.safetensors"))
    }

    /// Path of [`FINAL_CHECKPOINT`] inside the store.
    pub fn final_path(&self) -> PathBuf {
        self.dir.join(FINAL_CHECKPOINT)
    }

    /// Write the weights after `epoch` and return the written path.
    pub fn save_epoch(&self, varmap: &VarMap, epoch: usize) -> Result<PathBuf> {
        let path = self.epoch_path(epoch);
        self.save(varmap, &path)?;
        Ok(path)
    }

    /// Write the final weights and return the written path.
    pub fn save_final(&self, varmap: &VarMap) -> Result<PathBuf> {
        let path = self.final_path();
        self.save(varmap, &path)?;
        Ok(path)
    }

    fn save(&self, varmap: &VarMap, path: &Path) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        varmap.save(path).map_err(|e| {
            ProfanityError::Training(format!(
                "Failed to save checkpoint {}: {e}",
                path.display()
            ))
        })?;
        tracing::info!(path = %path.display(), "Saved checkpoint");
        Ok(())
    }
}
