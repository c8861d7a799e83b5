//! Resolution of encoder files from a local directory or the HuggingFace Hub.

use std::path::{Path, PathBuf};

use profanity_core::{ModelConfig, ProfanityError, Result};

/// Encoder configuration file name.
pub const CONFIG_FILE: &str = "config.json";
/// Serialized tokenizer file name.
pub const TOKENIZER_FILE: &str = "tokenizer.json";
/// Pretrained weights file name.
pub const WEIGHTS_FILE: &str = "model.safetensors";

/// Paths to the files making up a pretrained encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFiles {
    /// `config.json` with the BERT hyperparameters.
    pub config: PathBuf,
    /// `tokenizer.json`.
    pub tokenizer: PathBuf,
    /// Pretrained `model.safetensors`; only resolved when requested.
    pub weights: Option<PathBuf>,
}

/// Locate `config.json`, `tokenizer.json` and optionally the pretrained weights.
///
/// A configured `model_dir` takes precedence and never touches the network.
/// Otherwise the files are downloaded (or served from cache) for `model_id`.
pub async fn resolve_model_files(config: &ModelConfig, with_weights: bool) -> Result<ModelFiles> {
    match &config.model_dir {
        Some(dir) => local_files(dir, with_weights),
        None => hub_files(config, with_weights).await,
    }
}

fn local_files(dir: &Path, with_weights: bool) -> Result<ModelFiles> {
    let existing = |name: &str| -> Result<PathBuf> {
        let path = dir.join(name);
        if path.is_file() {
            Ok(path)
        } else {
            Err(ProfanityError::Config(format!(
                "{} not found in model directory {}",
                name,
                dir.display()
            )))
        }
    };

    Ok(ModelFiles {
        config: existing(CONFIG_FILE)?,
        tokenizer: existing(TOKENIZER_FILE)?,
        weights: if with_weights {
            Some(existing(WEIGHTS_FILE)?)
        } else {
            None
        },
    })
}

async fn hub_files(config: &ModelConfig, with_weights: bool) -> Result<ModelFiles> {
    use hf_hub::api::tokio::{Api, ApiBuilder};
    use hf_hub::{Repo, RepoType};

    let api = match &config.cache_dir {
        Some(dir) => ApiBuilder::new().with_cache_dir(PathBuf::from(dir)).build(),
        None => Api::new(),
    }
    .map_err(|e| ProfanityError::Model(format!("Failed to create HF API client: {e}")))?;

    let repo = match &config.revision {
        Some(rev) => api.repo(Repo::with_revision(
            config.model_id.clone(),
            RepoType::Model,
            rev.clone(),
        )),
        None => api.model(config.model_id.clone()),
    };

    tracing::info!(model_id = %config.model_id, "Resolving model files from HuggingFace Hub");

    let config_path = repo
        .get(CONFIG_FILE)
        .await
        .map_err(|e| ProfanityError::Model(format!("Failed to download {CONFIG_FILE}: {e}")))?;
    let tokenizer_path = repo
        .get(TOKENIZER_FILE)
        .await
        .map_err(|e| ProfanityError::Model(format!("Failed to download {TOKENIZER_FILE}: {e}")))?;
    let weights = if with_weights {
        Some(repo.get(WEIGHTS_FILE).await.map_err(|e| {
            ProfanityError::Model(format!("Failed to download {WEIGHTS_FILE}: {e}"))
        })?)
    } else {
        None
    };

    Ok(ModelFiles {
        config: config_path,
        tokenizer: tokenizer_path,
        weights,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"{}").unwrap();
    }

    #[tokio::test]
    async fn test_local_dir_resolves_without_weights() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), CONFIG_FILE);
        touch(dir.path(), TOKENIZER_FILE);

        let config = ModelConfig {
            model_dir: Some(dir.path().to_path_buf()),
            ..ModelConfig::default()
        };
        let files = resolve_model_files(&config, false).await.unwrap();
        assert_eq!(files.config, dir.path().join(CONFIG_FILE));
        assert_eq!(files.tokenizer, dir.path().join(TOKENIZER_FILE));
        assert!(files.weights.is_none());
    }

    #[tokio::test]
    async fn test_local_dir_missing_weights_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), CONFIG_FILE);
        touch(dir.path(), TOKENIZER_FILE);

        let config = ModelConfig {
            model_dir: Some(dir.path().to_path_buf()),
            ..ModelConfig::default()
        };
        let err = resolve_model_files(&config, true).await.unwrap_err();
        assert!(matches!(err, ProfanityError::Config(_)));
        assert!(err.to_string().contains(WEIGHTS_FILE));
    }

    #[tokio::test]
    async fn test_local_dir_missing_tokenizer() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), CONFIG_FILE);

        let config = ModelConfig {
            model_dir: Some(dir.path().to_path_buf()),
            ..ModelConfig::default()
        };
        assert!(resolve_model_files(&config, false).await.is_err());
    }
}
