//! YAML loading of [`TrainingConfig`].

use std::path::Path;

use profanity_core::{ProfanityError, Result, TrainingConfig};

/// Load a [`TrainingConfig`] from a YAML file. Missing keys take defaults.
pub fn load_config(path: &Path) -> Result<TrainingConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        ProfanityError::Config(format!(
            "Failed to read config file {}: {e}",
            path.display()
        ))
    })?;
    serde_yaml::from_str(&contents)
        .map_err(|e| ProfanityError::Config(format!("Failed to parse config YAML: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_yaml(yaml: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(yaml.as_bytes()).unwrap();
        f
    }

    #[test]
    fn test_load_config_overrides_selected_fields() {
        let f = write_yaml(
            r#"
epochs: 2
learning_rate: 3.0e-5
output_dir: "/tmp/checkpoints"
model:
  model_id: "bert-base-cased"
  max_length: 64
data:
  path: "comments.csv"
  label_column: "label"
"#,
        );
        let config = load_config(f.path()).unwrap();
        assert_eq!(config.epochs, 2);
        assert!((config.learning_rate - 3e-5).abs() < 1e-12);
        assert_eq!(config.model.model_id, "bert-base-cased");
        assert_eq!(config.model.max_length, 64);
        assert_eq!(config.data.label_column, "label");
        assert_eq!(config.data.text_column, "text");
        assert_eq!(config.batch_size, 16);
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config(Path::new("/nonexistent/train.yaml")).unwrap_err();
        assert!(matches!(err, ProfanityError::Config(_)));
    }

    #[test]
    fn test_load_config_invalid_yaml() {
        let f = write_yaml("epochs: [not, a, number]");
        assert!(load_config(f.path()).is_err());
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/train.yaml");
        assert_eq!(load_config(&path).unwrap(), TrainingConfig::default());
    }
}
