//! CSV loading and the seeded train/validation split.

use std::path::Path;

use profanity_core::{DataConfig, Example, Label, ProfanityError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Training and validation partitions of a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<Example>,
    pub validation: Vec<Example>,
}

/// Read labelled examples from the CSV at `path`.
///
/// Rows with an empty or missing text cell are kept as empty clean examples,
/// whatever their label cell holds.
pub fn load_csv(path: &Path, config: &DataConfig) -> Result<Vec<Example>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| ProfanityError::Data(format!("Failed to open {}: {e}", path.display())))?;

    let headers = reader
        .headers()
        .map_err(|e| ProfanityError::Data(format!("Failed to read CSV header: {e}")))?
        .clone();
    let column = |name: &str| -> Result<usize> {
        headers.iter().position(|h| h.trim() == name).ok_or_else(|| {
            ProfanityError::Data(format!(
                "Column '{name}' not found in {}",
                path.display()
            ))
        })
    };
    let text_idx = column(&config.text_column)?;
    let label_idx = column(&config.label_column)?;

    let mut examples = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let row = i + 1;
        let record =
            record.map_err(|e| ProfanityError::Data(format!("Record {row}: {e}")))?;

        let text = record.get(text_idx).unwrap_or_default();
        if text.is_empty() {
            examples.push(Example::new("", Label::Clean));
            continue;
        }
        let label = Label::parse(record.get(label_idx).unwrap_or_default())
            .map_err(|e| ProfanityError::Data(format!("Record {row}: {e}")))?;
        examples.push(Example::new(text, label));
    }

    let offensive = examples
        .iter()
        .filter(|e| e.label == Label::Offensive)
        .count();
    tracing::info!(
        path = %path.display(),
        examples = examples.len(),
        offensive,
        "Loaded dataset"
    );
    Ok(examples)
}

/// Shuffle `examples` with a seeded RNG and hold out `ceil(n * test_ratio)`.
pub fn train_test_split(examples: Vec<Example>, test_ratio: f64, seed: u64) -> Result<Split> {
    if test_ratio.is_nan() || test_ratio <= 0.0 || test_ratio >= 1.0 {
        return Err(ProfanityError::Config(format!(
            "test_ratio must be in (0, 1), got {test_ratio}"
        )));
    }

    let n = examples.len();
    let n_test = (n as f64 * test_ratio).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(ProfanityError::Data(format!(
            "Cannot split {n} examples with test_ratio {test_ratio}: one side would be empty"
        )));
    }

    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let mut slots: Vec<Option<Example>> = examples.into_iter().map(Some).collect();
    let mut take = |idx: &[usize]| -> Vec<Example> {
        idx.iter().filter_map(|&i| slots[i].take()).collect()
    };
    let validation = take(&order[..n_test]);
    let train = take(&order[n_test..]);

    tracing::info!(
        train = train.len(),
        validation = validation.len(),
        seed,
        "Split dataset"
    );
    Ok(Split { train, validation })
}
