//! BERT encoder with a pooler and a linear sequence-classification head.
//!
//! Parameters follow the HuggingFace `BertForSequenceClassification` naming
//! (`bert.*`, `bert.pooler.dense.*`, `classifier.*`), so checkpoints written
//! by the trainer load back through the same constructor used at inference
//! time. The logits are `classifier(dropout(tanh(pooler(h[CLS]))))`.

use std::path::Path;

use candle_core::{DType, Device, IndexOp, Tensor};
use candle_nn::{Dropout, VarBuilder, VarMap};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use profanity_core::{ProfanityError, Result};

/// Pretrained encoder plus pooler, dropout and a linear head.
pub struct BertSequenceClassifier {
    bert: BertModel,
    pooler: candle_nn::Linear,
    dropout: Dropout,
    classifier: candle_nn::Linear,
    num_labels: usize,
}

impl BertSequenceClassifier {
    /// Build the classifier from a [`VarBuilder`] rooted at the checkpoint.
    ///
    /// With a `VarMap`-backed builder the parameters are created (randomly
    /// initialised) and become trainable.
    pub fn load(
        vb: VarBuilder,
        config: &BertConfig,
        num_labels: usize,
        dropout: f32,
    ) -> Result<Self> {
        let encoder_vb = vb.pp("bert");
        let bert = BertModel::load(encoder_vb.clone(), config)
            .map_err(|e| ProfanityError::Model(format!("Failed to load BERT encoder: {e}")))?;
        let pooler = candle_nn::linear(
            config.hidden_size,
            config.hidden_size,
            encoder_vb.pp("pooler").pp("dense"),
        )
        .map_err(|e| ProfanityError::Model(format!("Failed to load BERT pooler: {e}")))?;
        let classifier = candle_nn::linear(config.hidden_size, num_labels, vb.pp("classifier"))
            .map_err(|e| ProfanityError::Model(format!("Failed to load classifier head: {e}")))?;

        Ok(Self {
            bert,
            pooler,
            dropout: Dropout::new(dropout),
            classifier,
            num_labels,
        })
    }

    /// Create a trainable classifier whose parameters live in `varmap`.
    pub fn new_trainable(
        varmap: &VarMap,
        config: &BertConfig,
        num_labels: usize,
        dropout: f32,
        device: &Device,
    ) -> Result<Self> {
        let vb = VarBuilder::from_varmap(varmap, DType::F32, device);
        Self::load(vb, config, num_labels, dropout)
    }

    /// Load fine-tuned weights from a safetensors checkpoint for inference.
    pub fn from_checkpoint(
        path: &Path,
        config: &BertConfig,
        num_labels: usize,
        device: &Device,
    ) -> Result<Self> {
        // SAFETY: checkpoints are written once by the trainer and never
        // modified while a model holds the mapping.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[path], DType::F32, device).map_err(|e| {
                ProfanityError::Model(format!(
                    "Failed to load checkpoint {}: {e}",
                    path.display()
                ))
            })?
        };
        Self::load(vb, config, num_labels, 0.0)
    }

    /// Number of output logits.
    #[must_use]
    pub fn num_labels(&self) -> usize {
        self.num_labels
    }

    /// Raw logits of shape `[batch, num_labels]`.
    ///
    /// `train` enables dropout on the pooled state.
    pub fn forward_t(
        &self,
        input_ids: &Tensor,
        token_type_ids: &Tensor,
        attention_mask: &Tensor,
        train: bool,
    ) -> Result<Tensor> {
        let logits = (|| {
            let hidden = self
                .bert
                .forward(input_ids, token_type_ids, Some(attention_mask))?;
            // [CLS] token is at position 0
            let cls_output = hidden.i((.., 0))?;
            let pooled = candle_nn::Module::forward(&self.pooler, &cls_output)?.tanh()?;
            let pooled = self.dropout.forward(&pooled, train)?;
            candle_nn::Module::forward(&self.classifier, &pooled)
        })();
        logits.map_err(|e| ProfanityError::Model(format!("Forward pass failed: {e}")))
    }
}

/// Parse a BERT `config.json` file.
pub fn parse_bert_config(path: &Path) -> Result<BertConfig> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|e| {
        ProfanityError::Model(format!("Invalid BERT config {}: {e}", path.display()))
    })
}

// ---------------------------------------------------------------------------
// Pretrained initialisation
// ---------------------------------------------------------------------------

/// Outcome of copying pretrained weights into a trainable variable map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PretrainedInit {
    /// Number of variables overwritten with pretrained values.
    pub loaded: usize,
    /// Variables absent from the pretrained file, left at their random init.
    pub missing: Vec<String>,
}

/// Copy pretrained weights into every matching variable of `varmap`.
///
/// Variables without a pretrained counterpart (the classification head when
/// starting from a bare encoder) keep their initial values. A shape or dtype
/// conversion failure aborts.
pub fn init_from_pretrained(varmap: &VarMap, weights: &Path, device: &Device) -> Result<PretrainedInit> {
    let pretrained = candle_core::safetensors::load(weights, device).map_err(|e| {
        ProfanityError::Model(format!(
            "Failed to read pretrained weights {}: {e}",
            weights.display()
        ))
    })?;

    let vars = varmap
        .data()
        .lock()
        .map_err(|_| ProfanityError::Model("Variable map lock poisoned".to_string()))?;

    let mut loaded = 0usize;
    let mut missing = Vec::new();
    for (name, var) in vars.iter() {
        let source = pretrained_key_candidates(name)
            .iter()
            .find_map(|key| pretrained.get(key));
        match source {
            Some(tensor) => {
                tensor
                    .to_dtype(var.dtype())
                    .and_then(|t| var.set(&t))
                    .map_err(|e| {
                        ProfanityError::Model(format!("Failed to initialise {name}: {e}"))
                    })?;
                loaded += 1;
            }
            None => missing.push(name.clone()),
        }
    }
    missing.sort();

    tracing::info!(
        loaded,
        missing = missing.len(),
        "Initialised classifier from pretrained weights"
    );
    Ok(PretrainedInit { loaded, missing })
}

/// Names a variable may carry in a pretrained checkpoint.
///
/// Covers bare-encoder files without the `bert.` prefix and legacy
/// `LayerNorm.gamma` / `LayerNorm.beta` naming.
fn pretrained_key_candidates(name: &str) -> Vec<String> {
    let mut bases = vec![name.to_string()];
    if let Some(stripped) = name.strip_prefix("bert.") {
        bases.push(stripped.to_string());
    }

    let mut candidates = bases.clone();
    for base in &bases {
        if let Some(prefix) = base.strip_suffix("LayerNorm.weight") {
            candidates.push(format!("{prefix}LayerNorm.gamma"));
        } else if let Some(prefix) = base.strip_suffix("LayerNorm.bias") {
            candidates.push(format!("{prefix}LayerNorm.beta"));
        }
    }
    candidates
}
