//! Tiny models and tokenizers that need no download.
//!
//! Compiled for this crate's tests and, through the `fixtures` feature, for
//! the tests of the training pipeline and the HTTP service.

use std::str::FromStr;

use candle_core::Device;
use candle_nn::VarMap;
use candle_transformers::models::bert::Config as BertConfig;
use tokenizers::Tokenizer;

use crate::classifier::BertSequenceClassifier;
use crate::inference::ProfanityModel;
use crate::tokenizer::configure_fixed_length;

/// Vocabulary size of [`TINY_TOKENIZER_JSON`] and [`tiny_bert_config`].
pub const TINY_VOCAB_SIZE: usize = 16;

/// Maximum sequence length supported by [`tiny_bert_config`].
pub const TINY_MAX_POSITIONS: usize = 32;

/// Whitespace word-level tokenizer over a 16-word vocabulary.
pub const TINY_TOKENIZER_JSON: &str = r#"{
  "version": "1.0",
  "truncation": null,
  "padding": null,
  "added_tokens": [],
  "normalizer": { "type": "Lowercase" },
  "pre_tokenizer": { "type": "Whitespace" },
  "post_processor": null,
  "decoder": null,
  "model": {
    "type": "WordLevel",
    "vocab": {
      "[PAD]": 0, "[UNK]": 1, "hello": 2, "you": 3, "are": 4, "a": 5,
      "stupid": 6, "idiot": 7, "fool": 8, "nice": 9, "day": 10, "thanks": 11,
      "friend": 12, "great": 13, "shut": 14, "up": 15
    },
    "unk_token": "[UNK]"
  }
}"#;

/// A one-layer BERT with hidden size 8.
pub fn tiny_bert_config() -> BertConfig {
    serde_json::from_value(tiny_bert_config_json()).expect("valid tiny BERT config")
}

/// The raw `config.json` of [`tiny_bert_config`].
pub fn tiny_bert_config_json() -> serde_json::Value {
    serde_json::json!({
        "vocab_size": TINY_VOCAB_SIZE,
        "hidden_size": 8,
        "num_hidden_layers": 1,
        "num_attention_heads": 2,
        "intermediate_size": 16,
        "hidden_act": "gelu",
        "hidden_dropout_prob": 0.1,
        "max_position_embeddings": TINY_MAX_POSITIONS,
        "type_vocab_size": 2,
        "initializer_range": 0.02,
        "layer_norm_eps": 1e-12,
        "pad_token_id": 0,
        "model_type": "bert"
    })
}

/// [`TINY_TOKENIZER_JSON`] padded / truncated to `max_length`.
pub fn tiny_tokenizer(max_length: usize) -> Tokenizer {
    let mut tokenizer = Tokenizer::from_str(TINY_TOKENIZER_JSON).expect("valid tiny tokenizer");
    configure_fixed_length(&mut tokenizer, max_length).expect("fixed length");
    tokenizer
}

/// A randomly initialised, trainable tiny classifier with two labels.
pub fn random_classifier(device: &Device) -> (VarMap, BertSequenceClassifier) {
    let varmap = VarMap::new();
    let model = BertSequenceClassifier::new_trainable(&varmap, &tiny_bert_config(), 2, 0.1, device)
        .expect("tiny classifier");
    (varmap, model)
}

/// A ready [`ProfanityModel`] over a random tiny classifier on the CPU.
pub fn tiny_profanity_model(max_length: usize) -> ProfanityModel {
    let device = Device::Cpu;
    let (_varmap, classifier) = random_classifier(&device);
    ProfanityModel::from_parts(tiny_tokenizer(max_length), classifier, device, max_length)
}

/// Write `config.json` and `tokenizer.json` of the tiny model into `dir`.
pub fn write_tiny_model_dir(dir: &std::path::Path) {
    std::fs::write(
        dir.join(crate::files::CONFIG_FILE),
        tiny_bert_config_json().to_string(),
    )
    .expect("write config.json");
    std::fs::write(dir.join(crate::files::TOKENIZER_FILE), TINY_TOKENIZER_JSON)
        .expect("write tokenizer.json");
}
