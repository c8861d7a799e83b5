//! Tokenizer setup with fixed-length padding and truncation.
//!
//! Training and inference both feed the encoder sequences of exactly
//! `max_length` tokens; the tokenizer is configured once so every encoding
//! already has that shape.

use std::path::Path;

use profanity_core::{ProfanityError, Result};
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

/// Padding token used when the tokenizer does not declare one.
const DEFAULT_PAD_TOKEN: &str = "[PAD]";

/// Token ids, attention mask and segment ids of one fixed-length encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedEncoding {
    /// Vocabulary ids, `[CLS] ... [SEP]` then padding.
    pub input_ids: Vec<u32>,
    /// 1 for real tokens, 0 for padding.
    pub attention_mask: Vec<u32>,
    /// Segment ids; all 0 for single-sentence input.
    pub token_type_ids: Vec<u32>,
}

impl FixedEncoding {
    /// Sequence length (equal to the configured `max_length`).
    #[must_use]
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }
}

/// Load a `tokenizer.json` and configure it for `max_length` tokens.
pub fn load_tokenizer(path: &Path, max_length: usize) -> Result<Tokenizer> {
    let mut tokenizer = Tokenizer::from_file(path).map_err(|e| {
        ProfanityError::Tokenizer(format!("Failed to load tokenizer {}: {e}", path.display()))
    })?;
    configure_fixed_length(&mut tokenizer, max_length)?;
    Ok(tokenizer)
}

/// Pad every encoding to exactly `max_length` tokens and truncate longer input.
///
/// Keeps the pad token declared by the tokenizer, if any.
pub fn configure_fixed_length(tokenizer: &mut Tokenizer, max_length: usize) -> Result<()> {
    if max_length == 0 {
        return Err(ProfanityError::Config("max_length must be > 0".to_string()));
    }

    let (pad_id, pad_token) = match tokenizer.get_padding() {
        Some(existing) => (existing.pad_id, existing.pad_token.clone()),
        None => (
            tokenizer.token_to_id(DEFAULT_PAD_TOKEN).unwrap_or(0),
            DEFAULT_PAD_TOKEN.to_string(),
        ),
    };

    tokenizer.with_padding(Some(PaddingParams {
        strategy: PaddingStrategy::Fixed(max_length),
        pad_id,
        pad_token,
        ..Default::default()
    }));
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length,
            ..Default::default()
        }))
        .map_err(|e| ProfanityError::Tokenizer(format!("Failed to configure truncation: {e}")))?;
    Ok(())
}

/// Encode one string with special tokens into a [`FixedEncoding`].
pub fn encode_fixed(tokenizer: &Tokenizer, text: &str) -> Result<FixedEncoding> {
    let encoding = tokenizer
        .encode(text, true)
        .map_err(|e| ProfanityError::Tokenizer(format!("Tokenization failed: {e}")))?;

    Ok(FixedEncoding {
        input_ids: encoding.get_ids().to_vec(),
        attention_mask: encoding.get_attention_mask().to_vec(),
        token_type_ids: encoding.get_type_ids().to_vec(),
    })
}
