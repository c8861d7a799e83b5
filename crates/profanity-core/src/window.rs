//! Sliding-window word scoring.
//!
//! The classifier scores whole sequences. To attribute a score to individual
//! words, the text is cut into overlapping windows of `size` words; every word
//! accumulates the (rounded) score of each window it appears in.

use serde::{Deserialize, Serialize};

use crate::{ProfanityClassifier, Result};

/// Accumulated profanity score of one word, in text order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordScore {
    /// Lower-cased word.
    pub word: String,
    /// Sum of the rounded scores of every window containing this word.
    pub profanity: f64,
}

/// A run of consecutive words handed to the classifier as one sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    /// Index of the first word of the window.
    pub start: usize,
    /// Number of words in the window.
    pub len: usize,
    /// Words joined by single spaces.
    pub text: String,
}

/// Split `text` into lower-cased runs of word characters
/// (alphanumerics and `_`).
#[must_use]
pub fn extract_words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Windows of `size` words stepping by one word.
///
/// Fewer words than `size` (but at least one) yield a single window over all
/// of them. A `size` of zero yields nothing.
#[must_use]
pub fn sliding_windows(words: &[String], size: usize) -> Vec<Window> {
    if size == 0 || words.is_empty() {
        return Vec::new();
    }
    let size = size.min(words.len());
    (0..=words.len() - size)
        .map(|start| Window {
            start,
            len: size,
            text: words[start..start + size].join(" "),
        })
        .collect()
}

/// Keep at most the last `n` whitespace-separated words of `s`.
///
/// Input with `n` words or fewer is returned untouched, including its
/// spacing as given.
#[must_use]
pub fn keep_last_words(s: &str, n: usize) -> String {
    let words: Vec<&str> = s.split_whitespace().collect();
    if words.len() <= n {
        return s.to_string();
    }
    words[words.len() - n..].join(" ")
}

/// Score every word of `text` by sliding a `size`-word window over it.
pub async fn score_words(
    classifier: &dyn ProfanityClassifier,
    text: &str,
    size: usize,
) -> Result<Vec<WordScore>> {
    let words = extract_words(text);
    let mut scores: Vec<WordScore> = words
        .iter()
        .map(|w| WordScore {
            word: w.clone(),
            profanity: 0.0,
        })
        .collect();

    for window in sliding_windows(&words, size) {
        let score = round2(classifier.score(&window.text).await?);
        tracing::debug!(start = window.start, text = %window.text, score, "Scored window");
        for entry in &mut scores[window.start..window.start + window.len] {
            entry.profanity += score;
        }
    }

    Ok(scores)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
