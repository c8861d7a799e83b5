//! Tokenizing dataset adapter and mini-batch iteration.

use candle_core::{Device, Tensor};
use profanity_core::{Example, Label, ProfanityError, Result};
use profanity_model::encode_fixed;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokenizers::Tokenizer;

/// One tokenized example, padded to the tokenizer's fixed length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedExample {
    pub input_ids: Vec<u32>,
    pub attention_mask: Vec<u32>,
    pub token_type_ids: Vec<u32>,
    pub label: u32,
}

/// Labelled examples tokenized on access.
pub struct TextClassificationDataset {
    examples: Vec<Example>,
    tokenizer: Tokenizer,
}

impl TextClassificationDataset {
    /// `tokenizer` must already be configured for fixed-length output.
    pub fn new(examples: Vec<Example>, tokenizer: Tokenizer) -> Self {
        Self {
            examples,
            tokenizer,
        }
    }

    /// Number of examples.
    pub fn len(&self) -> usize {
        self.examples.len()
    }

    /// Whether there are no examples.
    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// Tokenize the example at `idx`. Empty text always gets label 0.
    pub fn get(&self, idx: usize) -> Result<EncodedExample> {
        let example = self.examples.get(idx).ok_or_else(|| {
            ProfanityError::Data(format!(
                "Index {idx} out of range for dataset of {}",
                self.examples.len()
            ))
        })?;

        let label = if example.text.is_empty() {
            Label::Clean
        } else {
            example.label
        };
        let enc = encode_fixed(&self.tokenizer, &example.text)?;
        Ok(EncodedExample {
            input_ids: enc.input_ids,
            attention_mask: enc.attention_mask,
            token_type_ids: enc.token_type_ids,
            label: label.index(),
        })
    }

    /// Tokenize several examples, in the order of `indices`.
    pub fn get_many(&self, indices: &[usize]) -> Result<Vec<EncodedExample>> {
        indices.iter().map(|&i| self.get(i)).collect()
    }
}

/// A stacked mini-batch. Token tensors are `[B, L]`, labels `[B]`, all `u32`.
#[derive(Debug, Clone)]
pub struct Batch {
    pub input_ids: Tensor,
    pub attention_mask: Tensor,
    pub token_type_ids: Tensor,
    pub labels: Tensor,
}

impl Batch {
    /// Stack encoded examples of equal length onto `device`.
    pub fn stack(items: &[EncodedExample], device: &Device) -> Result<Self> {
        let seq_len = items.first().map(|e| e.input_ids.len()).ok_or_else(|| {
            ProfanityError::Data("Cannot build an empty batch".to_string())
        })?;
        if let Some(bad) = items.iter().find(|e| e.input_ids.len() != seq_len) {
            return Err(ProfanityError::Data(format!(
                "Batch mixes sequence lengths {seq_len} and {}",
                bad.input_ids.len()
            )));
        }

        let rows = items.len();
        let matrix = |flat: Vec<u32>| -> Result<Tensor> {
            Tensor::from_vec(flat, (rows, seq_len), device)
                .map_err(|e| ProfanityError::Data(format!("Failed to build batch tensor: {e}")))
        };
        let labels: Vec<u32> = items.iter().map(|e| e.label).collect();

        Ok(Self {
            input_ids: matrix(flatten(items, |e| &e.input_ids))?,
            attention_mask: matrix(flatten(items, |e| &e.attention_mask))?,
            token_type_ids: matrix(flatten(items, |e| &e.token_type_ids))?,
            labels: Tensor::new(labels.as_slice(), device)
                .map_err(|e| ProfanityError::Data(format!("Failed to build label tensor: {e}")))?,
        })
    }
}

fn flatten<F>(items: &[EncodedExample], field: F) -> Vec<u32>
where
    F: Fn(&EncodedExample) -> &Vec<u32>,
{
    items.iter().flat_map(|e| field(e).iter().copied()).collect()
}

/// Mini-batch iterator over a dataset. Sequential until [`reshuffle`] is called.
///
/// [`reshuffle`]: BatchIterator::reshuffle
pub struct BatchIterator<'a> {
    dataset: &'a TextClassificationDataset,
    indices: Vec<usize>,
    batch_size: usize,
    pos: usize,
    device: Device,
}

impl<'a> BatchIterator<'a> {
    /// Iterate `dataset` in order, `batch_size` examples at a time.
    pub fn new(dataset: &'a TextClassificationDataset, batch_size: usize, device: &Device) -> Self {
        Self {
            dataset,
            indices: (0..dataset.len()).collect(),
            batch_size: batch_size.max(1),
            pos: 0,
            device: device.clone(),
        }
    }

    /// Shuffle for a new epoch with a seed derived from `seed + epoch`.
    pub fn reshuffle(&mut self, seed: u64, epoch: usize) {
        self.indices = (0..self.dataset.len()).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(epoch as u64));
        self.indices.shuffle(&mut rng);
        self.pos = 0;
    }

    /// Restart in the current order.
    pub fn reset(&mut self) {
        self.pos = 0;
    }

    /// Batches per pass, the last one possibly partial.
    pub fn num_batches(&self) -> usize {
        self.indices.len().div_ceil(self.batch_size)
    }
}

impl Iterator for BatchIterator<'_> {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.indices.len() {
            return None;
        }
        let end = (self.pos + self.batch_size).min(self.indices.len());
        let batch = self
            .dataset
            .get_many(&self.indices[self.pos..end])
            .and_then(|items| Batch::stack(&items, &self.device));
        self.pos = end;
        Some(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use profanity_model::fixtures::tiny_tokenizer;

    fn dataset(n: usize) -> TextClassificationDataset {
        let examples = (0..n)
            .map(|i| {
                if i % 2 == 0 {
                    Example::new("nice day friend", Label::Clean)
                } else {
                    Example::new("you stupid idiot", Label::Offensive)
                }
            })
            .collect();
        TextClassificationDataset::new(examples, tiny_tokenizer(6))
    }

    #[test]
    fn test_get_pads_and_labels() {
        let ds = dataset(2);
        let first = ds.get(0).unwrap();
        assert_eq!(first.input_ids.len(), 6);
        assert_eq!(first.attention_mask, vec![1, 1, 1, 0, 0, 0]);
        assert_eq!(first.label, 0);
        assert_eq!(ds.get(1).unwrap().label, 1);
    }

    #[test]
    fn test_get_out_of_range() {
        assert!(matches!(dataset(2).get(2), Err(ProfanityError::Data(_))));
    }

    #[test]
    fn test_empty_text_forces_clean_label() {
        let ds = TextClassificationDataset::new(
            vec![Example::new("", Label::Offensive)],
            tiny_tokenizer(4),
        );
        let item = ds.get(0).unwrap();
        assert_eq!(item.label, 0);
        assert!(item.attention_mask.iter().all(|&m| m == 0));
    }

    #[test]
    fn test_get_many_keeps_order() {
        let ds = dataset(4);
        let items = ds.get_many(&[3, 0]).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].label, 1);
        assert_eq!(items[1].label, 0);
    }

    #[test]
    fn test_batches_cover_dataset_once() {
        let ds = dataset(5);
        let iter = BatchIterator::new(&ds, 2, &Device::Cpu);
        assert_eq!(iter.num_batches(), 3);

        let batches: Vec<Batch> = iter.map(|b| b.unwrap()).collect();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].input_ids.dims(), &[2, 6]);
        assert_eq!(batches[2].input_ids.dims(), &[1, 6]);
        assert_eq!(batches[2].labels.dims(), &[1]);

        let labels: Vec<u32> = batches
            .iter()
            .flat_map(|b| b.labels.to_vec1::<u32>().unwrap())
            .collect();
        assert_eq!(labels, vec![0, 1, 0, 1, 0]);
    }

    #[test]
    fn test_reshuffle_is_seeded_per_epoch() {
        let ds = dataset(16);
        let order = |epoch: usize| -> Vec<usize> {
            let mut iter = BatchIterator::new(&ds, 4, &Device::Cpu);
            iter.reshuffle(42, epoch);
            iter.indices.clone()
        };
        assert_eq!(order(0), order(0));
        assert_ne!(order(0), order(1));

        let mut sorted = order(1);
        sorted.sort_unstable();
        assert_eq!(sorted, (0..16).collect::<Vec<_>>());
    }

    #[test]
    fn test_reset_restarts_iteration() {
        let ds = dataset(3);
        let mut iter = BatchIterator::new(&ds, 8, &Device::Cpu);
        assert!(iter.next().is_some());
        assert!(iter.next().is_none());
        iter.reset();
        assert!(iter.next().is_some());
    }

    #[test]
    fn test_stack_rejects_empty() {
        assert!(Batch::stack(&[], &Device::Cpu).is_err());
    }
}
