//! Per-class precision, recall and F1 from predicted and true labels.
//!
//! Ratios with a zero denominator are reported as 0.

use profanity_core::{Label, ProfanityError, Result, NUM_CLASSES};

/// Precision, recall, F1 and support of one class or one average.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Text-report-style summary of a validation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    /// Indexed by class (`Label::index`).
    pub classes: [ClassMetrics; NUM_CLASSES],
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
    /// `confusion[true][predicted]`.
    pub confusion: [[usize; NUM_CLASSES]; NUM_CLASSES],
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

fn f1(precision: f64, recall: f64) -> f64 {
    if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    }
}

impl ClassificationReport {
    /// Build the report from class indices.
    pub fn from_predictions(predictions: &[u32], labels: &[u32]) -> Result<Self> {
        if predictions.len() != labels.len() {
            return Err(ProfanityError::Data(format!(
                "{} predictions for {} labels",
                predictions.len(),
                labels.len()
            )));
        }

        let mut confusion = [[0usize; NUM_CLASSES]; NUM_CLASSES];
        for (&pred, &truth) in predictions.iter().zip(labels) {
            let (p, t) = (pred as usize, truth as usize);
            if p >= NUM_CLASSES || t >= NUM_CLASSES {
                return Err(ProfanityError::Data(format!(
                    "Class index out of range: predicted {pred}, true {truth}"
                )));
            }
            confusion[t][p] += 1;
        }

        let total = labels.len();
        let classes: [ClassMetrics; NUM_CLASSES] = std::array::from_fn(|c| {
            let tp = confusion[c][c];
            let predicted: usize = (0..NUM_CLASSES).map(|t| confusion[t][c]).sum();
            let support: usize = confusion[c].iter().sum();
            let precision = ratio(tp, predicted);
            let recall = ratio(tp, support);
            ClassMetrics {
                precision,
                recall,
                f1: f1(precision, recall),
                support,
            }
        });

        let correct: usize = (0..NUM_CLASSES).map(|c| confusion[c][c]).sum();
        let average = |weight: &dyn Fn(&ClassMetrics) -> f64| -> ClassMetrics {
            let norm: f64 = classes.iter().map(weight).sum();
            let mean = |field: fn(&ClassMetrics) -> f64| -> f64 {
                if norm == 0.0 {
                    0.0
                } else {
                    classes.iter().map(|m| field(m) * weight(m)).sum::<f64>() / norm
                }
            };
            ClassMetrics {
                precision: mean(|m| m.precision),
                recall: mean(|m| m.recall),
                f1: mean(|m| m.f1),
                support: total,
            }
        };

        let macro_avg = average(&|_| 1.0);
        let weighted_avg = average(&|m| m.support as f64);

        Ok(Self {
            classes,
            accuracy: ratio(correct, total),
            macro_avg,
            weighted_avg,
            confusion,
        })
    }

    /// Metrics of one label.
    pub fn class(&self, label: Label) -> &ClassMetrics {
        &self.classes[label.index() as usize]
    }

    /// Number of evaluated examples.
    pub fn total(&self) -> usize {
        self.macro_avg.support
    }
}

impl std::fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        const W: usize = 12; // len("weighted avg")
        writeln!(
            f,
            "{:>W$}  {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;

        let row = |f: &mut std::fmt::Formatter<'_>, name: &str, m: &ClassMetrics| {
            writeln!(
                f,
                "{:>W$}  {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, m.precision, m.recall, m.f1, m.support
            )
        };
        for label in Label::all() {
            row(f, &label.to_string(), self.class(label))?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>W$}  {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy",
            "",
            "",
            self.accuracy,
            self.total()
        )?;
        row(f, "macro avg", &self.macro_avg)?;
        row(f, "weighted avg", &self.weighted_avg)
    }
}
