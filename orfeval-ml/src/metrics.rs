//! Classification evaluation metrics.
//!
//! Provides confusion matrix computation, per-class precision / recall,
//! accuracy, balanced accuracy, and per-sample binary outcomes.

use core::fmt;

use orfeval_core::{OrfevalError, Result};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Confusion Matrix
// ---------------------------------------------------------------------------

/// Row-major confusion matrix for multi-class classification.
///
/// Entry `(i, j)` counts samples whose **actual** class is `i` and
/// **predicted** class is `j`.
#[derive(Debug, Clone)]
pub struct ConfusionMatrix {
    /// Row-major storage: `matrix[actual * n_classes + predicted]`.
    pub matrix: Vec<usize>,
    /// Number of classes.
    pub n_classes: usize,
}

impl ConfusionMatrix {
    /// Build a confusion matrix from actual and predicted label vectors.
    ///
    /// `n_classes` is inferred from the maximum label + 1 when `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the slices are empty or have different lengths.
    pub fn from_labels(
        actual: &[usize],
        predicted: &[usize],
        n_classes: Option<usize>,
    ) -> Result<Self> {
        if actual.is_empty() {
            return Err(OrfevalError::InvalidInput("empty label vectors".into()));
        }
        if actual.len() != predicted.len() {
            return Err(OrfevalError::InvalidInput(format!(
                "actual length {} != predicted length {}",
                actual.len(),
                predicted.len()
            )));
        }

        let nc = n_classes.unwrap_or_else(|| {
            let max_a = actual.iter().copied().max().unwrap_or(0);
            let max_p = predicted.iter().copied().max().unwrap_or(0);
            max_a.max(max_p) + 1
        });

        let mut matrix = vec![0usize; nc * nc];
        for (&a, &p) in actual.iter().zip(predicted.iter()) {
            if a < nc && p < nc {
                matrix[a * nc + p] += 1;
            }
        }

        Ok(Self {
            matrix,
            n_classes: nc,
        })
    }

    /// Get the count for a specific (actual, predicted) pair.
    #[inline]
    pub fn get(&self, actual: usize, predicted: usize) -> usize {
        self.matrix[actual * self.n_classes + predicted]
    }

    /// Total number of samples.
    pub fn total(&self) -> usize {
        self.matrix.iter().sum()
    }

    /// Number of samples whose actual class is `class`.
    pub fn support(&self, class: usize) -> usize {
        (0..self.n_classes).map(|j| self.get(class, j)).sum()
    }

    /// Number of samples predicted as `class`.
    fn predicted_count(&self, class: usize) -> usize {
        (0..self.n_classes).map(|i| self.get(i, class)).sum()
    }

    /// Overall accuracy (correct predictions / total).
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let correct: usize = (0..self.n_classes).map(|c| self.get(c, c)).sum();
        correct as f64 / total as f64
    }

    /// Precision for a given class: `TP / (TP + FP)`.
    ///
    /// Returns 0.0 if nothing was predicted as `class`.
    pub fn precision(&self, class: usize) -> f64 {
        let denom = self.predicted_count(class);
        if denom == 0 {
            0.0
        } else {
            self.get(class, class) as f64 / denom as f64
        }
    }

    /// Recall (sensitivity) for a given class: `TP / (TP + FN)`.
    ///
    /// Returns 0.0 if `class` never occurs in the actual labels.
    pub fn recall(&self, class: usize) -> f64 {
        let denom = self.support(class);
        if denom == 0 {
            0.0
        } else {
            self.get(class, class) as f64 / denom as f64
        }
    }

    /// Mean recall over the classes present in the actual labels.
    ///
    /// Classes that only appear among the predictions do not contribute,
    /// so a constant predictor scores `1 / n_present` at best.
    pub fn balanced_accuracy(&self) -> f64 {
        let present: Vec<usize> = (0..self.n_classes)
            .filter(|&c| self.support(c) > 0)
            .collect();
        if present.is_empty() {
            return 0.0;
        }
        present.iter().map(|&c| self.recall(c)).sum::<f64>() / present.len() as f64
    }
}

// ---------------------------------------------------------------------------
// Standalone scalar metrics
// ---------------------------------------------------------------------------

/// Overall accuracy: fraction of correct predictions.
///
/// # Errors
///
/// Returns an error if the slices are empty or have different lengths.
pub fn accuracy(actual: &[usize], predicted: &[usize]) -> Result<f64> {
    let cm = ConfusionMatrix::from_labels(actual, predicted, None)?;
    Ok(cm.accuracy())
}

/// Balanced accuracy: mean per-class recall.
///
/// # Errors
///
/// Returns an error if the slices are empty or have different lengths.
pub fn balanced_accuracy(actual: &[usize], predicted: &[usize]) -> Result<f64> {
    let cm = ConfusionMatrix::from_labels(actual, predicted, None)?;
    Ok(cm.balanced_accuracy())
}

// ---------------------------------------------------------------------------
// Binary outcomes
// ---------------------------------------------------------------------------

/// Outcome of one binary prediction, with class 1 as the positive class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfusionOutcome {
    TruePositive,
    FalsePositive,
    FalseNegative,
    TrueNegative,
}

impl ConfusionOutcome {
    /// Classify one (actual, predicted) pair. Any nonzero label is positive.
    pub fn of(actual: usize, predicted: usize) -> Self {
        match (actual != 0, predicted != 0) {
            (true, true) => ConfusionOutcome::TruePositive,
            (false, true) => ConfusionOutcome::FalsePositive,
            (true, false) => ConfusionOutcome::FalseNegative,
            (false, false) => ConfusionOutcome::TrueNegative,
        }
    }

    /// Whether the prediction agreed with the actual label.
    pub fn is_correct(&self) -> bool {
        matches!(
            self,
            ConfusionOutcome::TruePositive | ConfusionOutcome::TrueNegative
        )
    }
}

impl fmt::Display for ConfusionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConfusionOutcome::TruePositive => "true positive",
            ConfusionOutcome::FalsePositive => "false positive",
            ConfusionOutcome::FalseNegative => "false negative",
            ConfusionOutcome::TrueNegative => "true negative",
        })
    }
}

/// Per-sample binary outcomes.
///
/// # Errors
///
/// Returns an error if the slices have different lengths.
pub fn confusion_outcomes(actual: &[usize], predicted: &[usize]) -> Result<Vec<ConfusionOutcome>> {
    if actual.len() != predicted.len() {
        return Err(OrfevalError::InvalidInput(format!(
            "actual length {} != predicted length {}",
            actual.len(),
            predicted.len()
        )));
    }
    Ok(actual
        .iter()
        .zip(predicted)
        .map(|(&a, &p)| ConfusionOutcome::of(a, p))
        .collect())
}
