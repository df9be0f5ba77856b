//! Class-weighted cross-entropy on raw logits.

use orfeval_core::{OrfevalError, Result};
use serde::{Deserialize, Serialize};

/// Row-wise softmax of a `batch x n_classes` logit matrix.
pub fn softmax(logits: &[f64], n_classes: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(logits.len());
    for row in logits.chunks_exact(n_classes) {
        let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<f64> = row.iter().map(|&z| (z - max).exp()).collect();
        let sum: f64 = exps.iter().sum();
        out.extend(exps.into_iter().map(|e| e / sum));
    }
    out
}

/// Cross-entropy where each sample is scaled by the weight of its class.
///
/// The batch loss is the plain mean of the weighted per-sample losses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedCrossEntropyLoss {
    pub weights: Vec<f64>,
}

impl WeightedCrossEntropyLoss {
    /// Unit weights for `n_classes` classes.
    pub fn new(n_classes: usize) -> Self {
        Self {
            weights: vec![1.0; n_classes],
        }
    }

    pub fn n_classes(&self) -> usize {
        self.weights.len()
    }

    /// Set inverse-frequency weights `n / (n_i * n_classes)`.
    ///
    /// # Errors
    ///
    /// Returns an error if `labels` is empty, a label is out of range, or a
    /// class has no samples.
    pub fn fit(&mut self, labels: &[usize]) -> Result<()> {
        let n_classes = self.n_classes();
        if labels.is_empty() {
            return Err(OrfevalError::InvalidInput("empty label vector".into()));
        }
        let mut counts = vec![0usize; n_classes];
        for &l in labels {
            if l >= n_classes {
                return Err(OrfevalError::InvalidInput(format!(
                    "label {l} out of range for {n_classes} classes"
                )));
            }
            counts[l] += 1;
        }
        if let Some(missing) = counts.iter().position(|&c| c == 0) {
            return Err(OrfevalError::InvalidInput(format!(
                "class {missing} has no samples; cannot weight the loss"
            )));
        }

        let n = labels.len() as f64;
        self.weights = counts
            .iter()
            .map(|&c| n / (c as f64 * n_classes as f64))
            .collect();
        tracing::debug!(weights = ?self.weights, "fitted loss weights");
        Ok(())
    }

    /// Mean weighted loss of a batch and its gradient with respect to the
    /// logits.
    ///
    /// # Errors
    ///
    /// Returns an error if the logit matrix does not have one row of
    /// `n_classes` per target, or a target is out of range.
    pub fn forward(&self, logits: &[f64], targets: &[usize]) -> Result<(f64, Vec<f64>)> {
        let nc = self.n_classes();
        if targets.is_empty() || logits.len() != targets.len() * nc {
            return Err(OrfevalError::InvalidInput(format!(
                "{} logits for {} targets and {nc} classes",
                logits.len(),
                targets.len()
            )));
        }
        if let Some(&bad) = targets.iter().find(|&&t| t >= nc) {
            return Err(OrfevalError::InvalidInput(format!(
                "target {bad} out of range for {nc} classes"
            )));
        }

        let batch = targets.len() as f64;
        let mut grad = softmax(logits, nc);
        let mut total = 0.0;
        for ((row, probs), &t) in logits
            .chunks_exact(nc)
            .zip(grad.chunks_exact_mut(nc))
            .zip(targets)
        {
            let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let lse = max + row.iter().map(|&z| (z - max).exp()).sum::<f64>().ln();
            let w = self.weights[t];
            total += w * (lse - row[t]);

            probs[t] -= 1.0;
            probs.iter_mut().for_each(|p| *p *= w / batch);
        }
        Ok((total / batch, grad))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax_rows_sum_to_one() {
        let p = softmax(&[1.0, 2.0, 3.0, 1000.0, 1000.0, 1000.0], 3);
        assert!((p[..3].iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!((p[3] - 1.0 / 3.0).abs() < 1e-12);
        assert!(p[2] > p[1] && p[1] > p[0]);
    }

    #[test]
    fn test_unweighted_loss_value() {
        let loss = WeightedCrossEntropyLoss::new(2);
        // Equal logits: -ln(0.5) per sample.
        let (l, grad) = loss.forward(&[0.0, 0.0, 0.0, 0.0], &[0, 1]).unwrap();
        assert!((l - 2f64.ln()).abs() < 1e-12);
        assert_eq!(grad, vec![-0.25, 0.25, 0.25, -0.25]);
    }

    #[test]
    fn test_fit_inverse_frequency() {
        let mut loss = WeightedCrossEntropyLoss::new(2);
        loss.fit(&[0, 0, 0, 1]).unwrap();
        assert!((loss.weights[0] - 4.0 / 6.0).abs() < 1e-12);
        assert!((loss.weights[1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_fit_rejects_absent_class() {
        let mut loss = WeightedCrossEntropyLoss::new(3);
        assert!(loss.fit(&[0, 1, 1]).is_err());
        assert!(loss.fit(&[0, 1, 5]).is_err());
    }

    #[test]
    fn test_weights_scale_loss() {
        let mut loss = WeightedCrossEntropyLoss::new(2);
        loss.weights = vec![1.0, 3.0];
        let (l, _) = loss.forward(&[0.0, 0.0], &[1]).unwrap();
        assert!((l - 3.0 * 2f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_gradient_matches_finite_differences() {
        let mut loss = WeightedCrossEntropyLoss::new(3);
        loss.weights = vec![0.5, 1.0, 2.0];
        let logits = vec![0.2, -1.0, 0.7, 1.5, 0.1, -0.3];
        let targets = [2, 0];
        let (_, grad) = loss.forward(&logits, &targets).unwrap();

        let h = 1e-6;
        for i in 0..logits.len() {
            let mut up = logits.clone();
            up[i] += h;
            let mut down = logits.clone();
            down[i] -= h;
            let numeric = (loss.forward(&up, &targets).unwrap().0
                - loss.forward(&down, &targets).unwrap().0)
                / (2.0 * h);
            assert!((numeric - grad[i]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_shape_errors() {
        let loss = WeightedCrossEntropyLoss::new(2);
        assert!(loss.forward(&[0.0, 0.0, 0.0], &[0]).is_err());
        assert!(loss.forward(&[0.0, 0.0], &[2]).is_err());
        assert!(loss.forward(&[], &[]).is_err());
    }
}
