//! Column standardization for embedding matrices.

use orfeval_core::{OrfevalError, Result};
use serde::{Deserialize, Serialize};

fn validate_matrix(data: &[f64], n_cols: usize) -> Result<()> {
    if n_cols == 0 {
        return Err(OrfevalError::InvalidInput("n_cols must be > 0".into()));
    }
    if data.is_empty() {
        return Err(OrfevalError::InvalidInput("empty data".into()));
    }
    if data.len() % n_cols != 0 {
        return Err(OrfevalError::InvalidInput(format!(
            "data length {} not divisible by n_cols {}",
            data.len(),
            n_cols
        )));
    }
    Ok(())
}

/// Per-column z-score transform learned from a training matrix.
///
/// Columns with zero variance keep a scale of 1.0, so they are only
/// centered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Learn column means and population standard deviations of a flat
    /// row-major matrix.
    pub fn fit(data: &[f64], n_features: usize) -> Result<Self> {
        validate_matrix(data, n_features)?;
        let n_rows = data.len() / n_features;
        let n = n_rows as f64;

        let mut mean = vec![0.0; n_features];
        for row in data.chunks_exact(n_features) {
            for (m, &v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut var = vec![0.0; n_features];
        for row in data.chunks_exact(n_features) {
            for ((s, &v), &m) in var.iter_mut().zip(row).zip(&mean) {
                *s += (v - m).powi(2);
            }
        }
        let scale = var
            .into_iter()
            .map(|s| {
                let std = (s / n).sqrt();
                if std == 0.0 {
                    1.0
                } else {
                    std
                }
            })
            .collect();

        Ok(Self { mean, scale })
    }

    /// Number of columns the scaler was fitted on.
    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Standardize `data` in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the row width does not match the fitted width.
    pub fn transform(&self, data: &mut [f64]) -> Result<()> {
        validate_matrix(data, self.n_features())?;
        for row in data.chunks_exact_mut(self.n_features()) {
            for ((v, &m), &s) in row.iter_mut().zip(&self.mean).zip(&self.scale) {
                *v = (*v - m) / s;
            }
        }
        Ok(())
    }

    /// Fit on `data` and transform it in place.
    pub fn fit_transform(data: &mut [f64], n_features: usize) -> Result<Self> {
        let scaler = Self::fit(data, n_features)?;
        scaler.transform(data)?;
        Ok(scaler)
    }
}
