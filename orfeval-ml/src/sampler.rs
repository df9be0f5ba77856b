//! Mini-batch samplers for classifier training.

use orfeval_core::{OrfevalError, Result};

use crate::dataset::Dataset;
use crate::rng::{shuffle, LcgRng};

/// Produces the row indices of every batch in one training epoch.
///
/// Samplers own their random state, so consecutive epochs see different
/// batches while a fixed seed keeps the whole run reproducible.
pub trait BatchSampler {
    /// Batches for the next epoch.
    fn batches(&mut self, dataset: &Dataset) -> Result<Vec<Vec<usize>>>;

    /// Short name recorded with the fitted model.
    fn name(&self) -> &str;
}

/// Shuffled pass over every row; the last batch may be short.
pub struct ShuffleSampler {
    batch_size: usize,
    rng: LcgRng,
}

impl ShuffleSampler {
    pub fn new(batch_size: usize, seed: u64) -> Self {
        Self {
            batch_size,
            rng: LcgRng::new(seed),
        }
    }
}

impl BatchSampler for ShuffleSampler {
    fn batches(&mut self, dataset: &Dataset) -> Result<Vec<Vec<usize>>> {
        if self.batch_size == 0 {
            return Err(OrfevalError::InvalidInput("batch_size must be > 0".into()));
        }
        let mut idxs: Vec<usize> = (0..dataset.len()).collect();
        shuffle(&mut self.rng, &mut idxs);
        Ok(idxs.chunks(self.batch_size).map(<[usize]>::to_vec).collect())
    }

    fn name(&self) -> &str {
        "shuffle"
    }
}

/// Class-balanced batches drawn with replacement.
///
/// Every batch holds `batch_size / n_classes` rows of each class, so
/// minority classes are oversampled.
pub struct BalancedSampler {
    batch_size: usize,
    n_batches: usize,
    rng: LcgRng,
}

impl BalancedSampler {
    pub fn new(batch_size: usize, n_batches: usize, seed: u64) -> Self {
        Self {
            batch_size,
            n_batches,
            rng: LcgRng::new(seed),
        }
    }
}

impl BatchSampler for BalancedSampler {
    fn batches(&mut self, dataset: &Dataset) -> Result<Vec<Vec<usize>>> {
        let labels = dataset
            .labels()
            .ok_or_else(|| OrfevalError::Precondition("balanced sampling needs labels".into()))?;
        let n_classes = dataset.n_classes().unwrap_or(0);

        let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
        for (i, &l) in labels.iter().enumerate() {
            by_class[l].push(i);
        }
        if let Some(empty) = by_class.iter().position(Vec::is_empty) {
            return Err(OrfevalError::InvalidInput(format!(
                "class {empty} has no samples to draw from"
            )));
        }
        let per_class = self.batch_size / n_classes.max(1);
        if per_class == 0 || self.n_batches == 0 {
            return Err(OrfevalError::InvalidInput(format!(
                "batch_size {} and n_batches {} cannot cover {n_classes} classes",
                self.batch_size, self.n_batches
            )));
        }

        let mut batches = Vec::with_capacity(self.n_batches);
        for _ in 0..self.n_batches {
            let mut batch = Vec::with_capacity(per_class * n_classes);
            for members in &by_class {
                for _ in 0..per_class {
                    let j = self.rng.next_bounded(members.len() as u64) as usize;
                    batch.push(members[j]);
                }
            }
            shuffle(&mut self.rng, &mut batch);
            batches.push(batch);
        }
        Ok(batches)
    }

    fn name(&self) -> &str {
        "balanced"
    }
}
