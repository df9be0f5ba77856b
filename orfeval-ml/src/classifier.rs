//! Embedding classifier: scaling, training with best-epoch selection,
//! prediction and persistence.
//!
//! # Example
//!
//! ```
//! use orfeval_ml::{split, Classifier, Dataset, TrainConfig};
//!
//! // Two well separated clusters in two dimensions.
//! let mut embeddings = Vec::new();
//! let mut labels = Vec::new();
//! for i in 0..40 {
//!     let class = i % 2;
//!     let offset = if class == 1 { 3.0 } else { -3.0 };
//!     embeddings.extend([offset + (i as f64 * 0.07).sin(), offset + (i as f64 * 0.13).cos()]);
//!     labels.push(class);
//! }
//! let index = (0..40).map(|i| format!("gene_{i}")).collect();
//! let data = Dataset::new(embeddings, 2, index, Some(labels), None)?;
//!
//! let mut datasets = split(&data, 0.25, 42)?;
//! let mut model = Classifier::new([2, 8, 2], 42)?;
//! model.scale(&mut datasets.train, true)?;
//! model.scale(&mut datasets.test, false)?;
//!
//! let config = TrainConfig { epochs: 50, lr: 0.05, progress: false, ..Default::default() };
//! model.fit(&datasets, &config)?;
//! assert!(model.fitted());
//! assert!(model.accuracy(&datasets.test)? > 0.9);
//! # Ok::<(), orfeval_core::OrfevalError>(())
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use csv::WriterBuilder;
use indicatif::{ProgressBar, ProgressStyle};
use orfeval_core::{OrfevalError, Result};
use serde::{Deserialize, Serialize};

use crate::dataset::{Dataset, Datasets};
use crate::loss::{softmax, WeightedCrossEntropyLoss};
use crate::metrics::{balanced_accuracy, ConfusionOutcome};
use crate::network::FeedForward;
use crate::normalize::StandardScaler;
use crate::optim::Adam;
use crate::sampler::{BatchSampler, ShuffleSampler};

/// Layer widths used when none are given: a 1024-dimensional embedding,
/// 512 hidden units, two classes.
pub const DEFAULT_DIMS: [usize; 3] = [1024, 512, 2];

/// Rows per forward pass during prediction.
const PREDICT_CHUNK: usize = 1024;

// ---------------------------------------------------------------------------
// Configuration and training records
// ---------------------------------------------------------------------------

/// Training hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub epochs: usize,
    pub lr: f64,
    pub batch_size: usize,
    /// Weight the loss by inverse class frequency in the training set.
    pub weight_loss: bool,
    /// Seed of the default shuffling sampler.
    pub seed: u64,
    /// Draw a progress bar on stderr.
    pub progress: bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: 10,
            lr: 1e-8,
            batch_size: 16,
            weight_loss: false,
            seed: 42,
            progress: true,
        }
    }
}

/// Per-epoch training curve.
///
/// Entry 0 describes the weights before training, so `train_loss[0]` is
/// always `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    pub train_loss: Vec<Option<f64>>,
    pub test_acc: Vec<f64>,
}

/// Parameters of a completed [`Classifier::fit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitSummary {
    /// Epoch whose weights were kept; 0 means the initial weights.
    pub best_epoch: usize,
    pub epochs: usize,
    pub batch_size: usize,
    pub lr: f64,
    pub weight_loss: bool,
    pub feature_type: Option<String>,
    pub sampler: String,
}

// ---------------------------------------------------------------------------
// Predictions
// ---------------------------------------------------------------------------

/// Model output for one row.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub index: String,
    pub label: Option<usize>,
    pub model_label: usize,
    pub probabilities: Vec<f64>,
}

impl Prediction {
    /// Binary outcome against the known label, if any.
    pub fn outcome(&self) -> Option<ConfusionOutcome> {
        self.label.map(|l| ConfusionOutcome::of(l, self.model_label))
    }
}

/// Predictions for a whole dataset, in row order.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionTable {
    pub rows: Vec<Prediction>,
}

impl PredictionTable {
    /// Write the table as CSV: `id`, `label`, `model_label`, `outcome`,
    /// then one `prob_<k>` column per class.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let n_classes = self.rows.first().map_or(0, |r| r.probabilities.len());
        let mut writer = WriterBuilder::new()
            .from_path(path)
            .map_err(|e| OrfevalError::Parse(format!("{}: {}", path.display(), e)))?;

        let mut header: Vec<String> = ["id", "label", "model_label", "outcome"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        header.extend((0..n_classes).map(|k| format!("prob_{k}")));
        writer
            .write_record(&header)
            .map_err(|e| OrfevalError::Parse(e.to_string()))?;

        for row in &self.rows {
            let mut record = vec![
                row.index.clone(),
                row.label.map(|l| l.to_string()).unwrap_or_default(),
                row.model_label.to_string(),
                row.outcome().map(|o| o.to_string()).unwrap_or_default(),
            ];
            record.extend(row.probabilities.iter().map(|p| p.to_string()));
            writer
                .write_record(&record)
                .map_err(|e| OrfevalError::Parse(e.to_string()))?;
        }
        writer.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// Feed-forward classifier over standardized embeddings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classifier {
    network: FeedForward,
    loss: WeightedCrossEntropyLoss,
    scaler: Option<StandardScaler>,
    history: History,
    fit: Option<FitSummary>,
}

impl Classifier {
    /// Untrained classifier with layer widths `dims`.
    pub fn new(dims: [usize; 3], seed: u64) -> Result<Self> {
        Ok(Self {
            network: FeedForward::new(dims, seed)?,
            loss: WeightedCrossEntropyLoss::new(dims[2]),
            scaler: None,
            history: History::default(),
            fit: None,
        })
    }

    pub fn dims(&self) -> [usize; 3] {
        self.network.dims()
    }

    pub fn network(&self) -> &FeedForward {
        &self.network
    }

    pub fn scaler(&self) -> Option<&StandardScaler> {
        self.scaler.as_ref()
    }

    pub fn loss_weights(&self) -> &[f64] {
        &self.loss.weights
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Whether [`Classifier::fit`] has completed.
    pub fn fitted(&self) -> bool {
        self.fit.is_some()
    }

    pub fn fit_summary(&self) -> Option<&FitSummary> {
        self.fit.as_ref()
    }

    pub fn best_epoch(&self) -> Option<usize> {
        self.fit.as_ref().map(|f| f.best_epoch)
    }

    /// Standardize a dataset in place, fitting the scaler first when `fit`
    /// is set.
    ///
    /// # Errors
    ///
    /// Returns [`OrfevalError::Precondition`] if the dataset is already
    /// scaled, or if `fit` is false and no scaler has been fitted yet.
    pub fn scale(&mut self, dataset: &mut Dataset, fit: bool) -> Result<()> {
        if dataset.is_scaled() {
            return Err(OrfevalError::Precondition(
                "the dataset has already been scaled".into(),
            ));
        }
        if fit {
            self.scaler = Some(StandardScaler::fit(dataset.embeddings(), dataset.n_features())?);
        }
        let scaler = self.scaler.as_ref().ok_or_else(|| {
            OrfevalError::Precondition("the scaler has not been fitted".into())
        })?;
        scaler.transform(dataset.embeddings_mut())?;
        dataset.mark_scaled();
        Ok(())
    }

    fn check_input(&self, dataset: &Dataset, role: &str) -> Result<()> {
        if !dataset.is_scaled() {
            return Err(OrfevalError::Precondition(format!(
                "the {role} dataset has not been scaled"
            )));
        }
        let d0 = self.dims()[0];
        if dataset.n_features() != d0 {
            return Err(OrfevalError::InvalidInput(format!(
                "the {role} dataset has {} features but the model expects {d0}",
                dataset.n_features()
            )));
        }
        Ok(())
    }

    fn require_labels<'d>(&self, dataset: &'d Dataset, role: &str) -> Result<&'d [usize]> {
        let labels = dataset.labels().ok_or_else(|| {
            OrfevalError::Precondition(format!("the {role} dataset is not labeled"))
        })?;
        let n_out = self.dims()[2];
        if let Some(&bad) = labels.iter().find(|&&l| l >= n_out) {
            return Err(OrfevalError::InvalidInput(format!(
                "the {role} dataset has label {bad} but the model has {n_out} outputs"
            )));
        }
        Ok(labels)
    }

    /// Train with shuffled mini-batches of `config.batch_size`.
    pub fn fit(&mut self, datasets: &Datasets, config: &TrainConfig) -> Result<()> {
        let mut sampler = ShuffleSampler::new(config.batch_size, config.seed);
        self.fit_with_sampler(datasets, config, &mut sampler)
    }

    /// Train with a custom batch sampler.
    ///
    /// The test balanced accuracy is recorded before training and after
    /// every epoch. The weights from the epoch with the highest accuracy
    /// (earliest on ties) are restored at the end, so afterwards
    /// [`Classifier::accuracy`] on the test set equals the best recorded
    /// value. The history is reset at the start of each call.
    ///
    /// # Errors
    ///
    /// Returns [`OrfevalError::Precondition`] if either dataset is unscaled
    /// or unlabeled.
    pub fn fit_with_sampler(
        &mut self,
        datasets: &Datasets,
        config: &TrainConfig,
        sampler: &mut dyn BatchSampler,
    ) -> Result<()> {
        self.check_input(&datasets.train, "train")?;
        self.check_input(&datasets.test, "test")?;
        let train_labels = self.require_labels(&datasets.train, "train")?;
        self.require_labels(&datasets.test, "test")?;

        if config.weight_loss {
            self.loss.fit(train_labels)?;
        }

        let mut optimizer = Adam::new(config.lr);
        self.history = History::default();
        self.history.train_loss.push(None);
        self.history.test_acc.push(self.accuracy(&datasets.test)?);
        let mut best_acc = self.history.test_acc[0];
        let mut best_epoch = 0;
        let mut best_network = self.network.clone();

        tracing::info!(
            epochs = config.epochs,
            lr = config.lr,
            n_train = datasets.train.len(),
            n_test = datasets.test.len(),
            sampler = sampler.name(),
            initial_test_acc = best_acc,
            "training classifier"
        );

        let pb = epoch_progress(config);
        let n_features = datasets.train.n_features();
        for epoch in 1..=config.epochs {
            let mut losses = Vec::new();
            for batch in sampler.batches(&datasets.train)? {
                if batch.is_empty() {
                    continue;
                }
                let mut inputs = Vec::with_capacity(batch.len() * n_features);
                let mut targets = Vec::with_capacity(batch.len());
                for &i in &batch {
                    let item = datasets.train.item(i).ok_or_else(|| {
                        OrfevalError::InvalidInput(format!("sampler produced row {i} out of bounds"))
                    })?;
                    inputs.extend_from_slice(item.embedding);
                    targets.push(train_labels[i]);
                }

                let acts = self.network.forward_cached(&inputs)?;
                let (loss, grad_logits) = self.loss.forward(&acts.logits, &targets)?;
                let grads = self.network.backward(&inputs, &acts, &grad_logits);
                optimizer.step(&mut self.network.params_mut(), &grads.as_slices())?;
                losses.push(loss);
            }

            let mean_loss = (!losses.is_empty())
                .then(|| losses.iter().sum::<f64>() / losses.len() as f64);
            let test_acc = self.accuracy(&datasets.test)?;
            self.history.train_loss.push(mean_loss);
            self.history.test_acc.push(test_acc);

            if test_acc > best_acc {
                best_acc = test_acc;
                best_epoch = epoch;
                best_network = self.network.clone();
            }
            tracing::debug!(epoch, train_loss = ?mean_loss, test_acc, "epoch complete");
            pb.set_message(format!("test_acc={test_acc:.4}"));
            pb.inc(1);
        }
        pb.finish_and_clear();

        tracing::info!(best_epoch, best_test_acc = best_acc, "loading best model weights");
        self.network = best_network;
        self.fit = Some(FitSummary {
            best_epoch,
            epochs: config.epochs,
            batch_size: config.batch_size,
            lr: config.lr,
            weight_loss: config.weight_loss,
            feature_type: datasets.train.feature_type().map(String::from),
            sampler: sampler.name().to_string(),
        });
        Ok(())
    }

    /// Class probabilities, row-major `n_samples x n_classes`.
    ///
    /// # Errors
    ///
    /// Returns [`OrfevalError::Precondition`] if the dataset is not scaled.
    pub fn predict_proba(&self, dataset: &Dataset) -> Result<Vec<f64>> {
        self.check_input(dataset, "input")?;
        let n_out = self.dims()[2];
        let mut probs = Vec::with_capacity(dataset.len() * n_out);
        for chunk in dataset
            .embeddings()
            .chunks(PREDICT_CHUNK * dataset.n_features())
        {
            let logits = self.network.forward(chunk)?;
            probs.extend(softmax(&logits, n_out));
        }
        Ok(probs)
    }

    /// Most probable class of every row (first class on ties).
    pub fn predict(&self, dataset: &Dataset) -> Result<Vec<usize>> {
        let n_out = self.dims()[2];
        Ok(self
            .predict_proba(dataset)?
            .chunks_exact(n_out)
            .map(argmax)
            .collect())
    }

    /// Predictions joined with the dataset's index and labels.
    pub fn predict_table(&self, dataset: &Dataset) -> Result<PredictionTable> {
        let n_out = self.dims()[2];
        let probs = self.predict_proba(dataset)?;
        let rows = probs
            .chunks_exact(n_out)
            .enumerate()
            .map(|(i, p)| Prediction {
                index: dataset.index()[i].clone(),
                label: dataset.labels().map(|l| l[i]),
                model_label: argmax(p),
                probabilities: p.to_vec(),
            })
            .collect();
        Ok(PredictionTable { rows })
    }

    /// Balanced accuracy on a labeled, scaled dataset.
    pub fn accuracy(&self, dataset: &Dataset) -> Result<f64> {
        let labels = dataset
            .labels()
            .ok_or_else(|| OrfevalError::Precondition("the dataset is not labeled".into()))?;
        let predicted = self.predict(dataset)?;
        balanced_accuracy(labels, &predicted)
    }

    /// Write the model as JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, self)
            .map_err(|e| OrfevalError::Other(format!("{}: {}", path.display(), e)))?;
        tracing::info!(path = %path.display(), "saved classifier");
        Ok(())
    }

    /// Read a model written by [`Classifier::save`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        serde_json::from_reader(reader)
            .map_err(|e| OrfevalError::Parse(format!("{}: {}", path.display(), e)))
    }
}

fn argmax(row: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in row.iter().enumerate() {
        if v > row[best] {
            best = i;
        }
    }
    best
}

fn epoch_progress(config: &TrainConfig) -> ProgressBar {
    if !config.progress {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(config.epochs as u64);
    pb.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} epochs {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    pb
}
