//! Embedding datasets and a feed-forward classifier for predicted genes.
//!
//! This crate provides:
//!
//! - **Datasets**: [`Dataset`] embedding matrices with labels, [`split`]
//! - **Preprocessing**: [`StandardScaler`]
//! - **Model**: [`FeedForward`] network, [`WeightedCrossEntropyLoss`], [`Adam`]
//! - **Training**: [`Classifier`] with [`TrainConfig`] and [`BatchSampler`]s
//! - **Evaluation**: [`ConfusionMatrix`], [`balanced_accuracy`]
//!
//! Label codes are plain `usize` class indices; the binary gene classifier
//! uses 1 for real genes and 0 for spurious ones.

mod rng;

pub mod classifier;
pub mod dataset;
pub mod loss;
pub mod metrics;
pub mod network;
pub mod normalize;
pub mod optim;
pub mod sampler;

pub use classifier::{
    Classifier, FitSummary, History, Prediction, PredictionTable, TrainConfig, DEFAULT_DIMS,
};
pub use dataset::{split, Dataset, Datasets, Item};
pub use loss::{softmax, WeightedCrossEntropyLoss};
pub use metrics::{
    accuracy, balanced_accuracy, confusion_outcomes, ConfusionMatrix, ConfusionOutcome,
};
pub use network::{Activations, FeedForward, Gradients, Linear, LinearGrad};
pub use normalize::StandardScaler;
pub use optim::Adam;
pub use sampler::{BalancedSampler, BatchSampler, ShuffleSampler};
