//! Labeled embedding datasets.
//!
//! A [`Dataset`] holds one embedding vector per gene in a flat row-major
//! matrix, keyed by gene id, with optional integer labels and sequences.
//! Embeddings are loaded once and only ever modified by scaling, which is
//! tracked by the `scaled` flag so that a dataset cannot be standardized
//! twice.
//!
//! # On-disk layout
//!
//! [`Dataset::from_store`] reads a directory containing
//!
//! - `<feature_type>.csv`: an `id` column followed by one numeric column per
//!   embedding dimension;
//! - `metadata.csv`: `id`, `label` and `seq` columns, in the same row order.

use std::fs::File;
use std::path::Path;

use csv::ReaderBuilder;
use orfeval_core::{OrfevalError, Result};
use serde::Deserialize;

use crate::rng::{shuffle, LcgRng};

/// One row of a [`Dataset`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Item<'a> {
    /// Row position within the dataset.
    pub idx: usize,
    /// Gene id.
    pub index: &'a str,
    pub embedding: &'a [f64],
    pub label: Option<usize>,
}

/// Embedding matrix with index keys and optional labels and sequences.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    embeddings: Vec<f64>,
    n_features: usize,
    index: Vec<String>,
    labels: Option<Vec<usize>>,
    seqs: Option<Vec<String>>,
    n_classes: Option<usize>,
    scaled: bool,
    feature_type: Option<String>,
}

impl Dataset {
    /// Build a dataset from a flat row-major embedding matrix.
    ///
    /// `n_classes` is `max(label) + 1`, so label codes may skip values.
    ///
    /// # Errors
    ///
    /// Returns an error if the matrix is empty, ragged, or the index,
    /// labels or sequences disagree with the number of rows.
    pub fn new(
        embeddings: Vec<f64>,
        n_features: usize,
        index: Vec<String>,
        labels: Option<Vec<usize>>,
        seqs: Option<Vec<String>>,
    ) -> Result<Self> {
        if n_features == 0 {
            return Err(OrfevalError::InvalidInput("n_features must be > 0".into()));
        }
        if embeddings.is_empty() {
            return Err(OrfevalError::InvalidInput("empty embedding matrix".into()));
        }
        if embeddings.len() % n_features != 0 {
            return Err(OrfevalError::InvalidInput(format!(
                "embedding length {} not divisible by n_features {}",
                embeddings.len(),
                n_features
            )));
        }
        let n = embeddings.len() / n_features;
        let check = |what: &str, len: usize| {
            if len != n {
                Err(OrfevalError::InvalidInput(format!(
                    "{what} has {len} entries but the embedding matrix has {n} rows"
                )))
            } else {
                Ok(())
            }
        };
        check("index", index.len())?;
        if let Some(labels) = &labels {
            check("labels", labels.len())?;
        }
        if let Some(seqs) = &seqs {
            check("seqs", seqs.len())?;
        }

        let n_classes = labels
            .as_ref()
            .and_then(|l| l.iter().copied().max())
            .map(|max| max + 1);

        Ok(Self {
            embeddings,
            n_features,
            index,
            labels,
            seqs,
            n_classes,
            scaled: false,
            feature_type: None,
        })
    }

    /// Tag the dataset with the name of its embedding type.
    pub fn with_feature_type(mut self, feature_type: impl Into<String>) -> Self {
        self.feature_type = Some(feature_type.into());
        self
    }

    /// Load a dataset from an embedding store directory.
    ///
    /// # Errors
    ///
    /// Returns an error if a file is missing or malformed, a requested
    /// column is empty, or the metadata rows do not line up with the
    /// embedding rows.
    pub fn from_store(
        dir: impl AsRef<Path>,
        feature_type: &str,
        load_labels: bool,
        load_seqs: bool,
    ) -> Result<Self> {
        let dir = dir.as_ref();
        let (index, embeddings, n_features) =
            read_embeddings(&dir.join(format!("{feature_type}.csv")))?;

        let (mut labels, mut seqs) = (None, None);
        if load_labels || load_seqs {
            let metadata = read_metadata(&dir.join("metadata.csv"))?;
            let aligned = metadata.len() == index.len()
                && metadata.iter().zip(&index).all(|(m, id)| &m.id == id);
            if !aligned {
                return Err(OrfevalError::InvalidInput(format!(
                    "{}: the indices of the metadata and embeddings do not match",
                    dir.display()
                )));
            }
            if load_labels {
                labels = Some(
                    metadata
                        .iter()
                        .map(|m| {
                            m.label.ok_or_else(|| {
                                OrfevalError::InvalidInput(format!("{}: missing label", m.id))
                            })
                        })
                        .collect::<Result<Vec<_>>>()?,
                );
            }
            if load_seqs {
                seqs = Some(
                    metadata
                        .into_iter()
                        .map(|m| {
                            m.seq.ok_or_else(|| {
                                OrfevalError::InvalidInput(format!("{}: missing seq", m.id))
                            })
                        })
                        .collect::<Result<Vec<_>>>()?,
                );
            }
        }

        let dataset = Self::new(embeddings, n_features, index, labels, seqs)?
            .with_feature_type(feature_type);
        tracing::info!(
            dir = %dir.display(),
            feature_type,
            n_samples = dataset.len(),
            n_features,
            "loaded dataset"
        );
        Ok(dataset)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// `(n_samples, n_features)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.len(), self.n_features)
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Number of label classes, if the dataset is labeled.
    pub fn n_classes(&self) -> Option<usize> {
        self.n_classes
    }

    /// Row `idx`, or `None` if out of bounds.
    pub fn item(&self, idx: usize) -> Option<Item<'_>> {
        Some(Item {
            idx,
            index: self.index.get(idx)?,
            embedding: self.embedding(idx)?,
            label: self.labels.as_ref().map(|l| l[idx]),
        })
    }

    /// Embedding vector of row `idx`.
    pub fn embedding(&self, idx: usize) -> Option<&[f64]> {
        let start = idx.checked_mul(self.n_features)?;
        self.embeddings.get(start..start + self.n_features)
    }

    /// The whole embedding matrix, row-major.
    pub fn embeddings(&self) -> &[f64] {
        &self.embeddings
    }

    pub(crate) fn embeddings_mut(&mut self) -> &mut [f64] {
        &mut self.embeddings
    }

    pub fn labels(&self) -> Option<&[usize]> {
        self.labels.as_deref()
    }

    pub fn seqs(&self) -> Option<&[String]> {
        self.seqs.as_deref()
    }

    pub fn index(&self) -> &[String] {
        &self.index
    }

    pub fn feature_type(&self) -> Option<&str> {
        self.feature_type.as_deref()
    }

    /// Whether the embeddings have been standardized.
    pub fn is_scaled(&self) -> bool {
        self.scaled
    }

    pub(crate) fn mark_scaled(&mut self) {
        self.scaled = true;
    }

    /// Number of rows per class, indexed by class code.
    pub fn class_counts(&self) -> Option<Vec<usize>> {
        let labels = self.labels.as_ref()?;
        let mut counts = vec![0; self.n_classes.unwrap_or(0)];
        for &l in labels {
            counts[l] += 1;
        }
        Some(counts)
    }

    /// Copy the given rows into a new dataset.
    ///
    /// The subset keeps the parent's class count, feature type and scaled
    /// flag.
    ///
    /// # Errors
    ///
    /// Returns an error if `idxs` is empty or any index is out of bounds.
    pub fn subset(&self, idxs: &[usize]) -> Result<Self> {
        if idxs.is_empty() {
            return Err(OrfevalError::InvalidInput("empty subset".into()));
        }
        if let Some(&bad) = idxs.iter().find(|&&i| i >= self.len()) {
            return Err(OrfevalError::InvalidInput(format!(
                "subset index {bad} out of bounds for {} rows",
                self.len()
            )));
        }

        let mut embeddings = Vec::with_capacity(idxs.len() * self.n_features);
        for &i in idxs {
            embeddings.extend_from_slice(&self.embeddings[i * self.n_features..(i + 1) * self.n_features]);
        }
        Ok(Self {
            embeddings,
            n_features: self.n_features,
            index: idxs.iter().map(|&i| self.index[i].clone()).collect(),
            labels: self.labels.as_ref().map(|l| idxs.iter().map(|&i| l[i]).collect()),
            seqs: self.seqs.as_ref().map(|s| idxs.iter().map(|&i| s[i].clone()).collect()),
            n_classes: self.n_classes,
            scaled: self.scaled,
            feature_type: self.feature_type.clone(),
        })
    }
}

/// A train/test pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Datasets {
    pub train: Dataset,
    pub test: Dataset,
}

/// Randomly split a dataset into train and test subsets.
///
/// The test subset gets `ceil(test_size * n)` rows.
///
/// # Errors
///
/// Returns an error if `test_size` is not in `(0, 1)` or either side of the
/// split would be empty.
pub fn split(dataset: &Dataset, test_size: f64, seed: u64) -> Result<Datasets> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(OrfevalError::InvalidInput(format!(
            "test_size must be in (0, 1), got {test_size}"
        )));
    }
    let n = dataset.len();
    let n_test = (test_size * n as f64).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(OrfevalError::InvalidInput(format!(
            "cannot split {n} rows with test_size {test_size}"
        )));
    }

    let mut idxs: Vec<usize> = (0..n).collect();
    let mut rng = LcgRng::new(seed);
    shuffle(&mut rng, &mut idxs);
    let (test, train) = idxs.split_at(n_test);

    tracing::debug!(n_train = train.len(), n_test, "split dataset");
    Ok(Datasets {
        train: dataset.subset(train)?,
        test: dataset.subset(test)?,
    })
}

// ---------------------------------------------------------------------------
// Store readers
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct MetadataRow {
    id: String,
    #[serde(default)]
    label: Option<usize>,
    #[serde(default)]
    seq: Option<String>,
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| {
        OrfevalError::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {}", path.display(), e),
        ))
    })
}

fn read_embeddings(path: &Path) -> Result<(Vec<String>, Vec<f64>, usize)> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(open(path)?);
    let headers = reader
        .headers()
        .map_err(|e| OrfevalError::Parse(format!("{}: {}", path.display(), e)))?;
    if headers.len() < 2 {
        return Err(OrfevalError::Parse(format!(
            "{}: expected an id column followed by feature columns",
            path.display()
        )));
    }
    let n_features = headers.len() - 1;

    let mut index = Vec::new();
    let mut embeddings = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record =
            record.map_err(|e| OrfevalError::Parse(format!("{}: {}", path.display(), e)))?;
        let mut fields = record.iter();
        let id = fields.next().unwrap_or_default();
        index.push(id.to_string());
        for field in fields {
            let value: f64 = field.trim().parse().map_err(|_| {
                OrfevalError::Parse(format!(
                    "{} row {}: invalid number {field:?}",
                    path.display(),
                    line + 1
                ))
            })?;
            embeddings.push(value);
        }
    }
    Ok((index, embeddings, n_features))
}

fn read_metadata(path: &Path) -> Result<Vec<MetadataRow>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(open(path)?);
    reader
        .deserialize::<MetadataRow>()
        .map(|row| row.map_err(|e| OrfevalError::Parse(format!("{}: {}", path.display(), e))))
        .collect()
}
