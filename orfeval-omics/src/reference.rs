//! Overlap search of predicted genes against a reference annotation.
//!
//! [`ReferenceGenome`] holds the annotated features of one genome, grouped
//! per contig and sorted by start. For each query gene it reports every
//! overlapping feature as a [`Hit`], with the strand and reading-frame
//! agreement needed to decide whether the prediction matches a real gene.
//!
//! # Example
//!
//! ```
//! use orfeval_omics::{GeneRecord, ReferenceGenome, SearchConfig, Strand};
//!
//! let reference = ReferenceGenome::new(
//!     "GCF_000005845.2",
//!     vec![GeneRecord::cds("b0001", "GCF_000005845.2", "chr", 190, 255, Strand::Forward).unwrap()],
//! ).unwrap();
//! let queries = vec![GeneRecord::cds("chr_1", "GCF_000005845.2", "chr", 190, 255, Strand::Forward).unwrap()];
//!
//! let results = reference.search(&queries, &SearchConfig { progress: false }).unwrap();
//! assert_eq!(results.hits.len(), 1);
//! assert!(results.hits[0].valid);
//! assert_eq!(results.summaries[0].n_valid_hits, 1);
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;

use orfeval_core::{OrfevalError, Result, Summarizable};
use serde::{Deserialize, Serialize};

use crate::annotation::GeneRecord;
use crate::genomic::spans_overlap;
use crate::summary::{summarize, HitSummary};

/// Options for [`ReferenceGenome::search`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Draw a progress bar on stderr while scanning queries.
    pub progress: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { progress: true }
    }
}

/// One query/subject overlap with its derived agreement flags.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit<'a> {
    /// The predicted gene.
    pub query: &'a GeneRecord,
    /// The reference feature it overlaps.
    pub subject: &'a GeneRecord,
    pub same_strand: bool,
    /// First shared base.
    pub overlap_start: u64,
    /// Last shared base.
    pub overlap_stop: u64,
    /// `overlap_stop - overlap_start`, so a single shared base gives 0.
    /// Always below the query length.
    pub overlap_length: u64,
    pub start_aligned: bool,
    pub stop_aligned: bool,
    /// Identical coordinates on the same strand.
    pub exact_match: bool,
    /// Stop coordinates differ by a multiple of three.
    pub in_frame: bool,
    /// Same strand, in frame, and the subject is a coding sequence.
    pub valid: bool,
}

impl<'a> Hit<'a> {
    /// Build a hit from two records, or `None` if they do not overlap.
    ///
    /// Contigs are not compared; callers pair records from the same contig.
    pub fn between(query: &'a GeneRecord, subject: &'a GeneRecord) -> Option<Self> {
        if !spans_overlap(query.start, query.stop, subject.start, subject.stop) {
            return None;
        }

        let same_strand = query.strand == subject.strand;
        let overlap_start = query.start.max(subject.start);
        let overlap_stop = query.stop.min(subject.stop);
        let start_aligned = query.start == subject.start;
        let stop_aligned = query.stop == subject.stop;
        let in_frame = (query.stop as i64 - subject.stop as i64).rem_euclid(3) == 0;

        Some(Self {
            query,
            subject,
            same_strand,
            overlap_start,
            overlap_stop,
            overlap_length: overlap_stop - overlap_start,
            start_aligned,
            stop_aligned,
            exact_match: start_aligned && stop_aligned && same_strand,
            in_frame,
            valid: same_strand && in_frame && subject.is_cds(),
        })
    }
}

/// Output of [`ReferenceGenome::search`].
#[derive(Debug, Clone)]
pub struct SearchResults<'a> {
    /// Every hit, grouped by query in query order.
    pub hits: Vec<Hit<'a>>,
    /// One summary per query, in query order, including queries without hits.
    pub summaries: Vec<HitSummary>,
}

impl<'a> SearchResults<'a> {
    /// Hits belonging to one query.
    pub fn hits_for(&self, query_id: &str) -> Vec<&Hit<'a>> {
        self.hits.iter().filter(|h| h.query.id == query_id).collect()
    }

    /// Number of queries with at least one hit.
    pub fn n_queries_with_hits(&self) -> usize {
        self.summaries.iter().filter(|s| s.n_hits > 0).count()
    }
}

/// Annotated features of one reference genome.
#[derive(Debug, Clone)]
pub struct ReferenceGenome {
    genome_id: String,
    features: Vec<GeneRecord>,
    /// Per-contig feature indices, sorted by start.
    by_contig: HashMap<String, Vec<usize>>,
}

impl ReferenceGenome {
    /// Index a genome's features for overlap search.
    ///
    /// Features on a contig are ordered by start; features sharing a start
    /// keep their input order.
    ///
    /// # Errors
    ///
    /// Returns an error if any feature has invalid coordinates.
    pub fn new(genome_id: impl Into<String>, features: Vec<GeneRecord>) -> Result<Self> {
        let mut by_contig: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, feature) in features.iter().enumerate() {
            feature.validate()?;
            by_contig
                .entry(feature.contig_id.clone())
                .or_default()
                .push(idx);
        }
        for indices in by_contig.values_mut() {
            indices.sort_by_key(|&i| features[i].start);
        }

        Ok(Self {
            genome_id: genome_id.into(),
            features,
            by_contig,
        })
    }

    pub fn genome_id(&self) -> &str {
        &self.genome_id
    }

    /// All features in input order.
    pub fn features(&self) -> &[GeneRecord] {
        &self.features
    }

    /// Number of annotated features.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the genome has no features.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Number of distinct contigs with at least one feature.
    pub fn n_contigs(&self) -> usize {
        self.by_contig.len()
    }

    /// Every feature on the query's contig that overlaps the query.
    ///
    /// Hits come back in start order. An unknown contig yields no hits.
    pub fn hits<'a>(&'a self, query: &'a GeneRecord) -> Vec<Hit<'a>> {
        let Some(indices) = self.by_contig.get(&query.contig_id) else {
            return Vec::new();
        };

        let mut hits = Vec::new();
        for &idx in indices {
            let subject = &self.features[idx];
            // Sorted by start: nothing further along can overlap.
            if subject.start > query.stop {
                break;
            }
            if let Some(hit) = Hit::between(query, subject) {
                hits.push(hit);
            }
        }
        hits
    }

    /// Search every query against this genome and summarize the hits.
    ///
    /// # Errors
    ///
    /// Returns an error if two queries share an id.
    pub fn search<'a>(
        &'a self,
        queries: &'a [GeneRecord],
        config: &SearchConfig,
    ) -> Result<SearchResults<'a>> {
        let mut seen = HashSet::with_capacity(queries.len());
        for query in queries {
            if !seen.insert(query.id.as_str()) {
                return Err(OrfevalError::InvalidInput(format!(
                    "duplicate query id {}",
                    query.id
                )));
            }
        }

        #[cfg(feature = "parallel")]
        let hits: Vec<Hit<'a>> = {
            use indicatif::ParallelProgressIterator;
            use rayon::prelude::*;
            let bar = search_progress(queries.len(), config.progress);
            let per_query: Vec<Vec<Hit<'a>>> = queries
                .par_iter()
                .progress_with(bar.clone())
                .map(|query| self.hits(query))
                .collect();
            bar.finish_and_clear();
            per_query.into_iter().flatten().collect()
        };
        #[cfg(not(feature = "parallel"))]
        let hits: Vec<Hit<'a>> = {
            let bar = search_progress(queries.len(), config.progress);
            let mut hits = Vec::new();
            for query in queries {
                hits.extend(self.hits(query));
                bar.inc(1);
            }
            bar.finish_and_clear();
            hits
        };

        let summaries = summarize(queries, &hits);
        tracing::info!(
            genome_id = %self.genome_id,
            n_queries = queries.len(),
            n_hits = hits.len(),
            "reference search complete"
        );
        Ok(SearchResults { hits, summaries })
    }
}

fn search_progress(len: usize, visible: bool) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    if !visible {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len as u64);
    let style = ProgressStyle::with_template(
        "{spinner:.green} ReferenceGenome.search [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);
    bar
}

impl fmt::Display for ReferenceGenome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.genome_id)
    }
}

impl Summarizable for ReferenceGenome {
    fn summary(&self) -> String {
        let n_cds = self.features.iter().filter(|f| f.is_cds()).count();
        format!(
            "ReferenceGenome {}: {} features ({} CDS) on {} contigs",
            self.genome_id,
            self.len(),
            n_cds,
            self.n_contigs()
        )
    }
}
