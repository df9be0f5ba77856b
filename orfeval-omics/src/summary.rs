//! Per-query aggregation of reference hits.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::annotation::{FeatureType, GeneRecord, Partial};
use crate::genomic::Strand;
use crate::reference::Hit;

/// Aggregate of all hits for one query, with the top hit flattened into
/// `top_hit_*` columns.
///
/// A query without hits has zero counts, `false` flags and empty optional
/// fields. The flat layout is what the per-genome summary table stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitSummary {
    pub query_id: String,
    pub n_hits: usize,
    pub n_valid_hits: usize,
    pub n_hits_same_strand: usize,
    pub n_hits_opposite_strand: usize,
    pub n_hits_in_frame: usize,
    pub top_hit_id: Option<String>,
    pub top_hit_locus_tag: Option<String>,
    pub top_hit_feature: Option<FeatureType>,
    pub top_hit_product: Option<String>,
    pub top_hit_evidence_type: Option<String>,
    pub top_hit_partial: Option<Partial>,
    pub top_hit_start: Option<u64>,
    pub top_hit_stop: Option<u64>,
    pub top_hit_strand: Option<Strand>,
    pub top_hit_overlap: u64,
    pub top_hit_valid: bool,
    pub top_hit_in_frame: bool,
    pub top_hit_same_strand: bool,
}

impl HitSummary {
    /// Summary of a query with no hits.
    pub fn empty(query_id: impl Into<String>) -> Self {
        Self {
            query_id: query_id.into(),
            n_hits: 0,
            n_valid_hits: 0,
            n_hits_same_strand: 0,
            n_hits_opposite_strand: 0,
            n_hits_in_frame: 0,
            top_hit_id: None,
            top_hit_locus_tag: None,
            top_hit_feature: None,
            top_hit_product: None,
            top_hit_evidence_type: None,
            top_hit_partial: None,
            top_hit_start: None,
            top_hit_stop: None,
            top_hit_strand: None,
            top_hit_overlap: 0,
            top_hit_valid: false,
            top_hit_in_frame: false,
            top_hit_same_strand: false,
        }
    }

    /// Summarize the hits of a single query.
    ///
    /// All hits are assumed to belong to `query`.
    pub fn from_hits(query: &GeneRecord, hits: &[&Hit<'_>]) -> Self {
        let mut summary = Self::empty(query.id.clone());
        summary.n_hits = hits.len();
        summary.n_valid_hits = hits.iter().filter(|h| h.valid).count();
        summary.n_hits_same_strand = hits.iter().filter(|h| h.same_strand).count();
        summary.n_hits_opposite_strand = summary.n_hits - summary.n_hits_same_strand;
        summary.n_hits_in_frame = hits.iter().filter(|h| h.in_frame).count();

        if let Some(top) = top_hit(hits.iter().copied()) {
            let subject = top.subject;
            summary.top_hit_id = Some(subject.id.clone());
            summary.top_hit_locus_tag = subject.locus_tag.clone();
            summary.top_hit_feature = Some(subject.feature.clone());
            summary.top_hit_product = subject.product.clone();
            summary.top_hit_evidence_type = subject.evidence_type.clone();
            summary.top_hit_partial = subject.partial;
            summary.top_hit_start = Some(subject.start);
            summary.top_hit_stop = Some(subject.stop);
            summary.top_hit_strand = Some(subject.strand);
            summary.top_hit_overlap = top.overlap_length;
            summary.top_hit_valid = top.valid;
            summary.top_hit_in_frame = top.in_frame;
            summary.top_hit_same_strand = top.same_strand;
        }
        summary
    }

    /// Whether the query overlapped any reference feature.
    pub fn has_hits(&self) -> bool {
        self.n_hits > 0
    }
}

/// Pick the top hit: valid hits first, then the longest overlap.
///
/// Ties keep iteration order, so the same input always yields the same hit.
pub fn top_hit<'h, 'a: 'h, I>(hits: I) -> Option<&'h Hit<'a>>
where
    I: IntoIterator<Item = &'h Hit<'a>>,
{
    // min_by_key returns the first of equal minima.
    hits.into_iter()
        .min_by_key(|h| (!h.valid, std::cmp::Reverse(h.overlap_length)))
}

/// Build one summary per query, in query order.
///
/// Queries without hits get [`HitSummary::empty`].
pub fn summarize(queries: &[GeneRecord], hits: &[Hit<'_>]) -> Vec<HitSummary> {
    let mut grouped: HashMap<&str, Vec<&Hit<'_>>> = HashMap::new();
    for hit in hits {
        grouped.entry(hit.query.id.as_str()).or_default().push(hit);
    }

    queries
        .iter()
        .map(|query| match grouped.get(query.id.as_str()) {
            Some(query_hits) => HitSummary::from_hits(query, query_hits),
            None => HitSummary::empty(query.id.clone()),
        })
        .collect()
}
