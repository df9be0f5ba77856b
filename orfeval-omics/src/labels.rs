//! Label assignment for predicted genes compared against a reference.
//!
//! Every predicted gene falls into exactly one [`Label`]:
//!
//! | label              | top hit                                   | certainty |
//! |--------------------|-------------------------------------------|-----------|
//! | `Real`             | valid, annotation not a placeholder       | positive  |
//! | `Spurious`         | present but invalid, not a placeholder    | negative  |
//! | `Intergenic`       | none (or too short and out of frame)      | uncertain |
//! | `SuspectMatch`     | valid, placeholder ab-initio annotation   | uncertain |
//! | `SuspectConflict`  | invalid, placeholder ab-initio annotation | uncertain |
//!
//! A "placeholder" annotation is a reference feature whose product is the
//! generic hypothetical-protein string and whose only evidence is ab-initio
//! prediction: the reference itself may be a gene-finder artifact.

use core::fmt;
use std::collections::BTreeMap;

use orfeval_core::{OrfevalError, Result};
use serde::{Deserialize, Serialize};

use crate::annotation::{codon_length, GeneRecord, AB_INITIO_EVIDENCE, HYPOTHETICAL_PRODUCT};
use crate::genomic::Strand;
use crate::summary::HitSummary;

/// Thresholds and vocabulary for label assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelConfig {
    /// Top hits overlapping fewer bases than this, and out of frame, count
    /// as intergenic.
    pub min_overlap: u64,
    /// Product string of unannotated reference features.
    pub placeholder_product: String,
    /// Evidence string of reference features called without homology support.
    pub ab_initio_evidence: String,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            min_overlap: 0,
            placeholder_product: HYPOTHETICAL_PRODUCT.to_string(),
            ab_initio_evidence: AB_INITIO_EVIDENCE.to_string(),
        }
    }
}

/// Mutually exclusive label categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Real,
    Spurious,
    Intergenic,
    SuspectMatch,
    SuspectConflict,
}

impl Label {
    /// All categories in index order.
    pub const ALL: [Label; 5] = [
        Label::Real,
        Label::Spurious,
        Label::Intergenic,
        Label::SuspectMatch,
        Label::SuspectConflict,
    ];

    /// Stable integer code (0..=4).
    pub fn as_index(&self) -> usize {
        match self {
            Label::Real => 0,
            Label::Spurious => 1,
            Label::Intergenic => 2,
            Label::SuspectMatch => 3,
            Label::SuspectConflict => 4,
        }
    }

    /// Inverse of [`Label::as_index`].
    pub fn from_index(index: usize) -> Option<Label> {
        Label::ALL.get(index).copied()
    }

    /// Binary training target: real genes are 1, spurious genes 0.
    ///
    /// Uncertain categories have no target.
    pub fn binary_target(&self) -> Option<usize> {
        match self {
            Label::Real => Some(1),
            Label::Spurious => Some(0),
            _ => None,
        }
    }

    /// Whether the label is one of the uncertain categories.
    pub fn is_uncertain(&self) -> bool {
        self.binary_target().is_none()
    }

    fn as_str(&self) -> &'static str {
        match self {
            Label::Real => "real",
            Label::Spurious => "spurious",
            Label::Intergenic => "intergenic",
            Label::SuspectMatch => "suspect_match",
            Label::SuspectConflict => "suspect_conflict",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The five label predicates, each evaluated on its own.
///
/// Kept separate from [`Label`] so that the exclusivity of the rules can be
/// checked rather than assumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LabelFlags {
    pub real: bool,
    pub spurious: bool,
    pub intergenic: bool,
    pub suspect_match: bool,
    pub suspect_conflict: bool,
}

impl LabelFlags {
    /// Evaluate every predicate against a summary.
    pub fn from_summary(summary: &HitSummary, config: &LabelConfig) -> Self {
        let suspect = is_suspect(summary, config);
        let intergenic = summary.n_hits == 0
            || (summary.top_hit_overlap < config.min_overlap && !summary.top_hit_in_frame);
        let valid = summary.top_hit_valid;

        Self {
            real: !intergenic && !suspect && valid,
            spurious: !intergenic && !suspect && !valid,
            intergenic,
            suspect_match: !intergenic && suspect && valid,
            suspect_conflict: !intergenic && suspect && !valid,
        }
    }

    /// Number of predicates that hold.
    pub fn count(&self) -> usize {
        [
            self.real,
            self.spurious,
            self.intergenic,
            self.suspect_match,
            self.suspect_conflict,
        ]
        .iter()
        .filter(|&&f| f)
        .count()
    }

    /// The single label these flags describe.
    ///
    /// # Errors
    ///
    /// Returns [`OrfevalError::Invariant`] unless exactly one flag is set.
    pub fn label(&self) -> Result<Label> {
        if self.count() != 1 {
            return Err(OrfevalError::Invariant(format!(
                "expected exactly one label category, found {} ({self:?})",
                self.count()
            )));
        }
        let label = if self.real {
            Label::Real
        } else if self.spurious {
            Label::Spurious
        } else if self.intergenic {
            Label::Intergenic
        } else if self.suspect_match {
            Label::SuspectMatch
        } else {
            Label::SuspectConflict
        };
        Ok(label)
    }
}

/// Whether the top hit is a placeholder ab-initio annotation.
///
/// Always `false` for queries without hits.
pub fn is_suspect(summary: &HitSummary, config: &LabelConfig) -> bool {
    summary.top_hit_product.as_deref() == Some(config.placeholder_product.as_str())
        && summary.top_hit_evidence_type.as_deref() == Some(config.ab_initio_evidence.as_str())
}

/// Label one summary.
pub fn assign_label(summary: &HitSummary, config: &LabelConfig) -> Result<Label> {
    LabelFlags::from_summary(summary, config).label()
}

/// Label every summary, failing on the first one that breaks exclusivity.
pub fn assign_labels(summaries: &[HitSummary], config: &LabelConfig) -> Result<Vec<Label>> {
    summaries.iter().map(|s| assign_label(s, config)).collect()
}

/// Count genes per category; every category is present in the map.
pub fn label_counts(labels: &[Label]) -> BTreeMap<Label, usize> {
    let mut counts: BTreeMap<Label, usize> = Label::ALL.iter().map(|&l| (l, 0)).collect();
    for label in labels {
        *counts.entry(*label).or_default() += 1;
    }
    counts
}

/// A predicted gene joined with its reference summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparedGene {
    pub query: GeneRecord,
    pub summary: HitSummary,
}

impl ComparedGene {
    /// Join a query with its summary.
    ///
    /// # Errors
    ///
    /// Returns an error if the summary belongs to a different query.
    pub fn new(query: GeneRecord, summary: HitSummary) -> Result<Self> {
        if query.id != summary.query_id {
            return Err(OrfevalError::InvalidInput(format!(
                "summary for {} cannot be joined to query {}",
                summary.query_id, query.id
            )));
        }
        Ok(Self { query, summary })
    }

    pub fn label(&self, config: &LabelConfig) -> Result<Label> {
        assign_label(&self.summary, config)
    }

    fn top_hit_span(&self) -> Option<(u64, u64)> {
        Some((self.summary.top_hit_start?, self.summary.top_hit_stop?))
    }

    /// The prediction starts downstream of the top hit's start codon.
    pub fn n_truncated(&self) -> bool {
        self.top_hit_span().is_some_and(|(start, stop)| match self.query.strand {
            Strand::Forward => self.query.start > start,
            Strand::Reverse => self.query.stop < stop,
        })
    }

    /// The prediction stops upstream of the top hit's stop codon.
    pub fn c_truncated(&self) -> bool {
        self.top_hit_span().is_some_and(|(start, stop)| match self.query.strand {
            Strand::Forward => self.query.stop < stop,
            Strand::Reverse => self.query.start > start,
        })
    }

    /// The prediction starts upstream of the top hit's start codon.
    pub fn n_extended(&self) -> bool {
        self.top_hit_span().is_some_and(|(start, stop)| match self.query.strand {
            Strand::Forward => self.query.start < start,
            Strand::Reverse => self.query.stop > stop,
        })
    }

    /// The prediction stops downstream of the top hit's stop codon.
    pub fn c_extended(&self) -> bool {
        self.top_hit_span().is_some_and(|(start, stop)| match self.query.strand {
            Strand::Forward => self.query.stop > stop,
            Strand::Reverse => self.query.start < start,
        })
    }

    /// Length of the prediction in codons.
    pub fn codon_length(&self) -> u64 {
        self.query.codon_length()
    }

    /// Length of the top hit in codons, if there is one.
    pub fn top_hit_codon_length(&self) -> Option<u64> {
        self.top_hit_span()
            .map(|(start, stop)| codon_length(start, stop))
    }
}

/// Codon lengths of the predictions, or of their top hits.
///
/// Warns once if any nucleotide length is not a multiple of three, and once
/// if any gene has no top hit to measure.
pub fn codon_lengths(genes: &[ComparedGene], top_hit: bool) -> Vec<Option<u64>> {
    let spans: Vec<Option<(u64, u64)>> = genes
        .iter()
        .map(|g| {
            if top_hit {
                g.top_hit_span()
            } else {
                Some((g.query.start, g.query.stop))
            }
        })
        .collect();

    let n_ragged = spans
        .iter()
        .flatten()
        .filter(|(start, stop)| (stop + 1 - start) % 3 != 0)
        .count();
    if n_ragged > 0 {
        tracing::warn!(n_ragged, "not all gene lengths are divisible by three");
    }
    let n_missing = spans.iter().filter(|s| s.is_none()).count();
    if n_missing > 0 {
        tracing::warn!(
            n_missing,
            "some genes have no reference top hit; their lengths are missing"
        );
    }

    spans
        .into_iter()
        .map(|span| span.map(|(start, stop)| (stop + 1 - start) / 3))
        .collect()
}

/// Drop genes marked partial by the gene finder whose top hit is also
/// partial, or carries no partial indicator at all.
///
/// # Errors
///
/// Returns an error if any prediction lacks a partial indicator.
pub fn remove_partial(genes: Vec<ComparedGene>) -> Result<Vec<ComparedGene>> {
    if let Some(g) = genes.iter().find(|g| g.query.partial.is_none()) {
        return Err(OrfevalError::InvalidInput(format!(
            "{} has no partial indicator",
            g.query.id
        )));
    }

    let before = genes.len();
    let kept: Vec<ComparedGene> = genes
        .into_iter()
        .filter(|g| {
            let query_partial = g.query.partial.is_some_and(|p| !p.is_complete());
            let ref_partial = g.summary.top_hit_partial.map_or(true, |p| !p.is_complete());
            !(query_partial && ref_partial)
        })
        .collect();

    tracing::info!(
        removed = before - kept.len(),
        "removed sequences marked as partial by both the gene finder and the reference"
    );
    Ok(kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::Partial;
    use proptest::prelude::*;

    fn hit_summary(valid: bool, product: Option<&str>, evidence: Option<&str>) -> HitSummary {
        let mut s = HitSummary::empty("q");
        s.n_hits = 1;
        s.n_valid_hits = usize::from(valid);
        s.top_hit_id = Some("ref".into());
        s.top_hit_valid = valid;
        s.top_hit_in_frame = valid;
        s.top_hit_overlap = 300;
        s.top_hit_start = Some(100);
        s.top_hit_stop = Some(399);
        s.top_hit_product = product.map(String::from);
        s.top_hit_evidence_type = evidence.map(String::from);
        s
    }

    fn label(s: &HitSummary) -> Label {
        assign_label(s, &LabelConfig::default()).unwrap()
    }

    #[test]
    fn test_each_category() {
        assert_eq!(label(&HitSummary::empty("q")), Label::Intergenic);
        assert_eq!(label(&hit_summary(true, Some("DnaA"), None)), Label::Real);
        assert_eq!(label(&hit_summary(false, Some("DnaA"), None)), Label::Spurious);
        assert_eq!(
            label(&hit_summary(true, Some(HYPOTHETICAL_PRODUCT), Some(AB_INITIO_EVIDENCE))),
            Label::SuspectMatch
        );
        assert_eq!(
            label(&hit_summary(false, Some(HYPOTHETICAL_PRODUCT), Some(AB_INITIO_EVIDENCE))),
            Label::SuspectConflict
        );
    }

    #[test]
    fn test_hypothetical_without_ab_initio_is_not_suspect() {
        let s = hit_summary(true, Some(HYPOTHETICAL_PRODUCT), Some("similar to AA sequence"));
        assert_eq!(label(&s), Label::Real);
    }

    #[test]
    fn test_min_overlap_threshold() {
        let config = LabelConfig {
            min_overlap: 50,
            ..Default::default()
        };
        let mut s = hit_summary(false, Some("DnaA"), None);
        s.top_hit_overlap = 20;
        assert_eq!(assign_label(&s, &config).unwrap(), Label::Intergenic);

        // An in-frame short overlap still counts as a hit.
        s.top_hit_in_frame = true;
        assert_eq!(assign_label(&s, &config).unwrap(), Label::Spurious);
    }

    #[test]
    fn test_flags_reject_multiple_categories() {
        let flags = LabelFlags {
            real: true,
            spurious: true,
            ..Default::default()
        };
        assert!(matches!(flags.label(), Err(OrfevalError::Invariant(_))));
        assert!(LabelFlags::default().label().is_err());
    }

    #[test]
    fn test_label_index_round_trip() {
        for l in Label::ALL {
            assert_eq!(Label::from_index(l.as_index()), Some(l));
        }
        assert_eq!(Label::from_index(5), None);
        assert_eq!(Label::Real.binary_target(), Some(1));
        assert_eq!(Label::Spurious.binary_target(), Some(0));
        assert!(Label::Intergenic.is_uncertain());
        assert_eq!(Label::SuspectConflict.to_string(), "suspect_conflict");
    }

    #[test]
    fn test_label_counts() {
        let counts = label_counts(&[Label::Real, Label::Real, Label::Intergenic]);
        assert_eq!(counts[&Label::Real], 2);
        assert_eq!(counts[&Label::Intergenic], 1);
        assert_eq!(counts[&Label::Spurious], 0);
        assert_eq!(counts.len(), 5);
    }

    fn compared(start: u64, stop: u64, strand: Strand) -> ComparedGene {
        let query = GeneRecord::cds("q", "g", "c", start, stop, strand).unwrap();
        ComparedGene::new(query, hit_summary(true, None, None)).unwrap()
    }

    #[test]
    fn test_forward_truncation() {
        // Top hit spans 100..=399.
        let g = compared(130, 399, Strand::Forward);
        assert!(g.n_truncated() && !g.c_truncated());
        let g = compared(70, 369, Strand::Forward);
        assert!(g.n_extended() && g.c_truncated());
    }

    #[test]
    fn test_reverse_truncation() {
        // On the reverse strand the N-terminus sits at the high coordinate.
        let g = compared(100, 369, Strand::Reverse);
        assert!(g.n_truncated() && !g.c_truncated());
        let g = compared(70, 429, Strand::Reverse);
        assert!(g.n_extended() && g.c_extended());
    }

    #[test]
    fn test_truncation_without_top_hit() {
        let query = GeneRecord::cds("q", "g", "c", 1, 300, Strand::Forward).unwrap();
        let g = ComparedGene::new(query, HitSummary::empty("q")).unwrap();
        assert!(!g.n_truncated() && !g.c_truncated() && !g.n_extended() && !g.c_extended());
        assert_eq!(g.top_hit_codon_length(), None);
    }

    #[test]
    fn test_join_mismatch() {
        let query = GeneRecord::cds("a", "g", "c", 1, 300, Strand::Forward).unwrap();
        assert!(ComparedGene::new(query, HitSummary::empty("b")).is_err());
    }

    #[test]
    fn test_codon_lengths() {
        let with_hit = compared(100, 399, Strand::Forward);
        let query = GeneRecord::cds("q", "g", "c", 1, 301, Strand::Forward).unwrap();
        let without_hit = ComparedGene::new(query, HitSummary::empty("q")).unwrap();
        let genes = vec![with_hit, without_hit];

        assert_eq!(codon_lengths(&genes, false), vec![Some(100), Some(100)]);
        assert_eq!(codon_lengths(&genes, true), vec![Some(100), None]);
    }

    #[test]
    fn test_remove_partial() {
        let partial: Partial = "10".parse().unwrap();
        let mk = |id: &str, query_partial: Partial, ref_partial: Option<Partial>| {
            let query = GeneRecord::cds(id, "g", "c", 1, 300, Strand::Forward)
                .unwrap()
                .with_partial(query_partial);
            let mut summary = HitSummary::empty(id);
            summary.top_hit_partial = ref_partial;
            ComparedGene::new(query, summary).unwrap()
        };

        let genes = vec![
            mk("complete", Partial::COMPLETE, None),
            mk("both", partial, Some(partial)),
            mk("unmarked_ref", partial, None),
            mk("query_only", partial, Some(Partial::COMPLETE)),
        ];
        let kept = remove_partial(genes).unwrap();
        let ids: Vec<&str> = kept.iter().map(|g| g.query.id.as_str()).collect();
        assert_eq!(ids, vec!["complete", "query_only"]);
    }

    #[test]
    fn test_remove_partial_requires_indicator() {
        let query = GeneRecord::cds("q", "g", "c", 1, 300, Strand::Forward).unwrap();
        let g = ComparedGene::new(query, HitSummary::empty("q")).unwrap();
        assert!(remove_partial(vec![g]).is_err());
    }

    proptest! {
        #[test]
        fn exactly_one_category(
            n_hits in 0usize..4,
            valid in any::<bool>(),
            in_frame in any::<bool>(),
            overlap in 0u64..500,
            min_overlap in 0u64..200,
            hypothetical in any::<bool>(),
            ab_initio in any::<bool>(),
        ) {
            let mut s = HitSummary::empty("q");
            s.n_hits = n_hits;
            if n_hits > 0 {
                s.top_hit_valid = valid;
                s.top_hit_in_frame = in_frame || valid;
                s.top_hit_overlap = overlap;
                if hypothetical {
                    s.top_hit_product = Some(HYPOTHETICAL_PRODUCT.into());
                }
                if ab_initio {
                    s.top_hit_evidence_type = Some(AB_INITIO_EVIDENCE.into());
                }
            }
            let config = LabelConfig { min_overlap, ..Default::default() };
            let flags = LabelFlags::from_summary(&s, &config);
            prop_assert_eq!(flags.count(), 1);
            prop_assert!(flags.label().is_ok());
        }
    }
}
