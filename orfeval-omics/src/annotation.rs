//! Gene records shared by predicted genes and reference annotations.
//!
//! A [`GeneRecord`] is one row of a gene table: either a gene-finder call
//! (the query side of a comparison) or an annotated feature from a
//! reference genome (the subject side).

use core::fmt;
use core::str::FromStr;

use orfeval_core::{Annotated, OrfevalError, Result, Summarizable};
use serde::{Deserialize, Serialize};

use crate::genomic::{GeneInterval, Strand};

/// Product annotation given to ORFs with no functional assignment.
pub const HYPOTHETICAL_PRODUCT: &str = "hypothetical protein";

/// Evidence tag for features called by sequence-based prediction alone.
pub const AB_INITIO_EVIDENCE: &str = "ab initio prediction";

/// Annotated feature type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FeatureType {
    Cds,
    TRna,
    RRna,
    NcRna,
    TmRna,
    Pseudogene,
    RepeatRegion,
    Other(String),
}

impl FeatureType {
    /// Whether this is a coding sequence.
    pub fn is_cds(&self) -> bool {
        matches!(self, FeatureType::Cds)
    }

    fn as_str(&self) -> &str {
        match self {
            FeatureType::Cds => "CDS",
            FeatureType::TRna => "tRNA",
            FeatureType::RRna => "rRNA",
            FeatureType::NcRna => "ncRNA",
            FeatureType::TmRna => "tmRNA",
            FeatureType::Pseudogene => "pseudogene",
            FeatureType::RepeatRegion => "repeat_region",
            FeatureType::Other(s) => s,
        }
    }
}

impl From<&str> for FeatureType {
    fn from(s: &str) -> Self {
        match s {
            "CDS" => FeatureType::Cds,
            "tRNA" => FeatureType::TRna,
            "rRNA" => FeatureType::RRna,
            "ncRNA" => FeatureType::NcRna,
            "tmRNA" => FeatureType::TmRna,
            "pseudogene" => FeatureType::Pseudogene,
            "repeat_region" => FeatureType::RepeatRegion,
            other => FeatureType::Other(other.to_string()),
        }
    }
}

impl From<String> for FeatureType {
    fn from(s: String) -> Self {
        FeatureType::from(s.as_str())
    }
}

impl From<FeatureType> for String {
    fn from(feature: FeatureType) -> String {
        feature.as_str().to_string()
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Two-character partial-gene indicator (`00`, `10`, `01`, `11`).
///
/// The first character marks an incomplete left edge, the second an
/// incomplete right edge. `00` is a complete gene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Partial {
    pub left: bool,
    pub right: bool,
}

impl Partial {
    /// A complete gene (`00`).
    pub const COMPLETE: Partial = Partial {
        left: false,
        right: false,
    };

    /// Whether both edges are complete.
    pub fn is_complete(&self) -> bool {
        !self.left && !self.right
    }
}

impl FromStr for Partial {
    type Err = OrfevalError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = s.trim().as_bytes();
        let flag = |b: u8| match b {
            b'0' => Ok(false),
            b'1' => Ok(true),
            _ => Err(OrfevalError::Parse(format!(
                "partial indicator must be two of '0'/'1', got {s:?}"
            ))),
        };
        if bytes.len() != 2 {
            return Err(OrfevalError::Parse(format!(
                "partial indicator must be two characters, got {s:?}"
            )));
        }
        Ok(Partial {
            left: flag(bytes[0])?,
            right: flag(bytes[1])?,
        })
    }
}

impl TryFrom<String> for Partial {
    type Error = OrfevalError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Partial> for String {
    fn from(p: Partial) -> String {
        p.to_string()
    }
}

impl fmt::Display for Partial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", u8::from(self.left), u8::from(self.right))
    }
}

/// One gene or annotated feature.
///
/// Coordinates are 1-based with `stop` inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneRecord {
    pub id: String,
    pub genome_id: String,
    pub contig_id: String,
    pub start: u64,
    pub stop: u64,
    pub strand: Strand,
    pub feature: FeatureType,
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub locus_tag: Option<String>,
    #[serde(default)]
    pub evidence_type: Option<String>,
    #[serde(default)]
    pub partial: Option<Partial>,
}

impl GeneRecord {
    /// Create a coding-sequence record with no optional annotations.
    ///
    /// Returns an error if the coordinates do not form a valid interval.
    pub fn cds(
        id: impl Into<String>,
        genome_id: impl Into<String>,
        contig_id: impl Into<String>,
        start: u64,
        stop: u64,
        strand: Strand,
    ) -> Result<Self> {
        let record = Self {
            id: id.into(),
            genome_id: genome_id.into(),
            contig_id: contig_id.into(),
            start,
            stop,
            strand,
            feature: FeatureType::Cds,
            product: None,
            locus_tag: None,
            evidence_type: None,
            partial: None,
        };
        record.validate()?;
        Ok(record)
    }

    /// Builder-style setter for the feature type.
    pub fn with_feature(mut self, feature: FeatureType) -> Self {
        self.feature = feature;
        self
    }

    /// Builder-style setter for the product annotation.
    pub fn with_product(mut self, product: impl Into<String>) -> Self {
        self.product = Some(product.into());
        self
    }

    /// Builder-style setter for the evidence type.
    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence_type = Some(evidence.into());
        self
    }

    /// Builder-style setter for the locus tag.
    pub fn with_locus_tag(mut self, locus_tag: impl Into<String>) -> Self {
        self.locus_tag = Some(locus_tag.into());
        self
    }

    /// Builder-style setter for the partial indicator.
    pub fn with_partial(mut self, partial: Partial) -> Self {
        self.partial = Some(partial);
        self
    }

    /// Check that the coordinates are 1-based and ordered.
    pub fn validate(&self) -> Result<()> {
        if self.start == 0 || self.start > self.stop {
            return Err(OrfevalError::InvalidInput(format!(
                "{}: invalid coordinates {}..{}",
                self.id, self.start, self.stop
            )));
        }
        Ok(())
    }

    /// Length in nucleotides (both ends inclusive).
    pub fn len(&self) -> u64 {
        self.stop - self.start + 1
    }

    /// Always `false` for a validated record.
    pub fn is_empty(&self) -> bool {
        self.stop < self.start
    }

    /// Whether this record is a coding sequence.
    pub fn is_cds(&self) -> bool {
        self.feature.is_cds()
    }

    /// Whether the product annotation equals `placeholder`.
    pub fn is_hypothetical(&self, placeholder: &str) -> bool {
        self.product.as_deref() == Some(placeholder)
    }

    /// Whether the evidence type equals `evidence`.
    pub fn is_ab_initio(&self, evidence: &str) -> bool {
        self.evidence_type.as_deref() == Some(evidence)
    }

    /// The record as a [`GeneInterval`].
    pub fn interval(&self) -> GeneInterval {
        GeneInterval {
            contig: self.contig_id.clone(),
            start: self.start,
            stop: self.stop,
            strand: self.strand,
        }
    }

    /// Length in codons; see [`codon_length`].
    pub fn codon_length(&self) -> u64 {
        codon_length(self.start, self.stop)
    }
}

impl Annotated for GeneRecord {
    fn name(&self) -> &str {
        &self.id
    }

    fn description(&self) -> Option<&str> {
        self.product.as_deref()
    }
}

impl Summarizable for GeneRecord {
    fn summary(&self) -> String {
        format!(
            "{}: {} {}:{}-{} ({}, {} nt)",
            self.id,
            self.feature,
            self.contig_id,
            self.start,
            self.stop,
            self.strand,
            self.len()
        )
    }
}

/// Length of `[start, stop]` in codons, rounding down.
///
/// Emits a warning when the nucleotide length is not a multiple of three.
pub fn codon_length(start: u64, stop: u64) -> u64 {
    let nt = (stop + 1).saturating_sub(start);
    if nt % 3 != 0 {
        tracing::warn!(start, stop, nt, "gene length is not divisible by three");
    }
    nt / 3
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> GeneRecord {
        GeneRecord::cds("NC_000913.3_1", "GCF_000005845.2", "NC_000913.3", 337, 2799, Strand::Forward)
            .unwrap()
            .with_product("aspartate kinase")
            .with_locus_tag("b0002")
            .with_partial(Partial::COMPLETE)
    }

    #[test]
    fn test_feature_type_text() {
        assert_eq!(FeatureType::from("CDS"), FeatureType::Cds);
        assert_eq!(FeatureType::from("tRNA").to_string(), "tRNA");
        assert_eq!(
            FeatureType::from("mobile_element"),
            FeatureType::Other("mobile_element".into())
        );
        assert!(FeatureType::Cds.is_cds());
        assert!(!FeatureType::Pseudogene.is_cds());
    }

    #[test]
    fn test_partial_parse() {
        let p: Partial = "10".parse().unwrap();
        assert!(p.left && !p.right);
        assert!(!p.is_complete());
        assert!("00".parse::<Partial>().unwrap().is_complete());
        assert_eq!(Partial { left: false, right: true }.to_string(), "01");
        assert!("0".parse::<Partial>().is_err());
        assert!("0x".parse::<Partial>().is_err());
    }

    #[test]
    fn test_record_len_and_codons() {
        let g = sample();
        assert_eq!(g.len(), 2463);
        assert_eq!(g.codon_length(), 821);
    }

    #[test]
    fn test_codon_length_rounds_down() {
        assert_eq!(codon_length(1, 10), 3);
        assert_eq!(codon_length(5, 4), 0);
    }

    #[test]
    fn test_invalid_coordinates() {
        assert!(GeneRecord::cds("x", "g", "c", 0, 10, Strand::Forward).is_err());
        assert!(GeneRecord::cds("x", "g", "c", 20, 10, Strand::Forward).is_err());
    }

    #[test]
    fn test_hypothetical_and_ab_initio() {
        let g = sample()
            .with_product(HYPOTHETICAL_PRODUCT)
            .with_evidence(AB_INITIO_EVIDENCE);
        assert!(g.is_hypothetical(HYPOTHETICAL_PRODUCT));
        assert!(g.is_ab_initio(AB_INITIO_EVIDENCE));
        assert!(!sample().is_hypothetical(HYPOTHETICAL_PRODUCT));
    }

    #[test]
    fn test_annotated_and_summary() {
        let g = sample();
        assert_eq!(g.name(), "NC_000913.3_1");
        assert_eq!(g.description(), Some("aspartate kinase"));
        assert_eq!(
            g.summary(),
            "NC_000913.3_1: CDS NC_000913.3:337-2799 (+, 2463 nt)"
        );
    }

    #[test]
    fn test_interval() {
        let iv = sample().interval();
        assert_eq!(iv.len(), 2463);
        assert_eq!(iv.strand, Strand::Forward);
    }
}
