//! Genomic primitives: strand and interval types.
//!
//! Gene-finder output and reference annotations both use 1-based, fully
//! closed coordinates `[start, stop]`, so that is the convention here too.

use core::fmt;

use orfeval_core::{OrfevalError, Result};
use serde::{Deserialize, Serialize};

/// Strand orientation on a contig.
///
/// Serialized as the integers `1` and `-1`, matching gene-finder tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum Strand {
    Forward,
    Reverse,
}

impl Strand {
    /// Returns `true` if this is the forward (+) strand.
    pub fn is_forward(&self) -> bool {
        matches!(self, Strand::Forward)
    }

    /// Returns `true` if this is the reverse (-) strand.
    pub fn is_reverse(&self) -> bool {
        matches!(self, Strand::Reverse)
    }

    /// `1` for forward, `-1` for reverse.
    pub fn sign(&self) -> i8 {
        match self {
            Strand::Forward => 1,
            Strand::Reverse => -1,
        }
    }
}

impl TryFrom<i8> for Strand {
    type Error = OrfevalError;

    fn try_from(value: i8) -> Result<Self> {
        match value {
            1 => Ok(Strand::Forward),
            -1 => Ok(Strand::Reverse),
            other => Err(OrfevalError::Parse(format!(
                "strand must be 1 or -1, got {other}"
            ))),
        }
    }
}

impl From<Strand> for i8 {
    fn from(strand: Strand) -> i8 {
        strand.sign()
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strand::Forward => write!(f, "+"),
            Strand::Reverse => write!(f, "-"),
        }
    }
}

/// A closed interval `[start, stop]` on a contig (1-based).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GeneInterval {
    pub contig: String,
    pub start: u64,
    pub stop: u64,
    pub strand: Strand,
}

impl GeneInterval {
    /// Create a new interval.
    ///
    /// Returns an error if `start` is zero or `start > stop`.
    pub fn new(contig: impl Into<String>, start: u64, stop: u64, strand: Strand) -> Result<Self> {
        if start == 0 {
            return Err(OrfevalError::InvalidInput(
                "interval start is 1-based and must be > 0".into(),
            ));
        }
        if start > stop {
            return Err(OrfevalError::InvalidInput(format!(
                "interval start ({start}) must not exceed stop ({stop})"
            )));
        }
        Ok(Self {
            contig: contig.into(),
            start,
            stop,
            strand,
        })
    }

    /// Length of the interval in bases (both ends inclusive).
    pub fn len(&self) -> u64 {
        self.stop - self.start + 1
    }

    /// Always `false`; a closed interval covers at least one base.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether this interval overlaps `other`.
    ///
    /// Two intervals on the same contig overlap unless one starts after the
    /// other stops. Strand is ignored.
    pub fn overlaps(&self, other: &GeneInterval) -> bool {
        self.contig == other.contig && spans_overlap(self.start, self.stop, other.start, other.stop)
    }

    /// Return the overlapping region, or `None` if the intervals don't overlap.
    ///
    /// The result carries this interval's strand.
    pub fn intersect(&self, other: &GeneInterval) -> Option<GeneInterval> {
        if !self.overlaps(other) {
            return None;
        }
        Some(GeneInterval {
            contig: self.contig.clone(),
            start: self.start.max(other.start),
            stop: self.stop.min(other.stop),
            strand: self.strand,
        })
    }
}

impl fmt::Display for GeneInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}-{}({})",
            self.contig, self.start, self.stop, self.strand
        )
    }
}

/// Closed-span overlap test shared by intervals and gene records.
#[inline]
pub(crate) fn spans_overlap(a_start: u64, a_stop: u64, b_start: u64, b_stop: u64) -> bool {
    a_start <= b_stop && b_start <= a_stop
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strand_display() {
        assert_eq!(Strand::Forward.to_string(), "+");
        assert_eq!(Strand::Reverse.to_string(), "-");
    }

    #[test]
    fn test_strand_sign_round_trip() {
        assert_eq!(Strand::try_from(1).unwrap(), Strand::Forward);
        assert_eq!(Strand::try_from(-1).unwrap(), Strand::Reverse);
        assert_eq!(i8::from(Strand::Reverse), -1);
        assert!(Strand::try_from(0).is_err());
    }

    #[test]
    fn test_interval_invalid() {
        assert!(GeneInterval::new("c1", 0, 10, Strand::Forward).is_err());
        assert!(GeneInterval::new("c1", 11, 10, Strand::Forward).is_err());
        assert!(GeneInterval::new("c1", 10, 10, Strand::Forward).is_ok());
    }

    #[test]
    fn test_interval_len_is_inclusive() {
        let iv = GeneInterval::new("c1", 1, 300, Strand::Forward).unwrap();
        assert_eq!(iv.len(), 300);
    }

    #[test]
    fn test_interval_overlaps() {
        let a = GeneInterval::new("c1", 100, 200, Strand::Forward).unwrap();
        let b = GeneInterval::new("c1", 200, 300, Strand::Reverse).unwrap();
        let c = GeneInterval::new("c1", 201, 300, Strand::Forward).unwrap();
        let d = GeneInterval::new("c2", 100, 200, Strand::Forward).unwrap();

        assert!(a.overlaps(&b)); // shared base 200
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
        assert!(!a.overlaps(&d));
    }

    #[test]
    fn test_interval_intersect() {
        let a = GeneInterval::new("c1", 100, 200, Strand::Forward).unwrap();
        let b = GeneInterval::new("c1", 150, 250, Strand::Reverse).unwrap();
        let isect = a.intersect(&b).unwrap();
        assert_eq!((isect.start, isect.stop), (150, 200));
        assert_eq!(isect.strand, Strand::Forward);
        assert_eq!(isect.len(), 51);
    }

    #[test]
    fn test_interval_display() {
        let iv = GeneInterval::new("NC_000913.3", 337, 2799, Strand::Forward).unwrap();
        assert_eq!(iv.to_string(), "NC_000913.3:337-2799(+)");
    }
}
