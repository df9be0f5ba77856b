//! Delimited-text tables for gene records, hit summaries and labels.
//!
//! Files ending in `.tsv` or `.tab` are read and written tab-separated;
//! everything else is comma-separated. All tables have a header row whose
//! column names match the record field names.

use std::fs::File;
use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};
use orfeval_core::{OrfevalError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::annotation::GeneRecord;
use crate::labels::Label;
use crate::summary::HitSummary;

/// One row of a label table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledGene {
    pub query_id: String,
    pub genome_id: String,
    pub label: Label,
}

fn delimiter_for(path: &Path) -> u8 {
    match path.extension().and_then(|e| e.to_str()) {
        Some("tsv") | Some("tab") => b'\t',
        _ => b',',
    }
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| {
        OrfevalError::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {}", path.display(), e),
        ))
    })
}

fn read_rows<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<Vec<T>> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter_for(path))
        .from_reader(open(path)?);

    let mut rows = Vec::new();
    for (line, result) in reader.deserialize::<T>().enumerate() {
        let row: T = result.map_err(|e| {
            OrfevalError::Parse(format!("{} row {}: {}", path.display(), line + 1, e))
        })?;
        rows.push(row);
    }
    tracing::debug!(path = %path.display(), n_rows = rows.len(), "read table");
    Ok(rows)
}

fn write_rows<T: Serialize>(path: impl AsRef<Path>, rows: &[T]) -> Result<()> {
    let path = path.as_ref();
    let mut writer = WriterBuilder::new()
        .has_headers(true)
        .delimiter(delimiter_for(path))
        .from_path(path)
        .map_err(|e| OrfevalError::Parse(format!("{}: {}", path.display(), e)))?;

    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| OrfevalError::Parse(e.to_string()))?;
    }
    writer.flush()?;
    tracing::debug!(path = %path.display(), n_rows = rows.len(), "wrote table");
    Ok(())
}

/// Read gene records (predictions or reference features).
///
/// Every record is validated after parsing.
pub fn read_gene_records(path: impl AsRef<Path>) -> Result<Vec<GeneRecord>> {
    let records: Vec<GeneRecord> = read_rows(path)?;
    for record in &records {
        record.validate()?;
    }
    Ok(records)
}

/// Write gene records.
pub fn write_gene_records(path: impl AsRef<Path>, records: &[GeneRecord]) -> Result<()> {
    write_rows(path, records)
}

/// Read a per-genome summary table.
pub fn read_summaries(path: impl AsRef<Path>) -> Result<Vec<HitSummary>> {
    read_rows(path)
}

/// Write a per-genome summary table.
pub fn write_summaries(path: impl AsRef<Path>, summaries: &[HitSummary]) -> Result<()> {
    write_rows(path, summaries)
}

/// Read a label table.
pub fn read_labels(path: impl AsRef<Path>) -> Result<Vec<LabeledGene>> {
    read_rows(path)
}

/// Write a label table.
pub fn write_labels(path: impl AsRef<Path>, labels: &[LabeledGene]) -> Result<()> {
    write_rows(path, labels)
}

/// Extract an assembly accession from a file name.
///
/// `data/GCF_000005845.2_protein.faa` gives `GCF_000005845.2`.
///
/// # Errors
///
/// Returns an error if the file name does not start with an accession.
pub fn genome_id_from_path(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| OrfevalError::InvalidInput(format!("{}: no file name", path.display())))?;

    let mut parts = name.splitn(3, '_');
    let (prefix, accession) = match (parts.next(), parts.next()) {
        (Some(prefix), Some(rest)) => (prefix, rest),
        _ => {
            return Err(OrfevalError::InvalidInput(format!(
                "{name}: expected a GCF_/GCA_ accession"
            )))
        }
    };
    // The accession may run straight into the extension when nothing follows.
    let accession = match accession.split_once('.') {
        Some((digits, rest)) => {
            let version: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
            if version.is_empty() {
                digits.to_string()
            } else {
                format!("{digits}.{version}")
            }
        }
        None => accession.to_string(),
    };

    let is_accession = matches!(prefix, "GCF" | "GCA")
        && !accession.is_empty()
        && accession.split('.').next().is_some_and(|d| d.chars().all(|c| c.is_ascii_digit()));
    if !is_accession {
        return Err(OrfevalError::InvalidInput(format!(
            "{name}: expected a GCF_/GCA_ accession"
        )));
    }
    Ok(format!("{prefix}_{accession}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{FeatureType, Partial, HYPOTHETICAL_PRODUCT};
    use crate::genomic::Strand;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_gene_records_tsv() {
        let mut file = NamedTempFile::with_suffix(".tsv").unwrap();
        writeln!(
            file,
            "id\tgenome_id\tcontig_id\tstart\tstop\tstrand\tfeature\tproduct\tlocus_tag\tevidence_type\tpartial"
        )
        .unwrap();
        writeln!(file, "b0001\tGCF_1.1\tchr\t190\t255\t1\tCDS\tthr operon leader\tb0001\t\t00").unwrap();
        writeln!(file, "b0002\tGCF_1.1\tchr\t337\t2799\t-1\ttRNA\t\t\t\t").unwrap();
        file.flush().unwrap();

        let records = read_gene_records(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].strand, Strand::Forward);
        assert_eq!(records[0].product.as_deref(), Some("thr operon leader"));
        assert_eq!(records[0].partial, Some(Partial::COMPLETE));
        assert_eq!(records[0].evidence_type, None);
        assert_eq!(records[1].strand, Strand::Reverse);
        assert_eq!(records[1].feature, FeatureType::TRna);
        assert_eq!(records[1].partial, None);
    }

    #[test]
    fn test_read_rejects_bad_strand() {
        let mut file = NamedTempFile::with_suffix(".csv").unwrap();
        writeln!(file, "id,genome_id,contig_id,start,stop,strand,feature").unwrap();
        writeln!(file, "x,g,c,1,30,0,CDS").unwrap();
        file.flush().unwrap();
        assert!(matches!(read_gene_records(file.path()), Err(OrfevalError::Parse(_))));
    }

    #[test]
    fn test_read_rejects_bad_coordinates() {
        let mut file = NamedTempFile::with_suffix(".csv").unwrap();
        writeln!(file, "id,genome_id,contig_id,start,stop,strand,feature").unwrap();
        writeln!(file, "x,g,c,40,30,1,CDS").unwrap();
        file.flush().unwrap();
        assert!(matches!(
            read_gene_records(file.path()),
            Err(OrfevalError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_summary_table_preserves_missing_top_hit() {
        let file = NamedTempFile::with_suffix(".csv").unwrap();
        let mut hit = HitSummary::empty("q1");
        hit.n_hits = 1;
        hit.n_valid_hits = 1;
        hit.n_hits_same_strand = 1;
        hit.top_hit_id = Some("b0001".into());
        hit.top_hit_feature = Some(FeatureType::Cds);
        hit.top_hit_product = Some(HYPOTHETICAL_PRODUCT.into());
        hit.top_hit_strand = Some(Strand::Reverse);
        hit.top_hit_start = Some(10);
        hit.top_hit_stop = Some(309);
        hit.top_hit_overlap = 300;
        hit.top_hit_valid = true;
        let summaries = vec![hit, HitSummary::empty("q2")];

        write_summaries(file.path(), &summaries).unwrap();
        let back = read_summaries(file.path()).unwrap();
        assert_eq!(back, summaries);
    }

    #[test]
    fn test_label_table() {
        let file = NamedTempFile::with_suffix(".csv").unwrap();
        let rows = vec![
            LabeledGene { query_id: "a".into(), genome_id: "GCF_1.1".into(), label: Label::SuspectMatch },
            LabeledGene { query_id: "b".into(), genome_id: "GCF_1.1".into(), label: Label::Real },
        ];
        write_labels(file.path(), &rows).unwrap();

        let text = std::fs::read_to_string(file.path()).unwrap();
        assert!(text.contains("a,GCF_1.1,suspect_match"));
        assert_eq!(read_labels(file.path()).unwrap(), rows);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            read_summaries("/nonexistent/summary.csv"),
            Err(OrfevalError::Io(_))
        ));
    }

    #[test]
    fn test_genome_id_from_path() {
        assert_eq!(
            genome_id_from_path("data/proteins/GCF_000005845.2_protein.faa").unwrap(),
            "GCF_000005845.2"
        );
        assert_eq!(
            genome_id_from_path("GCA_003018135.1_summary.csv").unwrap(),
            "GCA_003018135.1"
        );
        assert_eq!(genome_id_from_path("GCF_000005845.2.gbff").unwrap(), "GCF_000005845.2");
        assert!(genome_id_from_path("ecoli_protein.faa").is_err());
        assert!(genome_id_from_path("GCF_abc.faa").is_err());
    }
}
