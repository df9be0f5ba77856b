//! Comparison of gene-finder predictions against reference annotations.
//!
//! This crate provides:
//!
//! - **Genomic primitives**: [`Strand`], [`GeneInterval`]
//! - **Gene records**: [`GeneRecord`], [`FeatureType`], [`Partial`]
//! - **Overlap search**: [`ReferenceGenome`], [`Hit`], [`HitSummary`]
//! - **Labels**: [`Label`] assignment with [`LabelConfig`], [`ComparedGene`] helpers
//! - **Tables**: delimited-text IO for records, summaries and labels
//!
//! # Quick start
//!
//! ```
//! use orfeval_omics::{
//!     assign_labels, GeneRecord, Label, LabelConfig, ReferenceGenome, SearchConfig, Strand,
//! };
//!
//! let genome = "GCF_000005845.2";
//! let reference = ReferenceGenome::new(genome, vec![
//!     GeneRecord::cds("b0001", genome, "chr", 190, 255, Strand::Forward)?,
//!     GeneRecord::cds("b0002", genome, "chr", 337, 2799, Strand::Forward)?,
//! ])?;
//! let predictions = vec![
//!     GeneRecord::cds("chr_1", genome, "chr", 190, 255, Strand::Forward)?,
//!     GeneRecord::cds("chr_2", genome, "chr", 338, 2800, Strand::Forward)?,
//!     GeneRecord::cds("chr_3", genome, "chr", 5000, 5299, Strand::Reverse)?,
//! ];
//!
//! let results = reference.search(&predictions, &SearchConfig { progress: false })?;
//! let labels = assign_labels(&results.summaries, &LabelConfig::default())?;
//! assert_eq!(labels, vec![Label::Real, Label::Spurious, Label::Intergenic]);
//! # Ok::<(), orfeval_core::OrfevalError>(())
//! ```

pub mod annotation;
pub mod genomic;
pub mod labels;
pub mod reference;
pub mod summary;
pub mod table;

pub use annotation::{
    codon_length, FeatureType, GeneRecord, Partial, AB_INITIO_EVIDENCE, HYPOTHETICAL_PRODUCT,
};
pub use genomic::{GeneInterval, Strand};
pub use labels::{
    assign_label, assign_labels, codon_lengths, is_suspect, label_counts, remove_partial,
    ComparedGene, Label, LabelConfig, LabelFlags,
};
pub use reference::{Hit, ReferenceGenome, SearchConfig, SearchResults};
pub use summary::{summarize, top_hit, HitSummary};
pub use table::{
    genome_id_from_path, read_gene_records, read_labels, read_summaries, write_gene_records,
    write_labels, write_summaries, LabeledGene,
};
