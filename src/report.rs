// src/report.rs

use std::io::Write;

use crate::types::{PerTaxonRow, SampleFraction, SummaryRow};

pub const SUMMARY_HEADER: &str =
    "sample\tbacterial_archaeal_bases\tmetagenome_size\tread_fraction\twarning";

pub const PER_TAXON_HEADER: &str = "sample\ttaxonomy\tcoverage\tgenome_size\tread_fraction";

/// Separator between flagged lineages in the warning column.
pub const WARNING_SEPARATOR: &str = ";";

/// One summary row per sample, in the order given.
pub fn summary_rows(fractions: &[SampleFraction]) -> Vec<SummaryRow> {
    fractions
        .iter()
        .map(|f| SummaryRow {
            sample: f.sample.clone(),
            bacterial_archaeal_bases: f.bacterial_archaeal_bases,
            metagenome_size: f.metagenome_size,
            read_fraction: format!("{:.2}", f.read_fraction),
            warning: f.warning.join(WARNING_SEPARATOR),
        })
        .collect()
}

/// One row per bacterial/archaeal lineage per sample. The value is the plain
/// fraction `coverage × genome_size / metagenome_size`, not capped.
pub fn per_taxon_rows(fractions: &[SampleFraction]) -> Vec<PerTaxonRow> {
    fractions
        .iter()
        .flat_map(|f| {
            f.contributions.iter().map(move |c| PerTaxonRow {
                sample: f.sample.clone(),
                taxonomy: c.taxonomy.clone(),
                coverage: c.coverage,
                genome_size: c.genome_size,
                read_fraction: format!("{:.6}", c.bases() / f.metagenome_size as f64),
            })
        })
        .collect()
}

pub fn write_summary<W: Write>(out: &mut W, rows: &[SummaryRow]) -> std::io::Result<()> {
    writeln!(out, "{}", SUMMARY_HEADER)?;
    for row in rows {
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}",
            row.sample,
            row.bacterial_archaeal_bases,
            row.metagenome_size,
            row.read_fraction,
            row.warning
        )?;
    }
    out.flush()
}

pub fn write_per_taxon<W: Write>(out: &mut W, rows: &[PerTaxonRow]) -> std::io::Result<()> {
    writeln!(out, "{}", PER_TAXON_HEADER)?;
    for row in rows {
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}",
            row.sample,
            row.taxonomy,
            row.coverage,
            row.genome_size,
            row.read_fraction
        )?;
    }
    out.flush()
}
