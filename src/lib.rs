// src/lib.rs
pub mod error;
pub mod estimate;
pub mod genome_lengths;
pub mod profile;
pub mod report;
pub mod tsv;
pub mod types;

use std::path::Path;

use crate::error::{MicrobialFractionError, Result};
use crate::estimate::{estimate_samples, join_metagenome_sizes};
use crate::genome_lengths::{GenomeLengthSource, GenomeLengthTable};
use crate::profile::{read_metagenome_sizes, read_profile};
use crate::report::{per_taxon_rows, summary_rows, write_per_taxon, write_summary};
use crate::tsv::open_output;
use crate::types::{PerTaxonRow, SampleFraction, SummaryRow};

/// Run-wide switches.
#[derive(Debug, Clone, Default)]
pub struct ReadFractionOptions {
    /// Skip profiled samples with no metagenome size instead of failing.
    pub accept_missing_samples: bool,
}

/// Estimates for every sample, in profile order. Text is generated on demand.
pub struct ReadFractionResults {
    pub fractions: Vec<SampleFraction>,
}

impl ReadFractionResults {
    pub fn summary_rows(&self) -> Vec<SummaryRow> {
        summary_rows(&self.fractions)
    }

    pub fn per_taxon_rows(&self) -> Vec<PerTaxonRow> {
        per_taxon_rows(&self.fractions)
    }

    /// Summary table as TSV text.
    pub fn get_summary_output(&self) -> String {
        let mut out = Vec::new();
        write_summary(&mut out, &self.summary_rows()).unwrap();
        String::from_utf8_lossy(&out).into_owned()
    }

    /// Per-taxon table as TSV text.
    pub fn get_per_taxon_output(&self) -> String {
        let mut out = Vec::new();
        write_per_taxon(&mut out, &self.per_taxon_rows()).unwrap();
        String::from_utf8_lossy(&out).into_owned()
    }

    /// Write the summary to a file, a `.gz` file, or stdout (`None` / `-`).
    pub fn write_summary_to(&self, destination: Option<&Path>) -> Result<()> {
        let mut out = open_output(destination)?;
        write_summary(&mut out, &self.summary_rows())
            .and_then(|_| out.finish())
            .map_err(|e| MicrobialFractionError::io(destination_name(destination), "writing", e))
    }

    pub fn write_per_taxon_to(&self, destination: Option<&Path>) -> Result<()> {
        let mut out = open_output(destination)?;
        write_per_taxon(&mut out, &self.per_taxon_rows())
            .and_then(|_| out.finish())
            .map_err(|e| MicrobialFractionError::io(destination_name(destination), "writing", e))
    }
}

fn destination_name(destination: Option<&Path>) -> &Path {
    destination.unwrap_or_else(|| Path::new("-"))
}

/// Estimate against an already loaded genome length table.
pub fn estimate_with_table(
    profile_path: &Path,
    metagenome_sizes_path: &Path,
    table: &GenomeLengthTable,
    options: &ReadFractionOptions,
) -> Result<ReadFractionResults> {
    let sizes = read_metagenome_sizes(metagenome_sizes_path)?;
    let profiles = read_profile(profile_path)?;
    let samples = join_metagenome_sizes(profiles, &sizes, options.accept_missing_samples)?;
    let fractions = estimate_samples(&samples, table)?;
    Ok(ReadFractionResults { fractions })
}

/// Load the genome length source, then estimate every profiled sample.
///
/// The table is loaded and validated before any input is read, so a
/// malformed table aborts the run up front.
pub fn estimate_read_fractions(
    profile_path: &Path,
    metagenome_sizes_path: &Path,
    genome_lengths: &GenomeLengthSource,
    options: &ReadFractionOptions,
) -> Result<ReadFractionResults> {
    let table = genome_lengths.load()?;
    estimate_with_table(profile_path, metagenome_sizes_path, &table, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    struct Inputs {
        _dir: tempfile::TempDir,
        profile: PathBuf,
        sizes: PathBuf,
        lengths: GenomeLengthSource,
    }

    fn inputs(sizes: &str) -> Inputs {
        let dir = tempfile::tempdir().unwrap();
        let profile = dir.path().join("profile.tsv");
        let sizes_path = dir.path().join("sizes.tsv");
        let lengths = dir.path().join("lengths.tsv");

        fs::write(
            &profile,
            "sample\tcoverage\ttaxonomy\n\
             KRGM_94\t157\tRoot; d__Bacteria; p__P; c__C; o__O; f__F; g__Big; s__Big sp\n\
             KRGM_94\t1\tRoot; d__Bacteria; p__P; c__C; o__O; f__F; g__Small\n\
             KRGM_94\t40\tRoot; d__Eukaryota; p__Chordata\n\
             KRGM_94\t3\tRoot\n\
             OVER\t2\tRoot; d__Archaea; p__Thermoproteota\n\
             OVER\t0.25\tRoot; d__Bacteria; p__P\n",
        )
        .unwrap();
        fs::write(&sizes_path, sizes).unwrap();
        fs::write(
            &lengths,
            "rank\tgenome_size\n\
             d__Bacteria\t4000000\n\
             d__Archaea\t2000000\n\
             s__Big sp\t3000000\n\
             g__Small\t2147661\n",
        )
        .unwrap();

        Inputs {
            _dir: dir,
            profile,
            sizes: sizes_path,
            lengths: GenomeLengthSource::Tsv(lengths),
        }
    }

    const ALL_SIZES: &str = "sample\tnum_bases\nOVER\t1000000\nKRGM_94\t512995675\n";

    #[test]
    fn test_end_to_end_summary() {
        let inp = inputs(ALL_SIZES);
        let results = estimate_read_fractions(
            &inp.profile,
            &inp.sizes,
            &inp.lengths,
            &ReadFractionOptions::default(),
        )
        .expect("estimation failed");

        assert_eq!(
            results.get_summary_output(),
            "sample\tbacterial_archaeal_bases\tmetagenome_size\tread_fraction\twarning\n\
             KRGM_94\t473147661\t512995675\t92.23\t\n\
             OVER\t5000000\t1000000\t100.00\t\n"
        );

        // Capped for display, but the counts still give the true ratio.
        let over = &results.fractions[1];
        assert_eq!(over.raw_fraction, 500.0);
        assert!(over.bacterial_archaeal_bases > over.metagenome_size);
    }

    #[test]
    fn test_end_to_end_per_taxon() {
        let inp = inputs(ALL_SIZES);
        let results = estimate_read_fractions(
            &inp.profile,
            &inp.sizes,
            &inp.lengths,
            &ReadFractionOptions::default(),
        )
        .unwrap();
        let rows = results.per_taxon_rows();
        let taxa: Vec<(&str, &str)> = rows
            .iter()
            .map(|r| (r.sample.as_str(), r.taxonomy.as_str()))
            .collect();
        assert_eq!(
            taxa,
            vec![
                ("KRGM_94", "d__Bacteria; p__P; c__C; o__O; f__F; g__Big; s__Big sp"),
                ("KRGM_94", "d__Bacteria; p__P; c__C; o__O; f__F; g__Small"),
                ("OVER", "d__Archaea; p__Thermoproteota"),
                ("OVER", "d__Bacteria; p__P"),
            ]
        );
        assert_eq!(rows[2].read_fraction, "4.000000");
        assert_eq!(rows[3].read_fraction, "1.000000");
    }

    #[test]
    fn test_missing_sample_handling() {
        let sizes = "sample\tnum_bases\nKRGM_94\t512995675\n";

        let inp = inputs(sizes);
        let err = estimate_read_fractions(
            &inp.profile,
            &inp.sizes,
            &inp.lengths,
            &ReadFractionOptions::default(),
        )
        .err()
        .expect("missing sample should fail");
        assert!(err.to_string().contains("'OVER'"));

        let results = estimate_read_fractions(
            &inp.profile,
            &inp.sizes,
            &inp.lengths,
            &ReadFractionOptions {
                accept_missing_samples: true,
            },
        )
        .unwrap();
        assert_eq!(results.fractions.len(), 1);
        assert_eq!(results.fractions[0].sample, "KRGM_94");
        assert_eq!(results.fractions[0].bacterial_archaeal_bases, 473_147_661);
    }

    #[test]
    fn test_malformed_table_aborts_before_inputs() {
        let inp = inputs(ALL_SIZES);
        let bad = inp.profile.with_file_name("bad_lengths.tsv");
        fs::write(&bad, "rank\tgenome_size\nd__Bacteria\t4000000\n").unwrap();
        let err = estimate_read_fractions(
            &PathBuf::from("/nonexistent/profile.tsv"),
            &inp.sizes,
            &GenomeLengthSource::Tsv(bad),
            &ReadFractionOptions::default(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, MicrobialFractionError::MissingDomainDefault { .. }));
    }

    #[test]
    fn test_warning_column_lists_flagged_lineages() {
        let inp = inputs(ALL_SIZES);
        let sizes = inp.sizes.with_file_name("small_sizes.tsv");
        fs::write(&sizes, "sample\tnum_bases\nOVER\t20000000\nKRGM_94\t512995675\n").unwrap();
        let results = estimate_read_fractions(
            &inp.profile,
            &sizes,
            &inp.lengths,
            &ReadFractionOptions::default(),
        )
        .unwrap();
        // OVER: 4 Mb of archaea and 1 Mb of bacteria in 20 Mb, both above species.
        let summary = results.summary_rows();
        assert_eq!(summary[1].read_fraction, "25.00");
        assert_eq!(summary[1].warning, "p__Thermoproteota;p__P");

        let out = inp.profile.with_file_name("summary.tsv.gz");
        results.write_summary_to(Some(&out)).unwrap();
        assert!(out.exists());
    }

    #[test]
    fn test_gz_outputs_are_complete() {
        use std::io::Read;

        let inp = inputs(ALL_SIZES);
        let results = estimate_read_fractions(
            &inp.profile,
            &inp.sizes,
            &inp.lengths,
            &ReadFractionOptions::default(),
        )
        .unwrap();

        let summary = inp.profile.with_file_name("summary.tsv.gz");
        let per_taxon = inp.profile.with_file_name("per_taxon.tsv.gz");
        results.write_summary_to(Some(&summary)).unwrap();
        results.write_per_taxon_to(Some(&per_taxon)).unwrap();

        for (path, expected) in [
            (&summary, results.get_summary_output()),
            (&per_taxon, results.get_per_taxon_output()),
        ] {
            // GzDecoder rejects a stream with no trailer.
            let mut text = String::new();
            flate2::read::GzDecoder::new(fs::File::open(path).unwrap())
                .read_to_string(&mut text)
                .expect("gzip stream should be finished");
            assert_eq!(text, expected);
        }
    }

    #[test]
    fn test_unclassified_only_samples() {
        let dir = tempfile::tempdir().unwrap();
        let profile = dir.path().join("profile.tsv");
        let sizes = dir.path().join("sizes.tsv");
        let lengths = dir.path().join("lengths.tsv");
        fs::write(
            &profile,
            "sample\tcoverage\ttaxonomy\n\
             A\t1\tRoot; d__Bacteria\n\
             HOST\t5\tRoot\n\
             GHOST\t5\tRoot\n",
        )
        .unwrap();
        fs::write(&sizes, "sample\tnum_bases\nA\t100000000\nHOST\t100000000\n").unwrap();
        fs::write(
            &lengths,
            "rank\tgenome_size\nd__Bacteria\t4000000\nd__Archaea\t2000000\n",
        )
        .unwrap();
        let source = GenomeLengthSource::Tsv(lengths);

        // GHOST has only root rows, but it is still a profiled sample.
        let err = estimate_read_fractions(&profile, &sizes, &source, &ReadFractionOptions::default())
            .err()
            .expect("sample without a size should fail");
        assert!(matches!(err, MicrobialFractionError::MissingSample { ref sample } if sample == "GHOST"));

        let results = estimate_read_fractions(
            &profile,
            &sizes,
            &source,
            &ReadFractionOptions {
                accept_missing_samples: true,
            },
        )
        .unwrap();
        assert_eq!(
            results.get_summary_output(),
            "sample\tbacterial_archaeal_bases\tmetagenome_size\tread_fraction\twarning\n\
             A\t4000000\t100000000\t4.00\td__Bacteria\n\
             HOST\t0\t100000000\t0.00\t\n"
        );
    }
}
