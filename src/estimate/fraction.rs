// src/estimate/fraction.rs

use super::sensitivity::detect_sensitive_lineages;
use super::{GenomeLengthTable, LineageContribution, MicrobialFractionError, Result, Sample, SampleFraction};
use crate::types::Lineage;

/// Reported percentages never exceed this.
pub const MAX_READ_FRACTION: f64 = 100.0;

/// Aggregate numbers for one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FractionEstimate {
    pub bacterial_archaeal_bases: u64,
    pub raw_fraction: f64,
    pub read_fraction: f64,
}

impl FractionEstimate {
    /// `bases` is rounded to a whole base count first so that the uncapped
    /// fraction is exactly `bacterial_archaeal_bases / metagenome_size`.
    pub fn from_bases(bases: f64, metagenome_size: u64) -> Self {
        let bacterial_archaeal_bases = bases.max(0.0).round() as u64;
        let raw_fraction = 100.0 * bacterial_archaeal_bases as f64 / metagenome_size as f64;
        Self {
            bacterial_archaeal_bases,
            raw_fraction,
            read_fraction: raw_fraction.min(MAX_READ_FRACTION),
        }
    }
}

/// Genome sizes of the bacterial and archaeal lineages, in profile order.
/// Other domains are not looked up.
pub fn lineage_contributions(
    lineages: &[Lineage],
    table: &GenomeLengthTable,
) -> Result<Vec<LineageContribution>> {
    lineages
        .iter()
        .filter(|l| l.domain().is_microbial())
        .map(|l| -> Result<LineageContribution> {
            Ok(LineageContribution {
                taxonomy: l.taxonomy_string(),
                label: l.most_specific_label().to_string(),
                coverage: l.coverage(),
                genome_size: table.lookup(l)?,
                classified_to_species: l.classified_to_species(),
            })
        })
        .collect()
}

/// Sum of `coverage × genome_size` over the contributions.
pub fn total_bases(contributions: &[LineageContribution]) -> f64 {
    contributions.iter().map(LineageContribution::bases).sum()
}

/// Estimate the bacterial/archaeal fraction of one sample and run the
/// sensitivity check on it.
pub fn estimate_sample(sample: &Sample, table: &GenomeLengthTable) -> Result<SampleFraction> {
    if sample.metagenome_size == 0 {
        return Err(MicrobialFractionError::Validation(format!(
            "metagenome size of sample '{}' must be positive",
            sample.name
        )));
    }

    let contributions = lineage_contributions(&sample.lineages, table).map_err(|e| {
        MicrobialFractionError::Validation(format!("sample '{}': {}", sample.name, e))
    })?;
    let bases = total_bases(&contributions);
    let estimate = FractionEstimate::from_bases(bases, sample.metagenome_size);

    let warning = detect_sensitive_lineages(&contributions, bases, sample.metagenome_size);
    if !warning.is_empty() {
        log::warn!(
            "Sample {}: read fraction {:.2}% is sensitive to the genome sizes of {}",
            sample.name,
            estimate.read_fraction,
            warning.join(", ")
        );
    }
    if estimate.raw_fraction > MAX_READ_FRACTION {
        log::warn!(
            "Sample {}: estimated {:.2}% bacterial/archaeal bases, reporting {:.2}%",
            sample.name,
            estimate.raw_fraction,
            MAX_READ_FRACTION
        );
    }
    log::debug!(
        "Sample {}: {} of {} bases from {} bacterial/archaeal lineages",
        sample.name,
        estimate.bacterial_archaeal_bases,
        sample.metagenome_size,
        contributions.len()
    );

    Ok(SampleFraction {
        sample: sample.name.clone(),
        bacterial_archaeal_bases: estimate.bacterial_archaeal_bases,
        metagenome_size: sample.metagenome_size,
        raw_fraction: estimate.raw_fraction,
        read_fraction: estimate.read_fraction,
        warning,
        contributions,
    })
}
