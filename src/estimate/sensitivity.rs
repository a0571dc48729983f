// src/estimate/sensitivity.rs

use ahash::AHashMap;

use super::fraction::FractionEstimate;
use super::LineageContribution;

/// How many coarse-rank lineages are perturbed.
pub const TOP_LINEAGES: usize = 3;

/// Percentage-point swing in the read fraction that raises a warning.
pub const SENSITIVITY_THRESHOLD: f64 = 2.0;

/// Genome size multipliers tried for each perturbed lineage.
pub const PERTURBATION_FACTORS: [f64; 2] = [0.5, 2.0];

/// The lineages whose genome size is extrapolated from above species rank,
/// largest contribution first, ties broken by taxonomy string.
pub fn rank_uncertain_lineages(contributions: &[LineageContribution]) -> Vec<&LineageContribution> {
    let mut uncertain: Vec<&LineageContribution> = contributions
        .iter()
        .filter(|c| !c.classified_to_species)
        .collect();
    uncertain.sort_by(|a, b| {
        b.bases()
            .total_cmp(&a.bases())
            .then_with(|| a.taxonomy.cmp(&b.taxonomy))
    });
    uncertain
}

/// Read fraction after scaling one lineage's genome size by `factor`, all
/// others held fixed.
pub fn perturbed_read_fraction(
    lineage: &LineageContribution,
    total_bases: f64,
    metagenome_size: u64,
    factor: f64,
) -> f64 {
    let perturbed = total_bases - lineage.bases() + lineage.bases() * factor;
    FractionEstimate::from_bases(perturbed, metagenome_size).read_fraction
}

/// Identifiers of the top uncertain lineages whose halving or doubling moves
/// the capped read fraction by more than [`SENSITIVITY_THRESHOLD`] points.
/// Empty when the estimate is robust.
///
/// A lineage is named by its most specific label, or by its full taxonomy
/// when another lineage of the sample shares that label.
pub fn detect_sensitive_lineages(
    contributions: &[LineageContribution],
    total_bases: f64,
    metagenome_size: u64,
) -> Vec<String> {
    let baseline = FractionEstimate::from_bases(total_bases, metagenome_size).read_fraction;

    let mut label_counts: AHashMap<&str, usize> = AHashMap::new();
    for c in contributions {
        *label_counts.entry(c.label.as_str()).or_insert(0) += 1;
    }

    rank_uncertain_lineages(contributions)
        .into_iter()
        .take(TOP_LINEAGES)
        .filter(|lineage| {
            PERTURBATION_FACTORS.iter().any(|&factor| {
                let shifted = perturbed_read_fraction(lineage, total_bases, metagenome_size, factor);
                (shifted - baseline).abs() > SENSITIVITY_THRESHOLD
            })
        })
        .map(|lineage| {
            if label_counts.get(lineage.label.as_str()).copied().unwrap_or(0) > 1 {
                lineage.taxonomy.clone()
            } else {
                lineage.label.clone()
            }
        })
        .collect()
}
