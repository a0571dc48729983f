use rayon::prelude::*;

use super::fraction::estimate_sample;
use super::{GenomeLengthTable, MicrobialFractionError, Result, Sample, SampleFraction};
use crate::profile::{MetagenomeSizes, SampleProfile};

/// Attach each profile's metagenome size.
///
/// A profiled sample missing from `sizes` fails the whole run unless
/// `accept_missing_samples` is set, in which case it is dropped and logged.
/// Everything is checked here so that no sample is estimated before a fatal
/// input error is found.
pub fn join_metagenome_sizes(
    profiles: Vec<SampleProfile>,
    sizes: &MetagenomeSizes,
    accept_missing_samples: bool,
) -> Result<Vec<Sample>> {
    let mut samples = Vec::with_capacity(profiles.len());
    for profile in profiles {
        match sizes.get(&profile.name) {
            Some(&0) => {
                return Err(MicrobialFractionError::Validation(format!(
                    "metagenome size of sample '{}' must be positive",
                    profile.name
                )));
            }
            Some(&metagenome_size) => samples.push(Sample {
                name: profile.name,
                metagenome_size,
                lineages: profile.lineages,
            }),
            None if accept_missing_samples => {
                log::warn!(
                    "Sample {} has no metagenome size, skipping it",
                    profile.name
                );
            }
            None => {
                return Err(MicrobialFractionError::MissingSample {
                    sample: profile.name,
                });
            }
        }
    }

    let unprofiled = sizes.len().saturating_sub(samples.len());
    if unprofiled > 0 {
        log::debug!(
            "{} sample(s) in the metagenome size table have no profile",
            unprofiled
        );
    }
    Ok(samples)
}

/// Estimate every sample in parallel. The table is only read, so each sample
/// is an independent task; results keep the input order.
pub fn estimate_samples(samples: &[Sample], table: &GenomeLengthTable) -> Result<Vec<SampleFraction>> {
    samples
        .par_iter()
        .map(|sample| estimate_sample(sample, table))
        .collect()
}
