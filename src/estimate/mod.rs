pub mod estimate_samples;
pub mod fraction;
pub mod sensitivity;

use super::error::{MicrobialFractionError, Result};
use super::genome_lengths::GenomeLengthTable;
use super::types::{LineageContribution, Sample, SampleFraction};

pub use estimate_samples::{estimate_samples, join_metagenome_sizes};
pub use fraction::{estimate_sample, FractionEstimate};
pub use sensitivity::{detect_sensitive_lineages, SENSITIVITY_THRESHOLD, TOP_LINEAGES};
