//src/types.rs

use std::fmt;

use crate::error::{MicrobialFractionError, Result};

/// Label that some profiles put above the domain rank.
pub const ROOT_LABEL: &str = "Root";

/// Separator between rank labels in a taxonomy string.
pub const TAXONOMY_SEPARATOR: &str = "; ";

/// Number of ranks from domain down to species.
pub const SPECIES_DEPTH: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    Bacteria,
    Archaea,
    /// Eukaryota, viruses, or anything unrecognised.
    Other,
}

impl Domain {
    /// Domain for a domain-rank label, with or without the `d__` prefix.
    pub fn from_label(label: &str) -> Self {
        match label.strip_prefix("d__").unwrap_or(label) {
            "Bacteria" => Domain::Bacteria,
            "Archaea" => Domain::Archaea,
            _ => Domain::Other,
        }
    }

    pub fn is_microbial(self) -> bool {
        matches!(self, Domain::Bacteria | Domain::Archaea)
    }

    /// Key of the domain-level default in a genome length table.
    pub fn default_rank(self) -> Option<&'static str> {
        match self {
            Domain::Bacteria => Some("d__Bacteria"),
            Domain::Archaea => Some("d__Archaea"),
            Domain::Other => None,
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::Bacteria => write!(f, "Bacteria"),
            Domain::Archaea => write!(f, "Archaea"),
            Domain::Other => write!(f, "other"),
        }
    }
}

/// Split a `; `-separated taxonomy string into its rank labels, dropping a
/// leading `Root` and any empty pieces.
pub fn split_taxonomy(taxonomy: &str) -> Vec<String> {
    let mut labels: Vec<String> = taxonomy
        .split(';')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    if labels.first().map(String::as_str) == Some(ROOT_LABEL) {
        labels.remove(0);
    }
    labels
}

/// One taxon of a sample's profile.
#[derive(Debug, Clone, PartialEq)]
pub struct Lineage {
    taxonomy: Vec<String>,
    coverage: f64,
}

impl Lineage {
    pub fn new(taxonomy: Vec<String>, coverage: f64) -> Result<Self> {
        if taxonomy.is_empty() {
            return Err(MicrobialFractionError::Validation(
                "lineage taxonomy is empty".to_string(),
            ));
        }
        if !coverage.is_finite() || coverage < 0.0 {
            return Err(MicrobialFractionError::Validation(format!(
                "lineage '{}' has invalid coverage {}",
                taxonomy.join(TAXONOMY_SEPARATOR),
                coverage
            )));
        }
        Ok(Self { taxonomy, coverage })
    }

    /// Parse a taxonomy string such as `Root; d__Bacteria; p__Bacillota`.
    pub fn from_taxonomy_str(taxonomy: &str, coverage: f64) -> Result<Self> {
        Self::new(split_taxonomy(taxonomy), coverage)
    }

    pub fn taxonomy(&self) -> &[String] {
        &self.taxonomy
    }

    pub fn coverage(&self) -> f64 {
        self.coverage
    }

    pub fn domain(&self) -> Domain {
        Domain::from_label(&self.taxonomy[0])
    }

    pub fn classified_to_species(&self) -> bool {
        self.taxonomy.len() >= SPECIES_DEPTH || self.most_specific_label().starts_with("s__")
    }

    pub fn most_specific_label(&self) -> &str {
        self.taxonomy.last().map(String::as_str).unwrap_or_default()
    }

    pub fn taxonomy_string(&self) -> String {
        self.taxonomy.join(TAXONOMY_SEPARATOR)
    }
}

/// One sample's profile joined with its sequenced size.
#[derive(Debug, Clone)]
pub struct Sample {
    pub name: String,
    /// Total bases sequenced, forward plus reverse.
    pub metagenome_size: u64,
    pub lineages: Vec<Lineage>,
}

/// A bacterial or archaeal lineage's share of a sample.
#[derive(Debug, Clone, PartialEq)]
pub struct LineageContribution {
    pub taxonomy: String,
    pub label: String,
    pub coverage: f64,
    pub genome_size: u64,
    pub classified_to_species: bool,
}

impl LineageContribution {
    /// Bases attributed to this lineage: `coverage × genome_size`.
    pub fn bases(&self) -> f64 {
        self.coverage * self.genome_size as f64
    }
}

/// Result of estimating one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleFraction {
    pub sample: String,
    pub bacterial_archaeal_bases: u64,
    pub metagenome_size: u64,
    /// Uncapped percentage; may exceed 100.
    pub raw_fraction: f64,
    /// Percentage capped to `[0, 100]`.
    pub read_fraction: f64,
    /// Most specific labels of the lineages that tripped the sensitivity check.
    pub warning: Vec<String>,
    /// Bacterial/archaeal lineages in profile order.
    pub contributions: Vec<LineageContribution>,
}

impl SampleFraction {
    pub fn is_capped(&self) -> bool {
        self.raw_fraction > self.read_fraction
    }
}

/// A row of the summary table.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub sample: String,
    pub bacterial_archaeal_bases: u64,
    pub metagenome_size: u64,
    pub read_fraction: String,
    pub warning: String,
}

/// A row of the per-taxon table.
#[derive(Debug, Clone, PartialEq)]
pub struct PerTaxonRow {
    pub sample: String,
    pub taxonomy: String,
    pub coverage: f64,
    pub genome_size: u64,
    /// Uncapped percentage of the metagenome.
    pub read_fraction: String,
}
