//src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Everything that can stop a read-fraction run.
///
/// Configuration problems (a malformed genome-length table, two competing
/// genome-length sources) are raised before any sample is estimated. Input
/// problems always name the file and line, sample or table entry involved.
#[derive(Debug, Error)]
pub enum MicrobialFractionError {
    #[error("I/O error while {operation} '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// A line of a TSV input could not be understood.
    #[error("{}:{line}: {detail}", path.display())]
    Format {
        path: PathBuf,
        line: usize,
        detail: String,
    },

    #[error("genome length table has no default for domain '{domain}'")]
    MissingDomainDefault { domain: String },

    #[error("no genome length found for lineage '{lineage}' (table lacks '{domain}' default)")]
    UnresolvedLineage { lineage: String, domain: String },

    #[error("genome length source misconfigured: {0}")]
    GenomeLengthSource(String),

    #[error("metapackage '{}' is unusable: {detail}", path.display())]
    Metapackage { path: PathBuf, detail: String },

    #[error("sample '{sample}' is in the profile but not in the metagenome size table")]
    MissingSample { sample: String },

    #[error("validation error: {0}")]
    Validation(String),
}

impl MicrobialFractionError {
    pub fn io(path: impl Into<PathBuf>, operation: &'static str, source: std::io::Error) -> Self {
        MicrobialFractionError::Io {
            path: path.into(),
            operation,
            source,
        }
    }

    pub fn format(path: impl Into<PathBuf>, line: usize, detail: impl Into<String>) -> Self {
        MicrobialFractionError::Format {
            path: path.into(),
            line,
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MicrobialFractionError>;
