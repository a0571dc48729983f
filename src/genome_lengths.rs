//src/genome_lengths.rs

use std::path::{Path, PathBuf};

use ahash::AHashMap;
use serde::Deserialize;

use crate::error::{MicrobialFractionError, Result};
use crate::tsv::TsvReader;
use crate::types::{split_taxonomy, Domain, Lineage, TAXONOMY_SEPARATOR};

/// Metapackage manifest file.
pub const METAPACKAGE_CONTENTS: &str = "CONTENTS.json";

/// Genome length table filename used when the manifest does not name one.
pub const DEFAULT_METAPACKAGE_GENOME_LENGTHS: &str = "taxon_genome_lengths.tsv";

/// Where the genome length table comes from. Exactly one source per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenomeLengthSource {
    /// A `rank`/`genome_size` TSV.
    Tsv(PathBuf),
    /// A metapackage directory bundling the same table.
    Metapackage(PathBuf),
}

impl GenomeLengthSource {
    pub fn from_options(
        genome_lengths_file: Option<PathBuf>,
        metapackage: Option<PathBuf>,
    ) -> Result<Self> {
        match (genome_lengths_file, metapackage) {
            (Some(file), None) => Ok(GenomeLengthSource::Tsv(file)),
            (None, Some(dir)) => Ok(GenomeLengthSource::Metapackage(dir)),
            (Some(file), Some(dir)) => Err(MicrobialFractionError::GenomeLengthSource(format!(
                "both a genome length file ('{}') and a metapackage ('{}') were given",
                file.display(),
                dir.display()
            ))),
            (None, None) => Err(MicrobialFractionError::GenomeLengthSource(
                "neither a genome length file nor a metapackage was given".to_string(),
            )),
        }
    }

    pub fn load(&self) -> Result<GenomeLengthTable> {
        match self {
            GenomeLengthSource::Tsv(path) => GenomeLengthTable::from_tsv(path),
            GenomeLengthSource::Metapackage(dir) => GenomeLengthTable::from_metapackage(dir),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MetapackageContents {
    #[serde(default)]
    taxon_genome_lengths: Option<String>,
}

/// Read-only map from rank label to genome size in bases.
///
/// Keys are either full taxonomy paths (`d__Bacteria; p__Bacillota`) or bare
/// rank labels (`p__Bacillota`). Both Bacteria and Archaea domain defaults
/// are guaranteed present once constructed.
#[derive(Debug, Clone)]
pub struct GenomeLengthTable {
    sizes: AHashMap<String, u64>,
}

/// Normalise a `rank` cell so that `Root; d__Bacteria ;p__X` and
/// `d__Bacteria; p__X` are the same key.
fn normalise_rank(rank: &str) -> String {
    split_taxonomy(rank).join(TAXONOMY_SEPARATOR)
}

impl GenomeLengthTable {
    /// Build from `(rank, genome_size)` pairs, rejecting duplicates and zero
    /// sizes and requiring both domain defaults.
    pub fn new<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, u64)>,
        S: AsRef<str>,
    {
        let mut sizes = AHashMap::new();
        for (rank, size) in entries {
            let key = normalise_rank(rank.as_ref());
            if key.is_empty() {
                return Err(MicrobialFractionError::Validation(
                    "genome length table has an entry with an empty rank".to_string(),
                ));
            }
            if size == 0 {
                return Err(MicrobialFractionError::Validation(format!(
                    "genome length table entry '{}' has a genome size of 0",
                    key
                )));
            }
            if sizes.insert(key.clone(), size).is_some() {
                return Err(MicrobialFractionError::Validation(format!(
                    "genome length table has duplicate entry '{}'",
                    key
                )));
            }
        }
        let table = Self { sizes };
        table.check_domain_defaults()?;
        Ok(table)
    }

    fn check_domain_defaults(&self) -> Result<()> {
        for domain in [Domain::Bacteria, Domain::Archaea] {
            if let Some(rank) = domain.default_rank() {
                if !self.sizes.contains_key(rank) {
                    return Err(MicrobialFractionError::MissingDomainDefault {
                        domain: rank.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Parse a TSV with `rank` and `genome_size` columns.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = TsvReader::open(path, &["rank", "genome_size"])?;
        let mut entries = Vec::new();
        while let Some((line, fields)) = reader.next_record()? {
            let size = parse_genome_size(&fields[1]).ok_or_else(|| {
                MicrobialFractionError::format(
                    path,
                    line,
                    format!(
                        "genome_size '{}' for rank '{}' is not a positive integer",
                        fields[1], fields[0]
                    ),
                )
            })?;
            entries.push((fields[0].clone(), size));
        }
        let table = Self::new(entries)?;
        log::info!(
            "Loaded {} genome length entries from {}",
            table.len(),
            path.display()
        );
        Ok(table)
    }

    /// Load the table bundled in a metapackage directory.
    pub fn from_metapackage<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let contents_path = dir.join(METAPACKAGE_CONTENTS);
        let raw = std::fs::read_to_string(&contents_path)
            .map_err(|e| MicrobialFractionError::io(&contents_path, "reading", e))?;
        let contents: MetapackageContents =
            serde_json::from_str(&raw).map_err(|e| MicrobialFractionError::Metapackage {
                path: dir.to_path_buf(),
                detail: format!("{} is not valid: {}", METAPACKAGE_CONTENTS, e),
            })?;

        let file = contents
            .taxon_genome_lengths
            .unwrap_or_else(|| DEFAULT_METAPACKAGE_GENOME_LENGTHS.to_string());
        let table_path = dir.join(&file);
        if !table_path.is_file() {
            return Err(MicrobialFractionError::Metapackage {
                path: dir.to_path_buf(),
                detail: format!("genome length table '{}' not found", file),
            });
        }
        log::debug!("Using metapackage genome lengths at {}", table_path.display());
        Self::from_tsv(table_path)
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    /// Exact lookup of a single key.
    pub fn get(&self, rank: &str) -> Option<u64> {
        self.sizes.get(rank).copied()
    }

    /// Keys to try for a taxonomy, most specific first: at each prefix the
    /// full path, then its terminal label.
    pub fn candidate_keys(taxonomy: &[String]) -> Vec<String> {
        let mut keys = Vec::with_capacity(taxonomy.len() * 2);
        for depth in (1..=taxonomy.len()).rev() {
            let prefix = &taxonomy[..depth];
            keys.push(prefix.join(TAXONOMY_SEPARATOR));
            if depth > 1 {
                keys.push(prefix[depth - 1].clone());
            }
        }
        keys
    }

    /// Genome size for a lineage, falling back rank by rank to the domain
    /// default.
    pub fn lookup(&self, lineage: &Lineage) -> Result<u64> {
        let found = Self::candidate_keys(lineage.taxonomy())
            .iter()
            .find_map(|key| self.get(key));
        if let Some(size) = found {
            return Ok(size);
        }

        let domain = lineage.domain();
        domain
            .default_rank()
            .and_then(|rank| self.get(rank))
            .ok_or_else(|| MicrobialFractionError::UnresolvedLineage {
                lineage: lineage.taxonomy_string(),
                domain: domain.to_string(),
            })
    }
}

fn parse_genome_size(field: &str) -> Option<u64> {
    if let Ok(size) = field.parse::<u64>() {
        return (size > 0).then_some(size);
    }
    // Tables written by dataframe tools sometimes carry `3500000.0`.
    let value: f64 = field.parse().ok()?;
    (value.is_finite() && value >= 1.0 && value.fract() == 0.0).then_some(value as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> GenomeLengthTable {
        GenomeLengthTable::new([
            ("d__Bacteria", 4_000_000),
            ("d__Archaea", 2_000_000),
            ("f__Enterobacteriaceae", 5_000_000),
            ("g__Escherichia", 5_100_000),
            ("d__Bacteria; p__Bacillota", 3_000_000),
        ])
        .unwrap()
    }

    fn lineage(taxonomy: &str) -> Lineage {
        Lineage::from_taxonomy_str(taxonomy, 1.0).unwrap()
    }

    #[test]
    fn test_candidate_order() {
        let l = lineage("d__Bacteria; p__P; g__G");
        assert_eq!(
            GenomeLengthTable::candidate_keys(l.taxonomy()),
            vec![
                "d__Bacteria; p__P; g__G",
                "g__G",
                "d__Bacteria; p__P",
                "p__P",
                "d__Bacteria",
            ]
        );
    }

    #[test]
    fn test_genus_then_family_then_domain() {
        let t = table();
        let base = "d__Bacteria; p__Pseudomonadota; c__Gammaproteobacteria; o__Enterobacterales";

        let genus = lineage(&format!("{}; f__Enterobacteriaceae; g__Escherichia", base));
        assert_eq!(t.lookup(&genus).unwrap(), 5_100_000);

        let other_genus = lineage(&format!("{}; f__Enterobacteriaceae; g__Klebsiella", base));
        assert_eq!(t.lookup(&other_genus).unwrap(), 5_000_000);

        let other_family = lineage(&format!("{}; f__Vibrionaceae; g__Vibrio", base));
        assert_eq!(t.lookup(&other_family).unwrap(), 4_000_000);

        assert_eq!(t.lookup(&lineage("d__Archaea; p__X")).unwrap(), 2_000_000);
    }

    #[test]
    fn test_full_path_keys_match() {
        let t = table();
        assert_eq!(
            t.lookup(&lineage("Root; d__Bacteria; p__Bacillota; c__Bacilli")).unwrap(),
            3_000_000
        );
    }

    #[test]
    fn test_unprefixed_domain_uses_default() {
        let t = table();
        assert_eq!(t.lookup(&lineage("Bacteria; p__Nope")).unwrap(), 4_000_000);
    }

    #[test]
    fn test_non_microbial_lineage_is_unresolved() {
        let err = table().lookup(&lineage("d__Eukaryota; p__Chordata")).unwrap_err();
        assert!(err.to_string().contains("d__Eukaryota; p__Chordata"));
    }

    #[test]
    fn test_missing_domain_default_is_fatal() {
        let err = GenomeLengthTable::new([("d__Bacteria", 4_000_000u64)]).unwrap_err();
        assert!(matches!(
            err,
            MicrobialFractionError::MissingDomainDefault { ref domain } if domain == "d__Archaea"
        ));
    }

    #[test]
    fn test_duplicate_and_zero_entries_rejected() {
        assert!(GenomeLengthTable::new([
            ("d__Bacteria", 1u64),
            ("d__Archaea", 1),
            ("Root; d__Bacteria", 2),
        ])
        .is_err());
        assert!(GenomeLengthTable::new([("d__Bacteria", 0u64), ("d__Archaea", 1)]).is_err());
    }

    #[test]
    fn test_from_tsv_and_metapackage() {
        let dir = tempfile::tempdir().unwrap();
        let tsv = dir.path().join("lengths.tsv");
        std::fs::write(
            &tsv,
            "rank\tgenome_size\nd__Bacteria\t4000000\nd__Archaea\t2000000.0\ng__G\t1000\n",
        )
        .unwrap();
        let t = GenomeLengthTable::from_tsv(&tsv).unwrap();
        assert_eq!(t.len(), 3);
        assert_eq!(t.get("d__Archaea"), Some(2_000_000));

        std::fs::write(
            dir.path().join(METAPACKAGE_CONTENTS),
            r#"{"version": 4, "taxon_genome_lengths": "lengths.tsv"}"#,
        )
        .unwrap();
        let source = GenomeLengthSource::from_options(None, Some(dir.path().to_path_buf())).unwrap();
        assert_eq!(source.load().unwrap().get("g__G"), Some(1000));
    }

    #[test]
    fn test_bad_genome_size_names_line() {
        let dir = tempfile::tempdir().unwrap();
        let tsv = dir.path().join("lengths.tsv");
        std::fs::write(&tsv, "rank\tgenome_size\nd__Bacteria\t-5\n").unwrap();
        let err = GenomeLengthTable::from_tsv(&tsv).unwrap_err();
        assert!(matches!(err, MicrobialFractionError::Format { line: 2, .. }));
    }

    #[test]
    fn test_metapackage_without_table() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(METAPACKAGE_CONTENTS), "{}").unwrap();
        let err = GenomeLengthTable::from_metapackage(dir.path()).unwrap_err();
        assert!(matches!(err, MicrobialFractionError::Metapackage { .. }));
    }

    #[test]
    fn test_source_must_be_unique() {
        assert!(GenomeLengthSource::from_options(None, None).is_err());
        assert!(GenomeLengthSource::from_options(
            Some(PathBuf::from("a.tsv")),
            Some(PathBuf::from("pkg"))
        )
        .is_err());
        assert_eq!(
            GenomeLengthSource::from_options(Some(PathBuf::from("a.tsv")), None).unwrap(),
            GenomeLengthSource::Tsv(PathBuf::from("a.tsv"))
        );
    }
}
