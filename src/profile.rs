//src/profile.rs

use std::path::Path;

use ahash::AHashMap;

use crate::error::{MicrobialFractionError, Result};
use crate::tsv::TsvReader;
use crate::types::{split_taxonomy, Lineage};

/// The lineages of one sample, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleProfile {
    pub name: String,
    pub lineages: Vec<Lineage>,
}

/// Parses a taxonomic profile in the format:
/// ```text
/// sample\tcoverage\ttaxonomy
/// S1\t2.5\tRoot; d__Bacteria; p__Bacillota
/// ```
/// Samples are returned in order of first appearance. Rows whose taxonomy is
/// only `Root` carry no lineage, but their sample is still kept so that a
/// sample with nothing classified is reported.
pub fn read_profile<P: AsRef<Path>>(path: P) -> Result<Vec<SampleProfile>> {
    let path = path.as_ref();
    let mut reader = TsvReader::open(path, &["sample", "coverage", "taxonomy"])?;

    let mut profiles: Vec<SampleProfile> = Vec::new();
    let mut index: AHashMap<String, usize> = AHashMap::new();
    let mut skipped = 0usize;

    while let Some((line, fields)) = reader.next_record()? {
        let sample = &fields[0];
        let coverage: f64 = fields[1].parse().map_err(|_| {
            MicrobialFractionError::format(
                path,
                line,
                format!("coverage '{}' is not a number", fields[1]),
            )
        })?;

        let slot = *index.entry(sample.clone()).or_insert_with(|| {
            profiles.push(SampleProfile {
                name: sample.clone(),
                lineages: Vec::new(),
            });
            profiles.len() - 1
        });

        let taxonomy = split_taxonomy(&fields[2]);
        if taxonomy.is_empty() {
            if !coverage.is_finite() || coverage < 0.0 {
                return Err(MicrobialFractionError::format(
                    path,
                    line,
                    format!("coverage {} of root row is invalid", coverage),
                ));
            }
            skipped += 1;
            continue;
        }
        let lineage = Lineage::new(taxonomy, coverage)
            .map_err(|e| MicrobialFractionError::format(path, line, e.to_string()))?;
        profiles[slot].lineages.push(lineage);
    }

    if skipped > 0 {
        log::debug!("Skipped {} root-only rows in {}", skipped, path.display());
    }
    log::info!(
        "Read profiles for {} sample(s) from {}",
        profiles.len(),
        path.display()
    );
    Ok(profiles)
}

/// Total sequenced bases per sample.
pub type MetagenomeSizes = AHashMap<String, u64>;

/// Parses a `sample`/`num_bases` TSV. Sizes must be positive integers and
/// each sample may appear once.
pub fn read_metagenome_sizes<P: AsRef<Path>>(path: P) -> Result<MetagenomeSizes> {
    let path = path.as_ref();
    let mut reader = TsvReader::open(path, &["sample", "num_bases"])?;
    let mut sizes = MetagenomeSizes::new();

    while let Some((line, fields)) = reader.next_record()? {
        let bases: i64 = fields[1].parse().map_err(|_| {
            MicrobialFractionError::format(
                path,
                line,
                format!("num_bases '{}' is not an integer", fields[1]),
            )
        })?;
        if bases <= 0 {
            return Err(MicrobialFractionError::format(
                path,
                line,
                format!(
                    "metagenome size for sample '{}' must be positive, got {}",
                    fields[0], bases
                ),
            ));
        }
        if sizes.insert(fields[0].clone(), bases as u64).is_some() {
            return Err(MicrobialFractionError::format(
                path,
                line,
                format!("sample '{}' listed more than once", fields[0]),
            ));
        }
    }

    log::info!(
        "Read metagenome sizes for {} sample(s) from {}",
        sizes.len(),
        path.display()
    );
    Ok(sizes)
}
