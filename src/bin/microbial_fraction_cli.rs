use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use microbial_fraction_rs::genome_lengths::GenomeLengthSource;
use microbial_fraction_rs::{estimate_read_fractions, ReadFractionOptions};

#[derive(Parser)]
#[command(name = "microbial-fraction-rs")]
#[command(about = "Estimate the fraction of a metagenome's bases that are bacterial or archaeal")]
#[command(after_help = "EXAMPLES:
  # Using a genome length table
  microbial-fraction-rs -p profile.tsv -m sizes.tsv --taxon-genome-lengths-file lengths.tsv

  # Using the table bundled in a metapackage, with per-taxon output
  microbial-fraction-rs -p profile.tsv -m sizes.tsv --metapackage pkg.smpkg \\
      --output-per-taxon-read-fractions per_taxon.tsv -o summary.tsv")]
struct Cli {
    /// Taxonomic profile TSV (sample, coverage, taxonomy)
    #[arg(short = 'p', long)]
    input_profile: PathBuf,

    /// Metagenome size TSV (sample, num_bases)
    #[arg(short = 'm', long)]
    input_metagenome_sizes: PathBuf,

    /// Genome length TSV (rank, genome_size)
    #[arg(long, conflicts_with = "metapackage")]
    taxon_genome_lengths_file: Option<PathBuf>,

    /// Metapackage directory whose genome length table is used
    #[arg(long)]
    metapackage: Option<PathBuf>,

    /// Skip profiled samples missing from the metagenome size table
    #[arg(long)]
    accept_missing_samples: bool,

    /// Summary output; `-` or absent for stdout, `.gz` to compress
    #[arg(short = 'o', long)]
    output_tsv: Option<PathBuf>,

    /// Also write each taxon's share of its metagenome here
    #[arg(long)]
    output_per_taxon_read_fractions: Option<PathBuf>,

    /// Worker threads (defaults to all cores)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Log debug messages
    #[arg(long, conflicts_with = "quiet")]
    debug: bool,

    /// Only log errors and hide progress
    #[arg(short, long)]
    quiet: bool,
}

fn spinner(quiet: bool, color: &str, msg: &'static str) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    let template = format!("{{spinner:.{}}} {{msg}}", color);
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
        .template(&template)
    {
        bar.set_style(style);
    }
    bar.set_message(msg);
    bar
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.debug {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("could not configure the worker pool")?;
    }

    let source = GenomeLengthSource::from_options(
        cli.taxon_genome_lengths_file.clone(),
        cli.metapackage.clone(),
    )?;
    let options = ReadFractionOptions {
        accept_missing_samples: cli.accept_missing_samples,
    };

    // 1. Estimate
    let bar = spinner(cli.quiet, "green", "Estimating read fractions...");
    let results = estimate_read_fractions(
        &cli.input_profile,
        &cli.input_metagenome_sizes,
        &source,
        &options,
    )
    .with_context(|| {
        format!(
            "estimating read fractions for {}",
            cli.input_profile.display()
        )
    })?;
    bar.finish_with_message(format!("Estimated {} sample(s).", results.fractions.len()));

    // 2. Write outputs
    let bar = spinner(cli.quiet, "yellow", "Writing output files...");
    results
        .write_summary_to(cli.output_tsv.as_deref())
        .context("writing summary table")?;
    if let Some(path) = &cli.output_per_taxon_read_fractions {
        results
            .write_per_taxon_to(Some(path))
            .with_context(|| format!("writing per-taxon table to {}", path.display()))?;
    }
    bar.finish_with_message("Output files created.");

    let warned = results.fractions.iter().filter(|f| !f.warning.is_empty()).count();
    if warned > 0 {
        log::info!(
            "{} sample(s) have read fractions sensitive to genome size uncertainty",
            warned
        );
    }
    Ok(())
}
