//! Command-line interface for dnc-solver.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **diagnose**: Find minimal and robust diagnostic combinations for query taxa
//! - **pairwise**: List sites separating pairs of taxa
//! - **taxa**: List the taxa in an alignment
//!
//! ## Usage
//!
//! ```text
//! # Diagnose every taxon
//! dnc-solver diagnose cones.fas
//!
//! # A single taxon and a merged clade
//! dnc-solver diagnose cones.fas --taxa "neridae,neridae+wiggi+verrucosa"
//!
//! # Parameters from a MolD configuration file, JSON output
//! dnc-solver diagnose --config mold.cfg --format json
//!
//! # Sites separating two taxa
//! dnc-solver pairwise cones.fas --pairs neridaeVSwiggi
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::core::alignment::Alignment;
use crate::core::combination::Combination;
use crate::core::types::GapHandling;
use crate::parsing::config::{load_parameters, RunParameters};
use crate::parsing::fasta::{load_alignment, LoadOptions, LoadReport};

pub mod diagnose;
pub mod pairwise;
pub mod taxa;

#[derive(Parser)]
#[command(name = "dnc-solver")]
#[command(version)]
#[command(about = "Find diagnostic nucleotide combinations for taxa in a DNA alignment")]
#[command(
    long_about = "dnc-solver finds, for each query taxon of a multiple sequence alignment, the combinations of sites and nucleotides that tell it apart from every other sequence.\n\nFor each query it reports:\n- Every minimal diagnostic combination (mDNC) up to a maximum length\n- The number of site-disjoint mDNCs\n- A robust diagnostic combination (rDNC) grown from the shortest mDNC and scored against simulated mutations"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Diagnose query taxa against the rest of the alignment
    Diagnose(diagnose::DiagnoseArgs),

    /// Compare pairs of taxa site by site
    Pairwise(pairwise::PairwiseArgs),

    /// List taxa and sequence counts
    Taxa(taxa::TaxaArgs),
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}

/// Alignment input shared by every command
#[derive(clap::Args)]
pub struct InputArgs {
    /// Aligned FASTA file with `>id|taxon` headers (plain or gzip).
    /// May be omitted when the configuration file sets INPUT_FILE
    pub alignment: Option<PathBuf>,

    /// MolD configuration file (KEY=VALUE lines); flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Treat gaps as missing data instead of a fifth character state
    #[arg(long)]
    pub gaps_as_missing: bool,

    /// Drop sequences with more undetermined nucleotides than this (default 5)
    #[arg(long)]
    pub max_undetermined: Option<usize>,

    /// Label sites by the ungapped positions of this sequence
    #[arg(long)]
    pub iref: Option<String>,
}

/// A loaded alignment with the parameter file it came with
pub struct Inputs {
    pub path: PathBuf,
    pub alignment: Alignment,
    pub report: LoadReport,
    pub params: RunParameters,
}

/// Read the configuration file (if any) and the alignment it or the command line names.
///
/// # Errors
///
/// Returns an error if the configuration file or alignment cannot be parsed, or
/// if no alignment path is given.
pub fn load_inputs(args: &InputArgs, verbose: bool) -> anyhow::Result<Inputs> {
    let params = match &args.config {
        Some(path) => load_parameters(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?,
        None => RunParameters::default(),
    };

    let path = args
        .alignment
        .clone()
        .or_else(|| {
            args.config
                .as_deref()
                .and_then(|config| params.resolve_input(config))
        })
        .ok_or_else(|| {
            anyhow::anyhow!("No alignment given: pass a FASTA file or set INPUT_FILE in --config")
        })?;

    let mut options = LoadOptions::default();
    params.apply_to_load_options(&mut options);
    if args.gaps_as_missing {
        options.gap_handling = GapHandling::AsMissing;
    }
    if let Some(max) = args.max_undetermined {
        options.max_undetermined = max;
    }
    if args.iref.is_some() {
        options.indexing_reference.clone_from(&args.iref);
    }

    let (alignment, report) = load_alignment(&path, &options)
        .with_context(|| format!("Failed to load alignment {}", path.display()))?;

    if verbose {
        eprintln!(
            "Loaded {} of {} sequences ({} columns, {} dropped)",
            report.sequences_retained,
            report.sequences_read,
            report.alignment_length,
            report.dropped.len()
        );
    }

    Ok(Inputs {
        path,
        alignment,
        report,
        params,
    })
}

/// Sites of a combination as shown to users, in indexing-reference coordinates when set
#[must_use]
pub fn site_list(combination: &Combination, alignment: &Alignment) -> String {
    let labels: Vec<String> = combination
        .positions()
        .map(|pos| alignment.site_label(pos))
        .collect();
    format!("[{}]", labels.join(", "))
}

/// Sequence counts per taxon, sorted by taxon name
#[must_use]
pub fn taxon_counts(alignment: &Alignment) -> Vec<(String, usize)> {
    alignment
        .taxa()
        .into_iter()
        .map(|(name, members)| (name.to_string(), members.len()))
        .collect()
}
