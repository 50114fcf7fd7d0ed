//! Pairwise command - sites at which two taxa share no nucleotide.

use std::io::Write;

use clap::Args;

use crate::cli::{load_inputs, InputArgs, OutputFormat};
use crate::diagnosis::config::DiagnosisConfig;
use crate::diagnosis::engine::DiagnosisEngine;
use crate::diagnosis::pairwise::PairwiseComparison;
use crate::parsing::taxa::resolve_query;

#[derive(Args)]
pub struct PairwiseArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Pairs to compare (aVSb, comma-separated, or ALLVSALL).
    /// Defaults to the pairs in QTAXA from the configuration file, else ALLVSALL
    #[arg(short, long)]
    pub pairs: Option<String>,
}

/// Execute the pairwise command
///
/// # Errors
///
/// Returns an error if inputs cannot be parsed or the specification holds no pairs.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: PairwiseArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let inputs = load_inputs(&args.input, verbose)?;
    let engine = DiagnosisEngine::new(&inputs.alignment, DiagnosisConfig::default())?;

    let spec = args
        .pairs
        .clone()
        .or_else(|| inputs.params.query_taxa.clone())
        .unwrap_or_else(|| "ALLVSALL".to_string());
    let selection = resolve_query(&spec, &inputs.alignment)?;
    if selection.pairs.is_empty() {
        anyhow::bail!("No pairs to compare in '{spec}'; use aVSb or ALLVSALL");
    }

    let comparisons = engine.compare_pairs(&selection.pairs);

    match format {
        OutputFormat::Text => {
            let mut out = std::io::stdout().lock();
            for (i, comparison) in comparisons.iter().enumerate() {
                if i > 0 {
                    writeln!(out, "\n{}", "─".repeat(60))?;
                }
                write_comparison_text(&mut out, comparison)?;
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&comparisons)?);
        }
        OutputFormat::Tsv => print_tsv(&comparisons),
    }

    Ok(())
}

pub(crate) fn write_comparison_text(
    out: &mut dyn Write,
    comparison: &PairwiseComparison,
) -> std::io::Result<()> {
    writeln!(
        out,
        "Pair: {} ({} sequences) vs {} ({} sequences)",
        comparison.first,
        comparison.first_sequences,
        comparison.second,
        comparison.second_sequences
    )?;
    writeln!(out, "   Separating sites: {}", comparison.count())?;
    for site in &comparison.sites {
        writeln!(
            out,
            "   site {}: {} | {}",
            site.site, site.first_states, site.second_states
        )?;
    }
    Ok(())
}

fn print_tsv(comparisons: &[PairwiseComparison]) {
    println!("first\tsecond\tsite\tfirst_states\tsecond_states");
    for comparison in comparisons {
        for site in &comparison.sites {
            println!(
                "{}\t{}\t{}\t{}\t{}",
                comparison.first,
                comparison.second,
                site.site,
                site.first_states,
                site.second_states
            );
        }
    }
}
