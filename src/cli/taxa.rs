//! Taxa command - list the taxa of an alignment.

use clap::Args;

use crate::cli::{load_inputs, taxon_counts, InputArgs, OutputFormat};

#[derive(Args)]
pub struct TaxaArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

/// Execute the taxa command
///
/// # Errors
///
/// Returns an error if the alignment cannot be loaded.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: TaxaArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let inputs = load_inputs(&args.input, verbose)?;
    let counts = taxon_counts(&inputs.alignment);

    match format {
        OutputFormat::Text => {
            println!(
                "{} taxa, {} sequences, {} columns",
                counts.len(),
                inputs.alignment.sequence_count(),
                inputs.alignment.length()
            );
            let width = counts.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
            for (name, count) in &counts {
                println!("   {name:<width$}  {count}");
            }
        }
        OutputFormat::Json => {
            let taxa: Vec<serde_json::Value> = counts
                .iter()
                .map(|(name, count)| serde_json::json!({ "taxon": name, "sequences": count }))
                .collect();
            let output = serde_json::json!({
                "sequences": inputs.alignment.sequence_count(),
                "length": inputs.alignment.length(),
                "load": inputs.report,
                "taxa": taxa,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Tsv => {
            println!("taxon\tsequences");
            for (name, count) in &counts {
                println!("{name}\t{count}");
            }
        }
    }

    Ok(())
}
