//! Diagnose command - minimal and robust diagnostic combinations per query taxon.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use crate::cli::{load_inputs, site_list, InputArgs, Inputs, OutputFormat};
use crate::core::alignment::Alignment;
use crate::core::types::{ScoringLevel, TaxonRank};
use crate::diagnosis::config::{DiagnosisConfig, SiteCutoff};
use crate::diagnosis::engine::{DiagnosisEngine, GroupDiagnosis, GroupOutcome};
use crate::diagnosis::pairwise::PairwiseComparison;
use crate::diagnosis::stopping::StoppingPolicy;
use crate::parsing::taxa::resolve_query;

#[derive(Args)]
pub struct DiagnoseArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Query specification: ALL, taxon names, merged clades (a+b) and pairs (aVSb),
    /// comma-separated. Defaults to QTAXA from the configuration file, else ALL
    #[arg(short, long)]
    pub taxa: Option<String>,

    /// Maximum length of a minimal combination (default 12)
    #[arg(long)]
    pub max_len_raw: Option<usize>,

    /// Maximum length of a robust combination (default 5)
    #[arg(long)]
    pub max_len_refined: Option<usize>,

    /// Simulated replicates per robustness score (default 10000)
    #[arg(short = 'n', long)]
    pub iterations: Option<u32>,

    /// Taxonomic rank, which sets the default mutation intensity
    #[arg(long, value_enum)]
    pub taxon_rank: Option<TaxonRank>,

    /// Maximum percent divergence of simulated sequences
    #[arg(long)]
    pub pdiff: Option<f64>,

    /// Maximum number of query sequences mutated per replicate (default 10)
    #[arg(long)]
    pub nmax: Option<usize>,

    /// Robustness threshold: lousy, moderate, stringent, very_stringent, or a percentage
    #[arg(long)]
    pub scoring: Option<ScoringLevel>,

    /// Minimum exclusion power of sites added to a robust combination, e.g. '>1'
    #[arg(long)]
    pub cutoff: Option<SiteCutoff>,

    /// Accept the first step meeting the threshold instead of requiring consecutive steps
    #[arg(long, conflicts_with = "stable_runs")]
    pub first_threshold: bool,

    /// Consecutive steps that must meet the threshold (default 2)
    #[arg(long)]
    pub stable_runs: Option<usize>,

    /// Stop retrieving minimal combinations after this many
    #[arg(long)]
    pub max_mdnc: Option<usize>,

    /// Stop the minimal search after examining this many candidate sets
    #[arg(long)]
    pub search_budget: Option<u64>,

    /// Seed for the robustness simulations
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write the report to this file instead of stdout.
    /// Defaults to OUTPUT_FILE from the configuration file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl DiagnoseArgs {
    /// Defaults, then the configuration file, then command-line flags
    fn diagnosis_config(&self, inputs: &Inputs) -> DiagnosisConfig {
        let mut config = DiagnosisConfig::default();
        inputs.params.apply_to_config(&mut config);

        if let Some(v) = self.max_len_raw {
            config.max_len_raw = v;
        }
        if let Some(v) = self.max_len_refined {
            config.max_len_refined = v;
        }
        if let Some(v) = self.iterations {
            config.iterations = v;
        }
        if let Some(v) = self.taxon_rank {
            config.taxon_rank = v;
        }
        if self.pdiff.is_some() {
            config.pdiff = self.pdiff;
        }
        if let Some(v) = self.nmax {
            config.nmax = v;
        }
        if let Some(v) = self.scoring {
            config.scoring = v;
        }
        if let Some(v) = self.cutoff {
            config.cutoff = v;
        }
        if self.first_threshold {
            config.stopping = StoppingPolicy::FirstThreshold;
        } else if let Some(runs) = self.stable_runs {
            config.stopping = StoppingPolicy::ConsecutiveThreshold { runs };
        }
        if let Some(v) = self.max_mdnc {
            config.max_mdnc = v;
        }
        if let Some(v) = self.search_budget {
            config.search_budget = v;
        }
        if let Some(v) = self.seed {
            config.seed = v;
        }
        config
    }
}

/// Execute the diagnose command
///
/// # Errors
///
/// Returns an error if inputs cannot be parsed, parameters are out of range,
/// the query specification names an unknown taxon, or the report cannot be written.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: DiagnoseArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let inputs = load_inputs(&args.input, verbose)?;
    let config = args.diagnosis_config(&inputs);
    let engine = DiagnosisEngine::new(&inputs.alignment, config)?;

    let spec = args
        .taxa
        .clone()
        .or_else(|| inputs.params.query_taxa.clone())
        .unwrap_or_else(|| "ALL".to_string());
    let selection = resolve_query(&spec, &inputs.alignment)?;

    if verbose {
        eprintln!(
            "Diagnosing {} query groups and {} pairs ({} replicates, pdiff {}%, threshold {})",
            selection.groups.len(),
            selection.pairs.len(),
            engine.config().iterations,
            engine.config().effective_pdiff(),
            engine.config().scoring
        );
    }

    let groups = engine.diagnose_all(&selection.groups);
    let pairs = engine.compare_pairs(&selection.pairs);

    let output_path = args.output.clone().or_else(|| inputs.params.output_file.clone());
    let mut out: Box<dyn Write> = match &output_path {
        Some(path) => Box::new(BufWriter::new(File::create(path).with_context(|| {
            format!("Failed to create report file {}", path.display())
        })?)),
        None => Box::new(std::io::stdout().lock()),
    };

    match format {
        OutputFormat::Text => write_text(&mut out, &inputs, engine.config(), &groups, &pairs)?,
        OutputFormat::Json => write_json(&mut out, &inputs, engine.config(), &groups, &pairs)?,
        OutputFormat::Tsv => write_tsv(&mut out, &inputs.alignment, &groups)?,
    }
    out.flush()?;

    if let Some(path) = output_path {
        if verbose {
            eprintln!("Report written to {}", path.display());
        }
    }

    Ok(())
}

fn write_text(
    out: &mut dyn Write,
    inputs: &Inputs,
    config: &DiagnosisConfig,
    groups: &[GroupDiagnosis],
    pairs: &[PairwiseComparison],
) -> std::io::Result<()> {
    let report = &inputs.report;
    writeln!(out, "Alignment: {}", inputs.path.display())?;
    writeln!(
        out,
        "   Sequences: {} read, {} retained, {} dropped",
        report.sequences_read,
        report.sequences_retained,
        report.dropped.len()
    )?;
    writeln!(
        out,
        "   Length: {} columns ({} with determined states), {} undetermined nucleotides",
        report.alignment_length, report.informative_columns, report.undetermined
    )?;
    writeln!(
        out,
        "   Parameters: Lmax {}, Lr {}, {} replicates, pdiff {}%, nmax {}, threshold {}, cutoff {}",
        config.max_len_raw,
        config.max_len_refined,
        config.iterations,
        config.effective_pdiff(),
        config.nmax,
        config.scoring,
        config.cutoff
    )?;

    let alignment = &inputs.alignment;
    for group in groups {
        writeln!(out, "\n{}", "─".repeat(60))?;
        write_group_text(out, alignment, group)?;
    }

    for pair in pairs {
        writeln!(out, "\n{}", "─".repeat(60))?;
        crate::cli::pairwise::write_comparison_text(out, pair)?;
    }
    Ok(())
}

fn write_group_text(
    out: &mut dyn Write,
    alignment: &Alignment,
    group: &GroupDiagnosis,
) -> std::io::Result<()> {
    writeln!(
        out,
        "Query: {} ({} sequences vs {} reference sequences)",
        group.query, group.query_sequences, group.reference_sequences
    )?;
    if group.taxa.len() > 1 {
        writeln!(out, "   Merged taxa: {}", group.taxa.join(", "))?;
    }

    let mdnc = &group.mdnc;
    writeln!(out, "   Candidate sites: {}", group.candidate_sites)?;
    writeln!(
        out,
        "   mDNCs retrieved: {}, sites involved: {}, independent: {}",
        mdnc.retrieved, mdnc.sites_involved, mdnc.independent
    )?;
    if let Some(reason) = mdnc.truncated {
        writeln!(out, "   Search truncated: {reason:?}")?;
    }
    if !mdnc.single_site.is_empty() {
        let sites: Vec<String> = mdnc
            .single_site
            .iter()
            .map(|c| site_list(c, alignment))
            .collect();
        writeln!(out, "   Single-site mDNCs: {}", sites.join(" "))?;
    }
    if let Some(shortest) = &mdnc.shortest {
        writeln!(out, "   Shortest mDNC: {}", site_list(shortest, alignment))?;
    }

    match &group.outcome {
        GroupOutcome::Diagnosed { rdnc, diagnosis } => {
            for step in &rdnc.steps {
                writeln!(
                    out,
                    "   {} rDNC_score ({}): {} - {}",
                    step.length,
                    step.score.iterations,
                    site_list(&step.combination, alignment),
                    step.score
                )?;
            }
            writeln!(
                out,
                "   Final rDNC: {} (score {}, stopped: {:?})",
                site_list(&rdnc.combination, alignment),
                rdnc.score,
                rdnc.stop_reason
            )?;
            writeln!(out, "   Diagnosis: {diagnosis}")?;
        }
        GroupOutcome::NoDiagnosis { reason } => {
            writeln!(out, "   No diagnosis: {reason}")?;
        }
    }
    Ok(())
}

fn write_json(
    out: &mut dyn Write,
    inputs: &Inputs,
    config: &DiagnosisConfig,
    groups: &[GroupDiagnosis],
    pairs: &[PairwiseComparison],
) -> anyhow::Result<()> {
    let output = serde_json::json!({
        "alignment": {
            "file": inputs.path.display().to_string(),
            "load": inputs.report,
            "reference_labels": inputs.alignment.has_reference_labels(),
            "site_labels": inputs.alignment.site_labels(),
        },
        "config": config,
        "groups": groups,
        "pairs": pairs,
    });
    writeln!(out, "{}", serde_json::to_string_pretty(&output)?)?;
    Ok(())
}

fn write_tsv(
    out: &mut dyn Write,
    alignment: &Alignment,
    groups: &[GroupDiagnosis],
) -> std::io::Result<()> {
    writeln!(
        out,
        "query\tquery_sequences\treference_sequences\tcandidate_sites\tmdnc_retrieved\tsites_involved\tindependent\tshortest_mdnc\trdnc\tscore\tstatus\tdiagnosis"
    )?;

    for group in groups {
        let shortest = group
            .mdnc
            .shortest
            .as_ref()
            .map_or_else(String::new, |c| site_list(c, alignment));
        let (rdnc, score, status, diagnosis) = match &group.outcome {
            GroupOutcome::Diagnosed { rdnc, diagnosis } => (
                site_list(&rdnc.combination, alignment),
                rdnc.score.to_string(),
                "diagnosed".to_string(),
                diagnosis.to_string(),
            ),
            GroupOutcome::NoDiagnosis { reason } => (
                String::new(),
                String::new(),
                "no_diagnosis".to_string(),
                reason.to_string(),
            ),
        };

        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            group.query,
            group.query_sequences,
            group.reference_sequences,
            group.candidate_sites,
            group.mdnc.retrieved,
            group.mdnc.sites_involved,
            group.mdnc.independent,
            shortest,
            rdnc,
            score,
            status,
            diagnosis
        )?;
    }
    Ok(())
}
