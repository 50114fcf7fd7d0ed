//! Parser for MolD-style run parameter files.
//!
//! One `KEY=VALUE` pair per line. Lines starting with `#`, lines without
//! exactly one `=`, and keys with an empty value are skipped. Keys are
//! case-insensitive; spaces inside values are removed.
//!
//! ```text
//! INPUT_FILE=cones.fas
//! QTAXA=neridae,neridae+wiggi+verrucosa
//! TAXON_RANK=1
//! MAXLEN1=12
//! SCORING=moderate
//! ```

use std::path::{Path, PathBuf};

use crate::core::types::{GapHandling, ScoringLevel, TaxonRank};
use crate::diagnosis::config::{DiagnosisConfig, SiteCutoff};
use crate::parsing::fasta::LoadOptions;
use crate::parsing::ParseError;

/// Values read from a parameter file; unset keys keep the run defaults
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunParameters {
    pub gap_handling: Option<GapHandling>,
    pub query_taxa: Option<String>,
    pub taxon_rank: Option<TaxonRank>,
    pub input_file: Option<PathBuf>,
    pub cutoff: Option<SiteCutoff>,
    pub max_undetermined: Option<usize>,
    pub iterations: Option<u32>,
    pub max_len_raw: Option<usize>,
    pub max_len_refined: Option<usize>,
    pub indexing_reference: Option<String>,
    pub pdiff: Option<f64>,
    pub nmax: Option<usize>,
    pub scoring: Option<ScoringLevel>,
    /// Report destination; stdout when unset
    pub output_file: Option<PathBuf>,
}

impl RunParameters {
    /// Overlay the file's values on a diagnosis configuration
    pub fn apply_to_config(&self, config: &mut DiagnosisConfig) {
        if let Some(rank) = self.taxon_rank {
            config.taxon_rank = rank;
        }
        if let Some(cutoff) = self.cutoff {
            config.cutoff = cutoff;
        }
        if let Some(iterations) = self.iterations {
            config.iterations = iterations;
        }
        if let Some(len) = self.max_len_raw {
            config.max_len_raw = len;
        }
        if let Some(len) = self.max_len_refined {
            config.max_len_refined = len;
        }
        if self.pdiff.is_some() {
            config.pdiff = self.pdiff;
        }
        if let Some(nmax) = self.nmax {
            config.nmax = nmax;
        }
        if let Some(scoring) = self.scoring {
            config.scoring = scoring;
        }
    }

    /// Overlay the file's values on alignment loader options
    pub fn apply_to_load_options(&self, options: &mut LoadOptions) {
        if let Some(gaps) = self.gap_handling {
            options.gap_handling = gaps;
        }
        if let Some(max) = self.max_undetermined {
            options.max_undetermined = max;
        }
        if self.indexing_reference.is_some() {
            options.indexing_reference.clone_from(&self.indexing_reference);
        }
    }

    /// Alignment path, resolved against the parameter file's directory when
    /// it is relative and does not exist from the working directory
    #[must_use]
    pub fn resolve_input(&self, parameter_file: &Path) -> Option<PathBuf> {
        let input = self.input_file.as_ref()?;
        if input.is_absolute() || input.exists() {
            return Some(input.clone());
        }
        Some(
            parameter_file
                .parent()
                .map_or_else(|| input.clone(), |dir| dir.join(input)),
        )
    }
}

/// Read a parameter file from disk.
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, otherwise see [`parse_parameters`].
pub fn load_parameters(path: &Path) -> Result<RunParameters, ParseError> {
    let text = std::fs::read_to_string(path)?;
    parse_parameters(&text)
}

/// Parse parameter file text.
///
/// # Errors
///
/// Returns `ParseError::UnknownParameter` for a key MolD does not define,
/// `ParseError::InvalidValue` for a value that does not parse, or
/// `ParseError::InvalidFormat` if the text holds no parameters.
pub fn parse_parameters(text: &str) -> Result<RunParameters, ParseError> {
    let mut params = RunParameters::default();
    let mut found = 0usize;

    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.starts_with('#') {
            continue;
        }
        let mut split = line.split('=');
        let (Some(key), Some(value), None) = (split.next(), split.next(), split.next()) else {
            continue;
        };
        let value: String = value.chars().filter(|c| *c != ' ').collect();
        if value.is_empty() {
            continue;
        }

        let key = key.trim().to_uppercase();
        set_parameter(&mut params, &key, &value, idx + 1)?;
        found += 1;
    }

    if found == 0 {
        return Err(ParseError::InvalidFormat(
            "No parameters found in configuration file".to_string(),
        ));
    }

    Ok(params)
}

fn set_parameter(
    params: &mut RunParameters,
    key: &str,
    value: &str,
    line: usize,
) -> Result<(), ParseError> {
    let invalid = |reason: &str| ParseError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    };

    match key {
        "GAPS_AS_CHARS" => {
            params.gap_handling =
                Some(GapHandling::from_flag(value).ok_or_else(|| invalid("expected yes or no"))?);
        }
        "QTAXA" => params.query_taxa = Some(value.to_string()),
        "TAXON_RANK" => {
            params.taxon_rank =
                Some(TaxonRank::from_code(value).ok_or_else(|| invalid("expected 1 or 2"))?);
        }
        "INPUT_FILE" => params.input_file = Some(PathBuf::from(value)),
        // Input name shown by the MolD GUI; reports here name the alignment path
        "ORIG_FNAME" => {}
        "CUTOFF" => {
            params.cutoff = Some(value.parse().map_err(|e| invalid(&format!("{e}")))?);
        }
        "NUMBERN" => params.max_undetermined = Some(parse_number(value, &invalid)?),
        "NUMBER_OF_ITERATIONS" => params.iterations = Some(parse_number(value, &invalid)?),
        "MAXLEN1" => params.max_len_raw = Some(parse_number(value, &invalid)?),
        "MAXLEN2" => params.max_len_refined = Some(parse_number(value, &invalid)?),
        "IREF" => {
            params.indexing_reference =
                (!value.eq_ignore_ascii_case("NO")).then(|| value.to_string());
        }
        "PDIFF" => {
            params.pdiff = Some(
                value
                    .parse::<f64>()
                    .map_err(|_| invalid("expected a percentage"))?,
            );
        }
        "NMAXSEQ" => params.nmax = Some(parse_number(value, &invalid)?),
        "SCORING" => params.scoring = Some(value.parse().map_err(|e: String| invalid(&e))?),
        "OUTPUT_FILE" => params.output_file = Some(PathBuf::from(value)),
        _ => {
            return Err(ParseError::UnknownParameter {
                key: key.to_string(),
                line,
            })
        }
    }

    Ok(())
}

fn parse_number<T: std::str::FromStr>(
    value: &str,
    invalid: &impl Fn(&str) -> ParseError,
) -> Result<T, ParseError> {
    value
        .parse::<T>()
        .map_err(|_| invalid("expected a non-negative integer"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# MolD parameters
INPUT_FILE=cones.fas
QTAXA = neridae, neridae+wiggi+verrucosa
TAXON_RANK=2
GAPS_AS_CHARS=no
CUTOFF=>2
NUMBERN=3
NUMBER_OF_ITERATIONS=500
MAXLEN1=8
MAXLEN2=4
IREF=NO
PDIFF=
nmaxseq=6
SCORING=stringent
";

    #[test]
    fn test_parse_parameters() {
        let params = parse_parameters(SAMPLE).unwrap();
        assert_eq!(params.input_file, Some(PathBuf::from("cones.fas")));
        assert_eq!(
            params.query_taxa.as_deref(),
            Some("neridae,neridae+wiggi+verrucosa")
        );
        assert_eq!(params.taxon_rank, Some(TaxonRank::Supraspecific));
        assert_eq!(params.gap_handling, Some(GapHandling::AsMissing));
        assert_eq!(params.cutoff, Some(SiteCutoff { min_excluded: 3 }));
        assert_eq!(params.max_undetermined, Some(3));
        assert_eq!(params.iterations, Some(500));
        assert_eq!(params.max_len_raw, Some(8));
        assert_eq!(params.max_len_refined, Some(4));
        assert_eq!(params.indexing_reference, None);
        assert_eq!(params.pdiff, None);
        assert_eq!(params.nmax, Some(6));
        assert_eq!(params.scoring, Some(ScoringLevel::Stringent));
    }

    #[test]
    fn test_apply_overrides_defaults() {
        let params = parse_parameters(SAMPLE).unwrap();
        let mut config = DiagnosisConfig::default();
        let mut options = LoadOptions::default();
        params.apply_to_config(&mut config);
        params.apply_to_load_options(&mut options);

        assert_eq!(config.max_len_raw, 8);
        assert_eq!(config.max_len_refined, 4);
        assert_eq!(config.iterations, 500);
        assert_eq!(config.nmax, 6);
        assert!((config.effective_pdiff() - 5.0).abs() < f64::EPSILON);
        assert_eq!(config.threshold(), 90);
        assert_eq!(options.gap_handling, GapHandling::AsMissing);
        assert_eq!(options.max_undetermined, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_parameter_rejected() {
        let err = parse_parameters("MAXLEN1=5\nFOO=bar\n").unwrap_err();
        assert!(matches!(
            err,
            ParseError::UnknownParameter { ref key, line: 2 } if key == "FOO"
        ));
    }

    #[test]
    fn test_empty_file_rejected() {
        assert!(matches!(
            parse_parameters("# nothing here\n\n"),
            Err(ParseError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            parse_parameters("MAXLEN1=-3"),
            Err(ParseError::InvalidValue { .. })
        ));
        assert!(matches!(
            parse_parameters("TAXON_RANK=3"),
            Err(ParseError::InvalidValue { .. })
        ));
        assert!(matches!(
            parse_parameters("SCORING=harsh"),
            Err(ParseError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_report_keys() {
        let params = parse_parameters("ORIG_FNAME=cones.fasta\nOUTPUT_FILE=/tmp/out.txt\n").unwrap();
        assert_eq!(params.output_file, Some(PathBuf::from("/tmp/out.txt")));
        assert_eq!(params.input_file, None);
    }

    #[test]
    fn test_resolve_input_relative_to_parameter_file() {
        let params = parse_parameters("INPUT_FILE=does_not_exist.fas").unwrap();
        let resolved = params
            .resolve_input(Path::new("/data/run/params.txt"))
            .unwrap();
        assert_eq!(resolved, PathBuf::from("/data/run/does_not_exist.fas"));
    }
}
