//! Loader for taxon-tagged FASTA alignments using noodles.
//!
//! Headers are `>sequence_id|taxon`. Supports uncompressed and gzip/bgzip
//! compressed files:
//! - `.fa`, `.fas`, `.fasta`, `.fna` (uncompressed)
//! - any of the above with `.gz` or `.bgz` appended

use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::GzDecoder;
use noodles::fasta;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::alignment::{
    Alignment, AlignmentError, SequenceRecord, GAP, GAP_CHARACTER, NUCLEOTIDES, UNDETERMINED,
};
use crate::core::types::GapHandling;
use crate::parsing::ParseError;
use crate::utils::validation::{check_sequence_limit, is_valid_taxon_name, MAX_ALIGNMENT_LENGTH};

/// Default maximum number of undetermined nucleotides per retained sequence
pub const DEFAULT_MAX_UNDETERMINED: usize = 5;

/// Options applied while reading an alignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadOptions {
    pub gap_handling: GapHandling,
    /// Sequences with more undetermined nucleotides than this are dropped
    pub max_undetermined: usize,
    /// Sequence whose ungapped positions label the sites in reports
    pub indexing_reference: Option<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            gap_handling: GapHandling::default(),
            max_undetermined: DEFAULT_MAX_UNDETERMINED,
            indexing_reference: None,
        }
    }
}

/// What the loader read, kept and dropped
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub sequences_read: usize,
    pub sequences_retained: usize,
    /// Identifiers of sequences dropped for too many undetermined nucleotides
    pub dropped: Vec<String>,
    pub alignment_length: usize,
    /// Undetermined nucleotides across retained sequences
    pub undetermined: usize,
    /// Columns with at least one determined state among retained sequences
    pub informative_columns: usize,
}

/// Check if the path is a gzipped file
#[allow(clippy::case_sensitive_file_extension_comparisons)] // Already lowercased
fn is_gzipped(path: &Path) -> bool {
    let path_str = path.to_string_lossy().to_lowercase();
    path_str.ends_with(".gz") || path_str.ends_with(".bgz")
}

/// Load an alignment from a FASTA file.
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, `ParseError::Noodles` if
/// FASTA parsing fails, `ParseError::InvalidFormat` for a malformed header,
/// `ParseError::Alignment` for unequal lengths, an empty result or an unknown
/// indexing reference, or `ParseError::TooManySequences` if the limit is exceeded.
pub fn load_alignment(
    path: &Path,
    options: &LoadOptions,
) -> Result<(Alignment, LoadReport), ParseError> {
    let file = std::fs::File::open(path)?;
    if is_gzipped(path) {
        read_alignment(BufReader::new(GzDecoder::new(file)), options)
    } else {
        read_alignment(BufReader::new(file), options)
    }
}

/// Load an alignment from FASTA text already in memory
///
/// # Errors
///
/// Same as [`load_alignment`], without IO errors from opening a file.
pub fn parse_alignment_text(
    text: &str,
    options: &LoadOptions,
) -> Result<(Alignment, LoadReport), ParseError> {
    read_alignment(text.as_bytes(), options)
}

/// Load an alignment from any buffered FASTA source
///
/// # Errors
///
/// See [`load_alignment`].
pub fn read_alignment<R: BufRead>(
    reader: R,
    options: &LoadOptions,
) -> Result<(Alignment, LoadReport), ParseError> {
    let mut fasta_reader = fasta::io::Reader::new(reader);
    let mut report = LoadReport::default();
    let mut retained = Vec::new();
    let mut reference_row: Option<Vec<u8>> = None;
    let mut expected_length: Option<usize> = None;

    for result in fasta_reader.records() {
        let record = result
            .map_err(|e| ParseError::Noodles(format!("Failed to parse FASTA record: {e}")))?;

        if check_sequence_limit(report.sequences_read).is_some() {
            return Err(ParseError::TooManySequences(report.sequences_read));
        }
        report.sequences_read += 1;

        let name = String::from_utf8_lossy(record.name()).to_string();
        let (id, taxon) = parse_header(&name)?;

        let raw: Vec<u8> = record
            .sequence()
            .as_ref()
            .iter()
            .map(u8::to_ascii_uppercase)
            .collect();

        if raw.len() > MAX_ALIGNMENT_LENGTH {
            return Err(ParseError::InvalidFormat(format!(
                "Sequence '{id}' has {} columns, maximum is {MAX_ALIGNMENT_LENGTH}",
                raw.len()
            )));
        }
        match expected_length {
            None => expected_length = Some(raw.len()),
            Some(expected) if expected != raw.len() => {
                return Err(AlignmentError::LengthMismatch {
                    id,
                    expected,
                    found: raw.len(),
                }
                .into());
            }
            Some(_) => {}
        }

        let undetermined = count_undetermined(&raw);
        if undetermined > options.max_undetermined {
            debug!("Dropping {id}: {undetermined} undetermined nucleotides");
            report.dropped.push(id);
            continue;
        }

        if options.indexing_reference.as_deref() == Some(id.as_str()) {
            reference_row = Some(raw.clone());
        }
        let states = normalize_states(&raw, options.gap_handling);
        retained.push(SequenceRecord::new(id, taxon, states));
    }

    if !report.dropped.is_empty() {
        warn!(
            "{} sequences dropped for more than {} undetermined nucleotides",
            report.dropped.len(),
            options.max_undetermined
        );
    }

    let mut alignment = Alignment::new(retained)?;
    if let Some(reference_id) = &options.indexing_reference {
        let row = reference_row
            .ok_or_else(|| AlignmentError::UnknownReference(reference_id.clone()))?;
        alignment = alignment.with_reference_labels(reference_id, &row)?;
    }

    report.sequences_retained = alignment.sequence_count();
    report.alignment_length = alignment.length();
    report.undetermined = alignment
        .sequences()
        .iter()
        .map(SequenceRecord::undetermined_count)
        .sum();
    report.informative_columns = (0..alignment.length())
        .filter(|&pos| {
            alignment
                .sequences()
                .iter()
                .any(|s| s.states[pos] != UNDETERMINED)
        })
        .count();

    info!(
        "Loaded {} of {} sequences, {} columns",
        report.sequences_retained, report.sequences_read, report.alignment_length
    );

    Ok((alignment, report))
}

/// Split a `sequence_id|taxon` header.
///
/// # Errors
///
/// Returns `ParseError::InvalidFormat` unless the header holds exactly one `|`
/// separating a non-empty identifier from a valid taxon name.
pub fn parse_header(name: &str) -> Result<(String, String), ParseError> {
    let mut parts = name.split('|');
    let (Some(id), Some(taxon), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(ParseError::InvalidFormat(format!(
            "Header '{name}' must have the form 'sequence_id|taxon'"
        )));
    };

    let id = id.trim();
    let taxon = taxon.trim();
    if id.is_empty() || !is_valid_taxon_name(taxon) {
        return Err(ParseError::InvalidFormat(format!(
            "Header '{name}' has an empty identifier or an invalid taxon name"
        )));
    }

    Ok((id.to_string(), taxon.to_string()))
}

/// Ambiguous or unknown symbols in an uppercased row; gaps are not counted
fn count_undetermined(raw: &[u8]) -> usize {
    raw.iter()
        .filter(|s| !NUCLEOTIDES.contains(s) && **s != GAP)
        .count()
}

/// Map an uppercased row onto the stored state alphabet
#[must_use]
pub fn normalize_states(raw: &[u8], gap_handling: GapHandling) -> Vec<u8> {
    raw.iter()
        .map(|&s| match s {
            b'A' | b'C' | b'G' | b'T' => s,
            GAP => match gap_handling {
                GapHandling::AsCharacter => GAP_CHARACTER,
                GapHandling::AsMissing => UNDETERMINED,
            },
            _ => UNDETERMINED,
        })
        .collect()
}
