use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Symbol for an undetermined nucleotide
pub const UNDETERMINED: u8 = b'N';

/// Symbol a gap is recoded to when gaps are treated as characters
pub const GAP_CHARACTER: u8 = b'D';

/// Raw gap symbol in aligned input
pub const GAP: u8 = b'-';

/// Nucleotide states a simulated substitution can produce
pub const NUCLEOTIDES: [u8; 4] = *b"ACGT";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AlignmentError {
    #[error("Alignment contains no sequences")]
    Empty,

    #[error("Sequence '{id}' has length {found}, expected {expected}")]
    LengthMismatch {
        id: String,
        expected: usize,
        found: usize,
    },

    #[error("Duplicate sequence identifier: {0}")]
    DuplicateId(String),

    #[error("Unknown indexing reference sequence: {0}")]
    UnknownReference(String),
}

/// A single aligned sequence with its taxon assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceRecord {
    /// Sequence identifier (text before the `|` in the FASTA header)
    pub id: String,

    /// Taxon the sequence belongs to (text after the `|`)
    pub taxon: String,

    /// Normalized states, one byte per alignment column
    #[serde(skip)]
    pub states: Vec<u8>,
}

impl SequenceRecord {
    pub fn new(id: impl Into<String>, taxon: impl Into<String>, states: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            taxon: taxon.into(),
            states: states.into(),
        }
    }

    /// Number of undetermined (`N`) states
    #[must_use]
    pub fn undetermined_count(&self) -> usize {
        self.states.iter().filter(|&&s| s == UNDETERMINED).count()
    }
}

/// An alignment of equal-length sequences. Read-only once constructed.
#[derive(Debug, Clone)]
pub struct Alignment {
    sequences: Vec<SequenceRecord>,
    length: usize,
    id_to_index: HashMap<String, usize>,
    /// Optional site labels in the coordinates of an indexing reference sequence
    site_labels: Option<Vec<String>>,
}

impl Alignment {
    /// Build an alignment, checking that all sequences share one length and ids are unique.
    ///
    /// # Errors
    ///
    /// Returns `AlignmentError::Empty` for no sequences, `AlignmentError::LengthMismatch`
    /// if lengths differ, or `AlignmentError::DuplicateId` for repeated identifiers.
    pub fn new(sequences: Vec<SequenceRecord>) -> Result<Self, AlignmentError> {
        let length = sequences
            .first()
            .map(|s| s.states.len())
            .ok_or(AlignmentError::Empty)?;

        let mut id_to_index = HashMap::with_capacity(sequences.len());
        for (idx, seq) in sequences.iter().enumerate() {
            if seq.states.len() != length {
                return Err(AlignmentError::LengthMismatch {
                    id: seq.id.clone(),
                    expected: length,
                    found: seq.states.len(),
                });
            }
            if id_to_index.insert(seq.id.clone(), idx).is_some() {
                return Err(AlignmentError::DuplicateId(seq.id.clone()));
            }
        }

        Ok(Self {
            sequences,
            length,
            id_to_index,
            site_labels: None,
        })
    }

    /// Attach site labels computed from an indexing reference sequence.
    ///
    /// `raw_states` must be the reference's aligned row with gaps still present.
    ///
    /// # Errors
    ///
    /// Returns `AlignmentError::LengthMismatch` if the row length differs from the alignment.
    pub fn with_reference_labels(
        mut self,
        id: &str,
        raw_states: &[u8],
    ) -> Result<Self, AlignmentError> {
        if raw_states.len() != self.length {
            return Err(AlignmentError::LengthMismatch {
                id: id.to_string(),
                expected: self.length,
                found: raw_states.len(),
            });
        }
        self.site_labels = Some(reference_site_labels(raw_states));
        Ok(self)
    }

    /// Number of alignment columns
    #[must_use]
    pub fn length(&self) -> usize {
        self.length
    }

    #[must_use]
    pub fn sequence_count(&self) -> usize {
        self.sequences.len()
    }

    #[must_use]
    pub fn sequences(&self) -> &[SequenceRecord] {
        &self.sequences
    }

    #[must_use]
    pub fn sequence(&self, index: usize) -> &SequenceRecord {
        &self.sequences[index]
    }

    #[must_use]
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.id_to_index.get(id).copied()
    }

    /// State of sequence `index` at zero-based column `position`
    #[inline]
    #[must_use]
    pub fn state(&self, index: usize, position: usize) -> u8 {
        self.sequences[index].states[position]
    }

    /// Taxon names mapped to the indices of their sequences, sorted by name
    #[must_use]
    pub fn taxa(&self) -> BTreeMap<&str, Vec<usize>> {
        let mut taxa: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (idx, seq) in self.sequences.iter().enumerate() {
            taxa.entry(seq.taxon.as_str()).or_default().push(idx);
        }
        taxa
    }

    /// Human-facing label for a zero-based column.
    ///
    /// One-based column numbers unless an indexing reference is attached.
    #[must_use]
    pub fn site_label(&self, position: usize) -> String {
        match &self.site_labels {
            Some(labels) => labels[position].clone(),
            None => (position + 1).to_string(),
        }
    }

    #[must_use]
    pub fn has_reference_labels(&self) -> bool {
        self.site_labels.is_some()
    }

    /// Indexing-reference label of every column, if a reference is attached
    #[must_use]
    pub fn site_labels(&self) -> Option<&[String]> {
        self.site_labels.as_deref()
    }
}

/// Compute labels for every column in the coordinates of an ungapped reference row.
///
/// Residue columns get their one-based residue number. Gap columns are labelled
/// `<previous residue>.<k>` where `k` counts consecutive gaps; leading gaps use `0`.
#[must_use]
pub fn reference_site_labels(raw_states: &[u8]) -> Vec<String> {
    let mut labels = Vec::with_capacity(raw_states.len());
    let mut residue = 0usize;
    let mut gap_run = 0usize;

    for &state in raw_states {
        if state == GAP {
            gap_run += 1;
            labels.push(format!("{residue}.{gap_run}"));
        } else {
            residue += 1;
            gap_run = 0;
            labels.push(residue.to_string());
        }
    }

    labels
}
