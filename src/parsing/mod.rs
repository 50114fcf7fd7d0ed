//! Parsers for alignments, run parameter files and query specifications.
//!
//! - **FASTA alignments** ([`fasta`]): `>sequence_id|taxon` headers, plain or gzip
//! - **Parameter files** ([`config`]): `KEY=VALUE` lines using the MolD key names
//! - **Query specifications** ([`taxa`]): `ALL`, `a+b`, `aVSb`, `ALLVSALL`
//!
//! ## Example
//!
//! ```rust,no_run
//! use dnc_solver::parsing::fasta::{load_alignment, LoadOptions};
//! use std::path::Path;
//!
//! let (alignment, report) = load_alignment(Path::new("cones.fas"), &LoadOptions::default()).unwrap();
//! println!("{} of {} sequences kept", report.sequences_retained, report.sequences_read);
//! ```
//!
//! ## Sequence states
//!
//! | Input | Stored as |
//! |-------|-----------|
//! | `A C G T` (any case) | itself, uppercase |
//! | `-` | `D` when gaps are characters, otherwise `N` |
//! | anything else | `N` (undetermined) |

use thiserror::Error;

use crate::core::alignment::AlignmentError;

pub mod config;
pub mod fasta;
pub mod taxa;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("noodles error: {0}")]
    Noodles(String),

    #[error(transparent)]
    Alignment(#[from] AlignmentError),

    #[error("Too many sequences: {0} exceeds maximum allowed (100000)")]
    TooManySequences(usize),

    #[error("Unknown parameter '{key}' on line {line}")]
    UnknownParameter { key: String, line: usize },

    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}
