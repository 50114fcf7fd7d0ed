//! # dnc-solver
//!
//! A library for deriving molecular diagnoses of taxa from DNA alignments.
//!
//! A taxon is diagnosed by a combination of alignment sites and nucleotides that every
//! one of its sequences carries and no sequence of any other taxon carries in full.
//! `dnc-solver` finds such combinations in two stages:
//!
//! - **Minimal combinations (mDNCs)**: every diagnostic combination from which no site
//!   can be removed, searched level by level up to a maximum length
//! - **Robust combinations (rDNCs)**: the shortest mDNC grown one site at a time, each
//!   step scored by how often it still diagnoses the taxon after random mutations
//!
//! ## Features
//!
//! - **Merged clades**: several taxa can be diagnosed together as one query
//! - **Independence count**: how many mDNCs share no site
//! - **Reproducible scores**: every simulation is seeded from one run-wide seed
//! - **Explicit failures**: undiagnosable queries are reported with the statistics computed so far
//!
//! ## Example
//!
//! ```rust,no_run
//! use dnc_solver::{DiagnosisConfig, DiagnosisEngine};
//! use dnc_solver::parsing::fasta::{load_alignment, LoadOptions};
//! use dnc_solver::parsing::taxa::resolve_query;
//! use std::path::Path;
//!
//! let (alignment, _report) = load_alignment(Path::new("cones.fas"), &LoadOptions::default()).unwrap();
//! let selection = resolve_query("neridae,neridae+wiggi+verrucosa", &alignment).unwrap();
//!
//! let engine = DiagnosisEngine::new(&alignment, DiagnosisConfig::default()).unwrap();
//! for result in engine.diagnose_all(&selection.groups) {
//!     if let Some(rdnc) = result.rdnc() {
//!         println!("{}: {} - {}", result.query, rdnc.combination, rdnc.score);
//!     }
//! }
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Alignments, taxon groups and site/state combinations
//! - [`diagnosis`]: Site matrix, mDNC search, robustness simulation and rDNC construction
//! - [`parsing`]: FASTA alignments, MolD parameter files and query specifications
//! - [`cli`]: Command-line interface implementation

pub mod cli;
pub mod core;
pub mod diagnosis;
pub mod parsing;
pub mod utils;

// Re-export commonly used types for convenience
pub use core::alignment::{Alignment, SequenceRecord};
pub use core::combination::{Combination, DiagnosisStatement, SiteState};
pub use core::taxon::{TaxonGroup, TaxonPair};
pub use core::types::*;
pub use diagnosis::config::DiagnosisConfig;
pub use diagnosis::engine::{DiagnosisEngine, GroupDiagnosis, GroupOutcome};
