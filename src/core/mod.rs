//! Core data types for molecular diagnosis.
//!
//! - [`Alignment`]: equal-length aligned sequences tagged with taxa
//! - [`TaxonGroup`]: a query taxon or merged clade, as alignment indices
//! - [`Combination`]: an ordered set of [`SiteState`] pairs, unique by site
//! - [`TaxonRank`], [`ScoringLevel`], [`GapHandling`]: run parameters
//!
//! ## Sites
//!
//! Positions are zero-based columns internally. Everything shown to a user
//! is one-based, or relabelled in the coordinates of an indexing reference
//! sequence when one is configured.

pub mod alignment;
pub mod combination;
pub mod taxon;
pub mod types;

pub use alignment::{Alignment, SequenceRecord};
pub use combination::{Combination, DiagnosisStatement, SiteState};
pub use taxon::{TaxonGroup, TaxonPair};
pub use types::{GapHandling, ScoringLevel, TaxonRank};
