//! Diagnostic combination engine.
//!
//! For one query group the pipeline is:
//!
//! 1. [`site_matrix::SiteMatrix`]: per-site state sets split into query and reference
//! 2. [`search::MinimalCombinationSearch`]: every minimal diagnostic combination (mDNC)
//!    up to the raw length cap
//! 3. [`independence::count_independent`]: greedy count of site-disjoint mDNCs
//! 4. [`builder::RdncBuilder`]: grows the shortest mDNC into a robust combination (rDNC),
//!    scoring each step with [`simulator::RobustnessSimulator`] and stopping by a
//!    [`stopping::StoppingRule`]
//!
//! [`engine::DiagnosisEngine`] runs the pipeline for many groups in parallel and
//! turns per-group failures into [`engine::GroupOutcome::NoDiagnosis`] values.

pub mod builder;
pub mod config;
pub mod engine;
pub mod independence;
pub mod pairwise;
pub mod search;
pub mod simulator;
pub mod site_matrix;
pub mod stopping;

pub use builder::{RdncBuilder, RdncResult, RdncStep, StopReason};
pub use config::{ConfigError, DiagnosisConfig, SiteCutoff};
pub use engine::{DiagnosisEngine, GroupDiagnosis, GroupOutcome, MdncSummary, NoDiagnosisReason};
pub use pairwise::{PairwiseComparison, PairwiseSite};
pub use search::{MdncSet, MinimalCombinationSearch, Truncation};
pub use simulator::{RobustnessScore, RobustnessSimulator};
pub use site_matrix::SiteMatrix;
pub use stopping::{StoppingPolicy, StoppingRule};
