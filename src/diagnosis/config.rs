use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use crate::core::types::{ScoringLevel, TaxonRank};
use crate::diagnosis::stopping::StoppingPolicy;
use crate::utils::validation::{is_valid_percent, MAX_COMBINATION_LENGTH};

/// Default maximum length of a minimal combination
pub const DEFAULT_MAX_LEN_RAW: usize = 12;

/// Default maximum length of a refined (robust) combination
pub const DEFAULT_MAX_LEN_REFINED: usize = 5;

/// Default number of simulated replicates per robustness score
pub const DEFAULT_ITERATIONS: u32 = 10_000;

/// Default number of query sequences perturbed per replicate
pub const DEFAULT_NMAX: usize = 10;

/// Default cap on retrieved minimal combinations per query group
pub const DEFAULT_MAX_MDNC: usize = 10_000;

/// Default cap on candidate sets examined by one search
pub const DEFAULT_SEARCH_BUDGET: u64 = 20_000_000;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be between {min} and {max}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: String,
        min: String,
        max: String,
    },

    #[error("Invalid cutoff '{0}': expected a form like '>1', '>=2' or '2'")]
    InvalidCutoff(String),

    #[error("Invalid scoring level: {0}")]
    InvalidScoring(String),
}

/// Minimum number of reference sequences a site must exclude to extend a
/// robust combination. Written as `>n`, `>=n`, or plain `n` (same as `>=n`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteCutoff {
    pub min_excluded: usize,
}

impl SiteCutoff {
    #[must_use]
    pub fn admits(self, excluded: usize) -> bool {
        excluded >= self.min_excluded
    }
}

impl Default for SiteCutoff {
    fn default() -> Self {
        Self { min_excluded: 2 }
    }
}

impl FromStr for SiteCutoff {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        let invalid = || ConfigError::InvalidCutoff(s.to_string());

        let min_excluded = if let Some(rest) = trimmed.strip_prefix(">=") {
            rest.parse::<usize>().map_err(|_| invalid())?
        } else if let Some(rest) = trimmed.strip_prefix('>') {
            rest.parse::<usize>().map_err(|_| invalid())? + 1
        } else {
            trimmed.parse::<usize>().map_err(|_| invalid())?
        };

        Ok(Self { min_excluded })
    }
}

impl std::fmt::Display for SiteCutoff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, ">={}", self.min_excluded)
    }
}

/// Run-wide parameters, shared read-only by every query group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosisConfig {
    /// Maximum size of a minimal diagnostic combination
    pub max_len_raw: usize,
    /// Maximum size of a refined diagnostic combination
    pub max_len_refined: usize,
    /// Simulated replicates per robustness score
    pub iterations: u32,
    /// Taxonomic rank, used for the default mutation intensity
    pub taxon_rank: TaxonRank,
    /// Maximum percent divergence of simulated sequences; rank default when unset
    pub pdiff: Option<f64>,
    /// Maximum number of query sequences perturbed per replicate
    pub nmax: usize,
    /// Robustness threshold for accepting a refined combination
    pub scoring: ScoringLevel,
    /// How the threshold is applied over consecutive extension steps
    pub stopping: StoppingPolicy,
    /// Minimum exclusion power of sites used to extend a combination
    pub cutoff: SiteCutoff,
    /// Stop retrieving minimal combinations after this many
    pub max_mdnc: usize,
    /// Stop the minimal search after examining this many candidate sets
    pub search_budget: u64,
    /// Seed for every simulation in the run
    pub seed: u64,
}

impl Default for DiagnosisConfig {
    fn default() -> Self {
        Self {
            max_len_raw: DEFAULT_MAX_LEN_RAW,
            max_len_refined: DEFAULT_MAX_LEN_REFINED,
            iterations: DEFAULT_ITERATIONS,
            taxon_rank: TaxonRank::default(),
            pdiff: None,
            nmax: DEFAULT_NMAX,
            scoring: ScoringLevel::default(),
            stopping: StoppingPolicy::default(),
            cutoff: SiteCutoff::default(),
            max_mdnc: DEFAULT_MAX_MDNC,
            search_budget: DEFAULT_SEARCH_BUDGET,
            seed: 1,
        }
    }
}

impl DiagnosisConfig {
    /// Mutation intensity in percent: explicit `pdiff`, else the rank default
    #[must_use]
    pub fn effective_pdiff(&self) -> f64 {
        self.pdiff.unwrap_or_else(|| self.taxon_rank.default_pdiff())
    }

    /// Robustness threshold as an integer percentage
    #[must_use]
    pub fn threshold(&self) -> u32 {
        self.scoring.threshold()
    }

    /// Check every parameter range. Run once before any group is processed.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::OutOfRange` for the first parameter outside its range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("max_len_raw", self.max_len_raw, 1, MAX_COMBINATION_LENGTH)?;
        check_range(
            "max_len_refined",
            self.max_len_refined,
            1,
            MAX_COMBINATION_LENGTH,
        )?;
        check_range("iterations", self.iterations, 1, u32::MAX)?;
        check_range("nmax", self.nmax, 1, usize::MAX)?;
        check_range("max_mdnc", self.max_mdnc, 1, usize::MAX)?;
        check_range("search_budget", self.search_budget, 1, u64::MAX)?;
        check_range("scoring threshold", self.threshold(), 0, 100)?;

        let pdiff = self.effective_pdiff();
        if !is_valid_percent(pdiff) {
            return Err(ConfigError::OutOfRange {
                name: "pdiff",
                value: pdiff.to_string(),
                min: "0".to_string(),
                max: "100".to_string(),
            });
        }

        if let StoppingPolicy::ConsecutiveThreshold { runs } = self.stopping {
            check_range("stopping runs", runs, 1, MAX_COMBINATION_LENGTH)?;
        }

        Ok(())
    }
}

fn check_range<T>(name: &'static str, value: T, min: T, max: T) -> Result<(), ConfigError>
where
    T: PartialOrd + std::fmt::Display,
{
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            name,
            value: value.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        });
    }
    Ok(())
}
