use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Taxonomic rank of the query, which sets the default mutation intensity
/// used when scoring robustness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TaxonRank {
    /// Up to 1% divergence from the original sequences
    #[default]
    Species,
    /// Up to 5% divergence from the original sequences
    Supraspecific,
}

impl TaxonRank {
    /// Default maximum percent divergence for simulated sequences
    #[must_use]
    pub fn default_pdiff(self) -> f64 {
        match self {
            Self::Species => 1.0,
            Self::Supraspecific => 5.0,
        }
    }

    /// Parse the numeric code used by configuration files (`1` or `2`)
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "1" => Some(Self::Species),
            "2" => Some(Self::Supraspecific),
            _ => None,
        }
    }
}

/// Named robustness thresholds for accepting a redundant combination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringLevel {
    Lousy,
    #[default]
    Moderate,
    Stringent,
    VeryStringent,
    /// Explicit percentage threshold
    Custom(u32),
}

impl ScoringLevel {
    /// Threshold as an integer percentage
    #[must_use]
    pub fn threshold(self) -> u32 {
        match self {
            Self::Lousy => 66,
            Self::Moderate => 75,
            Self::Stringent => 90,
            Self::VeryStringent => 95,
            Self::Custom(value) => value,
        }
    }
}

impl FromStr for ScoringLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "lousy" => Ok(Self::Lousy),
            "moderate" => Ok(Self::Moderate),
            "stringent" => Ok(Self::Stringent),
            "very_stringent" | "verystringent" => Ok(Self::VeryStringent),
            other => other
                .parse::<u32>()
                .map(Self::Custom)
                .map_err(|_| format!("unknown scoring level '{s}'")),
        }
    }
}

impl std::fmt::Display for ScoringLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lousy => write!(f, "lousy ({})", self.threshold()),
            Self::Moderate => write!(f, "moderate ({})", self.threshold()),
            Self::Stringent => write!(f, "stringent ({})", self.threshold()),
            Self::VeryStringent => write!(f, "very stringent ({})", self.threshold()),
            Self::Custom(value) => write!(f, "custom ({value})"),
        }
    }
}

/// How alignment gaps are coded when loading sequences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapHandling {
    /// Gaps become an independent character state
    #[default]
    AsCharacter,
    /// Gaps are treated as missing data
    AsMissing,
}

impl GapHandling {
    /// Parse the yes/no flag used by configuration files
    #[must_use]
    pub fn from_flag(flag: &str) -> Option<Self> {
        match flag.trim().to_lowercase().as_str() {
            "yes" | "y" | "true" => Some(Self::AsCharacter),
            "no" | "n" | "false" => Some(Self::AsMissing),
            _ => None,
        }
    }
}
