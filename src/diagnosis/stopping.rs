//! Stopping rules for growing a robust combination.
//!
//! A rule inspects the audit trail of extension steps so far and decides
//! whether the latest combination is durable enough to stop. The builder
//! always also stops at the maximum refined length and when no candidate
//! site improves the score.

use serde::{Deserialize, Serialize};

use crate::diagnosis::builder::RdncStep;

/// Decides whether the combination at the end of `trail` is final
pub trait StoppingRule: Send + Sync {
    fn is_satisfied(&self, trail: &[RdncStep]) -> bool;
}

/// Stop once the last `runs` steps all scored at or above `threshold`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsecutiveThreshold {
    pub threshold: u32,
    pub runs: usize,
}

impl StoppingRule for ConsecutiveThreshold {
    fn is_satisfied(&self, trail: &[RdncStep]) -> bool {
        trail.len() >= self.runs
            && trail[trail.len() - self.runs..]
                .iter()
                .all(|step| step.score.rounded() >= self.threshold)
    }
}

/// Stop as soon as one step scores at or above `threshold`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirstThreshold {
    pub threshold: u32,
}

impl StoppingRule for FirstThreshold {
    fn is_satisfied(&self, trail: &[RdncStep]) -> bool {
        trail
            .last()
            .is_some_and(|step| step.score.rounded() >= self.threshold)
    }
}

/// Serializable choice of stopping rule; the threshold comes from the scoring level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoppingPolicy {
    ConsecutiveThreshold { runs: usize },
    FirstThreshold,
}

impl Default for StoppingPolicy {
    fn default() -> Self {
        Self::ConsecutiveThreshold { runs: 2 }
    }
}

impl StoppingPolicy {
    #[must_use]
    pub fn rule(self, threshold: u32) -> Box<dyn StoppingRule> {
        match self {
            Self::ConsecutiveThreshold { runs } => {
                Box::new(ConsecutiveThreshold { threshold, runs })
            }
            Self::FirstThreshold => Box::new(FirstThreshold { threshold }),
        }
    }
}
