//! Greedy growth of a robust diagnostic combination (rDNC) from a seed mDNC.

use serde::Serialize;
use tracing::{debug, info};

use crate::core::combination::{Combination, SiteState};
use crate::diagnosis::config::{DiagnosisConfig, SiteCutoff};
use crate::diagnosis::simulator::{derive_seed, RobustnessScore, RobustnessSimulator};
use crate::diagnosis::site_matrix::SiteMatrix;
use crate::diagnosis::stopping::StoppingRule;

/// One entry of the audit trail: a candidate length and its score
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RdncStep {
    pub length: usize,
    pub combination: Combination,
    pub score: RobustnessScore,
}

/// Which condition ended the extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The stopping rule accepted the last step
    Threshold,
    /// The combination reached the maximum refined length
    MaxLength,
    /// No remaining site raised the score
    NoImprovement,
    /// No remaining site passes the cutoff
    NoCandidates,
}

/// Final robust combination with its audit trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RdncResult {
    pub steps: Vec<RdncStep>,
    pub combination: Combination,
    pub score: RobustnessScore,
    pub stop_reason: StopReason,
}

/// Grows a seed combination one site at a time using the simulator as an oracle
pub struct RdncBuilder<'s, 'm, 'a> {
    matrix: &'m SiteMatrix<'a>,
    simulator: &'s RobustnessSimulator<'m, 'a>,
    rule: &'s dyn StoppingRule,
    max_len: usize,
    cutoff: SiteCutoff,
}

impl<'s, 'm, 'a> RdncBuilder<'s, 'm, 'a> {
    #[must_use]
    pub fn new(
        matrix: &'m SiteMatrix<'a>,
        simulator: &'s RobustnessSimulator<'m, 'a>,
        rule: &'s dyn StoppingRule,
        config: &DiagnosisConfig,
    ) -> Self {
        Self {
            matrix,
            simulator,
            rule,
            max_len: config.max_len_refined,
            cutoff: config.cutoff,
        }
    }

    /// Query-fixed sites not yet in `current` that pass the cutoff
    fn extension_pool(&self, current: &Combination) -> Vec<SiteState> {
        self.matrix
            .fixed_sites()
            .into_iter()
            .filter(|pair| !current.contains_position(pair.position))
            .filter(|&pair| self.cutoff.admits(self.matrix.excluded_count(pair)))
            .collect()
    }

    /// Extend `seed_combination` until a stopping condition fires.
    ///
    /// Step `k` of the trail is scored with `derive_seed(seed, k)`; every
    /// candidate at one step shares that seed so candidates are compared on
    /// the same random stream.
    #[must_use]
    pub fn build(&self, seed_combination: &Combination, seed: u64) -> RdncResult {
        let mut current = seed_combination.clone();
        let mut score = self.simulator.score(&current, derive_seed(seed, 0));
        let mut steps = vec![self.step(&current, score)];
        // A seed longer than the cap is kept whole
        let max_len = self.max_len.max(seed_combination.len());

        let stop_reason = loop {
            if self.rule.is_satisfied(&steps) {
                break StopReason::Threshold;
            }
            if current.len() >= max_len {
                break StopReason::MaxLength;
            }

            let pool = self.extension_pool(&current);
            if pool.is_empty() {
                break StopReason::NoCandidates;
            }

            let step_seed = derive_seed(seed, steps.len() as u64);
            let mut best: Option<(Combination, RobustnessScore)> = None;
            for pair in pool {
                let candidate = current.extended(pair);
                let candidate_score = self.simulator.score(&candidate, step_seed);
                let better = best
                    .as_ref()
                    .map_or(true, |(_, s)| candidate_score.successes > s.successes);
                if better {
                    best = Some((candidate, candidate_score));
                }
            }

            let Some((candidate, candidate_score)) = best else {
                break StopReason::NoCandidates;
            };
            if candidate_score.successes <= score.successes {
                debug!(
                    "No extension of {current} improves on {score}; best was {candidate} at {candidate_score}"
                );
                break StopReason::NoImprovement;
            }

            current = candidate;
            score = candidate_score;
            steps.push(self.step(&current, score));
        };

        RdncResult {
            steps,
            combination: current,
            score,
            stop_reason,
        }
    }

    fn step(&self, combination: &Combination, score: RobustnessScore) -> RdncStep {
        info!(
            "{} rDNC_score ({}): {} - {}",
            combination.len(),
            score.iterations,
            combination,
            score
        );
        RdncStep {
            length: combination.len(),
            combination: combination.clone(),
            score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::alignment::{Alignment, SequenceRecord};
    use crate::core::taxon::TaxonGroup;
    use crate::diagnosis::stopping::{ConsecutiveThreshold, FirstThreshold};

    /// Two query sequences and six references; each reference differs from
    /// the query at site 1 and at one more site of its own.
    fn alignment() -> Alignment {
        let query = "ACGTACGTACGTACGTACGTACGTACGTACGTACGTACGT";
        let mut rows = vec![
            SequenceRecord::new("q1", "query", query.as_bytes()),
            SequenceRecord::new("q2", "query", query.as_bytes()),
        ];
        for r in 0..6 {
            let mut states = query.as_bytes().to_vec();
            states[0] = b'T';
            let own = 1 + r % 3;
            states[own] = b'A';
            rows.push(SequenceRecord::new(format!("r{r}"), "other", states));
        }
        Alignment::new(rows).unwrap()
    }

    fn config() -> DiagnosisConfig {
        DiagnosisConfig {
            pdiff: Some(10.0),
            iterations: 1000,
            ..DiagnosisConfig::default()
        }
    }

    #[test]
    fn test_rdnc_is_superset_of_seed() {
        let alignment = alignment();
        let group = TaxonGroup::new("query", vec![0, 1]);
        let matrix = SiteMatrix::new(&alignment, &group);
        let config = config();
        let simulator = RobustnessSimulator::new(&matrix, &config);
        let rule = ConsecutiveThreshold {
            threshold: 100,
            runs: 2,
        };
        let builder = RdncBuilder::new(&matrix, &simulator, &rule, &config);

        let seed = Combination::new([SiteState::new(0, b'A')]);
        let result = builder.build(&seed, 5);

        assert!(result.combination.is_superset_of(&seed));
        assert!(result.combination.len() <= config.max_len_refined);
        assert!(result.combination.len() >= seed.len());
        assert!(matrix.is_diagnostic(&result.combination));
        assert_eq!(result.steps.first().unwrap().combination, seed);
        assert_eq!(result.steps.last().unwrap().combination, result.combination);
        for pair in result.steps.windows(2) {
            assert_eq!(pair[1].length, pair[0].length + 1);
            assert!(pair[1].combination.is_superset_of(&pair[0].combination));
        }
    }

    #[test]
    fn test_threshold_stops_early() {
        let alignment = alignment();
        let group = TaxonGroup::new("query", vec![0, 1]);
        let matrix = SiteMatrix::new(&alignment, &group);
        let config = config();
        let simulator = RobustnessSimulator::new(&matrix, &config);
        let rule = FirstThreshold { threshold: 0 };
        let builder = RdncBuilder::new(&matrix, &simulator, &rule, &config);

        let seed = Combination::new([SiteState::new(0, b'A')]);
        let result = builder.build(&seed, 5);

        assert_eq!(result.stop_reason, StopReason::Threshold);
        assert_eq!(result.combination, seed);
        assert_eq!(result.steps.len(), 1);
    }

    #[test]
    fn test_cutoff_can_empty_the_pool() {
        let alignment = alignment();
        let group = TaxonGroup::new("query", vec![0, 1]);
        let matrix = SiteMatrix::new(&alignment, &group);
        let config = DiagnosisConfig {
            cutoff: SiteCutoff { min_excluded: 7 },
            ..config()
        };
        let simulator = RobustnessSimulator::new(&matrix, &config);
        let rule = ConsecutiveThreshold {
            threshold: 100,
            runs: 2,
        };
        let builder = RdncBuilder::new(&matrix, &simulator, &rule, &config);

        let seed = Combination::new([SiteState::new(0, b'A')]);
        let result = builder.build(&seed, 5);
        assert_eq!(result.stop_reason, StopReason::NoCandidates);
        assert_eq!(result.combination, seed);
    }

    #[test]
    fn test_seed_longer_than_cap_is_kept() {
        let alignment = alignment();
        let group = TaxonGroup::new("query", vec![0, 1]);
        let matrix = SiteMatrix::new(&alignment, &group);
        let config = DiagnosisConfig {
            max_len_refined: 1,
            ..config()
        };
        let simulator = RobustnessSimulator::new(&matrix, &config);
        let rule = ConsecutiveThreshold {
            threshold: 100,
            runs: 2,
        };
        let builder = RdncBuilder::new(&matrix, &simulator, &rule, &config);

        let seed = Combination::new([SiteState::new(1, b'C'), SiteState::new(2, b'G')]);
        let result = builder.build(&seed, 5);
        assert_eq!(result.combination, seed);
        assert_eq!(result.stop_reason, StopReason::MaxLength);
    }

    #[test]
    fn test_build_is_reproducible() {
        let alignment = alignment();
        let group = TaxonGroup::new("query", vec![0, 1]);
        let matrix = SiteMatrix::new(&alignment, &group);
        let config = config();
        let simulator = RobustnessSimulator::new(&matrix, &config);
        let rule = ConsecutiveThreshold {
            threshold: 90,
            runs: 2,
        };
        let builder = RdncBuilder::new(&matrix, &simulator, &rule, &config);

        let seed = Combination::new([SiteState::new(0, b'A')]);
        assert_eq!(builder.build(&seed, 9), builder.build(&seed, 9));
    }
}
