//! Per-group orchestration: site matrix, mDNC search, independence count
//! and rDNC construction, with groups processed in parallel.

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::core::alignment::Alignment;
use crate::core::combination::{Combination, DiagnosisStatement};
use crate::core::taxon::{TaxonGroup, TaxonPair};
use crate::diagnosis::builder::{RdncBuilder, RdncResult};
use crate::diagnosis::config::{ConfigError, DiagnosisConfig};
use crate::diagnosis::independence::count_independent;
use crate::diagnosis::pairwise::{compare, PairwiseComparison};
use crate::diagnosis::search::{MdncSet, MinimalCombinationSearch, Truncation};
use crate::diagnosis::simulator::{derive_seed, RobustnessSimulator};
use crate::diagnosis::site_matrix::SiteMatrix;

/// Raw mDNC statistics for one query group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MdncSummary {
    /// Number of mDNCs retrieved
    pub retrieved: usize,
    /// Distinct sites used by any retrieved mDNC
    pub sites_involved: usize,
    /// Greedy count of site-disjoint mDNCs
    pub independent: usize,
    pub shortest: Option<Combination>,
    /// mDNCs consisting of one site
    pub single_site: Vec<Combination>,
    pub truncated: Option<Truncation>,
}

impl MdncSummary {
    fn from_set(set: &MdncSet) -> Self {
        Self {
            retrieved: set.len(),
            sites_involved: set.sites_involved(),
            independent: count_independent(&set.combinations),
            shortest: set.shortest().cloned(),
            single_site: set.single_site().cloned().collect(),
            truncated: set.truncated,
        }
    }
}

/// Why a group could not be diagnosed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum NoDiagnosisReason {
    /// Every sequence of the alignment belongs to the query group
    NoReferenceSequences,
    /// The query sequences share no determined state at any site
    NoFixedSites,
    /// The search finished without finding a diagnostic combination
    NoCombinationWithin { max_len: usize },
    /// The search stopped at its budget before finding a diagnostic combination
    SearchExhausted,
}

impl std::fmt::Display for NoDiagnosisReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoReferenceSequences => write!(f, "no reference sequences outside the query"),
            Self::NoFixedSites => write!(f, "no site is fixed across the query sequences"),
            Self::NoCombinationWithin { max_len } => {
                write!(f, "no diagnostic combination of up to {max_len} sites")
            }
            Self::SearchExhausted => {
                write!(f, "search budget exhausted before a diagnostic combination was found")
            }
        }
    }
}

/// Result of diagnosing one query group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum GroupOutcome {
    Diagnosed {
        rdnc: RdncResult,
        diagnosis: DiagnosisStatement,
    },
    NoDiagnosis {
        reason: NoDiagnosisReason,
    },
}

/// Everything computed for one query group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupDiagnosis {
    pub query: String,
    pub taxa: Vec<String>,
    pub query_sequences: usize,
    pub reference_sequences: usize,
    /// Query-fixed sites that exclude at least one reference sequence
    pub candidate_sites: usize,
    pub mdnc: MdncSummary,
    pub outcome: GroupOutcome,
}

impl GroupDiagnosis {
    #[must_use]
    pub fn is_diagnosed(&self) -> bool {
        matches!(self.outcome, GroupOutcome::Diagnosed { .. })
    }

    /// The final robust combination, if one was built
    #[must_use]
    pub fn rdnc(&self) -> Option<&RdncResult> {
        match &self.outcome {
            GroupOutcome::Diagnosed { rdnc, .. } => Some(rdnc),
            GroupOutcome::NoDiagnosis { .. } => None,
        }
    }
}

/// Runs the diagnosis pipeline over one alignment with a validated configuration
pub struct DiagnosisEngine<'a> {
    alignment: &'a Alignment,
    config: DiagnosisConfig,
}

impl<'a> DiagnosisEngine<'a> {
    /// Create an engine after validating `config`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if any parameter is out of range.
    pub fn new(alignment: &'a Alignment, config: DiagnosisConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { alignment, config })
    }

    #[must_use]
    pub fn config(&self) -> &DiagnosisConfig {
        &self.config
    }

    /// Diagnose every group in parallel; group `i` uses a seed derived from
    /// the configured seed and `i`. Results keep the input order.
    #[must_use]
    pub fn diagnose_all(&self, groups: &[TaxonGroup]) -> Vec<GroupDiagnosis> {
        groups
            .par_iter()
            .enumerate()
            .map(|(i, group)| self.diagnose(group, derive_seed(self.config.seed, i as u64)))
            .collect()
    }

    /// Diagnose a single query group against every other sequence.
    #[must_use]
    pub fn diagnose(&self, group: &TaxonGroup, seed: u64) -> GroupDiagnosis {
        let matrix = SiteMatrix::new(self.alignment, group);
        info!(
            "Diagnosing {} ({} query, {} reference sequences)",
            group.name,
            matrix.query_len(),
            matrix.reference_len()
        );

        let mut report = GroupDiagnosis {
            query: group.name.clone(),
            taxa: group.taxa.clone(),
            query_sequences: matrix.query_len(),
            reference_sequences: matrix.reference_len(),
            candidate_sites: 0,
            mdnc: MdncSummary::from_set(&MdncSet::default()),
            outcome: GroupOutcome::NoDiagnosis {
                reason: NoDiagnosisReason::NoReferenceSequences,
            },
        };

        if matrix.reference_len() == 0 {
            return report;
        }
        if matrix.fixed_sites().is_empty() {
            report.outcome = GroupOutcome::NoDiagnosis {
                reason: NoDiagnosisReason::NoFixedSites,
            };
            return report;
        }

        let mdncs = MinimalCombinationSearch::new(&matrix, &self.config).run();
        report.candidate_sites = mdncs.candidate_sites;
        report.mdnc = MdncSummary::from_set(&mdncs);
        info!(
            "{}: {} mDNCs retrieved, {} sites involved, {} independent",
            group.name, report.mdnc.retrieved, report.mdnc.sites_involved, report.mdnc.independent
        );

        let Some(seed_combination) = mdncs.shortest() else {
            let reason = match mdncs.truncated {
                Some(Truncation::Budget) if !mdncs.infeasible => NoDiagnosisReason::SearchExhausted,
                _ => NoDiagnosisReason::NoCombinationWithin {
                    max_len: self.config.max_len_raw,
                },
            };
            debug!("{}: {}", group.name, reason);
            report.outcome = GroupOutcome::NoDiagnosis { reason };
            return report;
        };

        let simulator = RobustnessSimulator::new(&matrix, &self.config);
        let rule = self.config.stopping.rule(self.config.threshold());
        let rdnc = RdncBuilder::new(&matrix, &simulator, rule.as_ref(), &self.config)
            .build(seed_combination, seed);
        debug!(
            "{}: rDNC {} with score {} ({:?})",
            group.name, rdnc.combination, rdnc.score, rdnc.stop_reason
        );

        let diagnosis = rdnc.combination.statement(self.alignment);
        report.outcome = GroupOutcome::Diagnosed { rdnc, diagnosis };
        report
    }

    /// Site-by-site comparison of each pair
    #[must_use]
    pub fn compare_pairs(&self, pairs: &[TaxonPair]) -> Vec<PairwiseComparison> {
        pairs
            .par_iter()
            .map(|pair| compare(self.alignment, pair))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::alignment::SequenceRecord;
    use crate::diagnosis::builder::StopReason;

    fn records(rows: &[(&str, &str, &str)]) -> Alignment {
        Alignment::new(
            rows.iter()
                .map(|(id, taxon, seq)| SequenceRecord::new(*id, *taxon, seq.as_bytes()))
                .collect(),
        )
        .unwrap()
    }

    fn quick_config() -> DiagnosisConfig {
        DiagnosisConfig {
            iterations: 200,
            ..DiagnosisConfig::default()
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let alignment = records(&[("a", "x", "ACGT"), ("b", "y", "ACGA")]);
        let config = DiagnosisConfig {
            max_len_raw: 0,
            ..DiagnosisConfig::default()
        };
        assert!(DiagnosisEngine::new(&alignment, config).is_err());
    }

    #[test]
    fn test_single_site_diagnosis() {
        let alignment = records(&[
            ("q1", "alpha", "ACGTACGTAC"),
            ("q2", "alpha", "ACGTACGTAC"),
            ("r1", "beta", "ACGAACGTAC"),
            ("r2", "beta", "ACGAACGTTC"),
            ("r3", "gamma", "ACGCACGTAC"),
        ]);
        let engine = DiagnosisEngine::new(&alignment, quick_config()).unwrap();
        let group = TaxonGroup::new("alpha", vec![0, 1]);
        let result = engine.diagnose(&group, 1);

        assert!(result.is_diagnosed());
        assert_eq!(result.query_sequences, 2);
        assert_eq!(result.reference_sequences, 3);
        assert_eq!(result.mdnc.single_site.len(), 1);
        let shortest = result.mdnc.shortest.clone().unwrap();
        assert_eq!(shortest.to_string(), "[4]");

        let rdnc = result.rdnc().unwrap();
        assert!(rdnc.combination.is_superset_of(&shortest));
        assert!(rdnc.combination.len() <= engine.config().max_len_refined);
        match &result.outcome {
            GroupOutcome::Diagnosed { diagnosis, .. } => {
                assert!(diagnosis.to_string().starts_with("'T' at site 4"));
            }
            GroupOutcome::NoDiagnosis { .. } => unreachable!(),
        }
    }

    #[test]
    fn test_identical_query_and_reference_is_not_diagnosed() {
        let alignment = records(&[
            ("q1", "alpha", "ACGTACGT"),
            ("r1", "beta", "ACGTACGT"),
            ("r2", "beta", "TTTTACGT"),
        ]);
        let engine = DiagnosisEngine::new(&alignment, quick_config()).unwrap();
        let result = engine.diagnose(&TaxonGroup::new("alpha", vec![0]), 1);

        assert!(!result.is_diagnosed());
        assert_eq!(result.mdnc.retrieved, 0);
        assert_eq!(
            result.outcome,
            GroupOutcome::NoDiagnosis {
                reason: NoDiagnosisReason::NoCombinationWithin { max_len: 12 }
            }
        );
        assert!(result.candidate_sites > 0);
    }

    #[test]
    fn test_no_reference_sequences() {
        let alignment = records(&[("q1", "alpha", "ACGT"), ("q2", "alpha", "ACGA")]);
        let engine = DiagnosisEngine::new(&alignment, quick_config()).unwrap();
        let result = engine.diagnose(&TaxonGroup::new("alpha", vec![0, 1]), 1);
        assert_eq!(
            result.outcome,
            GroupOutcome::NoDiagnosis {
                reason: NoDiagnosisReason::NoReferenceSequences
            }
        );
    }

    #[test]
    fn test_no_fixed_sites() {
        let alignment = records(&[
            ("q1", "alpha", "ACGT"),
            ("q2", "alpha", "TGCA"),
            ("r1", "beta", "GGGG"),
        ]);
        let engine = DiagnosisEngine::new(&alignment, quick_config()).unwrap();
        let result = engine.diagnose(&TaxonGroup::new("alpha", vec![0, 1]), 1);
        assert_eq!(
            result.outcome,
            GroupOutcome::NoDiagnosis {
                reason: NoDiagnosisReason::NoFixedSites
            }
        );
    }

    #[test]
    fn test_diagnose_all_is_ordered_and_reproducible() {
        let alignment = records(&[
            ("a1", "alpha", "AAAACCCCGG"),
            ("a2", "alpha", "AAAACCCCGT"),
            ("b1", "beta", "CCCCAAAAGG"),
            ("b2", "beta", "CCCCAAAATT"),
            ("c1", "gamma", "GGGGTTTTAA"),
        ]);
        let engine = DiagnosisEngine::new(&alignment, quick_config()).unwrap();
        let groups = vec![
            TaxonGroup::new("alpha", vec![0, 1]),
            TaxonGroup::new("beta", vec![2, 3]),
            TaxonGroup::new("gamma", vec![4]),
        ];

        let first = engine.diagnose_all(&groups);
        let second = engine.diagnose_all(&groups);
        assert_eq!(first, second);
        let names: Vec<&str> = first.iter().map(|g| g.query.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta", "gamma"]);
        assert!(first.iter().all(GroupDiagnosis::is_diagnosed));
    }

    #[test]
    fn test_rdnc_stops_at_refined_length() {
        let alignment = records(&[
            ("q1", "alpha", "ACGTACGTACGTACGT"),
            ("r1", "beta", "TCGTACGTACGTACGT"),
            ("r2", "beta", "TGCAACGTACGTACGT"),
            ("r3", "beta", "TGCATGCAACGTACGT"),
        ]);
        let config = DiagnosisConfig {
            max_len_refined: 2,
            scoring: crate::core::types::ScoringLevel::Custom(100),
            pdiff: Some(50.0),
            ..quick_config()
        };
        let engine = DiagnosisEngine::new(&alignment, config).unwrap();
        let result = engine.diagnose(&TaxonGroup::new("alpha", vec![0]), 3);
        let rdnc = result.rdnc().unwrap();
        assert!(rdnc.combination.len() <= 2);
        assert!(matches!(
            rdnc.stop_reason,
            StopReason::MaxLength | StopReason::NoImprovement | StopReason::Threshold
        ));
    }
}
