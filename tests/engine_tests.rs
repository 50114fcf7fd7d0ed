//! Properties of the diagnosis engine on a simulated multi-taxon alignment.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use dnc_solver::diagnosis::independence::independent_combinations;
use dnc_solver::diagnosis::search::MinimalCombinationSearch;
use dnc_solver::diagnosis::simulator::RobustnessSimulator;
use dnc_solver::diagnosis::site_matrix::SiteMatrix;
use dnc_solver::parsing::taxa::all_taxa;
use dnc_solver::{
    Alignment, Combination, DiagnosisConfig, DiagnosisEngine, GroupOutcome, SequenceRecord,
};

const NUCLEOTIDES: &[u8; 4] = b"ACGT";

/// Four taxa of five sequences each, diverged from one ancestor, with
/// within-taxon noise so not every site is fixed.
fn simulated_alignment(seed: u64) -> Alignment {
    let mut rng = StdRng::seed_from_u64(seed);
    let length = 60;
    let ancestor: Vec<u8> = (0..length)
        .map(|_| NUCLEOTIDES[rng.gen_range(0..4)])
        .collect();

    let mut records = Vec::new();
    for taxon in 0..4 {
        let mut base = ancestor.clone();
        for _ in 0..4 {
            let pos = rng.gen_range(0..length);
            base[pos] = NUCLEOTIDES[rng.gen_range(0..4)];
        }
        for i in 0..5 {
            let mut states = base.clone();
            if rng.gen_bool(0.5) {
                let pos = rng.gen_range(0..length);
                states[pos] = NUCLEOTIDES[rng.gen_range(0..4)];
            }
            records.push(SequenceRecord::new(
                format!("t{taxon}_s{i}"),
                format!("taxon{taxon}"),
                states,
            ));
        }
    }
    Alignment::new(records).unwrap()
}

fn config() -> DiagnosisConfig {
    DiagnosisConfig {
        max_len_raw: 4,
        iterations: 300,
        ..DiagnosisConfig::default()
    }
}

fn without(combination: &Combination, skip: usize) -> Combination {
    Combination::new(
        combination
            .pairs()
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != skip)
            .map(|(_, &p)| p),
    )
}

#[test]
fn test_mdncs_are_diagnostic_and_minimal() {
    for seed in 0..5 {
        let alignment = simulated_alignment(seed);
        for group in all_taxa(&alignment) {
            let matrix = SiteMatrix::new(&alignment, &group);
            let mdncs = MinimalCombinationSearch::new(&matrix, &config()).run();

            for combination in &mdncs.combinations {
                assert!(matrix.is_diagnostic(combination), "{combination} not diagnostic");
                for &query in matrix.query_members() {
                    assert!(matrix.matches(query, combination));
                }
                for &reference in matrix.reference_members() {
                    assert!(!matrix.matches(reference, combination));
                }
                if combination.len() > 1 {
                    for skip in 0..combination.len() {
                        assert!(
                            !matrix.is_diagnostic(&without(combination, skip)),
                            "{combination} is not minimal"
                        );
                    }
                }
            }
        }
    }
}

#[test]
fn test_search_is_deterministic() {
    let alignment = simulated_alignment(3);
    for group in all_taxa(&alignment) {
        let matrix = SiteMatrix::new(&alignment, &group);
        let first = MinimalCombinationSearch::new(&matrix, &config()).run();
        let second = MinimalCombinationSearch::new(&matrix, &config()).run();
        assert_eq!(first.combinations, second.combinations);
    }
}

#[test]
fn test_independent_mdncs_are_site_disjoint() {
    for seed in 0..5 {
        let alignment = simulated_alignment(seed);
        for group in all_taxa(&alignment) {
            let matrix = SiteMatrix::new(&alignment, &group);
            let mdncs = MinimalCombinationSearch::new(&matrix, &config()).run();
            let independent = independent_combinations(&mdncs.combinations);

            assert!(independent.len() <= mdncs.len());
            for (i, a) in independent.iter().enumerate() {
                for b in &independent[i + 1..] {
                    assert!(a.is_site_disjoint(b));
                }
            }
        }
    }
}

#[test]
fn test_rdnc_extends_its_seed_within_bounds() {
    for seed in 0..5 {
        let alignment = simulated_alignment(seed);
        let config = config();
        let engine = DiagnosisEngine::new(&alignment, config.clone()).unwrap();

        for result in engine.diagnose_all(&all_taxa(&alignment)) {
            let GroupOutcome::Diagnosed { rdnc, diagnosis } = &result.outcome else {
                assert_eq!(result.mdnc.retrieved, 0);
                continue;
            };
            let shortest = result.mdnc.shortest.as_ref().unwrap();
            assert!(rdnc.combination.is_superset_of(shortest));
            assert!(rdnc.combination.len() >= shortest.len());
            assert!(rdnc.combination.len() <= config.max_len_refined.max(shortest.len()));
            assert_eq!(diagnosis.assertions.len(), rdnc.combination.len());
            assert_eq!(rdnc.steps.last().unwrap().score, rdnc.score);
        }
    }
}

#[test]
fn test_robustness_grows_with_redundant_sites() {
    let alignment = simulated_alignment(1);
    let config = DiagnosisConfig {
        pdiff: Some(10.0),
        iterations: 2000,
        ..config()
    };

    for group in all_taxa(&alignment) {
        let matrix = SiteMatrix::new(&alignment, &group);
        let mdncs = MinimalCombinationSearch::new(&matrix, &config).run();
        let Some(seed_combination) = mdncs.shortest() else {
            continue;
        };
        let Some(extra) = matrix
            .fixed_sites()
            .into_iter()
            .find(|p| !seed_combination.contains_position(p.position))
        else {
            continue;
        };
        let extended = seed_combination.extended(extra);

        let simulator = RobustnessSimulator::new(&matrix, &config);
        let mean = |c: &Combination| -> f64 {
            (0..5).map(|s| simulator.score(c, s).percent()).sum::<f64>() / 5.0
        };
        assert!(mean(&extended) + 2.0 >= mean(seed_combination));
    }
}

#[test]
fn test_scores_are_reproducible() {
    let alignment = simulated_alignment(2);
    let engine = DiagnosisEngine::new(&alignment, config()).unwrap();
    let groups = all_taxa(&alignment);
    assert_eq!(engine.diagnose_all(&groups), engine.diagnose_all(&groups));
}

#[test]
fn test_query_identical_to_reference_is_reported() {
    let mut records: Vec<SequenceRecord> = simulated_alignment(4).sequences().to_vec();
    let copy = records[0].states.clone();
    records.push(SequenceRecord::new("twin", "twin_taxon", copy));
    let alignment = Alignment::new(records).unwrap();

    let engine = DiagnosisEngine::new(&alignment, config()).unwrap();
    let groups = all_taxa(&alignment);
    let twin = groups.iter().find(|g| g.name == "twin_taxon").unwrap();
    let result = engine.diagnose(twin, 1);

    assert!(!result.is_diagnosed());
    assert_eq!(result.mdnc.retrieved, 0);
    assert!(matches!(result.outcome, GroupOutcome::NoDiagnosis { .. }));
}
