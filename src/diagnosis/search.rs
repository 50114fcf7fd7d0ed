//! Breadth-first search for minimal diagnostic combinations (mDNCs).
//!
//! Levels are searched in increasing size. Within a level, candidate sets
//! are enumerated depth-first in column order while tracking which
//! reference sequences still match the partial set. Two prunings keep the
//! enumeration tractable without losing minimal sets:
//!
//! - a pair that excludes none of the current survivors would be redundant
//!   in any completion, so it is skipped;
//! - a prefix that already excludes every reference cannot be completed to
//!   a minimal set of the current size.
//!
//! A completed diagnostic set is minimal iff it contains no mDNC retained at
//! an earlier level.

use std::collections::BTreeSet;
use std::ops::ControlFlow;

use serde::Serialize;
use tracing::debug;

use crate::core::combination::{Combination, SiteState};
use crate::diagnosis::config::DiagnosisConfig;
use crate::diagnosis::site_matrix::SiteMatrix;
use crate::utils::bitset::SequenceSet;

/// Why a search stopped before exhausting every level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Truncation {
    /// The configured number of retrieved mDNCs was reached
    ResultCap,
    /// The configured number of examined candidate sets was reached
    Budget,
}

/// Every minimal diagnostic combination found for one query group
#[derive(Debug, Clone, Default)]
pub struct MdncSet {
    /// Retrieved mDNCs, sorted by size then by sites
    pub combinations: Vec<Combination>,
    /// Query-fixed sites that exclude at least one reference sequence
    pub candidate_sites: usize,
    /// Largest combination size examined
    pub deepest_level: usize,
    /// Set when the search stopped early
    pub truncated: Option<Truncation>,
    /// True when even all candidate sites together cannot exclude every reference
    pub infeasible: bool,
}

impl MdncSet {
    #[must_use]
    pub fn len(&self) -> usize {
        self.combinations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.combinations.is_empty()
    }

    /// The shortest retrieved mDNC, earliest sites first on ties
    #[must_use]
    pub fn shortest(&self) -> Option<&Combination> {
        self.combinations.first()
    }

    /// Retrieved mDNCs of a single site
    pub fn single_site(&self) -> impl Iterator<Item = &Combination> {
        self.combinations.iter().take_while(|c| c.len() == 1)
    }

    /// Number of distinct sites used by any retrieved mDNC
    #[must_use]
    pub fn sites_involved(&self) -> usize {
        self.combinations
            .iter()
            .flat_map(Combination::positions)
            .collect::<BTreeSet<_>>()
            .len()
    }
}

struct Candidate<'m> {
    pair: SiteState,
    carriers: &'m SequenceSet,
}

/// mDNCs retained so far, as sorted candidate indices
struct Accumulated {
    combos: Vec<Vec<usize>>,
    by_first: Vec<Vec<usize>>,
}

impl Accumulated {
    fn new(candidates: usize) -> Self {
        Self {
            combos: Vec::new(),
            by_first: vec![Vec::new(); candidates],
        }
    }

    fn len(&self) -> usize {
        self.combos.len()
    }

    fn push(&mut self, combo: Vec<usize>) {
        self.by_first[combo[0]].push(self.combos.len());
        self.combos.push(combo);
    }

    /// True if some retained mDNC is a subset of `chosen` (sorted)
    fn contains_any_within(&self, chosen: &[usize]) -> bool {
        chosen.iter().any(|&first| {
            self.by_first[first].iter().any(|&id| {
                self.combos[id]
                    .iter()
                    .all(|idx| chosen.binary_search(idx).is_ok())
            })
        })
    }
}

struct LevelSearch<'s, 'm> {
    candidates: &'s [Candidate<'m>],
    accumulated: &'s Accumulated,
    size: usize,
    chosen: Vec<usize>,
    survivors: Vec<SequenceSet>,
    found: Vec<Vec<usize>>,
    examined: &'s mut u64,
    budget: u64,
    max_results: usize,
}

impl LevelSearch<'_, '_> {
    fn descend(&mut self, start: usize, depth: usize) -> ControlFlow<Truncation> {
        let n = self.candidates.len();
        for i in start..n {
            if n - i < self.size - depth {
                break;
            }
            if *self.examined >= self.budget {
                return ControlFlow::Break(Truncation::Budget);
            }
            *self.examined += 1;

            let carriers = self.candidates[i].carriers;
            let (head, tail) = self.survivors.split_at_mut(depth + 1);
            let current = &head[depth];
            if current.is_subset_of(carriers) {
                continue;
            }
            let next = &mut tail[0];
            next.assign_intersection(current, carriers);
            let all_excluded = next.is_empty();

            self.chosen.push(i);
            let flow = if depth + 1 == self.size {
                self.record(all_excluded)
            } else if all_excluded {
                ControlFlow::Continue(())
            } else {
                self.descend(i + 1, depth + 1)
            };
            self.chosen.pop();

            if flow.is_break() {
                return flow;
            }
        }
        ControlFlow::Continue(())
    }

    fn record(&mut self, all_excluded: bool) -> ControlFlow<Truncation> {
        if all_excluded && !self.accumulated.contains_any_within(&self.chosen) {
            self.found.push(self.chosen.clone());
            if self.accumulated.len() + self.found.len() >= self.max_results {
                return ControlFlow::Break(Truncation::ResultCap);
            }
        }
        ControlFlow::Continue(())
    }
}

/// Level-wise search for minimal diagnostic combinations of one query group
pub struct MinimalCombinationSearch<'m, 'a> {
    matrix: &'m SiteMatrix<'a>,
    max_len: usize,
    max_results: usize,
    budget: u64,
}

impl<'m, 'a> MinimalCombinationSearch<'m, 'a> {
    #[must_use]
    pub fn new(matrix: &'m SiteMatrix<'a>, config: &DiagnosisConfig) -> Self {
        Self {
            matrix,
            max_len: config.max_len_raw,
            max_results: config.max_mdnc,
            budget: config.search_budget,
        }
    }

    /// Retrieve every mDNC up to the maximum raw length.
    ///
    /// Deterministic: identical input and parameters give an identical set.
    #[must_use]
    pub fn run(&self) -> MdncSet {
        let candidates: Vec<Candidate<'m>> = self
            .matrix
            .fixed_sites()
            .into_iter()
            .filter(|&pair| self.matrix.excluded_count(pair) > 0)
            .map(|pair| Candidate {
                pair,
                carriers: self.matrix.reference_carriers(pair),
            })
            .collect();

        let mut result = MdncSet {
            candidate_sites: candidates.len(),
            ..MdncSet::default()
        };

        if candidates.is_empty() {
            debug!("No informative query-fixed sites");
            return result;
        }

        let mut joint = SequenceSet::full(self.matrix.reference_len());
        for candidate in &candidates {
            joint.intersect_with(candidate.carriers);
        }
        if !joint.is_empty() {
            debug!(
                "{} reference sequences match the query at every candidate site",
                joint.len()
            );
            result.infeasible = true;
            return result;
        }

        let mut accumulated = Accumulated::new(candidates.len());
        let mut examined = 0u64;

        for size in 1..=self.max_len.min(candidates.len()) {
            let mut survivors = vec![SequenceSet::empty(self.matrix.reference_len()); size + 1];
            survivors[0].fill();

            let mut level = LevelSearch {
                candidates: &candidates,
                accumulated: &accumulated,
                size,
                chosen: Vec::with_capacity(size),
                survivors,
                found: Vec::new(),
                examined: &mut examined,
                budget: self.budget,
                max_results: self.max_results,
            };
            let flow = level.descend(0, 0);
            let found = level.found;

            debug!("Level {size}: {} new mDNCs", found.len());
            result.deepest_level = size;
            for combo in found {
                accumulated.push(combo);
            }

            if let ControlFlow::Break(reason) = flow {
                debug!("Search truncated at level {size}: {reason:?}");
                result.truncated = Some(reason);
                break;
            }
        }

        result.combinations = accumulated
            .combos
            .iter()
            .map(|idxs| Combination::new(idxs.iter().map(|&i| candidates[i].pair)))
            .collect();
        result
    }
}
