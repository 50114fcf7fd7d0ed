//! Monte-Carlo robustness scoring of a diagnostic combination.
//!
//! Each replicate perturbs up to `nmax` query sequences with random
//! substitutions and asks whether the combination still tells every
//! perturbed sequence apart from every (unperturbed) reference sequence.
//! A substitution at a combination site replaces the query state with a
//! different nucleotide; the perturbed sequence is still diagnosed iff no
//! reference carries its (possibly substituted) states at every combination
//! site.
//!
//! Only combination sites can change the outcome, so a replicate samples
//! which of those sites are hit rather than materialising whole sequences:
//! for `m` substitutions at distinct positions among `d` determined sites,
//! the combination sites are visited in order and each is hit with
//! probability `(m - hits so far) / (d - sites visited)`, which reproduces
//! the joint hit distribution exactly.
//!
//! Replicates are independent and run in parallel. Replicate `i` draws from
//! its own generator seeded by `derive_seed(seed, i)`, so a score depends on
//! the seed only, never on thread scheduling.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;
use tracing::warn;

use crate::core::alignment::NUCLEOTIDES;
use crate::core::combination::{Combination, SiteState};
use crate::diagnosis::config::DiagnosisConfig;
use crate::diagnosis::site_matrix::SiteMatrix;
use crate::utils::bitset::SequenceSet;

/// Safely convert a count to f64 for percentage calculations
#[inline]
fn count_to_f64(count: usize) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    {
        count as f64
    }
}

/// Mix a base seed with a stream number (SplitMix64 finaliser)
#[must_use]
pub fn derive_seed(seed: u64, stream: u64) -> u64 {
    let mut z = seed ^ stream.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Fraction of simulated replicates in which a combination stayed diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RobustnessScore {
    pub successes: u32,
    pub iterations: u32,
}

impl RobustnessScore {
    #[must_use]
    pub fn new(successes: u32, iterations: u32) -> Self {
        Self {
            successes,
            iterations,
        }
    }

    /// Score as a percentage in `0.0..=100.0`
    #[must_use]
    pub fn percent(&self) -> f64 {
        if self.iterations == 0 {
            return 0.0;
        }
        100.0 * f64::from(self.successes) / f64::from(self.iterations)
    }

    /// Score rounded to an integer percentage, as reported
    #[must_use]
    pub fn rounded(&self) -> u32 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // 0..=100
        {
            self.percent().round() as u32
        }
    }
}

impl std::fmt::Display for RobustnessScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.rounded())
    }
}

/// Per-thread buffers reused across replicates
struct Scratch {
    ranks: Vec<usize>,
    carried: Vec<u8>,
    survivors: SequenceSet,
}

/// Estimates how often a combination survives random substitutions in the query
pub struct RobustnessSimulator<'m, 'a> {
    matrix: &'m SiteMatrix<'a>,
    pdiff: f64,
    iterations: u32,
    nmax: usize,
}

impl<'m, 'a> RobustnessSimulator<'m, 'a> {
    #[must_use]
    pub fn new(matrix: &'m SiteMatrix<'a>, config: &DiagnosisConfig) -> Self {
        Self {
            matrix,
            pdiff: config.effective_pdiff(),
            iterations: config.iterations,
            nmax: config.nmax,
        }
    }

    /// Number of query sequences perturbed in each replicate
    #[must_use]
    pub fn perturbed_per_replicate(&self) -> usize {
        self.nmax.min(self.matrix.query_len())
    }

    /// Largest substitution count for a sequence with `determined` determined sites
    #[must_use]
    pub fn max_mutations(&self, determined: usize) -> usize {
        if self.pdiff <= 0.0 || determined == 0 {
            return 0;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // non-negative, <= determined
        let scaled = (self.pdiff / 100.0 * count_to_f64(determined)).floor() as usize;
        scaled.clamp(1, determined)
    }

    /// Score `combination`, which must be diagnostic for the matrix's groups.
    ///
    /// Degenerate settings (no substitutions possible, or nothing to perturb)
    /// leave every replicate unchanged, so every replicate succeeds.
    #[must_use]
    pub fn score(&self, combination: &Combination, seed: u64) -> RobustnessScore {
        let perturbed = self.perturbed_per_replicate();
        let can_mutate = (0..self.matrix.query_len())
            .any(|rank| self.max_mutations(self.matrix.query_determined_count(rank)) > 0);

        if perturbed == 0 || !can_mutate || combination.is_empty() {
            warn!(
                "Degenerate simulation (pdiff {}%, {} sequences perturbed): no substitutions applied",
                self.pdiff, perturbed
            );
            return RobustnessScore::new(self.iterations, self.iterations);
        }

        let successes: u32 = (0..self.iterations)
            .into_par_iter()
            .map_init(
                || Scratch {
                    ranks: (0..self.matrix.query_len()).collect(),
                    carried: combination.pairs().iter().map(|pair| pair.state).collect(),
                    survivors: SequenceSet::empty(self.matrix.reference_len()),
                },
                |scratch, i| {
                    let mut rng = StdRng::seed_from_u64(derive_seed(seed, u64::from(i)));
                    u32::from(self.replicate(combination.pairs(), &mut rng, scratch))
                },
            )
            .sum();

        RobustnessScore::new(successes, self.iterations)
    }

    /// One replicate: true if every perturbed sequence is still diagnosed
    fn replicate<R: Rng>(
        &self,
        pairs: &[SiteState],
        rng: &mut R,
        scratch: &mut Scratch,
    ) -> bool {
        let selected = self.perturbed_per_replicate();

        // Partial Fisher-Yates: the first `selected` ranks become a uniform sample
        let total = scratch.ranks.len();
        for j in 0..selected {
            let k = rng.gen_range(j..total);
            scratch.ranks.swap(j, k);
        }

        for j in 0..selected {
            let rank = scratch.ranks[j];
            if !self.perturb(rank, pairs, rng, &mut scratch.carried) {
                continue;
            }
            let carriers = pairs.iter().zip(&scratch.carried).map(|(pair, &state)| {
                self.matrix
                    .reference_carriers(SiteState::new(pair.position, state))
            });
            if !still_diagnosed(carriers, &mut scratch.survivors) {
                return false;
            }
        }
        true
    }

    /// Apply substitutions to one query sequence, recording the state it now
    /// carries at each combination site.
    ///
    /// Returns false when no combination site was hit.
    fn perturb<R: Rng>(
        &self,
        rank: usize,
        pairs: &[SiteState],
        rng: &mut R,
        carried: &mut [u8],
    ) -> bool {
        let determined = self.matrix.query_determined_count(rank);
        let max = self.max_mutations(determined);
        if max == 0 {
            return false;
        }

        let mut remaining_mutations = rng.gen_range(1..=max);
        let mut remaining_sites = determined;
        let mut any_hit = false;

        for (pair, state) in pairs.iter().zip(carried.iter_mut()) {
            *state = pair.state;
            if remaining_mutations > 0 && rng.gen_range(0..remaining_sites) < remaining_mutations {
                remaining_mutations -= 1;
                *state = substitute(pair.state, rng);
                any_hit = true;
            }
            remaining_sites -= 1;
        }

        any_hit
    }
}

/// A nucleotide other than `state`, chosen uniformly
fn substitute<R: Rng>(state: u8, rng: &mut R) -> u8 {
    match NUCLEOTIDES.iter().position(|&n| n == state) {
        Some(idx) => {
            let offset = rng.gen_range(1..NUCLEOTIDES.len());
            NUCLEOTIDES[(idx + offset) % NUCLEOTIDES.len()]
        }
        None => NUCLEOTIDES[rng.gen_range(0..NUCLEOTIDES.len())],
    }
}

/// True if no reference sequence is in every one of `carriers`
fn still_diagnosed<'s>(
    carriers: impl IntoIterator<Item = &'s SequenceSet>,
    survivors: &mut SequenceSet,
) -> bool {
    survivors.fill();
    for set in carriers {
        survivors.intersect_with(set);
        if survivors.is_empty() {
            return true;
        }
    }
    survivors.is_empty()
}
