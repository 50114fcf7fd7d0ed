use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::cmp::Ordering;

use crate::core::alignment::Alignment;

/// A single alignment site paired with a nucleotide state.
///
/// `position` is the zero-based column; reports use one-based site numbers.
/// The serialized `site` is always the one-based alignment column, even when
/// an indexing reference relabels sites in text output; structured reports
/// carry the reference labels alongside (see [`Alignment::site_labels`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SiteState {
    pub position: usize,
    pub state: u8,
}

impl SiteState {
    #[must_use]
    pub fn new(position: usize, state: u8) -> Self {
        Self { position, state }
    }

    /// One-based site number
    #[must_use]
    pub fn site(&self) -> usize {
        self.position + 1
    }
}

impl Serialize for SiteState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("SiteState", 2)?;
        s.serialize_field("site", &self.site())?;
        s.serialize_field("state", &char::from(self.state))?;
        s.end()
    }
}

/// A set of site/state pairs, at most one per site, ordered by position.
///
/// Combinations are plain values: extending one yields a new combination.
/// Ordering is size first, then by the pairs themselves, so the smallest
/// combination in a sorted list is the shortest and earliest one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Combination {
    pairs: Vec<SiteState>,
}

impl Combination {
    /// Build from pairs in any order. When two pairs share a site the first one wins.
    #[must_use]
    pub fn new(pairs: impl IntoIterator<Item = SiteState>) -> Self {
        let mut pairs: Vec<SiteState> = pairs.into_iter().collect();
        pairs.sort_by_key(|p| p.position);
        pairs.dedup_by_key(|p| p.position);
        Self { pairs }
    }

    /// Copy of this combination with one more pair
    #[must_use]
    pub fn extended(&self, pair: SiteState) -> Self {
        let mut pairs = self.pairs.clone();
        match pairs.binary_search_by_key(&pair.position, |p| p.position) {
            Ok(_) => {}
            Err(idx) => pairs.insert(idx, pair),
        }
        Self { pairs }
    }

    #[must_use]
    pub fn pairs(&self) -> &[SiteState] {
        &self.pairs
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.pairs.iter().map(|p| p.position)
    }

    #[must_use]
    pub fn first_position(&self) -> Option<usize> {
        self.pairs.first().map(|p| p.position)
    }

    #[must_use]
    pub fn contains_position(&self, position: usize) -> bool {
        self.pairs
            .binary_search_by_key(&position, |p| p.position)
            .is_ok()
    }

    /// True if every pair of `other` is also in `self`
    #[must_use]
    pub fn is_superset_of(&self, other: &Combination) -> bool {
        other.pairs.iter().all(|p| {
            self.pairs
                .binary_search_by_key(&p.position, |q| q.position)
                .is_ok_and(|idx| self.pairs[idx].state == p.state)
        })
    }

    /// True if the two combinations share no site
    #[must_use]
    pub fn is_site_disjoint(&self, other: &Combination) -> bool {
        !other.positions().any(|pos| self.contains_position(pos))
    }

    /// Semantic diagnosis: ordered "state at site" assertions, labelled by the alignment.
    #[must_use]
    pub fn statement(&self, alignment: &Alignment) -> DiagnosisStatement {
        DiagnosisStatement {
            assertions: self
                .pairs
                .iter()
                .map(|p| SiteAssertion {
                    site: alignment.site_label(p.position),
                    state: char::from(p.state),
                })
                .collect(),
        }
    }
}

impl Ord for Combination {
    fn cmp(&self, other: &Self) -> Ordering {
        self.len()
            .cmp(&other.len())
            .then_with(|| self.pairs.cmp(&other.pairs))
    }
}

impl PartialOrd for Combination {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for Combination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sites: Vec<String> = self.pairs.iter().map(|p| p.site().to_string()).collect();
        write!(f, "[{}]", sites.join(", "))
    }
}

/// One assertion of a molecular diagnosis
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteAssertion {
    pub site: String,
    pub state: char,
}

/// The human-readable diagnosis produced from a final combination
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct DiagnosisStatement {
    pub assertions: Vec<SiteAssertion>,
}

impl std::fmt::Display for DiagnosisStatement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .assertions
            .iter()
            .map(|a| format!("'{}' at site {}", a.state, a.site))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}
