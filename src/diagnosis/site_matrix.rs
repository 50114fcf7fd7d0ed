use crate::core::alignment::{Alignment, UNDETERMINED};
use crate::core::combination::{Combination, SiteState};
use crate::core::taxon::TaxonGroup;
use crate::utils::bitset::SequenceSet;

/// States seen at one site, each with the set of group members carrying it
#[derive(Debug, Clone, Default)]
struct StateSets {
    entries: Vec<(u8, SequenceSet)>,
}

impl StateSets {
    fn get(&self, state: u8) -> Option<&SequenceSet> {
        self.entries
            .iter()
            .find(|(s, _)| *s == state)
            .map(|(_, set)| set)
    }

    fn insert(&mut self, state: u8, member: usize, capacity: usize) {
        if let Some((_, set)) = self.entries.iter_mut().find(|(s, _)| *s == state) {
            set.insert(member);
        } else {
            let mut set = SequenceSet::empty(capacity);
            set.insert(member);
            self.entries.push((state, set));
        }
    }

    fn states(&self) -> impl Iterator<Item = u8> + '_ {
        self.entries.iter().map(|(s, _)| *s)
    }
}

#[derive(Debug, Clone, Default)]
struct SiteColumn {
    query: StateSets,
    reference: StateSets,
}

/// Column-oriented view of an alignment split into query and reference members.
///
/// Members are addressed by rank within their group (`0..query_len()` and
/// `0..reference_len()`); [`SiteMatrix::query_members`] and
/// [`SiteMatrix::reference_members`] map ranks back to alignment indices.
#[derive(Debug, Clone)]
pub struct SiteMatrix<'a> {
    alignment: &'a Alignment,
    query: Vec<usize>,
    reference: Vec<usize>,
    columns: Vec<SiteColumn>,
    undetermined: Vec<u8>,
    query_determined: Vec<usize>,
    no_carriers: SequenceSet,
}

impl<'a> SiteMatrix<'a> {
    /// Matrix for a query group against every other sequence in the alignment
    #[must_use]
    pub fn new(alignment: &'a Alignment, group: &TaxonGroup) -> Self {
        let reference = group.complement(alignment.sequence_count());
        Self::from_members(alignment, group.members.clone(), reference)
    }

    /// Matrix for explicit query and reference members, with `N` as the only undetermined state
    #[must_use]
    pub fn from_members(alignment: &'a Alignment, query: Vec<usize>, reference: Vec<usize>) -> Self {
        Self::with_undetermined(alignment, query, reference, &[UNDETERMINED])
    }

    /// Build the matrix in one pass over the alignment.
    ///
    /// States listed in `undetermined` never make a site fixed and are not
    /// counted as determined sites of a sequence.
    #[must_use]
    pub fn with_undetermined(
        alignment: &'a Alignment,
        query: Vec<usize>,
        reference: Vec<usize>,
        undetermined: &[u8],
    ) -> Self {
        let length = alignment.length();
        let mut columns = vec![SiteColumn::default(); length];

        for (rank, &idx) in query.iter().enumerate() {
            let states = &alignment.sequence(idx).states;
            for (column, &state) in columns.iter_mut().zip(states) {
                column.query.insert(state, rank, query.len());
            }
        }
        for (rank, &idx) in reference.iter().enumerate() {
            let states = &alignment.sequence(idx).states;
            for (column, &state) in columns.iter_mut().zip(states) {
                column.reference.insert(state, rank, reference.len());
            }
        }

        let query_determined = query
            .iter()
            .map(|&idx| {
                alignment
                    .sequence(idx)
                    .states
                    .iter()
                    .filter(|&&s| !undetermined.contains(&s))
                    .count()
            })
            .collect();

        Self {
            alignment,
            no_carriers: SequenceSet::empty(reference.len()),
            query,
            reference,
            columns,
            undetermined: undetermined.to_vec(),
            query_determined,
        }
    }

    #[must_use]
    pub fn alignment(&self) -> &'a Alignment {
        self.alignment
    }

    #[must_use]
    pub fn length(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn query_members(&self) -> &[usize] {
        &self.query
    }

    #[must_use]
    pub fn reference_members(&self) -> &[usize] {
        &self.reference
    }

    #[must_use]
    pub fn query_len(&self) -> usize {
        self.query.len()
    }

    #[must_use]
    pub fn reference_len(&self) -> usize {
        self.reference.len()
    }

    #[must_use]
    pub fn is_determined(&self, state: u8) -> bool {
        !self.undetermined.contains(&state)
    }

    /// Number of determined sites in the query member of rank `rank`
    #[must_use]
    pub fn query_determined_count(&self, rank: usize) -> usize {
        self.query_determined[rank]
    }

    /// Distinct determined states among query members at `position`
    pub fn query_states(&self, position: usize) -> impl Iterator<Item = u8> + '_ {
        self.columns[position]
            .query
            .states()
            .filter(|&s| self.is_determined(s))
    }

    /// Distinct determined states among reference members at `position`
    pub fn reference_states(&self, position: usize) -> impl Iterator<Item = u8> + '_ {
        self.columns[position]
            .reference
            .states()
            .filter(|&s| self.is_determined(s))
    }

    /// The single determined state every query member shares at `position`, if any
    #[must_use]
    pub fn fixed_state(&self, position: usize) -> Option<u8> {
        match self.columns[position].query.entries.as_slice() {
            [(state, _)] if self.is_determined(*state) => Some(*state),
            _ => None,
        }
    }

    /// Every site where the query is fixed, paired with its state, in column order
    #[must_use]
    pub fn fixed_sites(&self) -> Vec<SiteState> {
        (0..self.length())
            .filter_map(|pos| self.fixed_state(pos).map(|s| SiteState::new(pos, s)))
            .collect()
    }

    /// Reference members carrying `pair.state` at `pair.position`
    #[must_use]
    pub fn reference_carriers(&self, pair: SiteState) -> &SequenceSet {
        self.columns[pair.position]
            .reference
            .get(pair.state)
            .unwrap_or(&self.no_carriers)
    }

    /// Number of reference members the pair alone tells apart from the query
    #[must_use]
    pub fn excluded_count(&self, pair: SiteState) -> usize {
        self.reference_len() - self.reference_carriers(pair).len()
    }

    /// Reference members matching every pair of `combination`
    #[must_use]
    pub fn reference_survivors(&self, combination: &Combination) -> SequenceSet {
        let mut survivors = SequenceSet::full(self.reference_len());
        for &pair in combination.pairs() {
            survivors.intersect_with(self.reference_carriers(pair));
            if survivors.is_empty() {
                break;
            }
        }
        survivors
    }

    /// True iff the sequence at alignment index `index` carries every pair of `combination`
    #[must_use]
    pub fn matches(&self, index: usize, combination: &Combination) -> bool {
        combination
            .pairs()
            .iter()
            .all(|p| self.alignment.state(index, p.position) == p.state)
    }

    /// True iff every query member matches and no reference member matches `combination`
    #[must_use]
    pub fn is_diagnostic(&self, combination: &Combination) -> bool {
        let query_matches = combination.pairs().iter().all(|p| {
            self.columns[p.position]
                .query
                .get(p.state)
                .is_some_and(|carriers| carriers.len() == self.query_len())
        });
        query_matches && self.reference_survivors(combination).is_empty()
    }
}
