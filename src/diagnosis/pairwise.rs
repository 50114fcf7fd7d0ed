//! Site-by-site comparison of two taxa.

use serde::Serialize;

use crate::core::alignment::Alignment;
use crate::core::taxon::TaxonPair;
use crate::diagnosis::site_matrix::SiteMatrix;

/// A site at which the two taxa share no determined state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairwiseSite {
    /// Site label (alignment column or indexing-reference position)
    pub site: String,
    /// Zero-based alignment column
    #[serde(skip)]
    pub position: usize,
    pub first_states: String,
    pub second_states: String,
}

/// Every site separating the two taxa of a pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairwiseComparison {
    pub first: String,
    pub second: String,
    pub first_sequences: usize,
    pub second_sequences: usize,
    pub sites: Vec<PairwiseSite>,
}

impl PairwiseComparison {
    #[must_use]
    pub fn count(&self) -> usize {
        self.sites.len()
    }
}

/// Compare two taxa column by column.
///
/// A site is reported when both taxa have at least one determined state
/// there and the two state sets do not overlap.
#[must_use]
pub fn compare(alignment: &Alignment, pair: &TaxonPair) -> PairwiseComparison {
    let matrix = SiteMatrix::from_members(
        alignment,
        pair.first.members.clone(),
        pair.second.members.clone(),
    );

    let sites = (0..matrix.length())
        .filter_map(|pos| {
            let first: Vec<u8> = matrix.query_states(pos).collect();
            let second: Vec<u8> = matrix.reference_states(pos).collect();
            let separated = !first.is_empty()
                && !second.is_empty()
                && first.iter().all(|s| !second.contains(s));
            separated.then(|| PairwiseSite {
                site: alignment.site_label(pos),
                position: pos,
                first_states: sorted_states(&first),
                second_states: sorted_states(&second),
            })
        })
        .collect();

    PairwiseComparison {
        first: pair.first.name.clone(),
        second: pair.second.name.clone(),
        first_sequences: pair.first.len(),
        second_sequences: pair.second.len(),
        sites,
    }
}

fn sorted_states(states: &[u8]) -> String {
    let mut sorted = states.to_vec();
    sorted.sort_unstable();
    sorted.into_iter().map(char::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::alignment::SequenceRecord;
    use crate::core::taxon::TaxonGroup;

    fn alignment() -> Alignment {
        Alignment::new(vec![
            SequenceRecord::new("a1", "alpha", b"ACGTN".as_slice()),
            SequenceRecord::new("a2", "alpha", b"ACGAN".as_slice()),
            SequenceRecord::new("b1", "beta", b"TCCTA".as_slice()),
            SequenceRecord::new("b2", "beta", b"GCCAA".as_slice()),
            SequenceRecord::new("c1", "gamma", b"AAAAA".as_slice()),
        ])
        .unwrap()
    }

    #[test]
    fn test_disjoint_sites_reported() {
        let alignment = alignment();
        let pair = TaxonPair {
            first: TaxonGroup::new("alpha", vec![0, 1]),
            second: TaxonGroup::new("beta", vec![2, 3]),
        };
        let result = compare(&alignment, &pair);

        let positions: Vec<usize> = result.sites.iter().map(|s| s.position).collect();
        // column 4 overlaps (T/A on both sides), column 5 has no determined alpha state
        assert_eq!(positions, vec![0, 2]);
        assert_eq!(result.count(), 2);
        assert_eq!(result.sites[0].site, "1");
        assert_eq!(result.sites[0].first_states, "A");
        assert_eq!(result.sites[0].second_states, "GT");
        assert_eq!(result.sites[1].first_states, "G");
        assert_eq!(result.sites[1].second_states, "C");
        assert_eq!(result.first_sequences, 2);
        assert_eq!(result.second_sequences, 2);
    }

    #[test]
    fn test_other_taxa_ignored() {
        let alignment = alignment();
        let pair = TaxonPair {
            first: TaxonGroup::new("alpha", vec![0, 1]),
            second: TaxonGroup::new("gamma", vec![4]),
        };
        let result = compare(&alignment, &pair);
        let positions: Vec<usize> = result.sites.iter().map(|s| s.position).collect();
        assert_eq!(positions, vec![1, 2]);
    }
}
