//! Greedy selection of site-disjoint mDNCs.
//!
//! Maximum set packing is NP-hard; the greedy count is reported as an
//! informational statistic and never drives further search.

use std::collections::HashSet;

use crate::core::combination::Combination;

/// Select pairwise site-disjoint combinations greedily.
///
/// Combinations are visited by size, then by first site, then by the rest
/// of their sites; each is kept if it shares no site with those already kept.
#[must_use]
pub fn independent_combinations(combinations: &[Combination]) -> Vec<&Combination> {
    let mut ordered: Vec<&Combination> = combinations.iter().collect();
    ordered.sort_by(|a, b| {
        a.len()
            .cmp(&b.len())
            .then_with(|| a.first_position().cmp(&b.first_position()))
            .then_with(|| a.cmp(b))
    });

    let mut used: HashSet<usize> = HashSet::new();
    let mut selected = Vec::new();

    for combination in ordered {
        if combination.positions().any(|pos| used.contains(&pos)) {
            continue;
        }
        used.extend(combination.positions());
        selected.push(combination);
    }

    selected
}

/// Number of greedily selected site-disjoint combinations
#[must_use]
pub fn count_independent(combinations: &[Combination]) -> usize {
    independent_combinations(combinations).len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::combination::SiteState;

    fn combo(positions: &[usize]) -> Combination {
        Combination::new(positions.iter().map(|&p| SiteState::new(p, b'A')))
    }

    #[test]
    fn test_disjoint_all_selected() {
        let combos = vec![combo(&[1]), combo(&[2, 3]), combo(&[4, 5])];
        assert_eq!(count_independent(&combos), 3);
    }

    #[test]
    fn test_smaller_preferred() {
        // {2} is chosen first, which blocks {1,2} and {2,3}; {3,4} is still free
        let combos = vec![combo(&[1, 2]), combo(&[2, 3]), combo(&[2]), combo(&[3, 4])];
        let selected = independent_combinations(&combos);
        let names: Vec<String> = selected.iter().map(ToString::to_string).collect();
        assert_eq!(names, vec!["[3]", "[4, 5]"]);
    }

    #[test]
    fn test_selected_sets_are_disjoint() {
        let combos = vec![
            combo(&[0, 5]),
            combo(&[1, 5]),
            combo(&[2, 6]),
            combo(&[0, 2]),
            combo(&[7]),
        ];
        let selected = independent_combinations(&combos);
        assert!(selected.len() <= combos.len());
        for (i, a) in selected.iter().enumerate() {
            for b in &selected[i + 1..] {
                assert!(a.is_site_disjoint(b));
            }
        }
        assert_eq!(selected.len(), 3);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(count_independent(&[]), 0);
    }
}
