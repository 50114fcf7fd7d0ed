//! Query specifications: which taxa to diagnose and which pairs to compare.
//!
//! A specification is a comma-separated list of entries:
//!
//! | Entry | Meaning |
//! |-------|---------|
//! | `ALL` | one query group per taxon |
//! | `name` | that taxon |
//! | `a+b+c` | one merged clade of the listed taxa |
//! | `aVSb` | pairwise comparison of two taxa |
//! | `ALLVSALL` | pairwise comparison of every unordered pair of taxa |

use std::collections::BTreeMap;

use thiserror::Error;

use crate::core::alignment::Alignment;
use crate::core::taxon::{TaxonGroup, TaxonPair};

const ALL: &str = "ALL";
const PAIR_SEPARATOR: &str = "VS";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TaxaError {
    #[error("Query specification is empty")]
    Empty,

    #[error("Unknown taxon '{0}'")]
    UnknownTaxon(String),

    #[error("Malformed entry '{0}'")]
    Malformed(String),

    #[error("Pair '{0}' compares a taxon with itself")]
    SelfPair(String),
}

/// Query groups and pairs resolved against an alignment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerySelection {
    pub groups: Vec<TaxonGroup>,
    pub pairs: Vec<TaxonPair>,
}

impl QuerySelection {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.pairs.is_empty()
    }
}

/// Resolve a query specification into groups and pairs.
///
/// Entries are whitespace-insensitive. Groups and pairs keep the order of
/// first appearance; repeated entries are resolved once.
///
/// # Errors
///
/// Returns `TaxaError::Empty` for a blank specification, `TaxaError::UnknownTaxon`
/// for a name absent from the alignment, `TaxaError::Malformed` for empty clade or
/// pair members, and `TaxaError::SelfPair` for a pair naming one taxon twice.
pub fn resolve_query(spec: &str, alignment: &Alignment) -> Result<QuerySelection, TaxaError> {
    let taxa = alignment.taxa();
    let mut selection = QuerySelection::default();

    let entries: Vec<String> = spec
        .split(',')
        .map(|e| e.chars().filter(|c| !c.is_whitespace()).collect::<String>())
        .filter(|e| !e.is_empty())
        .collect();
    if entries.is_empty() {
        return Err(TaxaError::Empty);
    }

    for entry in &entries {
        if entry == ALL {
            for (name, members) in &taxa {
                push_group(&mut selection.groups, TaxonGroup::new(*name, members.clone()));
            }
        } else if entry == "ALLVSALL" {
            let groups: Vec<TaxonGroup> = taxa
                .iter()
                .map(|(name, members)| TaxonGroup::new(*name, members.clone()))
                .collect();
            for (i, first) in groups.iter().enumerate() {
                for second in &groups[i + 1..] {
                    push_pair(
                        &mut selection.pairs,
                        TaxonPair {
                            first: first.clone(),
                            second: second.clone(),
                        },
                    );
                }
            }
        } else if entry.contains(PAIR_SEPARATOR) {
            let pair = resolve_pair(entry, &taxa)?;
            push_pair(&mut selection.pairs, pair);
        } else {
            let group = resolve_group(entry, &taxa)?;
            push_group(&mut selection.groups, group);
        }
    }

    Ok(selection)
}

/// One group per taxon in the alignment, sorted by name
#[must_use]
pub fn all_taxa(alignment: &Alignment) -> Vec<TaxonGroup> {
    alignment
        .taxa()
        .into_iter()
        .map(|(name, members)| TaxonGroup::new(name, members))
        .collect()
}

fn resolve_group(entry: &str, taxa: &BTreeMap<&str, Vec<usize>>) -> Result<TaxonGroup, TaxaError> {
    let parts: Vec<TaxonGroup> = entry
        .split('+')
        .map(|name| lookup(name, entry, taxa))
        .collect::<Result<_, _>>()?;

    Ok(match parts.as_slice() {
        [single] => single.clone(),
        _ => TaxonGroup::union(&parts),
    })
}

fn resolve_pair(entry: &str, taxa: &BTreeMap<&str, Vec<usize>>) -> Result<TaxonPair, TaxaError> {
    let mut sides = entry.split(PAIR_SEPARATOR);
    let (Some(first), Some(second), None) = (sides.next(), sides.next(), sides.next()) else {
        return Err(TaxaError::Malformed(entry.to_string()));
    };
    if first == second {
        return Err(TaxaError::SelfPair(entry.to_string()));
    }
    Ok(TaxonPair {
        first: lookup(first, entry, taxa)?,
        second: lookup(second, entry, taxa)?,
    })
}

fn lookup(
    name: &str,
    entry: &str,
    taxa: &BTreeMap<&str, Vec<usize>>,
) -> Result<TaxonGroup, TaxaError> {
    if name.is_empty() {
        return Err(TaxaError::Malformed(entry.to_string()));
    }
    taxa.get(name)
        .map(|members| TaxonGroup::new(name, members.clone()))
        .ok_or_else(|| TaxaError::UnknownTaxon(name.to_string()))
}

fn push_group(groups: &mut Vec<TaxonGroup>, group: TaxonGroup) {
    if !groups.iter().any(|g| g.name == group.name) {
        groups.push(group);
    }
}

fn push_pair(pairs: &mut Vec<TaxonPair>, pair: TaxonPair) {
    let seen = pairs.iter().any(|p| {
        (p.first.name == pair.first.name && p.second.name == pair.second.name)
            || (p.first.name == pair.second.name && p.second.name == pair.first.name)
    });
    if !seen {
        pairs.push(pair);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::alignment::SequenceRecord;

    fn alignment() -> Alignment {
        Alignment::new(vec![
            SequenceRecord::new("s1", "wiggi", b"ACGT".as_slice()),
            SequenceRecord::new("s2", "neridae", b"ACGT".as_slice()),
            SequenceRecord::new("s3", "verrucosa", b"ACGA".as_slice()),
            SequenceRecord::new("s4", "neridae", b"ACGA".as_slice()),
        ])
        .unwrap()
    }

    #[test]
    fn test_all_yields_one_group_per_taxon() {
        let selection = resolve_query("ALL", &alignment()).unwrap();
        let names: Vec<&str> = selection.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["neridae", "verrucosa", "wiggi"]);
        assert_eq!(selection.groups[0].members, vec![1, 3]);
        assert!(selection.pairs.is_empty());
    }

    #[test]
    fn test_single_and_merged_groups() {
        let selection =
            resolve_query(" neridae , neridae + wiggi + verrucosa ", &alignment()).unwrap();
        assert_eq!(selection.groups.len(), 2);
        assert_eq!(selection.groups[0].name, "neridae");
        let clade = &selection.groups[1];
        assert_eq!(clade.name, "neridae+wiggi+verrucosa");
        assert_eq!(clade.taxa.len(), 3);
        assert_eq!(clade.members, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_pairs() {
        let selection = resolve_query("neridaeVSwiggi,wiggiVSneridae", &alignment()).unwrap();
        assert!(selection.groups.is_empty());
        assert_eq!(selection.pairs.len(), 1);
        assert_eq!(selection.pairs[0].first.name, "neridae");
        assert_eq!(selection.pairs[0].second.name, "wiggi");

        let all = resolve_query("ALLVSALL", &alignment()).unwrap();
        assert_eq!(all.pairs.len(), 3);
    }

    #[test]
    fn test_errors() {
        let alignment = alignment();
        assert_eq!(resolve_query(" , ", &alignment), Err(TaxaError::Empty));
        assert_eq!(
            resolve_query("conus", &alignment),
            Err(TaxaError::UnknownTaxon("conus".to_string()))
        );
        assert_eq!(
            resolve_query("neridae+", &alignment),
            Err(TaxaError::Malformed("neridae+".to_string()))
        );
        assert_eq!(
            resolve_query("wiggiVSwiggi", &alignment),
            Err(TaxaError::SelfPair("wiggiVSwiggi".to_string()))
        );
    }

    #[test]
    fn test_all_taxa() {
        let groups = all_taxa(&alignment());
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[2].name, "wiggi");
    }
}
