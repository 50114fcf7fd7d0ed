use serde::Serialize;

/// A named set of sequences analysed together as one query.
///
/// A group is either a single taxon or a merged clade whose members are the
/// union of its constituent taxa. Members are alignment indices, sorted and unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxonGroup {
    /// Display name (`taxon` or `a+b+c` for merged clades)
    pub name: String,

    /// Constituent taxon names
    pub taxa: Vec<String>,

    /// Alignment indices of the member sequences
    pub members: Vec<usize>,
}

impl TaxonGroup {
    pub fn new(name: impl Into<String>, members: Vec<usize>) -> Self {
        let name = name.into();
        let mut members = members;
        members.sort_unstable();
        members.dedup();
        Self {
            taxa: vec![name.clone()],
            name,
            members,
        }
    }

    /// Merge several groups into one clade named by joining constituent names with `+`.
    #[must_use]
    pub fn union(groups: &[TaxonGroup]) -> Self {
        let taxa: Vec<String> = groups.iter().flat_map(|g| g.taxa.clone()).collect();
        let mut members: Vec<usize> = groups.iter().flat_map(|g| g.members.clone()).collect();
        members.sort_unstable();
        members.dedup();

        Self {
            name: taxa.join("+"),
            taxa,
            members,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        self.members.binary_search(&index).is_ok()
    }

    /// Indices of every sequence outside this group
    #[must_use]
    pub fn complement(&self, sequence_count: usize) -> Vec<usize> {
        (0..sequence_count).filter(|&i| !self.contains(i)).collect()
    }
}

/// Two taxa compared site by site
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxonPair {
    pub first: TaxonGroup,
    pub second: TaxonGroup,
}
