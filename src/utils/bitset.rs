//! Fixed-capacity bit set over dense sequence indices.

const WORD_BITS: usize = 64;

/// A set of sequence indices in `0..capacity`, one bit per index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceSet {
    words: Vec<u64>,
    capacity: usize,
}

impl SequenceSet {
    #[must_use]
    pub fn empty(capacity: usize) -> Self {
        Self {
            words: vec![0; capacity.div_ceil(WORD_BITS)],
            capacity,
        }
    }

    #[must_use]
    pub fn full(capacity: usize) -> Self {
        let mut set = Self::empty(capacity);
        set.fill();
        set
    }

    /// Set every index in `0..capacity`
    pub fn fill(&mut self) {
        for word in &mut self.words {
            *word = u64::MAX;
        }
        let tail = self.capacity % WORD_BITS;
        if tail != 0 {
            if let Some(last) = self.words.last_mut() {
                *last = (1u64 << tail) - 1;
            }
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn insert(&mut self, index: usize) {
        debug_assert!(index < self.capacity);
        self.words[index / WORD_BITS] |= 1u64 << (index % WORD_BITS);
    }

    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        index < self.capacity && self.words[index / WORD_BITS] & (1u64 << (index % WORD_BITS)) != 0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// True if every member of `self` is also in `other`
    #[must_use]
    pub fn is_subset_of(&self, other: &SequenceSet) -> bool {
        self.words
            .iter()
            .zip(&other.words)
            .all(|(&a, &b)| a & !b == 0)
    }

    pub fn intersect_with(&mut self, other: &SequenceSet) {
        for (a, &b) in self.words.iter_mut().zip(&other.words) {
            *a &= b;
        }
    }

    /// Overwrite `self` with `a ∩ b` without allocating
    pub fn assign_intersection(&mut self, a: &SequenceSet, b: &SequenceSet) {
        for ((out, &x), &y) in self.words.iter_mut().zip(&a.words).zip(&b.words) {
            *out = x & y;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(w, &word)| {
            (0..WORD_BITS)
                .filter(move |bit| word & (1u64 << bit) != 0)
                .map(move |bit| w * WORD_BITS + bit)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_contains_len() {
        let mut set = SequenceSet::empty(130);
        assert!(set.is_empty());
        set.insert(0);
        set.insert(64);
        set.insert(129);
        assert!(set.contains(64));
        assert!(!set.contains(65));
        assert!(!set.contains(500));
        assert_eq!(set.len(), 3);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![0, 64, 129]);
    }

    #[test]
    fn test_full_respects_capacity() {
        let set = SequenceSet::full(70);
        assert_eq!(set.len(), 70);
        assert!(set.contains(69));
        assert!(!set.contains(70));

        assert!(SequenceSet::full(0).is_empty());
    }

    #[test]
    fn test_intersection_and_subset() {
        let mut a = SequenceSet::empty(10);
        let mut b = SequenceSet::empty(10);
        for i in [1, 3, 5] {
            a.insert(i);
        }
        for i in [3, 5, 7] {
            b.insert(i);
        }

        let mut out = SequenceSet::empty(10);
        out.assign_intersection(&a, &b);
        assert_eq!(out.iter().collect::<Vec<_>>(), vec![3, 5]);
        assert!(out.is_subset_of(&a));
        assert!(!a.is_subset_of(&b));

        a.intersect_with(&b);
        assert_eq!(a, out);
    }
}
