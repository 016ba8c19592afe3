//! Membership index over catalog identifiers.
//!
//! A catalog mixes exact identifiers and inclusive `fromid..=toid` ranges.
//! The index keeps the singles in a hash set and the ranges as a sorted,
//! merged list so that a lookup is a hash probe plus one binary search.
//!
//! Usage contract: add everything, call [`CoverageIndex::finalize`] once,
//! then query. Adding after finalize leaves the range list unnormalized.

use crate::ItemId;
use std::collections::HashSet;

#[derive(Debug, Default, Clone)]
pub struct CoverageIndex {
    singles: HashSet<ItemId>,
    // (start, end), both inclusive
    ranges: Vec<(ItemId, ItemId)>,
}

impl CoverageIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_single(&mut self, id: ItemId) {
        self.singles.insert(id);
    }

    /// Records `from..=to` as covered. A reversed pair is swapped.
    pub fn add_range(&mut self, from: ItemId, to: ItemId) {
        if to < from {
            self.ranges.push((to, from));
        } else {
            self.ranges.push((from, to));
        }
    }

    /// Sorts ranges by start and merges overlapping or adjacent neighbours.
    pub fn finalize(&mut self) {
        if self.ranges.len() < 2 {
            return;
        }
        self.ranges.sort_unstable_by_key(|r| r.0);

        let mut merged: Vec<(ItemId, ItemId)> = Vec::with_capacity(self.ranges.len());
        for &(start, end) in &self.ranges {
            match merged.last_mut() {
                Some(last) if start <= last.1.saturating_add(1) => {
                    last.1 = last.1.max(end);
                }
                _ => merged.push((start, end)),
            }
        }
        self.ranges = merged;
    }

    pub fn exists(&self, id: ItemId) -> bool {
        if self.singles.contains(&id) {
            return true;
        }
        // Last range starting at or before `id`
        let Some(last) = self.ranges.partition_point(|r| r.0 <= id).checked_sub(1) else {
            return false;
        };
        id <= self.ranges[last].1
    }

    pub fn single_count(&self) -> usize {
        self.singles.len()
    }

    pub fn ranges(&self) -> &[(ItemId, ItemId)] {
        &self.ranges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjacent_ranges_merge() {
        let mut index = CoverageIndex::new();
        index.add_range(100, 105);
        index.add_range(106, 110);
        index.finalize();

        assert_eq!(index.ranges(), &[(100, 110)]);
        assert!(index.exists(105));
        assert!(index.exists(106));
        assert!(!index.exists(99));
        assert!(!index.exists(111));
    }

    #[test]
    fn overlapping_and_unsorted_ranges_merge() {
        let mut index = CoverageIndex::new();
        index.add_range(50, 60);
        index.add_range(10, 20);
        index.add_range(15, 30);
        index.add_range(58, 52);
        index.finalize();

        assert_eq!(index.ranges(), &[(10, 30), (50, 60)]);
        assert!(index.exists(30));
        assert!(!index.exists(31));
        assert!(!index.exists(49));
    }

    #[test]
    fn reversed_range_is_swapped() {
        let mut index = CoverageIndex::new();
        index.add_range(9, 3);
        index.finalize();

        assert!(index.exists(3));
        assert!(index.exists(9));
        assert!(!index.exists(10));
    }

    #[test]
    fn singles_and_gaps() {
        let mut index = CoverageIndex::new();
        index.add_single(7);
        index.add_range(1, 3);
        index.add_range(5, 5);
        index.finalize();

        // 4 is a one-wide gap, so the ranges stay apart
        assert_eq!(index.ranges(), &[(1, 3), (5, 5)]);
        assert!(!index.exists(4));
        assert!(index.exists(5));
        assert!(index.exists(7));
        assert!(!index.exists(8));
        assert!(!index.exists(0));
    }

    #[test]
    fn matches_brute_force() {
        let mut index = CoverageIndex::new();
        let ranges = [(3, 8), (40, 44), (9, 12), (20, 20), (100, 90), (43, 60)];
        let singles = [1, 25, 61, 200];
        for &(a, b) in &ranges {
            index.add_range(a, b);
        }
        for &s in &singles {
            index.add_single(s);
        }
        index.finalize();

        for id in 0..250 {
            let expected = singles.contains(&id)
                || ranges
                    .iter()
                    .any(|&(a, b)| (a.min(b)..=a.max(b)).contains(&id));
            assert_eq!(index.exists(id), expected, "id {id}");
        }
    }

    #[test]
    fn range_at_upper_bound_does_not_overflow() {
        let mut index = CoverageIndex::new();
        index.add_range(ItemId::MAX - 1, ItemId::MAX);
        index.add_range(10, 11);
        index.finalize();

        assert!(index.exists(ItemId::MAX));
        assert!(!index.exists(12));
    }
}
