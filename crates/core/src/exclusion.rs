//! Identifiers that never appear in exported reports.

use crate::ItemId;
use std::collections::HashSet;

/// Structural and decorative ids that show up on every map and are
/// deliberately left out of the catalog.
pub const BUILTIN_EXCLUDED_IDS: &[ItemId] = &[
    // invisible walkable/blocking markers
    459, 460, 1548, 1549,
    // map border and void tiles
    100, 101, 102,
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionFilter {
    ids: HashSet<ItemId>,
}

impl ExclusionFilter {
    pub fn builtin() -> Self {
        Self::from_ids(BUILTIN_EXCLUDED_IDS.iter().copied())
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_ids(ids: impl IntoIterator<Item = ItemId>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    pub fn extend(&mut self, ids: impl IntoIterator<Item = ItemId>) {
        self.ids.extend(ids);
    }

    pub fn is_excluded(&self, id: ItemId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_contains_constants() {
        let filter = ExclusionFilter::builtin();
        assert_eq!(filter.len(), BUILTIN_EXCLUDED_IDS.len());
        assert!(BUILTIN_EXCLUDED_IDS.iter().all(|id| filter.is_excluded(*id)));
        assert!(!filter.is_excluded(2160));
    }

    #[test]
    fn extend_adds_ids() {
        let mut filter = ExclusionFilter::none();
        assert!(filter.is_empty());
        filter.extend([5, 6]);
        assert!(filter.is_excluded(5));
        assert!(!filter.is_excluded(7));
    }
}
