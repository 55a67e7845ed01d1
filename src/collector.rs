//! Dependency deduplication and indexing.
//!
//! A [`Collector`] accumulates references discovered while sweeping scene
//! containers, deduplicates them, and on [`Collector::commit`] fixes a stable
//! small-integer index per unique reference. Index order is first-discovery
//! order of the collection sweep, which is reproducible across runs; the
//! index *values* are an internal detail of the compiled representation, not
//! an external contract. A [`Bundle`] snapshots the committed membership and
//! order for change detection on later compiles.

use std::hash::Hash;

use indexmap::IndexSet;

/// Immutable snapshot of a collector's committed membership and order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle<K> {
    items: Vec<K>,
}

#[derive(Debug)]
pub struct Collector<K> {
    pending: IndexSet<K>,
    committed: IndexSet<K>,
}

impl<K: Copy + Eq + Hash> Collector<K> {
    pub fn new() -> Collector<K> {
        Collector {
            pending: IndexSet::new(),
            committed: IndexSet::new(),
        }
    }

    /// Resets to empty. Must precede a new collection pass.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.committed.clear();
    }

    /// Runs `extract` over every item of `source` and unions the returned
    /// references into the pending candidate set. May be called several
    /// times before [`Collector::commit`].
    pub fn collect<S, F, D>(&mut self, source: S, mut extract: F)
    where
        S: IntoIterator,
        F: FnMut(S::Item) -> D,
        D: IntoIterator<Item = K>,
    {
        for item in source {
            for key in extract(item) {
                self.pending.insert(key);
            }
        }
    }

    /// Fixes an index and iteration order for every pending candidate.
    pub fn commit(&mut self) {
        self.committed = std::mem::take(&mut self.pending);
    }

    /// Index of a committed reference. `None` means the reference was never
    /// collected, which indicates a malformed dependency walk.
    pub fn item_index(&self, key: K) -> Option<usize> {
        self.committed.get_index_of(&key)
    }

    /// Committed references in index order.
    pub fn iter(&self) -> impl Iterator<Item = K> + '_ {
        self.committed.iter().copied()
    }

    pub fn bundle(&self) -> Bundle<K> {
        Bundle {
            items: self.committed.iter().copied().collect(),
        }
    }

    /// True if the committed membership or order differs from `bundle`, or
    /// `is_dirty` holds for any committed reference.
    pub fn needs_update<F>(&self, bundle: &Bundle<K>, is_dirty: F) -> bool
    where
        F: Fn(K) -> bool,
    {
        if self.committed.len() != bundle.items.len() {
            return true;
        }
        if self.committed.iter().zip(&bundle.items).any(|(a, b)| a != b) {
            return true;
        }
        self.committed.iter().any(|&key| is_dirty(key))
    }

    /// Applies `f` to every committed reference.
    pub fn finalize<F>(&self, mut f: F)
    where
        F: FnMut(K),
    {
        for &key in &self.committed {
            f(key);
        }
    }

    pub fn len(&self) -> usize {
        self.committed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.committed.is_empty()
    }
}

impl<K: Copy + Eq + Hash> Default for Collector<K> {
    fn default() -> Collector<K> {
        Collector::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_assigns_first_discovery_order() {
        let mut collector = Collector::new();
        collector.collect([1u32, 2, 3], |n| [n * 10, 7]);
        collector.collect([4u32], |n| [n * 10]);
        collector.commit();

        let order: Vec<u32> = collector.iter().collect();
        assert_eq!(order, vec![10, 7, 20, 30, 40]);
        assert_eq!(collector.item_index(7), Some(1));
        assert_eq!(collector.item_index(40), Some(4));
        assert_eq!(collector.item_index(99), None);
        assert_eq!(collector.len(), 5);
    }

    #[test]
    fn indices_are_undefined_before_commit() {
        let mut collector = Collector::new();
        collector.collect([1u32], |n| [n]);
        assert_eq!(collector.item_index(1), None);
        collector.commit();
        assert_eq!(collector.item_index(1), Some(0));
    }

    #[test]
    fn clear_resets_committed_state() {
        let mut collector = Collector::new();
        collector.collect([1u32], |n| [n]);
        collector.commit();
        collector.clear();
        assert!(collector.is_empty());
        assert_eq!(collector.item_index(1), None);
    }

    #[test]
    fn needs_update_detects_membership_and_order_changes() {
        let mut collector = Collector::new();
        collector.collect([1u32, 2], |n| [n]);
        collector.commit();
        let bundle = collector.bundle();
        assert!(!collector.needs_update(&bundle, |_| false));

        // Same members, different discovery order.
        collector.clear();
        collector.collect([2u32, 1], |n| [n]);
        collector.commit();
        assert!(collector.needs_update(&bundle, |_| false));

        // Different membership.
        collector.clear();
        collector.collect([1u32, 2, 3], |n| [n]);
        collector.commit();
        assert!(collector.needs_update(&bundle, |_| false));
    }

    #[test]
    fn needs_update_reports_dirty_items() {
        let mut collector = Collector::new();
        collector.collect([1u32, 2], |n| [n]);
        collector.commit();
        let bundle = collector.bundle();
        assert!(collector.needs_update(&bundle, |key| key == 2));
        assert!(!collector.needs_update(&bundle, |_| false));
    }

    #[test]
    fn finalize_visits_every_committed_item() {
        let mut collector = Collector::new();
        collector.collect([1u32, 2, 3], |n| [n]);
        collector.commit();
        let mut seen = Vec::new();
        collector.finalize(|key| seen.push(key));
        assert_eq!(seen, vec![1, 2, 3]);
    }
}
