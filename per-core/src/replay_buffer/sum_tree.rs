//! Sum tree for prioritized sampling.
//!
//! Leaves hold the priorities of stored records and every internal node holds
//! the sum of its subtree, all laid out in a flat array:
//!
//! ```text
//! tree index:        0          <- total priority
//!                  /   \
//!                 1     2
//!                / \   / \
//!               3   4 5   6     <- leaves, one per slot
//! ```
//!
//! Internal nodes occupy `[0, capacity - 1)` and leaves `[capacity - 1, 2 * capacity - 1)`.
//! Min and max over the leaves are kept in two segment trees so that both queries
//! are `O(log n)`.
use crate::error::PerError;
use log::trace;
use segment_tree::{
    ops::{MaxIgnoreNaN, MinIgnoreNaN},
    SegmentPoint,
};

/// A fixed-capacity sum tree whose leaves are paired with records.
///
/// Records are written in ring-buffer order: once all slots are filled, an insertion
/// overwrites the oldest record.
#[derive(Debug)]
pub struct PrioritySumTree<T> {
    capacity: usize,
    tree: Vec<f32>,
    data: Vec<Option<T>>,
    write_cursor: usize,
    n_stored: usize,
    min_tree: SegmentPoint<f32, MinIgnoreNaN>,
    max_tree: SegmentPoint<f32, MaxIgnoreNaN>,
}

impl<T> PrioritySumTree<T> {
    /// Creates a sum tree with `capacity` leaves, all with zero priority.
    pub fn new(capacity: usize) -> Result<Self, PerError> {
        if capacity == 0 {
            return Err(PerError::InvalidCapacity(capacity));
        }

        Ok(Self {
            capacity,
            tree: vec![0f32; 2 * capacity - 1],
            data: (0..capacity).map(|_| None).collect(),
            write_cursor: 0,
            n_stored: 0,
            min_tree: SegmentPoint::build(vec![f32::MAX; capacity], MinIgnoreNaN),
            max_tree: SegmentPoint::build(vec![0f32; capacity], MaxIgnoreNaN),
        })
    }

    /// Number of leaves.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots written so far, saturating at the capacity.
    pub fn len(&self) -> usize {
        self.n_stored
    }

    /// Returns `true` if nothing has been inserted.
    pub fn is_empty(&self) -> bool {
        self.n_stored == 0
    }

    /// Tree index of the first leaf.
    #[inline]
    pub fn first_leaf(&self) -> usize {
        self.capacity - 1
    }

    /// Converts a leaf index of the tree into the slot index of its record.
    #[inline]
    pub fn leaf_to_slot(&self, leaf_ix: usize) -> usize {
        leaf_ix + 1 - self.capacity
    }

    /// Converts a slot index into the leaf index of the tree.
    #[inline]
    pub fn slot_to_leaf(&self, slot: usize) -> usize {
        slot + self.capacity - 1
    }

    /// The slot that the next insertion will write.
    pub fn write_cursor(&self) -> usize {
        self.write_cursor
    }

    /// Sum of all leaf priorities.
    #[inline]
    pub fn total_priority(&self) -> f32 {
        self.tree[0]
    }

    /// Largest leaf priority, `0` if no leaf holds a positive priority.
    pub fn max_leaf_priority(&self) -> f32 {
        self.max_tree.query(0, self.max_tree.len())
    }

    /// Smallest positive priority among written leaves.
    ///
    /// Leaves with zero priority are never drawn and so are skipped.
    pub fn min_leaf_priority(&self) -> Option<f32> {
        let p = self.min_tree.query(0, self.min_tree.len());
        if p == f32::MAX {
            None
        } else {
            Some(p)
        }
    }

    /// Priority stored at a leaf.
    pub fn priority(&self, leaf_ix: usize) -> Result<f32, PerError> {
        self.check_leaf(leaf_ix)?;
        Ok(self.tree[leaf_ix])
    }

    /// Record stored in a slot, if any.
    pub fn get(&self, slot: usize) -> Option<&T> {
        self.data.get(slot).and_then(|r| r.as_ref())
    }

    /// Iterates over the written records in slot order.
    pub fn records(&self) -> impl Iterator<Item = &T> {
        self.data.iter().filter_map(|r| r.as_ref())
    }

    /// Writes `record` at the write cursor with priority `p` and advances the cursor.
    ///
    /// Once the tree is full the oldest record is evicted. Returns the leaf index written.
    pub fn insert(&mut self, p: f32, record: T) -> Result<usize, PerError> {
        let leaf_ix = self.slot_to_leaf(self.write_cursor);
        self.update(leaf_ix, p)?;
        self.data[self.write_cursor] = Some(record);

        self.write_cursor += 1;
        if self.write_cursor >= self.capacity {
            self.write_cursor = 0;
        }
        if self.n_stored < self.capacity {
            self.n_stored += 1;
        }

        Ok(leaf_ix)
    }

    /// Sets the priority of a leaf and refreshes the sums of all its ancestors.
    pub fn update(&mut self, leaf_ix: usize, p: f32) -> Result<(), PerError> {
        self.check_leaf(leaf_ix)?;
        if !p.is_finite() || p < 0f32 {
            return Err(PerError::InvalidPriority(p));
        }

        let slot = self.leaf_to_slot(leaf_ix);
        self.min_tree.modify(slot, if p > 0f32 { p } else { f32::MAX });
        self.max_tree.modify(slot, p);

        self.tree[leaf_ix] = p;
        self.propagate(leaf_ix);
        Ok(())
    }

    // Parents are recomputed from their children: tree[i] == tree[2i+1] + tree[2i+2] holds exactly.
    fn propagate(&mut self, ix: usize) {
        if ix == 0 {
            return;
        }
        let parent = (ix - 1) / 2;
        let left = 2 * parent + 1;
        let right = left + 1;
        self.tree[parent] = self.tree[left] + self.tree[right];
        self.propagate(parent);
    }

    /// Returns the leaf whose cumulative priority interval contains `s`.
    ///
    /// Leaf `i` owns the half-open interval `[C_{i-1}, C_i)` of the cumulative priorities,
    /// in the in-order leaf order of the tree (slot order for a power-of-two capacity).
    /// A subtree with zero mass is never entered unless its sibling has zero mass too,
    /// so a tree with positive total never yields a zero-priority leaf.
    pub fn find_leaf(&self, s: f32) -> usize {
        self.descend(0, s)
    }

    fn descend(&self, ix: usize, s: f32) -> usize {
        let left = 2 * ix + 1;
        let right = left + 1;

        if left >= self.tree.len() {
            return ix;
        }

        if s < self.tree[left] || self.tree[right] == 0f32 {
            self.descend(left, s)
        } else {
            self.descend(right, s - self.tree[left])
        }
    }

    /// Inverse-CDF lookup: returns the leaf index, its priority and its record.
    pub fn retrieve(&self, s: f32) -> Result<(usize, f32, &T), PerError> {
        let leaf_ix = self.find_leaf(s);
        let slot = self.leaf_to_slot(leaf_ix);
        trace!("retrieve({}) -> leaf {} (slot {})", s, leaf_ix, slot);
        let record = self.get(slot).ok_or(PerError::EmptySlot(slot))?;
        Ok((leaf_ix, self.tree[leaf_ix], record))
    }

    fn check_leaf(&self, leaf_ix: usize) -> Result<(), PerError> {
        if leaf_ix < self.first_leaf() || leaf_ix >= self.tree.len() {
            Err(PerError::InvalidLeafIndex {
                ix: leaf_ix,
                capacity: self.capacity,
            })
        } else {
            Ok(())
        }
    }

    #[cfg(test)]
    pub(crate) fn nodes(&self) -> &[f32] {
        &self.tree
    }
}

#[cfg(test)]
mod tests {
    use super::PrioritySumTree;
    use crate::error::PerError;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn tree_with(ps: &[f32], capacity: usize) -> PrioritySumTree<usize> {
        let mut tree = PrioritySumTree::new(capacity).unwrap();
        for (i, &p) in ps.iter().enumerate() {
            tree.insert(p, i).unwrap();
        }
        tree
    }

    fn assert_sums(tree: &PrioritySumTree<usize>) {
        let nodes = tree.nodes();
        for i in 0..tree.first_leaf() {
            assert_eq!(nodes[i], nodes[2 * i + 1] + nodes[2 * i + 2], "node {}", i);
        }
        let leaf_sum: f32 = nodes[tree.first_leaf()..].iter().sum();
        assert!((tree.total_priority() - leaf_sum).abs() <= 1e-4 * leaf_sum.max(1.0));
    }

    #[test]
    fn test_zero_capacity() {
        assert_eq!(
            PrioritySumTree::<usize>::new(0).unwrap_err(),
            PerError::InvalidCapacity(0)
        );
    }

    #[test]
    fn test_retrieve_half_open_intervals() {
        let tree = tree_with(&[1.0, 3.0, 2.0], 4);
        assert_eq!(tree.total_priority(), 6.0);

        let leaf = |s| tree.leaf_to_slot(tree.find_leaf(s));
        assert_eq!(leaf(0.0), 0);
        assert_eq!(leaf(0.5), 0);
        assert_eq!(leaf(1.0), 1);
        assert_eq!(leaf(3.9), 1);
        assert_eq!(leaf(4.0), 2);
        assert_eq!(leaf(5.9), 2);
        // overshoot never lands on the empty fourth slot
        assert_eq!(leaf(6.0), 2);
        assert_eq!(leaf(7.5), 2);
    }

    #[test]
    fn test_retrieve_skips_zero_leaves() {
        let tree = tree_with(&[0.0, 5.0, 0.0, 0.0], 4);
        let (ix, p, &record) = tree.retrieve(0.0).unwrap();
        assert_eq!(tree.leaf_to_slot(ix), 1);
        assert_eq!(p, 5.0);
        assert_eq!(record, 1);
    }

    #[test]
    fn test_all_zero_tree_returns_a_leaf() {
        let tree = tree_with(&[0.0, 0.0, 0.0, 0.0], 4);
        assert_eq!(tree.total_priority(), 0.0);
        let (ix, p, _) = tree.retrieve(0.0).unwrap();
        assert_eq!(ix, tree.first_leaf());
        assert_eq!(p, 0.0);
    }

    #[test]
    fn test_retrieve_empty_slot() {
        let tree = PrioritySumTree::<usize>::new(4).unwrap();
        assert_eq!(tree.retrieve(0.0).unwrap_err(), PerError::EmptySlot(0));
    }

    #[test]
    fn test_ring_eviction() {
        let capacity = 5;
        let k = 3;
        let mut tree = PrioritySumTree::new(capacity).unwrap();
        for i in 0..capacity + k {
            tree.insert(1.0, i).unwrap();
        }
        assert_eq!(tree.len(), capacity);
        assert_eq!(tree.write_cursor(), k);
        let mut records = tree.records().copied().collect::<Vec<_>>();
        records.sort();
        assert_eq!(records, (k..capacity + k).collect::<Vec<_>>());
        assert_eq!(tree.total_priority(), capacity as f32);
    }

    #[test]
    fn test_update_unchanged_value() {
        let mut tree = tree_with(&[0.5, 0.2, 0.8, 0.3, 1.1, 2.5, 3.9], 8);
        let before = tree.nodes().to_vec();
        for leaf_ix in tree.first_leaf()..before.len() {
            let p = tree.priority(leaf_ix).unwrap();
            tree.update(leaf_ix, p).unwrap();
        }
        assert_eq!(tree.nodes(), &before[..]);
    }

    #[test]
    fn test_update_rejects_bad_input() {
        let mut tree = tree_with(&[1.0], 4);
        assert_eq!(
            tree.update(0, 1.0).unwrap_err(),
            PerError::InvalidLeafIndex { ix: 0, capacity: 4 }
        );
        assert_eq!(
            tree.update(7, 1.0).unwrap_err(),
            PerError::InvalidLeafIndex { ix: 7, capacity: 4 }
        );
        assert_eq!(tree.update(3, -1.0).unwrap_err(), PerError::InvalidPriority(-1.0));
        assert!(tree.update(3, f32::NAN).is_err());
        // a leaf that was never written can still be updated
        tree.update(6, 2.0).unwrap();
        assert_eq!(tree.total_priority(), 3.0);
    }

    #[test]
    fn test_min_max_leaf_priority() {
        let mut tree = PrioritySumTree::new(4).unwrap();
        assert_eq!(tree.max_leaf_priority(), 0.0);
        assert_eq!(tree.min_leaf_priority(), None);

        tree.insert(0.7, 0usize).unwrap();
        tree.insert(0.2, 1).unwrap();
        tree.insert(0.0, 2).unwrap();
        assert_eq!(tree.max_leaf_priority(), 0.7);
        assert_eq!(tree.min_leaf_priority(), Some(0.2));

        tree.update(tree.slot_to_leaf(0), 0.1).unwrap();
        assert_eq!(tree.max_leaf_priority(), 0.2);
        assert_eq!(tree.min_leaf_priority(), Some(0.1));
    }

    #[test]
    fn test_sum_invariant_random_ops() {
        for capacity in [1, 2, 3, 7, 8, 13, 64] {
            let mut rng = StdRng::seed_from_u64(capacity as u64);
            let mut tree = PrioritySumTree::new(capacity).unwrap();
            for step in 0..500 {
                if tree.is_empty() || rng.gen_bool(0.4) {
                    tree.insert(rng.gen_range(0.0..10.0), step).unwrap();
                } else {
                    let leaf_ix = tree.first_leaf() + rng.gen_range(0..capacity);
                    tree.update(leaf_ix, rng.gen_range(0.0..10.0)).unwrap();
                }
                assert_sums(&tree);
            }
        }
    }

    #[test]
    fn test_retrieve_follows_priorities() {
        let ps = [0.5f32, 0.2, 0.8, 0.3, 1.1, 2.5, 3.9, 0.0];
        let tree = tree_with(&ps, 8);
        let mut rng = StdRng::seed_from_u64(42);
        let n = 100_000;
        let mut counts = vec![0usize; ps.len()];
        for _ in 0..n {
            let s = rng.gen_range(0.0..tree.total_priority());
            let (_, _, &record) = tree.retrieve(s).unwrap();
            counts[record] += 1;
        }
        assert_eq!(counts[7], 0);
        for (i, &p) in ps.iter().enumerate() {
            let expected = p / tree.total_priority();
            let observed = counts[i] as f32 / n as f32;
            assert!((expected - observed).abs() < 0.01, "leaf {}", i);
        }
    }
}
