use core::mem;

use super::OMTree;
use crate::raw::RawOMTree;

impl<V> OMTree<V> {
    /// Creates an empty tree with room for at least `capacity` values.
    ///
    /// Node, value and index storage are all sized up front, so the first
    /// `capacity` inserts do not allocate.
    ///
    /// # Examples
    ///
    /// ```
    /// use omtree::OMTree;
    ///
    /// let tree: OMTree<i32> = OMTree::with_capacity(32);
    /// assert!(tree.is_empty());
    /// ```
    ///
    /// # Complexity
    ///
    /// O(capacity) for memory allocation.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_raw(RawOMTree::with_capacity(capacity))
    }

    /// Returns how many values the tree can hold without reallocating.
    ///
    /// # Examples
    ///
    /// ```
    /// use omtree::OMTree;
    ///
    /// let tree: OMTree<i32> = OMTree::with_capacity(32);
    /// assert!(tree.capacity() >= 32);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(1)
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }

    /// Estimates the bytes held by the tree.
    ///
    /// Counts the handle itself, every node slot, the value slots and the
    /// value index, allocated or not. Heap memory owned by the values
    /// themselves is not included.
    ///
    /// # Examples
    ///
    /// ```
    /// use omtree::OMTree;
    ///
    /// let small: OMTree<u64> = OMTree::with_capacity(4);
    /// let large: OMTree<u64> = OMTree::with_capacity(4096);
    /// assert!(small.memory_footprint() < large.memory_footprint());
    /// ```
    ///
    /// # Complexity
    ///
    /// O(1)
    #[must_use]
    pub fn memory_footprint(&self) -> usize {
        mem::size_of::<Self>() + self.raw.memory_footprint()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn with_capacity_does_not_reallocate() {
        let mut tree: OMTree<u32> = OMTree::with_capacity(64);
        let capacity = tree.capacity();
        let footprint = tree.memory_footprint();
        for i in 0..64 {
            tree.insert_at(i, 0).unwrap();
        }
        assert_eq!(tree.capacity(), capacity);
        assert_eq!(tree.memory_footprint(), footprint);
    }

    #[test]
    fn footprint_counts_empty_tree() {
        let tree: OMTree<u32> = OMTree::new();
        assert_eq!(tree.memory_footprint(), mem::size_of::<OMTree<u32>>());
    }
}
