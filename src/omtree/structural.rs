use alloc::vec::Vec;

use super::OMTree;
use crate::error::{Error, MergeError, Result, StealError};
use crate::raw::RawOMTree;

impl<V> OMTree<V> {
    /// Builds a tree holding a copy of `values`, in order.
    ///
    /// The input is expected to be in the order the caller wants to keep; the
    /// tree never compares values, so "sorted" is the caller's notion. The
    /// result has minimal height.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfMemory`] if storage could not be allocated.
    ///
    /// # Complexity
    ///
    /// O(n)
    ///
    /// # Examples
    ///
    /// ```
    /// use omtree::OMTree;
    ///
    /// let tree = OMTree::from_sorted_slice(&["a", "b", "c"]).unwrap();
    /// assert_eq!(tree.fetch(2), Ok(&"c"));
    /// ```
    pub fn from_sorted_slice(values: &[V]) -> Result<Self>
    where
        V: Clone,
    {
        let mut buffer = Vec::new();
        buffer.try_reserve_exact(values.len())?;
        buffer.extend_from_slice(values);

        tracing::trace!(len = values.len(), "bulk loading order-maintenance tree");
        let raw = RawOMTree::from_vec(buffer, values.len()).map_err(|(error, _)| error)?;
        Ok(Self::from_raw(raw))
    }

    /// Builds a tree over the first `count` values of `buffer`, taking the
    /// buffer over as value storage instead of copying it.
    ///
    /// Values past `count` are dropped. The buffer's spare capacity is kept
    /// and used by later inserts.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `buffer` is empty or `count` exceeds
    ///   its length.
    /// - [`Error::OutOfMemory`] if node storage could not be allocated.
    ///
    /// On error the buffer is handed back, untouched, through
    /// [`StealError::into_buffer`].
    ///
    /// # Complexity
    ///
    /// O(n) node construction; the values are not moved.
    ///
    /// # Examples
    ///
    /// ```
    /// use omtree::{Error, OMTree};
    ///
    /// let tree = OMTree::steal_sorted_array(vec![1, 2, 3, 4], 3).unwrap();
    /// assert_eq!(tree.len(), 3);
    ///
    /// let err = OMTree::<u8>::steal_sorted_array(Vec::new(), 0).unwrap_err();
    /// assert_eq!(err.error(), Error::InvalidArgument("buffer is empty"));
    /// ```
    pub fn steal_sorted_array(buffer: Vec<V>, count: usize) -> core::result::Result<Self, StealError<V>> {
        if buffer.is_empty() {
            return Err(StealError::new(Error::InvalidArgument("buffer is empty"), buffer));
        }
        if count > buffer.len() {
            return Err(StealError::new(Error::InvalidArgument("count exceeds buffer length"), buffer));
        }

        tracing::trace!(count, capacity = buffer.capacity(), "stealing buffer into order-maintenance tree");
        match RawOMTree::from_vec(buffer, count) {
            Ok(raw) => Ok(Self::from_raw(raw)),
            Err((error, buffer)) => Err(StealError::new(error, buffer)),
        }
    }

    /// Moves every value at `rank` and above into a new tree, which is
    /// returned. This tree keeps the values below `rank`.
    ///
    /// No value is copied. Only the smaller of the two halves changes
    /// storage, so splitting near either end is cheap.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidIndex`] if `rank > len()`.
    /// - [`Error::OutOfMemory`] if storage for the smaller half could not be
    ///   allocated.
    ///
    /// # Complexity
    ///
    /// O(log n + min(rank, n − rank))
    ///
    /// # Examples
    ///
    /// ```
    /// use omtree::OMTree;
    ///
    /// let mut left: OMTree<u32> = (0..10).collect();
    /// let right = left.split_at(4).unwrap();
    /// assert_eq!(left.len(), 4);
    /// assert_eq!(right.fetch(0), Ok(&4));
    /// ```
    pub fn split_at(&mut self, rank: usize) -> Result<Self> {
        let upper = self.raw.split_off(rank)?;
        self.touch();
        tracing::trace!(rank, lower = self.len(), upper = upper.len(), "split order-maintenance tree");
        Ok(Self::from_raw(upper))
    }

    /// Splits the tree into two halves of about equal total weight.
    ///
    /// `weight` gives the weight of each value. This tree keeps the longest
    /// prefix whose weight is at most half of the total; the rest moves to the
    /// returned tree. When the weights cannot be split evenly the returned
    /// tree is the heavier one.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfMemory`] as for [`OMTree::split_at`].
    ///
    /// # Complexity
    ///
    /// O(n) calls to `weight`, then a [`OMTree::split_at`].
    ///
    /// # Examples
    ///
    /// ```
    /// use omtree::OMTree;
    ///
    /// let mut left = OMTree::from_sorted_slice(&[1, 1, 4, 1, 1]).unwrap();
    /// let right = left.split_by_weight(|v| *v).unwrap();
    /// assert_eq!(left.len(), 2);
    /// assert_eq!(right.len(), 3);
    /// ```
    pub fn split_by_weight<F>(&mut self, mut weight: F) -> Result<Self>
    where
        F: FnMut(&V) -> u64,
    {
        let total: u128 = self.iter().map(|v| u128::from(weight(v))).sum();

        let mut prefix = 0;
        let mut rank = 0;
        for value in self.iter() {
            prefix += u128::from(weight(value));
            if prefix * 2 > total {
                break;
            }
            rank += 1;
        }

        tracing::trace!(rank, total = %total, "splitting order-maintenance tree by weight");
        self.split_at(rank)
    }

    /// Concatenates `left` then `right` into one tree.
    ///
    /// Both inputs are consumed. The larger one's storage is kept and the
    /// smaller one's values are moved into it.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfMemory`] if the kept storage could not grow. Both trees
    /// are handed back unchanged through [`MergeError::into_parts`].
    ///
    /// # Complexity
    ///
    /// O(log n + min(|left|, |right|))
    ///
    /// # Examples
    ///
    /// ```
    /// use omtree::OMTree;
    ///
    /// let left = OMTree::from_sorted_slice(&[1, 2]).unwrap();
    /// let right = OMTree::from_sorted_slice(&[3, 4, 5]).unwrap();
    /// let merged = OMTree::merge(left, right).unwrap();
    /// assert_eq!(merged.iter().copied().collect::<Vec<_>>(), [1, 2, 3, 4, 5]);
    /// ```
    pub fn merge(mut left: Self, mut right: Self) -> core::result::Result<Self, MergeError<V>> {
        let (left_len, right_len) = (left.len(), right.len());
        if let Err(error) = left.raw.append(&mut right.raw) {
            return Err(MergeError::new(error, left, right));
        }

        tracing::trace!(left = left_len, right = right_len, "merged order-maintenance trees");
        Ok(Self::from_raw(left.raw))
    }

    /// Clones the tree without aborting on allocation failure.
    ///
    /// The copy is independent of this tree and has its own identity, so
    /// cursors taken from one are stale on the other.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfMemory`] if storage could not be allocated.
    pub fn try_clone(&self) -> Result<Self>
    where
        V: Clone,
    {
        tracing::trace!(len = self.len(), "cloning order-maintenance tree");
        Ok(Self::from_raw(self.raw.try_clone()?))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::raw::Handle;
    use alloc::vec;
    use pretty_assertions::assert_eq;

    fn to_vec(tree: &OMTree<u32>) -> Vec<u32> {
        tree.iter().copied().collect()
    }

    #[test]
    fn steal_keeps_spare_capacity() {
        let mut buffer = Vec::with_capacity(64);
        buffer.extend(0..10u32);
        let mut tree = OMTree::steal_sorted_array(buffer, 10).unwrap();
        assert!(tree.verify());
        assert!(tree.capacity() >= 10);
        tree.insert_at(10, 10).unwrap();
        assert_eq!(to_vec(&tree), (0..11).collect::<Vec<_>>());
    }

    #[test]
    fn steal_truncates_to_count() {
        let tree = OMTree::steal_sorted_array(vec![5u32, 6, 7, 8], 2).unwrap();
        assert_eq!(to_vec(&tree), [5, 6]);

        let empty = OMTree::steal_sorted_array(vec![5u32], 0).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn steal_rejects_bad_count() {
        let err = OMTree::steal_sorted_array(vec![1u32, 2], 3).unwrap_err();
        assert_eq!(err.error(), Error::InvalidArgument("count exceeds buffer length"));
        assert_eq!(err.into_buffer(), [1, 2]);
    }

    #[test]
    fn steal_failure_returns_whole_buffer() {
        let buffer = vec![0u8; Handle::MAX + 10];
        let err = OMTree::steal_sorted_array(buffer, Handle::MAX + 1).unwrap_err();
        assert_eq!(err.error(), Error::OutOfMemory);
        assert_eq!(err.into_buffer().len(), Handle::MAX + 10);
    }

    #[test]
    fn merge_beyond_handle_space_returns_inputs() {
        let half = u32::try_from(Handle::MAX / 2 + 8).unwrap();
        let left: OMTree<u32> = (0..half).collect();
        let right: OMTree<u32> = (half..half * 2).collect();
        let (cursor, _) = right.cursor_at(3).unwrap();

        let err = OMTree::merge(left, right).unwrap_err();
        assert_eq!(err.error(), Error::OutOfMemory);
        let (left, right) = err.into_parts();
        assert!(left.verify());
        assert!(right.verify());
        assert_eq!(to_vec(&left), (0..half).collect::<Vec<_>>());
        assert_eq!(to_vec(&right), (half..half * 2).collect::<Vec<_>>());
        assert_eq!(right.resolve(&cursor), Ok(&(half + 3)));
    }

    #[test]
    fn split_rejects_out_of_range_rank() {
        let mut tree: OMTree<u32> = (0..3).collect();
        let (cursor, _) = tree.cursor_at(0).unwrap();
        assert_eq!(tree.split_at(4).unwrap_err(), Error::InvalidIndex { index: 4, len: 3 });
        assert_eq!(tree.resolve(&cursor), Ok(&0));
    }

    #[test]
    fn split_at_ends() {
        let mut tree: OMTree<u32> = (0..5).collect();
        let all = tree.split_at(0).unwrap();
        assert!(tree.is_empty());
        assert_eq!(to_vec(&all), [0, 1, 2, 3, 4]);

        let mut tree = all;
        let none = tree.split_at(5).unwrap();
        assert!(none.is_empty());
        assert_eq!(tree.len(), 5);
    }

    #[test]
    fn split_by_weight_favours_right() {
        let mut tree: OMTree<u32> = core::iter::repeat_n(1, 5).collect();
        let right = tree.split_by_weight(|v| u64::from(*v)).unwrap();
        assert_eq!((tree.len(), right.len()), (2, 3));

        let mut tree: OMTree<u32> = core::iter::repeat_n(1, 6).collect();
        let right = tree.split_by_weight(|v| u64::from(*v)).unwrap();
        assert_eq!((tree.len(), right.len()), (3, 3));
    }

    #[test]
    fn split_by_weight_heavy_head() {
        let mut tree = OMTree::from_sorted_slice(&[100u32, 1, 1, 1]).unwrap();
        let right = tree.split_by_weight(|v| u64::from(*v)).unwrap();
        assert!(tree.is_empty());
        assert_eq!(to_vec(&right), [100, 1, 1, 1]);

        let mut empty: OMTree<u32> = OMTree::new();
        assert!(empty.split_by_weight(|_| 1).unwrap().is_empty());
    }

    #[test]
    fn split_by_weight_does_not_overflow() {
        let mut tree: OMTree<u64> = core::iter::repeat_n(u64::MAX, 4).collect();
        let right = tree.split_by_weight(|v| *v).unwrap();
        assert_eq!((tree.len(), right.len()), (2, 2));
    }

    #[test]
    fn merge_with_empty() {
        let left: OMTree<u32> = OMTree::new();
        let right: OMTree<u32> = (0..3).collect();
        let merged = OMTree::merge(left, right).unwrap();
        assert_eq!(to_vec(&merged), [0, 1, 2]);
        assert!(merged.verify());

        let merged = OMTree::merge(merged, OMTree::new()).unwrap();
        assert_eq!(to_vec(&merged), [0, 1, 2]);
    }

    #[test]
    fn try_clone_is_deep() {
        let tree: OMTree<u32> = (0..20).collect();
        let mut copy = tree.try_clone().unwrap();
        copy.delete_at(0).unwrap();
        copy.set_at(7, 0).unwrap();
        assert_eq!(to_vec(&tree), (0..20).collect::<Vec<_>>());
        assert_eq!(copy.fetch(0), Ok(&7));
        assert!(copy.verify());
    }
}
