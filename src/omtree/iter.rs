use alloc::vec::Vec;
use core::fmt;
use core::iter::FusedIterator;
use core::ops::{Bound, ControlFlow, RangeBounds};

use super::OMTree;
use crate::error::{Error, Result};
use crate::raw::{RawOMTree, Stack};

/// Resolves `range` against a tree of length `len` into `start..end`.
fn resolve_range<R>(range: &R, len: usize) -> Result<(usize, usize)>
where
    R: RangeBounds<usize>,
{
    let start = match range.start_bound() {
        Bound::Included(&start) => start,
        Bound::Excluded(&start) => start.checked_add(1).ok_or(Error::InvalidIndex { index: start, len })?,
        Bound::Unbounded => 0,
    };
    let end = match range.end_bound() {
        Bound::Included(&end) => end.checked_add(1).ok_or(Error::InvalidIndex { index: end, len })?,
        Bound::Excluded(&end) => end,
        Bound::Unbounded => len,
    };

    if end > len {
        return Err(Error::InvalidIndex { index: end, len });
    }
    if start > end {
        return Err(Error::InvalidIndex { index: start, len });
    }
    Ok((start, end))
}

/// An iterator over the values of an [`OMTree`], in rank order.
///
/// This `struct` is created by [`OMTree::iter`] and [`OMTree::range`].
pub struct Iter<'a, V> {
    tree: &'a RawOMTree<V>,
    front: Stack,
    back: Stack,
    remaining: usize,
}

impl<'a, V> Iter<'a, V> {
    fn new(tree: &'a RawOMTree<V>, start: usize, end: usize) -> Self {
        let mut front = Stack::new();
        let mut back = Stack::new();
        if start < end {
            tree.seek_front(start, &mut front);
            tree.seek_back(end, &mut back);
        }
        Self {
            tree,
            front,
            back,
            remaining: end - start,
        }
    }
}

impl<V> Clone for Iter<'_, V> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree,
            front: self.front.clone(),
            back: self.back.clone(),
            remaining: self.remaining,
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for Iter<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        if self.remaining == 0 {
            return None;
        }
        let h = self.front.pop()?;
        self.remaining -= 1;

        let mut current = self.tree.node(h).right();
        while let Some(c) = current {
            self.front.push(c);
            current = self.tree.node(c).left();
        }
        Some(self.tree.value(h))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, V> DoubleEndedIterator for Iter<'a, V> {
    fn next_back(&mut self) -> Option<&'a V> {
        if self.remaining == 0 {
            return None;
        }
        let h = self.back.pop()?;
        self.remaining -= 1;

        let mut current = self.tree.node(h).left();
        while let Some(c) = current {
            self.back.push(c);
            current = self.tree.node(c).right();
        }
        Some(self.tree.value(h))
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}

impl<V> FusedIterator for Iter<'_, V> {}

impl<V> OMTree<V> {
    /// Returns an iterator over the values in rank order.
    ///
    /// # Examples
    ///
    /// ```
    /// use omtree::OMTree;
    ///
    /// let tree = OMTree::from_sorted_slice(&[1, 2, 3]).unwrap();
    /// assert_eq!(tree.iter().rev().copied().collect::<Vec<_>>(), [3, 2, 1]);
    /// ```
    #[must_use]
    pub fn iter(&self) -> Iter<'_, V> {
        Iter::new(&self.raw, 0, self.len())
    }

    /// Returns an iterator over the values whose ranks fall in `range`.
    ///
    /// # Panics
    ///
    /// Panics if the range starts after it ends, or ends past `len()`.
    ///
    /// # Examples
    ///
    /// ```
    /// use omtree::OMTree;
    ///
    /// let tree: OMTree<u32> = (0..10).collect();
    /// assert_eq!(tree.range(3..=5).copied().collect::<Vec<_>>(), [3, 4, 5]);
    /// ```
    pub fn range<R>(&self, range: R) -> Iter<'_, V>
    where
        R: RangeBounds<usize>,
    {
        match resolve_range(&range, self.len()) {
            Ok((start, end)) => Iter::new(&self.raw, start, end),
            Err(error) => panic!("invalid range in OMTree: {error}"),
        }
    }

    /// Calls `f` with each value and its rank, in rank order, until it breaks.
    ///
    /// Returns the break value, or [`ControlFlow::Continue`] if every value
    /// was visited.
    ///
    /// # Complexity
    ///
    /// O(k + log n) for k visited values.
    pub fn iterate<B, F>(&self, f: F) -> ControlFlow<B>
    where
        F: FnMut(&V, usize) -> ControlFlow<B>,
    {
        visit(self.iter(), 0, f)
    }

    /// Calls `f` with each value whose rank falls in `range`, in rank order,
    /// until it breaks. Ranks passed to `f` are ranks in the whole tree.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidIndex`] if the range starts after it ends, or ends past
    /// `len()`. Nothing is visited in that case.
    ///
    /// # Complexity
    ///
    /// O(k + log n) for k visited values.
    ///
    /// # Examples
    ///
    /// ```
    /// use core::ops::ControlFlow;
    /// use omtree::OMTree;
    ///
    /// let tree = OMTree::from_sorted_slice(&[10, 20, 30, 40]).unwrap();
    /// let mut seen = Vec::new();
    /// let flow = tree.iterate_on_range(1..3, |v, rank| {
    ///     seen.push((*v, rank));
    ///     ControlFlow::<()>::Continue(())
    /// });
    /// assert_eq!(flow, Ok(ControlFlow::Continue(())));
    /// assert_eq!(seen, [(20, 1), (30, 2)]);
    /// ```
    pub fn iterate_on_range<R, B, F>(&self, range: R, f: F) -> Result<ControlFlow<B>>
    where
        R: RangeBounds<usize>,
        F: FnMut(&V, usize) -> ControlFlow<B>,
    {
        let (start, end) = resolve_range(&range, self.len())?;
        Ok(visit(Iter::new(&self.raw, start, end), start, f))
    }

    /// Calls `f` with a mutable reference to each value and its rank, in rank
    /// order, until it breaks.
    ///
    /// Values may be changed freely; the tree's shape is not. Outstanding
    /// cursors go stale.
    ///
    /// # Examples
    ///
    /// ```
    /// use core::ops::ControlFlow;
    /// use omtree::OMTree;
    ///
    /// let mut tree: OMTree<u32> = (0..4).collect();
    /// let _ = tree.iterate_mut(|v, rank| {
    ///     *v += rank as u32;
    ///     ControlFlow::<()>::Continue(())
    /// });
    /// assert_eq!(tree.iter().copied().collect::<Vec<_>>(), [0, 2, 4, 6]);
    /// ```
    pub fn iterate_mut<B, F>(&mut self, f: F) -> ControlFlow<B>
    where
        F: FnMut(&mut V, usize) -> ControlFlow<B>,
    {
        self.touch();
        self.raw.for_each_mut(f)
    }
}

fn visit<'a, V: 'a, B, F>(iter: Iter<'a, V>, start: usize, mut f: F) -> ControlFlow<B>
where
    F: FnMut(&V, usize) -> ControlFlow<B>,
{
    iter.zip(start..).try_for_each(|(value, rank)| f(value, rank))
}

impl<'a, V> IntoIterator for &'a OMTree<V> {
    type Item = &'a V;
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Iter<'a, V> {
        self.iter()
    }
}

impl<V> FromIterator<V> for OMTree<V> {
    /// Bulk loads the values in iteration order.
    ///
    /// # Panics
    ///
    /// Panics if the tree cannot hold that many values.
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        let values: Vec<V> = iter.into_iter().collect();
        let len = values.len();
        tracing::trace!(len, "bulk loading order-maintenance tree");
        match RawOMTree::from_vec(values, len) {
            Ok(raw) => Self::from_raw(raw),
            Err((error, _)) => panic!("cannot collect into OMTree: {error}"),
        }
    }
}
