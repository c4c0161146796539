use core::fmt;
use core::ops::Index;

use crate::cursor::{Cursor, TreeId};
use crate::error::{Error, Result};
use crate::raw::RawOMTree;

mod capacity;
mod iter;
mod search;
mod structural;

pub use iter::Iter;
pub use search::Direction;

/// An ordered sequence of values addressed by rank.
///
/// An `OMTree` is a vector `V₀ … Vₙ₋₁` that supports inserting and deleting
/// at any rank in O(log n), shifting the ranks of everything behind the
/// change. It never compares values itself: where a position depends on the
/// values, the caller passes a monotone predicate (see [`OMTree::find_zero`]).
///
/// Internally it is a weight-balanced binary tree whose nodes cache their
/// subtree sizes. Ranks are derived from those sizes on the way down and are
/// never stored, so every mutation touches only one root-to-leaf path.
///
/// The tree is single-threaded: nothing is synchronized internally. Callers
/// needing shared access must serialize it, or partition the data with
/// [`OMTree::split_at`].
///
/// # Examples
///
/// ```
/// use omtree::OMTree;
///
/// let mut tree = OMTree::new();
/// tree.insert_at(10, 0).unwrap();
/// tree.insert_at(30, 1).unwrap();
/// tree.insert_at(20, 1).unwrap();
///
/// assert_eq!(tree.len(), 3);
/// assert_eq!(tree.fetch(1), Ok(&20));
///
/// // Keep the sequence sorted by inserting through a predicate.
/// let rank = tree.insert(25, |v| v.cmp(&25)).unwrap();
/// assert_eq!(rank, 2);
/// assert_eq!(tree.iter().copied().collect::<Vec<_>>(), [10, 20, 25, 30]);
/// ```
pub struct OMTree<V> {
    raw: RawOMTree<V>,
    id: TreeId,
    generation: u64,
}

impl<V> OMTree<V> {
    /// Creates an empty tree.
    ///
    /// # Examples
    ///
    /// ```
    /// use omtree::OMTree;
    ///
    /// let tree: OMTree<u64> = OMTree::new();
    /// assert!(tree.is_empty());
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::from_raw(RawOMTree::new())
    }

    pub(crate) fn from_raw(raw: RawOMTree<V>) -> Self {
        OMTree {
            raw,
            id: TreeId::next(),
            generation: 0,
        }
    }

    /// Invalidates every outstanding cursor.
    fn touch(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    /// Returns the number of values in the tree.
    ///
    /// # Complexity
    ///
    /// O(1)
    #[must_use]
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns the number of values in the tree. Same as [`OMTree::len`].
    #[must_use]
    pub fn size(&self) -> usize {
        self.raw.len()
    }

    /// Returns `true` if the tree holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Returns the value at `rank`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidIndex`] if `rank >= len()`.
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn fetch(&self, rank: usize) -> Result<&V> {
        let node = self.locate(rank)?;
        Ok(self.raw.value(node))
    }

    /// Returns a mutable reference to the value at `rank`.
    ///
    /// Taking the reference counts as a mutation: outstanding cursors go stale.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidIndex`] if `rank >= len()`.
    pub fn fetch_mut(&mut self, rank: usize) -> Result<&mut V> {
        let node = self.locate(rank)?;
        self.touch();
        Ok(self.raw.value_mut(node))
    }

    fn locate(&self, rank: usize) -> Result<crate::raw::Handle> {
        self.raw.locate(rank).ok_or(Error::InvalidIndex {
            index: rank,
            len: self.len(),
        })
    }

    /// Inserts `value` so that it becomes the value at `rank`.
    ///
    /// Every value previously at `rank` or above moves up by one.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidIndex`] if `rank > len()`.
    /// - [`Error::OutOfMemory`] if storage could not grow.
    ///
    /// On error the tree is unchanged and `value` is dropped.
    ///
    /// # Complexity
    ///
    /// O(log n)
    ///
    /// # Examples
    ///
    /// ```
    /// use omtree::OMTree;
    ///
    /// let mut tree = OMTree::new();
    /// for v in [10, 20, 30] {
    ///     tree.insert_at(v, 0).unwrap();
    /// }
    /// assert_eq!(tree.iter().copied().collect::<Vec<_>>(), [30, 20, 10]);
    /// ```
    pub fn insert_at(&mut self, value: V, rank: usize) -> Result<()> {
        self.raw.insert_at(rank, value)?;
        self.touch();
        Ok(())
    }

    /// Replaces the value at `rank`, returning the previous one.
    ///
    /// The size and the order of the other values are unchanged.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidIndex`] if `rank >= len()`.
    pub fn set_at(&mut self, value: V, rank: usize) -> Result<V> {
        let len = self.len();
        let old = self.raw.replace(rank, value).ok_or(Error::InvalidIndex { index: rank, len })?;
        self.touch();
        Ok(old)
    }

    /// Inserts `value` at the position chosen by the monotone predicate `h`.
    ///
    /// If `h` is zero ([`Ordering::Equal`](core::cmp::Ordering::Equal)) for
    /// some stored value, nothing is inserted. Otherwise `value` goes to the
    /// smallest rank where `h` is positive, or to the end if there is none.
    /// Returns the rank `value` was inserted at.
    ///
    /// `h` must be monotone over the sequence; see [`OMTree::find_zero`].
    ///
    /// # Errors
    ///
    /// - [`Error::DuplicateKey`] with the rank of the first zero.
    /// - [`Error::OutOfMemory`] if storage could not grow.
    ///
    /// On error the tree is unchanged and `value` is dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use omtree::{Error, OMTree};
    ///
    /// let mut tree = OMTree::from_sorted_slice(&[10, 30]).unwrap();
    /// assert_eq!(tree.insert(20, |v| v.cmp(&20)), Ok(1));
    /// assert_eq!(tree.insert(30, |v| v.cmp(&30)), Err(Error::DuplicateKey { rank: 2 }));
    /// ```
    pub fn insert<F>(&mut self, value: V, h: F) -> Result<usize>
    where
        F: FnMut(&V) -> core::cmp::Ordering,
    {
        let rank = match self.find_zero(h) {
            Ok((rank, _)) => return Err(Error::DuplicateKey { rank }),
            Err(Error::NotFound { rank }) => rank,
            Err(error) => return Err(error),
        };
        self.insert_at(value, rank)?;
        Ok(rank)
    }

    /// Removes and returns the value at `rank`.
    ///
    /// Every value previously above `rank` moves down by one.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidIndex`] if `rank >= len()`.
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn delete_at(&mut self, rank: usize) -> Result<V> {
        let value = self.raw.remove_at(rank)?;
        self.touch();
        Ok(value)
    }

    /// Removes every value, keeping allocated storage for reuse.
    ///
    /// # Examples
    ///
    /// ```
    /// use omtree::OMTree;
    ///
    /// let mut tree: OMTree<u32> = (0..100).collect();
    /// let capacity = tree.capacity();
    /// tree.clear();
    /// assert!(tree.is_empty());
    /// assert_eq!(tree.capacity(), capacity);
    /// ```
    pub fn clear(&mut self) {
        tracing::trace!(len = self.len(), "clearing order-maintenance tree");
        self.raw.clear();
        self.touch();
    }

    /// Returns the value at `rank` together with a [`Cursor`] to it.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidIndex`] if `rank >= len()`.
    pub fn cursor_at(&self, rank: usize) -> Result<(Cursor, &V)> {
        let node = self.locate(rank)?;
        let cursor = Cursor::new(self.id, self.generation, node, rank);
        Ok((cursor, self.raw.value(node)))
    }

    /// Returns the value a cursor points at.
    ///
    /// # Errors
    ///
    /// [`Error::StaleCursor`] if the cursor came from another tree, or this
    /// tree was mutated since the cursor was taken.
    ///
    /// # Complexity
    ///
    /// O(1)
    pub fn resolve(&self, cursor: &Cursor) -> Result<&V> {
        let node = cursor.node_for(self.id, self.generation).ok_or(Error::StaleCursor)?;
        Ok(self.raw.value(node))
    }

    /// Checks the internal invariants: exact subtree sizes, weight balance at
    /// every node, and a consistent value index.
    ///
    /// Intended for tests and debugging. O(n).
    #[must_use]
    pub fn verify(&self) -> bool {
        self.raw.check_invariants()
    }
}

impl<V> Default for OMTree<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> Clone for OMTree<V> {
    fn clone(&self) -> Self {
        Self::from_raw(self.raw.clone())
    }
}

impl<V: fmt::Debug> fmt::Debug for OMTree<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<V: PartialEq> PartialEq for OMTree<V> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<V: Eq> Eq for OMTree<V> {}

impl<V> Index<usize> for OMTree<V> {
    type Output = V;

    /// Returns the value at `rank`.
    ///
    /// # Panics
    ///
    /// Panics if `rank >= len()`.
    fn index(&self, rank: usize) -> &V {
        match self.fetch(rank) {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        }
    }
}
