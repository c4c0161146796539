//! Error types for `omtree`.

use alloc::collections::TryReserveError;
use alloc::vec::Vec;
use core::fmt;

use crate::OMTree;

/// Result type alias using our [`Error`].
pub type Result<T> = core::result::Result<T, Error>;

/// Failure kinds reported by [`OMTree`] operations.
///
/// Every failing operation leaves the tree exactly as it was before the call.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, thiserror::Error)]
pub enum Error {
    /// An allocation failed, or the tree would exceed its handle space.
    #[error("out of memory")]
    OutOfMemory,

    /// A rank was outside the current bounds of the tree.
    #[error("rank {index} is out of bounds for a tree of length {len}")]
    InvalidIndex {
        /// The rejected rank.
        index: usize,
        /// The length of the tree at the time of the call.
        len: usize,
    },

    /// Malformed input to a constructor or search.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// A predicate-driven insert found a value for which the predicate is zero.
    #[error("a matching value already exists at rank {rank}")]
    DuplicateKey {
        /// Rank of the first value for which the predicate is zero.
        rank: usize,
    },

    /// A predicate search found no qualifying value.
    ///
    /// For [`OMTree::find_zero`] `rank` is where a matching value would be
    /// inserted. For [`OMTree::find`] it is the boundary the search ran into:
    /// the length of the tree when searching for a successor, `0` when
    /// searching for a predecessor.
    #[error("no matching value (boundary at rank {rank})")]
    NotFound {
        /// Boundary rank of the failed search.
        rank: usize,
    },

    /// A [`Cursor`](crate::Cursor) was used after its tree changed, or with a
    /// tree it does not belong to.
    #[error("cursor is stale or belongs to another tree")]
    StaleCursor,
}

impl From<TryReserveError> for Error {
    fn from(_: TryReserveError) -> Self {
        Error::OutOfMemory
    }
}

/// Error returned by [`OMTree::steal_sorted_array`].
///
/// Ownership of the buffer is handed back to the caller.
#[derive(thiserror::Error)]
#[error("cannot take ownership of buffer: {error}")]
pub struct StealError<V> {
    #[source]
    error: Error,
    buffer: Vec<V>,
}

impl<V> StealError<V> {
    pub(crate) fn new(error: Error, buffer: Vec<V>) -> Self {
        Self { error, buffer }
    }

    /// Returns the reason the buffer was rejected.
    #[must_use]
    pub fn error(&self) -> Error {
        self.error
    }

    /// Returns the buffer, untouched.
    #[must_use]
    pub fn into_buffer(self) -> Vec<V> {
        self.buffer
    }
}

impl<V> fmt::Debug for StealError<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StealError")
            .field("error", &self.error)
            .field("len", &self.buffer.len())
            .field("capacity", &self.buffer.capacity())
            .finish()
    }
}


/// Error returned by [`OMTree::merge`].
///
/// Both input trees are handed back unmodified.
#[derive(thiserror::Error)]
#[error("cannot merge trees: {error}")]
pub struct MergeError<V> {
    #[source]
    error: Error,
    left: OMTree<V>,
    right: OMTree<V>,
}

impl<V> MergeError<V> {
    pub(crate) fn new(error: Error, left: OMTree<V>, right: OMTree<V>) -> Self {
        Self { error, left, right }
    }

    /// Returns the reason the merge failed.
    #[must_use]
    pub fn error(&self) -> Error {
        self.error
    }

    /// Returns the `(left, right)` trees that were passed to the merge.
    #[must_use]
    pub fn into_parts(self) -> (OMTree<V>, OMTree<V>) {
        (self.left, self.right)
    }
}

impl<V> fmt::Debug for MergeError<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergeError")
            .field("error", &self.error)
            .field("left_len", &self.left.len())
            .field("right_len", &self.right.len())
            .finish()
    }
}
