use core::sync::atomic::{AtomicUsize, Ordering};

use crate::raw::Handle;

/// Identity of one `OMTree` instance, used to reject cursors from other trees.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub(crate) struct TreeId(usize);

impl TreeId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicUsize = AtomicUsize::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A locator for one value of an [`OMTree`](crate::OMTree).
///
/// Ranks shift under mutation, so a cursor is only good for the exact tree and
/// tree state it was taken from. It records both, and
/// [`OMTree::resolve`](crate::OMTree::resolve) checks them on every
/// dereference: any mutation of the tree, or use against a different tree,
/// yields [`Error::StaleCursor`](crate::Error::StaleCursor).
///
/// # Examples
///
/// ```
/// use omtree::{Error, OMTree};
///
/// let mut tree = OMTree::from_sorted_slice(&[10, 20, 30]).unwrap();
/// let (cursor, value) = tree.cursor_at(1).unwrap();
/// assert_eq!((*value, cursor.rank()), (20, 1));
/// assert_eq!(tree.resolve(&cursor), Ok(&20));
///
/// tree.insert_at(5, 0).unwrap();
/// assert_eq!(tree.resolve(&cursor), Err(Error::StaleCursor));
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Cursor {
    tree: TreeId,
    generation: u64,
    node: Handle,
    rank: usize,
}

impl Cursor {
    pub(crate) fn new(tree: TreeId, generation: u64, node: Handle, rank: usize) -> Self {
        Self {
            tree,
            generation,
            node,
            rank,
        }
    }

    /// The rank the value had when the cursor was taken.
    #[must_use]
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Returns the node if the cursor is still valid for a tree with this identity and generation.
    pub(crate) fn node_for(&self, tree: TreeId, generation: u64) -> Option<Handle> {
        (self.tree == tree && self.generation == generation).then_some(self.node)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn tree_ids_are_unique() {
        let a = TreeId::next();
        let b = TreeId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn cursor_checks_tree_and_generation() {
        let tree = TreeId::next();
        let node = Handle::from_index(3);
        let cursor = Cursor::new(tree, 7, node, 2);
        assert_eq!(cursor.rank(), 2);
        assert_eq!(cursor.node_for(tree, 7), Some(node));
        assert_eq!(cursor.node_for(tree, 8), None);
        assert_eq!(cursor.node_for(TreeId::next(), 7), None);
    }
}
