use super::handle::Handle;
use super::size::Size;

/// A node of the weight-balanced tree.
///
/// Nodes own their children through arena handles; there are no parent links.
/// The value itself lives in the tree's value store at `slot`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Node {
    left: Option<Handle>,
    right: Option<Handle>,
    // The number of values in the subtree rooted at this node.
    size: Size,
    slot: Handle,
}

impl Node {
    /// Creates a childless node for the value at `slot`.
    pub(crate) const fn leaf(slot: Handle) -> Self {
        Self {
            left: None,
            right: None,
            size: Size::ONE,
            slot,
        }
    }

    #[inline]
    pub(crate) const fn left(&self) -> Option<Handle> {
        self.left
    }

    #[inline]
    pub(crate) const fn right(&self) -> Option<Handle> {
        self.right
    }

    #[inline]
    pub(crate) const fn children(&self) -> (Option<Handle>, Option<Handle>) {
        (self.left, self.right)
    }

    #[inline]
    pub(crate) const fn size(&self) -> Size {
        self.size
    }

    #[inline]
    pub(crate) const fn slot(&self) -> Handle {
        self.slot
    }

    pub(crate) fn set_left(&mut self, left: Option<Handle>) {
        self.left = left;
    }

    pub(crate) fn set_right(&mut self, right: Option<Handle>) {
        self.right = right;
    }

    pub(crate) fn set_children(&mut self, left: Option<Handle>, right: Option<Handle>) {
        self.left = left;
        self.right = right;
    }

    pub(crate) fn set_size(&mut self, size: Size) {
        self.size = size;
    }

    pub(crate) fn set_slot(&mut self, slot: Handle) {
        self.slot = slot;
    }
}
