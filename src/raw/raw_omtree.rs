use alloc::vec::Vec;
use core::cmp::Ordering;
use core::mem;
use core::ops::ControlFlow;

use smallvec::SmallVec;

use super::arena::Arena;
use super::handle::Handle;
use super::node::Node;
use super::size::Size;
use crate::error::{Error, Result};

// Weight-balance parameters <Δ, Γ> = <3, 2>, with weight(t) = size(t) + 1.
const DELTA: usize = 3;
const GAMMA: usize = 2;

/// Whether a subtree of `size` is too heavy to sit beside one of `than`.
#[inline]
const fn is_heavier(size: usize, than: usize) -> bool {
    (than + 1) * DELTA < size + 1
}

#[inline]
const fn is_balanced(a: usize, b: usize) -> bool {
    !is_heavier(a, b) && !is_heavier(b, a)
}

/// Whether a single rotation suffices, given the heavy child's inner and outer grandchildren.
#[inline]
const fn is_single(inner: usize, outer: usize) -> bool {
    inner + 1 < (outer + 1) * GAMMA
}

/// Traversal stack. Inline for trees up to about 2^26 values; deeper
/// paths (at most log_{4/3} of the handle space, ~77) spill to the heap.
pub(crate) type Stack = SmallVec<[Handle; 64]>;

/// The weight-balanced tree backing `OMTree`.
#[derive(Clone)]
pub(crate) struct RawOMTree<V> {
    /// Arena storing all tree nodes.
    nodes: Arena<Node>,
    /// Dense value storage, in no particular order. May be a stolen caller buffer.
    values: Vec<V>,
    /// `owners[i]` is the node whose value is `values[i]`.
    owners: Vec<Handle>,
    /// Handle to the root node, if the tree is non-empty.
    root: Option<Handle>,
}

impl<V> RawOMTree<V> {
    pub(crate) const fn new() -> Self {
        Self {
            nodes: Arena::new(),
            values: Vec::new(),
            owners: Vec::new(),
            root: None,
        }
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Arena::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
            owners: Vec::with_capacity(capacity),
            root: None,
        }
    }

    /// Builds a perfectly balanced tree over `values[..len]`, using the vector itself as value storage.
    ///
    /// Values past `len` are dropped. On failure the vector is handed back untouched.
    pub(crate) fn from_vec(mut values: Vec<V>, len: usize) -> core::result::Result<Self, (Error, Vec<V>)> {
        debug_assert!(len <= values.len());
        let mut tree = Self::new();
        if let Err(error) = tree.reserve_nodes(len) {
            return Err((error, values));
        }
        values.truncate(len);
        tree.values = values;
        tree.owners.resize(len, Handle::from_index(0));
        tree.root = tree.build(0, len);
        Ok(tree)
    }

    pub(crate) fn try_clone(&self) -> Result<Self>
    where
        V: Clone,
    {
        let mut values = Vec::new();
        values.try_reserve_exact(self.values.len())?;
        values.extend_from_slice(&self.values);

        let mut owners = Vec::new();
        owners.try_reserve_exact(self.owners.len())?;
        owners.extend_from_slice(&self.owners);

        Ok(Self {
            nodes: self.nodes.try_clone()?,
            values,
            owners,
            root: self.root,
        })
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.values.capacity().min(self.nodes.capacity())
    }

    /// Heap bytes held by the structure, excluding heap memory owned by the values themselves.
    pub(crate) fn memory_footprint(&self) -> usize {
        self.nodes.memory_footprint()
            + self.values.capacity() * mem::size_of::<V>()
            + self.owners.capacity() * mem::size_of::<Handle>()
    }

    /// Removes all values, keeping every buffer's capacity.
    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.values.clear();
        self.owners.clear();
        self.root = None;
    }

    #[cfg(test)]
    pub(crate) fn root(&self) -> Option<Handle> {
        self.root
    }

    #[inline]
    pub(crate) fn node(&self, handle: Handle) -> &Node {
        self.nodes.get(handle)
    }

    #[inline]
    pub(crate) fn value(&self, handle: Handle) -> &V {
        &self.values[self.nodes.get(handle).slot().to_index()]
    }

    #[inline]
    pub(crate) fn value_mut(&mut self, handle: Handle) -> &mut V {
        let slot = self.nodes.get(handle).slot().to_index();
        &mut self.values[slot]
    }

    #[inline]
    pub(crate) fn size_of(&self, tree: Option<Handle>) -> usize {
        tree.map_or(0, |h| self.nodes.get(h).size().to_usize())
    }

    #[inline]
    fn children(&self, handle: Handle) -> (Option<Handle>, Option<Handle>) {
        self.nodes.get(handle).children()
    }

    /// Reserves everything needed to insert `additional` values without allocating.
    fn try_reserve(&mut self, additional: usize) -> Result<()> {
        self.reserve_nodes(additional)?;
        self.values.try_reserve(additional)?;
        Ok(())
    }

    fn reserve_nodes(&mut self, additional: usize) -> Result<()> {
        self.nodes.try_reserve(additional)?;
        self.owners.try_reserve(additional)?;
        Ok(())
    }

    /// Stores `value` and allocates a childless node for it. Capacity must be reserved.
    fn attach(&mut self, value: V) -> Handle {
        let slot = Handle::from_index(self.values.len());
        self.values.push(value);
        let node = self.nodes.alloc(Node::leaf(slot));
        self.owners.push(node);
        node
    }

    /// Frees `node` and removes its value, back-filling the hole from the end of the store.
    fn release(&mut self, node: Handle) -> V {
        let slot = self.nodes.get(node).slot();
        self.nodes.free(node);
        let value = self.values.swap_remove(slot.to_index());
        self.owners.swap_remove(slot.to_index());
        if let Some(&moved) = self.owners.get(slot.to_index()) {
            self.nodes.get_mut(moved).set_slot(slot);
        }
        value
    }

    /// Returns the node at `rank`, if any.
    pub(crate) fn locate(&self, rank: usize) -> Option<Handle> {
        let mut current = self.root;
        let mut remaining = rank;

        while let Some(h) = current {
            let (left, right) = self.children(h);
            let left_size = self.size_of(left);
            match remaining.cmp(&left_size) {
                Ordering::Less => current = left,
                Ordering::Equal => return Some(h),
                Ordering::Greater => {
                    remaining -= left_size + 1;
                    current = right;
                }
            }
        }

        None
    }

    /// Replaces the value at `rank`, returning the old one.
    pub(crate) fn replace(&mut self, rank: usize, value: V) -> Option<V> {
        let node = self.locate(rank)?;
        Some(mem::replace(self.value_mut(node), value))
    }

    /// Inserts `value` so that it ends up at `rank`.
    pub(crate) fn insert_at(&mut self, rank: usize, value: V) -> Result<()> {
        let len = self.len();
        if rank > len {
            return Err(Error::InvalidIndex { index: rank, len });
        }

        self.try_reserve(1)?;
        let node = self.attach(value);
        let root = self.root;
        self.root = Some(self.insert_node(root, rank, node));
        Ok(())
    }

    fn insert_node(&mut self, tree: Option<Handle>, rank: usize, node: Handle) -> Handle {
        let Some(h) = tree else {
            return node;
        };

        let (left, right) = self.children(h);
        let left_size = self.size_of(left);
        if rank <= left_size {
            let child = self.insert_node(left, rank, node);
            self.nodes.get_mut(h).set_left(Some(child));
        } else {
            let child = self.insert_node(right, rank - left_size - 1, node);
            self.nodes.get_mut(h).set_right(Some(child));
        }
        self.balance(h)
    }

    /// Removes and returns the value at `rank`.
    pub(crate) fn remove_at(&mut self, rank: usize) -> Result<V> {
        let len = self.len();
        let Some(root) = self.root.filter(|_| rank < len) else {
            return Err(Error::InvalidIndex { index: rank, len });
        };

        let (root, removed) = self.remove_node(root, rank);
        self.root = root;
        Ok(self.release(removed))
    }

    fn remove_node(&mut self, h: Handle, rank: usize) -> (Option<Handle>, Handle) {
        let (left, right) = self.children(h);
        let left_size = self.size_of(left);
        match (rank.cmp(&left_size), left, right) {
            (Ordering::Less, Some(l), _) => {
                let (l, removed) = self.remove_node(l, rank);
                self.nodes.get_mut(h).set_left(l);
                (Some(self.balance(h)), removed)
            }
            (Ordering::Greater, _, Some(r)) => {
                let (r, removed) = self.remove_node(r, rank - left_size - 1);
                self.nodes.get_mut(h).set_right(r);
                (Some(self.balance(h)), removed)
            }
            _ => (self.glue(left, right), h),
        }
    }

    fn remove_min(&mut self, h: Handle) -> (Option<Handle>, Handle) {
        match self.children(h) {
            (None, right) => (right, h),
            (Some(l), _) => {
                let (rest, min) = self.remove_min(l);
                self.nodes.get_mut(h).set_left(rest);
                (Some(self.balance(h)), min)
            }
        }
    }

    fn remove_max(&mut self, h: Handle) -> (Option<Handle>, Handle) {
        match self.children(h) {
            (left, None) => (left, h),
            (_, Some(r)) => {
                let (rest, max) = self.remove_max(r);
                self.nodes.get_mut(h).set_right(rest);
                (Some(self.balance(h)), max)
            }
        }
    }

    /// Joins two balanced siblings whose parent was just removed.
    fn glue(&mut self, left: Option<Handle>, right: Option<Handle>) -> Option<Handle> {
        match (left, right) {
            (None, tree) | (tree, None) => tree,
            (Some(l), Some(r)) => {
                let root = if self.size_of(left) > self.size_of(right) {
                    let (rest, max) = self.remove_max(l);
                    self.nodes.get_mut(max).set_children(rest, Some(r));
                    max
                } else {
                    let (rest, min) = self.remove_min(r);
                    self.nodes.get_mut(min).set_children(Some(l), rest);
                    min
                };
                Some(self.balance(root))
            }
        }
    }

    /// Recomputes the size of `h` from its children.
    fn update(&mut self, h: Handle) {
        let (left, right) = self.children(h);
        let size = self.size_of(left) + self.size_of(right) + 1;
        self.nodes.get_mut(h).set_size(Size::from_usize(size));
    }

    fn rotate_left(&mut self, h: Handle) -> Handle {
        let Some(r) = self.nodes.get(h).right() else {
            self.update(h);
            return h;
        };
        let inner = self.nodes.get(r).left();
        self.nodes.get_mut(h).set_right(inner);
        self.update(h);
        self.nodes.get_mut(r).set_left(Some(h));
        self.update(r);
        r
    }

    fn rotate_right(&mut self, h: Handle) -> Handle {
        let Some(l) = self.nodes.get(h).left() else {
            self.update(h);
            return h;
        };
        let inner = self.nodes.get(l).right();
        self.nodes.get_mut(h).set_left(inner);
        self.update(h);
        self.nodes.get_mut(l).set_right(Some(h));
        self.update(l);
        l
    }

    /// Restores balance at `h` after one of its subtrees gained or lost a value.
    fn balance(&mut self, h: Handle) -> Handle {
        let (left, right) = self.children(h);
        let (left_size, right_size) = (self.size_of(left), self.size_of(right));

        match (left, right) {
            (_, Some(r)) if is_heavier(right_size, left_size) => {
                let (inner, outer) = self.children(r);
                if !is_single(self.size_of(inner), self.size_of(outer)) {
                    let r = self.rotate_right(r);
                    self.nodes.get_mut(h).set_right(Some(r));
                }
                self.rotate_left(h)
            }
            (Some(l), _) if is_heavier(left_size, right_size) => {
                let (outer, inner) = self.children(l);
                if !is_single(self.size_of(inner), self.size_of(outer)) {
                    let l = self.rotate_left(l);
                    self.nodes.get_mut(h).set_left(Some(l));
                }
                self.rotate_right(h)
            }
            _ => {
                self.update(h);
                h
            }
        }
    }

    /// Concatenates `left`, `mid`, `right` (in that order) into one balanced tree.
    fn link(&mut self, left: Option<Handle>, mid: Handle, right: Option<Handle>) -> Handle {
        if self.size_of(left) >= self.size_of(right) {
            self.link_right(left, mid, right)
        } else {
            self.link_left(left, mid, right)
        }
    }

    // `tree` is at least as heavy as `right`: descend its right spine until the
    // two fit side by side, then rebalance on the way back up.
    fn link_right(&mut self, tree: Option<Handle>, mid: Handle, right: Option<Handle>) -> Handle {
        let right_size = self.size_of(right);
        let t = match tree {
            Some(t) if !is_balanced(self.size_of(tree), right_size) => t,
            _ => {
                self.nodes.get_mut(mid).set_children(tree, right);
                self.update(mid);
                return mid;
            }
        };

        let (l, c) = self.children(t);
        let joined = self.link_right(c, mid, right);
        self.nodes.get_mut(t).set_right(Some(joined));

        let (l1, r1) = self.children(joined);
        let (l_size, l1_size, r1_size) = (self.size_of(l), self.size_of(l1), self.size_of(r1));
        if is_balanced(l_size, self.size_of(Some(joined))) {
            self.update(t);
            t
        } else if is_balanced(l_size, l1_size) && is_balanced(l_size + l1_size + 1, r1_size) {
            self.rotate_left(t)
        } else {
            let joined = self.rotate_right(joined);
            self.nodes.get_mut(t).set_right(Some(joined));
            self.rotate_left(t)
        }
    }

    fn link_left(&mut self, left: Option<Handle>, mid: Handle, tree: Option<Handle>) -> Handle {
        let left_size = self.size_of(left);
        let t = match tree {
            Some(t) if !is_balanced(left_size, self.size_of(tree)) => t,
            _ => {
                self.nodes.get_mut(mid).set_children(left, tree);
                self.update(mid);
                return mid;
            }
        };

        let (c, r) = self.children(t);
        let joined = self.link_left(left, mid, c);
        self.nodes.get_mut(t).set_left(Some(joined));

        let (l1, r1) = self.children(joined);
        let (r_size, l1_size, r1_size) = (self.size_of(r), self.size_of(l1), self.size_of(r1));
        if is_balanced(r_size, self.size_of(Some(joined))) {
            self.update(t);
            t
        } else if is_balanced(r_size, r1_size) && is_balanced(r_size + r1_size + 1, l1_size) {
            self.rotate_right(t)
        } else {
            let joined = self.rotate_left(joined);
            self.nodes.get_mut(t).set_left(Some(joined));
            self.rotate_right(t)
        }
    }

    /// Concatenates two trees that live in this arena.
    fn join(&mut self, left: Option<Handle>, right: Option<Handle>) -> Option<Handle> {
        match (left, right) {
            (None, tree) | (tree, None) => tree,
            (Some(_), Some(r)) => {
                let (rest, min) = self.remove_min(r);
                Some(self.link(left, min, rest))
            }
        }
    }

    /// Splits `tree` into the values below `rank` and the rest.
    fn split_node(&mut self, tree: Option<Handle>, rank: usize) -> (Option<Handle>, Option<Handle>) {
        let Some(h) = tree else {
            return (None, None);
        };

        let (left, right) = self.children(h);
        let left_size = self.size_of(left);
        if rank <= left_size {
            let (below, above) = self.split_node(left, rank);
            (below, Some(self.link(above, h, right)))
        } else {
            let (below, above) = self.split_node(right, rank - left_size - 1);
            (Some(self.link(left, h, below)), above)
        }
    }

    /// Moves the subtree rooted at `h` out of `src` and into this tree's storage.
    ///
    /// Shape and sizes are preserved; capacity must already be reserved here.
    fn adopt(&mut self, src: &mut Self, h: Handle) -> Handle {
        let node = *src.nodes.get(h);
        let left = node.left().map(|l| self.adopt(src, l));
        let right = node.right().map(|r| self.adopt(src, r));

        let adopted = self.attach(src.release(h));
        let adopted_node = self.nodes.get_mut(adopted);
        adopted_node.set_children(left, right);
        adopted_node.set_size(node.size());
        adopted
    }

    /// Moves every value at `rank` and above into a new tree.
    ///
    /// Only the smaller half is relocated between storages; when that is the
    /// lower half the two storages are swapped afterwards.
    pub(crate) fn split_off(&mut self, rank: usize) -> Result<Self> {
        let len = self.len();
        if rank > len {
            return Err(Error::InvalidIndex { index: rank, len });
        }

        let lower_is_smaller = rank <= len - rank;
        let mut other = Self::new();
        other.try_reserve(rank.min(len - rank))?;

        let root = self.root.take();
        let (below, above) = self.split_node(root, rank);
        if lower_is_smaller {
            other.root = below.map(|h| other.adopt(self, h));
            self.root = above;
            mem::swap(self, &mut other);
        } else {
            other.root = above.map(|h| other.adopt(self, h));
            self.root = below;
        }
        Ok(other)
    }

    /// Moves every value of `other` to the end of this tree, leaving `other` empty.
    ///
    /// The larger storage is kept and the smaller side is relocated into it.
    pub(crate) fn append(&mut self, other: &mut Self) -> Result<()> {
        if other.is_empty() {
            return Ok(());
        }

        let self_is_smaller = self.len() < other.len();
        let moved = self.len().min(other.len());
        if self_is_smaller {
            other.try_reserve(moved)?;
            mem::swap(self, other);
        } else {
            self.try_reserve(moved)?;
        }

        // `other` now holds the smaller side.
        let adopted = other.root.take().map(|h| self.adopt(other, h));
        let kept = self.root;
        self.root = if self_is_smaller {
            self.join(adopted, kept)
        } else {
            self.join(kept, adopted)
        };
        Ok(())
    }

    /// Builds a perfectly balanced subtree over `values[lo..hi]`.
    fn build(&mut self, lo: usize, hi: usize) -> Option<Handle> {
        if lo == hi {
            return None;
        }

        let mid = lo + (hi - lo) / 2;
        let left = self.build(lo, mid);
        let right = self.build(mid + 1, hi);

        let mut node = Node::leaf(Handle::from_index(mid));
        node.set_children(left, right);
        node.set_size(Size::from_usize(hi - lo));
        let h = self.nodes.alloc(node);
        self.owners[mid] = h;
        Some(h)
    }

    /// Finds the smallest rank whose value `h` does not rank below.
    ///
    /// Returns that rank, its node, and the sign `h` gave it.
    pub(crate) fn search_zero<F>(&self, mut h: F) -> Option<(usize, Handle, Ordering)>
    where
        F: FnMut(&V) -> Ordering,
    {
        let mut current = self.root;
        let mut base = 0;
        let mut best = None;

        while let Some(node) = current {
            let (left, right) = self.children(node);
            let rank = base + self.size_of(left);
            match h(self.value(node)) {
                Ordering::Less => {
                    base = rank + 1;
                    current = right;
                }
                sign => {
                    best = Some((rank, node, sign));
                    current = left;
                }
            }
        }

        best
    }

    /// Finds the smallest rank where `h` is positive.
    pub(crate) fn search_successor<F>(&self, mut h: F) -> Option<(usize, Handle)>
    where
        F: FnMut(&V) -> Ordering,
    {
        let mut current = self.root;
        let mut base = 0;
        let mut best = None;

        while let Some(node) = current {
            let (left, right) = self.children(node);
            let rank = base + self.size_of(left);
            if h(self.value(node)) == Ordering::Greater {
                best = Some((rank, node));
                current = left;
            } else {
                base = rank + 1;
                current = right;
            }
        }

        best
    }

    /// Finds the largest rank where `h` is negative.
    pub(crate) fn search_predecessor<F>(&self, mut h: F) -> Option<(usize, Handle)>
    where
        F: FnMut(&V) -> Ordering,
    {
        let mut current = self.root;
        let mut base = 0;
        let mut best = None;

        while let Some(node) = current {
            let (left, right) = self.children(node);
            let rank = base + self.size_of(left);
            if h(self.value(node)) == Ordering::Less {
                best = Some((rank, node));
                base = rank + 1;
                current = right;
            } else {
                current = left;
            }
        }

        best
    }

    /// Pushes the path to the smallest rank `>= start` onto `stack`.
    pub(crate) fn seek_front(&self, start: usize, stack: &mut Stack) {
        let mut current = self.root;
        let mut base = 0;

        while let Some(h) = current {
            let (left, right) = self.children(h);
            let rank = base + self.size_of(left);
            if start <= rank {
                stack.push(h);
                current = left;
            } else {
                base = rank + 1;
                current = right;
            }
        }
    }

    /// Pushes the path to the largest rank `< end` onto `stack`.
    pub(crate) fn seek_back(&self, end: usize, stack: &mut Stack) {
        let mut current = self.root;
        let mut base = 0;

        while let Some(h) = current {
            let (left, right) = self.children(h);
            let rank = base + self.size_of(left);
            if rank < end {
                stack.push(h);
                base = rank + 1;
                current = right;
            } else {
                current = left;
            }
        }
    }

    /// Visits every value mutably, in rank order, until `f` breaks.
    pub(crate) fn for_each_mut<B, F>(&mut self, mut f: F) -> ControlFlow<B>
    where
        F: FnMut(&mut V, usize) -> ControlFlow<B>,
    {
        let Self { nodes, values, root, .. } = self;
        let mut stack = Stack::new();
        let mut current = *root;
        let mut rank = 0;

        loop {
            while let Some(h) = current {
                stack.push(h);
                current = nodes.get(h).left();
            }
            let Some(h) = stack.pop() else {
                return ControlFlow::Continue(());
            };

            let node = nodes.get(h);
            if let ControlFlow::Break(b) = f(&mut values[node.slot().to_index()], rank) {
                return ControlFlow::Break(b);
            }
            rank += 1;
            current = node.right();
        }
    }

    /// Checks sizes, weight balance and the value back-index.
    pub(crate) fn check_invariants(&self) -> bool {
        let Some(size) = self.check_subtree(self.root) else {
            return false;
        };
        size == self.len() && self.owners.len() == self.len() && self.nodes.len() == self.len()
    }

    fn check_subtree(&self, tree: Option<Handle>) -> Option<usize> {
        let Some(h) = tree else {
            return Some(0);
        };

        let node = self.nodes.get(h);
        let left = self.check_subtree(node.left())?;
        let right = self.check_subtree(node.right())?;
        let size = left + right + 1;
        let owned = self.owners.get(node.slot().to_index()) == Some(&h);
        (node.size().to_usize() == size && is_balanced(left, right) && owned).then_some(size)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use alloc::vec;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn contents<V: Clone>(tree: &RawOMTree<V>) -> Vec<V> {
        let mut out = Vec::new();
        let mut stack = Stack::new();
        tree.seek_front(0, &mut stack);
        while let Some(h) = stack.pop() {
            out.push(tree.value(h).clone());
            let mut current = tree.node(h).right();
            while let Some(c) = current {
                stack.push(c);
                current = tree.node(c).left();
            }
        }
        out
    }

    fn height<V>(tree: &RawOMTree<V>, node: Option<Handle>) -> usize {
        node.map_or(0, |h| {
            let (l, r) = tree.node(h).children();
            1 + height(tree, l).max(height(tree, r))
        })
    }

    fn from_range(n: u32) -> RawOMTree<u32> {
        RawOMTree::from_vec((0..n).collect(), n as usize).ok().unwrap()
    }

    #[test]
    fn balance_predicates() {
        assert!(is_balanced(0, 0));
        assert!(is_balanced(0, 2));
        assert!(!is_balanced(0, 3));
        assert!(is_heavier(3, 0));
        assert!(is_single(0, 0));
        assert!(!is_single(1, 0));
    }

    #[test]
    fn build_is_minimal_height() {
        let tree = from_range(1000);
        assert!(tree.check_invariants());
        assert_eq!(height(&tree, tree.root()), 10);
        assert_eq!(contents(&tree), (0..1000).collect::<Vec<_>>());
    }

    #[test]
    fn insert_at_front_reverses() {
        let mut tree = RawOMTree::new();
        for v in [10, 20, 30] {
            tree.insert_at(0, v).unwrap();
        }
        assert_eq!(contents(&tree), vec![30, 20, 10]);
        assert!(tree.check_invariants());
    }

    #[test]
    fn sequential_inserts_stay_logarithmic() {
        let mut tree = RawOMTree::new();
        for i in 0..4096u32 {
            tree.insert_at(tree.len(), i).unwrap();
        }
        assert!(tree.check_invariants());
        // <3,2> weight balance bounds height by log_{4/3}(n + 1).
        assert!(height(&tree, tree.root()) <= 29);
    }

    #[test]
    fn insert_past_end_is_rejected() {
        let mut tree = from_range(3);
        assert_eq!(tree.insert_at(4, 9), Err(Error::InvalidIndex { index: 4, len: 3 }));
        assert_eq!(contents(&tree), vec![0, 1, 2]);
    }

    #[test]
    fn insert_beyond_handle_space_is_out_of_memory() {
        let mut tree = RawOMTree::new();
        for i in 0..Handle::MAX {
            tree.insert_at(i, ()).unwrap();
        }
        assert_eq!(tree.insert_at(0, ()), Err(Error::OutOfMemory));
        assert_eq!(tree.len(), Handle::MAX);
        assert!(tree.check_invariants());
    }

    #[test]
    fn remove_back_fills_value_store() {
        let mut tree = from_range(8);
        assert_eq!(tree.remove_at(0), Ok(0));
        assert_eq!(tree.remove_at(3), Ok(4));
        assert_eq!(tree.remove_at(6), Err(Error::InvalidIndex { index: 6, len: 6 }));
        assert_eq!(contents(&tree), vec![1, 2, 3, 5, 6, 7]);
        assert!(tree.check_invariants());
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut tree = from_range(100);
        let capacity = tree.capacity();
        tree.clear();
        assert!(tree.is_empty());
        assert_eq!(tree.root(), None);
        assert_eq!(tree.capacity(), capacity);
        assert!(tree.check_invariants());
    }

    #[test]
    fn split_moves_smaller_half() {
        for rank in [0, 1, 10, 50, 99, 100] {
            let mut tree = from_range(100);
            let upper = tree.split_off(rank).unwrap();
            assert_eq!(contents(&tree), (0..rank as u32).collect::<Vec<_>>());
            assert_eq!(contents(&upper), (rank as u32..100).collect::<Vec<_>>());
            assert!(tree.check_invariants());
            assert!(upper.check_invariants());
        }
    }

    #[test]
    fn append_uneven_trees() {
        for (a, b) in [(0, 5), (5, 0), (1, 200), (200, 1), (64, 64)] {
            let mut left = RawOMTree::from_vec((0..a).collect(), a as usize).ok().unwrap();
            let mut right = RawOMTree::from_vec((a..a + b).collect(), b as usize).ok().unwrap();
            left.append(&mut right).unwrap();
            assert!(right.is_empty());
            assert_eq!(contents(&left), (0..a + b).collect::<Vec<u32>>());
            assert!(left.check_invariants());
        }
    }

    #[test]
    fn append_beyond_handle_space_leaves_both_trees() {
        let half = u32::try_from(Handle::MAX / 2 + 8).unwrap();
        let mut left = from_range(half);
        let mut right = RawOMTree::from_vec((half..half * 2).collect(), half as usize).ok().unwrap();

        assert_eq!(left.append(&mut right), Err(Error::OutOfMemory));
        assert!(left.check_invariants());
        assert!(right.check_invariants());
        assert_eq!(contents(&left), (0..half).collect::<Vec<_>>());
        assert_eq!(contents(&right), (half..half * 2).collect::<Vec<_>>());
    }

    #[test]
    fn from_vec_failure_returns_whole_vector() {
        let values = vec![0u8; Handle::MAX + 10];
        let (error, values) = RawOMTree::from_vec(values, Handle::MAX + 1).err().unwrap();
        assert_eq!(error, Error::OutOfMemory);
        assert_eq!(values.len(), Handle::MAX + 10);
    }

    #[test]
    fn search_modes() {
        let tree = RawOMTree::from_vec(vec![10, 20, 20, 30], 4).ok().unwrap();
        let h = |v: &i32| v.cmp(&20);

        let (rank, node, sign) = tree.search_zero(h).unwrap();
        assert_eq!((rank, *tree.value(node), sign), (1, 20, Ordering::Equal));
        assert_eq!(tree.search_successor(h).map(|(r, _)| r), Some(3));
        assert_eq!(tree.search_predecessor(h).map(|(r, _)| r), Some(0));
        assert!(tree.search_zero(|v: &i32| v.cmp(&99)).is_none());
        assert!(tree.search_predecessor(|_: &i32| Ordering::Greater).is_none());
    }

    #[test]
    fn for_each_mut_stops_early() {
        let mut tree = from_range(10);
        let flow = tree.for_each_mut(|v, rank| {
            *v *= 10;
            if rank == 3 { ControlFlow::Break(rank) } else { ControlFlow::Continue(()) }
        });
        assert_eq!(flow, ControlFlow::Break(3));
        assert_eq!(contents(&tree), vec![0, 10, 20, 30, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn try_clone_is_independent() {
        let tree = from_range(50);
        let mut copy = tree.try_clone().unwrap();
        copy.remove_at(0).unwrap();
        copy.replace(0, 999);
        assert_eq!(contents(&tree), (0..50).collect::<Vec<_>>());
        assert_eq!(copy.len(), 49);
        assert!(copy.check_invariants());
    }

    #[derive(Clone, Debug)]
    enum Operation {
        Insert(usize, u32),
        Remove(usize),
        Split(usize),
    }

    fn strategy() -> impl Strategy<Value = Operation> {
        prop_oneof![
            10 => (any::<usize>(), any::<u32>()).prop_map(|(r, v)| Operation::Insert(r, v)),
            6 => any::<usize>().prop_map(Operation::Remove),
            1 => any::<usize>().prop_map(Operation::Split),
        ]
    }

    proptest! {
        #[test]
        fn mutations_keep_invariants(operations in prop::collection::vec(strategy(), 0..512)) {
            let mut model: Vec<u32> = Vec::new();
            let mut tree = RawOMTree::new();

            for operation in operations {
                match operation {
                    Operation::Insert(which, value) => {
                        let rank = which % (model.len() + 1);
                        tree.insert_at(rank, value).unwrap();
                        model.insert(rank, value);
                    }
                    Operation::Remove(which) => {
                        if model.is_empty() {
                            continue;
                        }
                        let rank = which % model.len();
                        prop_assert_eq!(tree.remove_at(rank).unwrap(), model.remove(rank));
                    }
                    Operation::Split(which) => {
                        // Split and glue back together.
                        let rank = which % (model.len() + 1);
                        let mut upper = tree.split_off(rank).unwrap();
                        prop_assert!(tree.check_invariants());
                        prop_assert!(upper.check_invariants());
                        tree.append(&mut upper).unwrap();
                    }
                }

                prop_assert!(tree.check_invariants());
                prop_assert_eq!(contents(&tree), model.clone());
            }
        }
    }
}
