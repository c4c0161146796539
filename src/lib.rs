//! An order-maintenance tree for Rust.
//!
//! This crate provides [`OMTree`], a sequence of values addressed by rank that
//! supports insertion and deletion anywhere in O(log n):
//!
//! - [`insert_at`](OMTree::insert_at) / [`delete_at`](OMTree::delete_at) - Positional mutation that shifts later ranks
//! - [`find_zero`](OMTree::find_zero) / [`find`](OMTree::find) - Search with a caller-supplied monotone predicate
//! - [`split_at`](OMTree::split_at) / [`merge`](OMTree::merge) - Cut and join sequences without copying values
//! - [`steal_sorted_array`](OMTree::steal_sorted_array) - Bulk load that takes over the caller's buffer
//!
//! # Example
//!
//! ```
//! use omtree::{Direction, Error, OMTree};
//!
//! let mut tree = OMTree::from_sorted_slice(&[10, 20, 30]).unwrap();
//!
//! // Positional access
//! tree.insert_at(15, 1).unwrap();
//! assert_eq!(tree.fetch(1), Ok(&15));
//!
//! // The tree never compares values: order is described by a predicate
//! assert_eq!(tree.find_zero(|v| v.cmp(&20)), Ok((2, &20)));
//! assert_eq!(tree.find_zero(|v| v.cmp(&25)), Err(Error::NotFound { rank: 3 }));
//! assert_eq!(tree.find(|v| v.cmp(&20), Direction::Successor), Ok((3, &30)));
//!
//! // Split and merge
//! let upper = tree.split_at(2).unwrap();
//! assert_eq!(upper.iter().copied().collect::<Vec<_>>(), [20, 30]);
//! let tree = OMTree::merge(tree, upper).unwrap();
//! assert_eq!(tree.len(), 4);
//! ```
//!
//! # Features
//!
//! - **`no_std` compatible** - Only requires `alloc`, no standard library dependency
//! - **All-or-nothing** - A failed operation, allocation failure included, leaves the tree untouched
//! - **Stale-safe cursors** - [`Cursor`]s detect any later mutation of their tree
//!
//! # Implementation
//!
//! The tree is weight balanced, with parameters ⟨3, 2⟩. Each node caches its
//! subtree size, from which ranks are derived on the way down. Nodes live in an
//! arena and point at their values in a separate dense array, which is what
//! lets [`OMTree::steal_sorted_array`] adopt a caller's `Vec` as is.

#![no_std]
// These forbid rules and lint groups are meant to be very restrictive.
#![forbid(unsafe_code)]
#![forbid(keyword_idents)]
#![forbid(non_ascii_idents)]
#![forbid(unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::pedantic)]
// Enable coverage attributes for nightly builds.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

extern crate alloc;

mod cursor;
mod error;
mod raw;

pub mod omtree;

pub use cursor::Cursor;
pub use error::{Error, MergeError, Result, StealError};
pub use omtree::{Direction, Iter, OMTree};
