mod arena;
mod handle;
mod node;
mod raw_omtree;
mod size;

pub(crate) use handle::Handle;
pub(crate) use raw_omtree::{RawOMTree, Stack};
