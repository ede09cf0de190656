//! Module implement [AVL] tree, a height balanced binary search tree,
//! along with a thread-safe [Index] wrapper around it.
//!
//! [AVL]: https://en.wikipedia.org/wiki/AVL_tree

mod arena;
mod depth;
mod index;
mod node;
mod stats;
mod tree;

pub use depth::Depth;
pub use index::Index;
pub use stats::Stats;
pub use tree::{Iter, Range, Tree, Upsert};

pub(crate) use arena::{Arena, NodeId};
pub(crate) use node::Node;

#[cfg(test)]
mod proptests;
