//! Package implement an in-memory, ordered index using [AVL] tree.
//!
//! Keys are unique and totally ordered, values are opaque. The index
//! support point lookup, ordered insertion, range scan and two flavours
//! of deletion:
//!
//! * [avl::Index::remove] physically detach the entry and re-balance the
//!   tree right away.
//! * [avl::Index::delete] only mark entries as deleted, a.k.a tombstones,
//!   without touching the tree shape. Tombstones are purged in batch by
//!   [avl::Index::compact], which re-builds the tree from live entries.
//!
//! All operations are serialized by a single reader-writer lock per index,
//! readers can proceed concurrently, writers are exclusive. Batch
//! operations like [avl::Index::set_many] acquire the lock once per key,
//! hence the batch as a whole is not atomic.
//!
//! Index can be snapshotted into, and restored from, a JSON node-graph
//! or a CBOR binary image, refer to [snapshot] module.
//!
//! [AVL]: https://en.wikipedia.org/wiki/AVL_tree

#[macro_use]
mod error;

mod config;
mod util;

pub mod avl;
pub mod snapshot;

pub use crate::config::Config;
pub use crate::error::{Error, Result};
