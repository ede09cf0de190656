//! Module implement snapshot formats for [Index].
//!
//! Two formats are supported:
//!
//! * [graph], a JSON node-graph where every node is given an opaque id,
//!   and parent, previous (lower) and next (higher) links refer to other
//!   nodes by that id.
//! * [binary], a CBOR image of nodes in pre-order, child links refer to
//!   other nodes by position and parent links are not encoded. They are
//!   derived from child links on load.
//!
//! Restoring from either format validates the decoded tree, including
//! sort order, balance and tombstone count, before handing it out. A
//! malformed snapshot is reported as [Error::DecodeFail] and nothing is
//! populated.
//!
//! [Index]: crate::avl::Index
//! [Error::DecodeFail]: crate::Error::DecodeFail

use log::warn;

use std::{collections::HashMap, fmt};

use crate::{
    avl::{Arena, Node, NodeId, Tree},
    Error, Result,
};

pub mod binary;
pub mod graph;

// Flattened view of a node, links are positions in pre-order.
pub(crate) struct Flat<'a, K, V> {
    pub key: &'a K,
    pub value: &'a V,
    pub deleted: bool,
    pub parent: Option<usize>,
    pub lower: Option<usize>,
    pub higher: Option<usize>,
}

// Decoded node, links are positions into the decoded list.
pub(crate) struct Entry<K, V> {
    pub key: K,
    pub value: V,
    pub deleted: bool,
    pub lower: Option<usize>,
    pub higher: Option<usize>,
}

/// Flatten the tree in pre-order, root at position 0.
pub(crate) fn flatten<K, V>(tree: &Tree<K, V>) -> Vec<Flat<K, V>> {
    let arena = tree.as_arena();

    let mut order: Vec<NodeId> = Vec::with_capacity(arena.len());
    let mut stack: Vec<NodeId> = tree.as_root().into_iter().collect();
    while let Some(id) = stack.pop() {
        order.push(id);
        let node = &arena[id];
        stack.extend(node.higher);
        stack.extend(node.lower);
    }

    let positions: HashMap<NodeId, usize> =
        order.iter().enumerate().map(|(pos, id)| (*id, pos)).collect();
    let position = |id: Option<NodeId>| id.and_then(|id| positions.get(&id).copied());

    order
        .into_iter()
        .map(|id| {
            let node = &arena[id];
            Flat {
                key: node.as_key(),
                value: node.as_value(),
                deleted: node.is_deleted(),
                parent: position(node.parent),
                lower: position(node.lower),
                higher: position(node.higher),
            }
        })
        .collect()
}

/// Re-build a tree from decoded entries. Return the tree along with the
/// node handle allocated for each entry, in the same order as `entries`.
pub(crate) fn build<K, V>(
    entries: Vec<Entry<K, V>>,
    root: Option<usize>,
    n_deleted: usize,
    max_depth: usize,
) -> Result<(Tree<K, V>, Vec<NodeId>)>
where
    K: Ord + fmt::Debug,
{
    check_links(&entries, root)?;

    let mut arena = Arena::with_capacity(entries.len());
    let mut links = Vec::with_capacity(entries.len());
    let mut ids = Vec::with_capacity(entries.len());
    for entry in entries.into_iter() {
        let mut node = Node::new(entry.key, entry.value, None);
        if entry.deleted {
            node.set_deleted()
        }
        ids.push(arena.insert(node));
        links.push((entry.lower, entry.higher));
    }
    for (pos, (lower, higher)) in links.into_iter().enumerate() {
        let node = &mut arena[ids[pos]];
        node.lower = lower.map(|p| ids[p]);
        node.higher = higher.map(|p| ids[p]);
    }

    let mut tree = Tree::from_parts(arena, root.map(|p| ids[p]), n_deleted);
    tree.relink();
    match tree.validate(max_depth) {
        Ok(_) => Ok((tree, ids)),
        Err(Error::Fatal(_, msg)) => fail(msg),
        Err(err) => Err(err),
    }
}

// Child links shall form a single tree rooted at `root`, covering every
// entry exactly once.
fn check_links<K, V>(entries: &[Entry<K, V>], root: Option<usize>) -> Result<()> {
    let n = entries.len();
    let root = match root {
        None if n == 0 => return Ok(()),
        None => return fail(format!("missing root for {} nodes", n)),
        Some(root) if root >= n => return fail(format!("dangling root {}", root)),
        Some(root) => root,
    };

    let mut visited = vec![false; n];
    let mut stack = vec![root];
    let mut n_reached = 0;
    while let Some(pos) = stack.pop() {
        if visited[pos] {
            return fail(format!("node {} is linked more than once", pos));
        }
        visited[pos] = true;
        n_reached += 1;

        let entry = &entries[pos];
        for child in entry.lower.into_iter().chain(entry.higher.into_iter()) {
            if child >= n {
                return fail(format!("dangling link {} -> {}", pos, child));
            }
            stack.push(child);
        }
    }

    match n_reached {
        n_reached if n_reached == n => Ok(()),
        n_reached => fail(format!("{} of {} nodes unreachable", n - n_reached, n)),
    }
}

pub(crate) fn fail<T>(msg: String) -> Result<T> {
    warn!(target: "avlidx", "snapshot decode failed, {}", msg);
    err_at!(DecodeFail, msg: "{}", msg)
}
