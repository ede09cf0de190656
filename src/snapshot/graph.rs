//! JSON node-graph format.
//!
//! ```json
//! {
//!   "root": 0,
//!   "n_deleted": 1,
//!   "nodes": [
//!     { "id": 0, "key": 2, "value": "b", "deleted": false, "previous": 1, "next": 2 },
//!     { "id": 1, "key": 1, "value": "a", "deleted": true, "parent": 0 },
//!     { "id": 2, "key": 3, "value": "c", "deleted": false, "parent": 0 }
//!   ]
//! }
//! ```
//!
//! Ids are assigned in pre-order while encoding, but decoding treat them
//! as opaque integers. Absent links are omitted. Parent links are
//! optional on decode; when present they must agree with child links.

use log::info;
use serde::{Deserialize, Serialize};

use std::{collections::HashMap, fmt};

use crate::{
    avl::{Index, Tree},
    snapshot::{self, Entry},
    Config, Result,
};

#[derive(Serialize, Deserialize)]
struct Graph<K, V> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    root: Option<u64>,
    #[serde(default)]
    n_deleted: usize,
    nodes: Vec<GraphNode<K, V>>,
}

#[derive(Serialize, Deserialize)]
struct GraphNode<K, V> {
    id: u64,
    key: K,
    value: V,
    #[serde(default)]
    deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    previous: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    next: Option<u64>,
}

/// Encode `index` into JSON node-graph, under read lock.
pub fn encode<K, V>(index: &Index<K, V>) -> Result<String>
where
    K: Serialize,
    V: Serialize,
{
    let tree = index.read();
    let to_id = |pos: Option<usize>| pos.map(|pos| pos as u64);

    let nodes: Vec<GraphNode<&K, &V>> = snapshot::flatten(&*tree)
        .into_iter()
        .enumerate()
        .map(|(pos, flat)| GraphNode {
            id: pos as u64,
            key: flat.key,
            value: flat.value,
            deleted: flat.deleted,
            parent: to_id(flat.parent),
            previous: to_id(flat.lower),
            next: to_id(flat.higher),
        })
        .collect();
    let graph = Graph {
        root: if nodes.is_empty() { None } else { Some(0) },
        n_deleted: tree.deleted_count(),
        nodes,
    };

    err_at!(FailJson, serde_json::to_string(&graph))
}

/// Decode JSON node-graph into a new [Index] configured with `config`.
pub fn decode<K, V>(config: Config, text: &str) -> Result<Index<K, V>>
where
    K: Ord + fmt::Debug + for<'de> Deserialize<'de>,
    V: for<'de> Deserialize<'de>,
{
    config.check()?;
    let tree = decode_tree(text, config.max_depth)?;
    info!(
        target: "avlidx",
        "{:?}, restored {} entries from node-graph", config.name, tree.len()
    );
    Ok(Index::from_tree(config, tree))
}

/// Replace the contents of `index` with the decoded node-graph. On error
/// `index` is left untouched.
pub fn restore<K, V>(index: &Index<K, V>, text: &str) -> Result<()>
where
    K: Ord + fmt::Debug + for<'de> Deserialize<'de>,
    V: for<'de> Deserialize<'de>,
{
    let config = index.to_config();
    let tree = decode_tree(text, config.max_depth)?;
    let n = tree.len();
    index.swap(tree);
    info!(target: "avlidx", "{:?}, restored {} entries from node-graph", config.name, n);
    Ok(())
}

fn decode_tree<K, V>(text: &str, max_depth: usize) -> Result<Tree<K, V>>
where
    K: Ord + fmt::Debug + for<'de> Deserialize<'de>,
    V: for<'de> Deserialize<'de>,
{
    let graph: Graph<K, V> = match serde_json::from_str(text) {
        Ok(graph) => graph,
        Err(err) => return snapshot::fail(format!("node-graph {}", err)),
    };

    let mut positions: HashMap<u64, usize> = HashMap::with_capacity(graph.nodes.len());
    for (pos, node) in graph.nodes.iter().enumerate() {
        if positions.insert(node.id, pos).is_some() {
            return snapshot::fail(format!("duplicate id {}", node.id));
        }
    }
    let to_pos = |id: Option<u64>| -> Result<Option<usize>> {
        match id {
            Some(id) => match positions.get(&id) {
                Some(pos) => Ok(Some(*pos)),
                None => snapshot::fail(format!("dangling id {}", id)),
            },
            None => Ok(None),
        }
    };

    let root = to_pos(graph.root)?;
    let mut parents = Vec::with_capacity(graph.nodes.len());
    let mut entries = Vec::with_capacity(graph.nodes.len());
    for node in graph.nodes.into_iter() {
        parents.push(node.parent.map(|id| (id, to_pos(Some(id)))));
        entries.push(Entry {
            key: node.key,
            value: node.value,
            deleted: node.deleted,
            lower: to_pos(node.previous)?,
            higher: to_pos(node.next)?,
        });
    }

    let (tree, ids) = snapshot::build(entries, root, graph.n_deleted, max_depth)?;

    // parent links are derived from child links, confirm the given ones.
    let arena = tree.as_arena();
    for (pos, parent) in parents.into_iter().enumerate() {
        if let Some((id, given)) = parent {
            let given = given?.map(|p| ids[p]);
            if arena[ids[pos]].parent != given {
                return snapshot::fail(format!("parent {} mismatch at node {}", id, pos));
            }
        }
    }

    Ok(tree)
}

#[cfg(test)]
#[path = "graph_test.rs"]
mod graph_test;
