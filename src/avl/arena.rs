use slab::Slab;

use std::ops;

use crate::avl::Node;

/// Handle to a node held in [Arena].
///
/// Child links are owning handles, parent links are plain handles. Handles
/// stay valid across mutations to other slots, and a freed slot can be
/// reused by a later insert.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct NodeId(usize);

/// Arena storage for tree nodes. Rotations and splices become handle
/// re-assignments, there is no reference cycle between a node and its
/// parent.
pub(crate) struct Arena<K, V> {
    nodes: Slab<Node<K, V>>,
}

impl<K, V> Arena<K, V> {
    pub fn new() -> Arena<K, V> {
        Arena { nodes: Slab::new() }
    }

    pub fn with_capacity(capacity: usize) -> Arena<K, V> {
        Arena {
            nodes: Slab::with_capacity(capacity),
        }
    }

    /// Number of nodes currently held, live and deleted.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn insert(&mut self, node: Node<K, V>) -> NodeId {
        NodeId(self.nodes.insert(node))
    }

    /// Remove node from arena, panics if `id` is not occupied.
    pub fn remove(&mut self, id: NodeId) -> Node<K, V> {
        self.nodes.remove(id.0)
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&Node<K, V>> {
        self.nodes.get(id.0)
    }
}

impl<K, V> ops::Index<NodeId> for Arena<K, V> {
    type Output = Node<K, V>;

    #[inline]
    fn index(&self, id: NodeId) -> &Node<K, V> {
        &self.nodes[id.0]
    }
}

impl<K, V> ops::IndexMut<NodeId> for Arena<K, V> {
    #[inline]
    fn index_mut(&mut self, id: NodeId) -> &mut Node<K, V> {
        &mut self.nodes[id.0]
    }
}
