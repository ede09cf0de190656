use std::mem;

use crate::avl::NodeId;

// Node corresponds to a single entry in the AVL tree.
pub struct Node<K, V> {
    pub key: K,
    pub value: V,
    pub lower: Option<NodeId>,  // store: keys less than this node
    pub higher: Option<NodeId>, // store: keys greater than this node
    pub parent: Option<NodeId>, // non-owning, none for root
    pub height: usize,          // height of sub-tree rooted here, leaf is 1
    pub deleted: bool,          // tombstone
}

impl<K, V> Node<K, V> {
    pub fn new(key: K, value: V, parent: Option<NodeId>) -> Node<K, V> {
        Node {
            key,
            value,
            lower: None,
            higher: None,
            parent,
            height: 1,
            deleted: false,
        }
    }

    /// Replace value, return the old value.
    pub fn set(&mut self, value: V) -> V {
        mem::replace(&mut self.value, value)
    }

    #[inline]
    pub fn set_deleted(&mut self) {
        self.deleted = true
    }

    #[inline]
    pub fn set_live(&mut self) {
        self.deleted = false
    }

    #[inline]
    pub fn as_key(&self) -> &K {
        &self.key
    }

    #[inline]
    pub fn as_value(&self) -> &V {
        &self.value
    }

    #[inline]
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.lower.is_none() && self.higher.is_none()
    }

    pub fn into_entry(self) -> (K, V) {
        (self.key, self.value)
    }
}

#[cfg(test)]
#[path = "node_test.rs"]
mod node_test;
