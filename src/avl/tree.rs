// Module ``tree`` implement the balancing engine for [AVL] tree.
//
// Nodes are held in an arena and linked by handles. Every node carry
// a handle to its parent, so that re-balancing can walk upward from the
// point of mutation without recursion, and the cached height of its
// sub-tree, so that balance factor is computed in constant time.
//
// Two flavours of deletion are supported:
//
// * remove(), physically detach the node and re-balance right away.
// * delete(), mark nodes as tombstones without touching the tree shape.
//   Tombstones are purged in batch by compact().
//
// [AVL]: https://en.wikipedia.org/wiki/AVL_tree

use std::{
    borrow::Borrow,
    cmp::Ordering,
    collections::VecDeque,
    fmt, marker, mem,
    ops::{Bound, RangeBounds},
};

use crate::{
    avl::{Arena, Depth, Node, NodeId},
    config::MAX_DEPTH_LIMIT,
    Result,
};

/// Outcome of [Tree::set] operation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Upsert<V> {
    /// Key was not present, a new node is created.
    Insert,
    /// Key was present and live, carry the old value.
    Update(V),
    /// Key was present as tombstone, it is now live again with the new
    /// value. Carry the old value.
    Resurrect(V),
}

impl<V> Upsert<V> {
    pub fn is_insert(&self) -> bool {
        matches!(self, Upsert::Insert)
    }

    /// Return the value that was replaced, if any.
    pub fn into_old(self) -> Option<V> {
        match self {
            Upsert::Insert => None,
            Upsert::Update(old) | Upsert::Resurrect(old) => Some(old),
        }
    }
}

/// Single threaded AVL tree. Use [Index] for concurrent access.
///
/// [Index]: crate::avl::Index
pub struct Tree<K, V> {
    arena: Arena<K, V>,
    root: Option<NodeId>,
    n_deleted: usize,
}

impl<K, V> Default for Tree<K, V> {
    fn default() -> Tree<K, V> {
        Tree::new()
    }
}

impl<K, V> Tree<K, V> {
    pub fn new() -> Tree<K, V> {
        Tree {
            arena: Arena::new(),
            root: None,
            n_deleted: 0,
        }
    }

    // Tree is assembled from snapshot, relink() and validate() must follow.
    pub(crate) fn from_parts(
        arena: Arena<K, V>,
        root: Option<NodeId>,
        n_deleted: usize,
    ) -> Tree<K, V> {
        Tree {
            arena,
            root,
            n_deleted,
        }
    }

    /// Return number of live entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.arena.len() - self.n_deleted
    }

    /// Return whether there are no live entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return number of nodes in the tree, including tombstones.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    /// Return number of tombstones waiting for compaction.
    #[inline]
    pub fn deleted_count(&self) -> usize {
        self.n_deleted
    }

    /// Return the number of levels in the tree, zero for empty tree.
    #[inline]
    pub fn depth(&self) -> usize {
        self.height(self.root)
    }

    /// Return whether there are tombstones in the tree.
    #[inline]
    pub fn needs_compaction(&self) -> bool {
        self.n_deleted > 0
    }

    /// Return key held by the root node, live or deleted.
    pub fn root_key(&self) -> Option<&K> {
        self.root.map(|id| self.arena[id].as_key())
    }

    pub(crate) fn as_root(&self) -> Option<NodeId> {
        self.root
    }

    pub(crate) fn as_arena(&self) -> &Arena<K, V> {
        &self.arena
    }

    /// Full table scan, in sort order, skipping tombstones.
    pub fn iter(&self) -> Iter<K, V> {
        let mut paths = Vec::default();
        build_iter(self, self.root, &mut paths);
        Iter { tree: self, paths }
    }

    /// Return live entries that are exactly `depth` levels from the root,
    /// root being at level 1, in sort order. With `depth` as ZERO return
    /// all live entries.
    pub fn traverse(&self, depth: usize) -> Vec<(&K, &V)> {
        match depth {
            0 => self.iter().collect(),
            depth => {
                let mut items = vec![];
                self.do_traverse(self.root, 1, depth, &mut items);
                items
            }
        }
    }

    fn do_traverse<'a>(
        &'a self,
        node: Option<NodeId>,
        level: usize,
        depth: usize,
        items: &mut Vec<(&'a K, &'a V)>,
    ) {
        if let Some(id) = node {
            let node = &self.arena[id];
            if level == depth {
                if !node.is_deleted() {
                    items.push((node.as_key(), node.as_value()))
                }
            } else {
                self.do_traverse(node.lower, level + 1, depth, items);
                self.do_traverse(node.higher, level + 1, depth, items);
            }
        }
    }

    // Node handles, breadth first from the root.
    pub(crate) fn level_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.arena.len());
        let mut queue: VecDeque<NodeId> = self.root.into_iter().collect();
        while let Some(id) = queue.pop_front() {
            order.push(id);
            let node = &self.arena[id];
            queue.extend(node.lower);
            queue.extend(node.higher);
        }
        order
    }

    // Re-derive parent links and cached heights from child links. Caller
    // shall make sure that child links form a tree.
    pub(crate) fn relink(&mut self) {
        let order = self.level_order();
        for &id in order.iter() {
            let (lower, higher) = (self.arena[id].lower, self.arena[id].higher);
            for child in lower.into_iter().chain(higher.into_iter()) {
                self.arena[child].parent = Some(id);
            }
        }
        if let Some(root) = self.root {
            self.arena[root].parent = None;
        }
        for &id in order.iter().rev() {
            self.update_height(id);
        }
    }
}

impl<K, V> Tree<K, V> {
    /// Get value for `key`, tombstones are treated as missing.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let id = self.find(key)?;
        let node = &self.arena[id];
        match node.is_deleted() {
            true => None,
            false => Some(node.as_value()),
        }
    }

    /// Iterate over live entries within `from` and `to`. Bounds are
    /// included if `inclusive` is true. `from` beyond `to` yields nothing.
    #[allow(clippy::type_complexity)]
    pub fn range<'a, 'b, Q>(
        &'a self,
        from: &'b Q,
        to: &'b Q,
        inclusive: bool,
    ) -> Range<'a, K, V, (Bound<&'b Q>, Bound<&'b Q>), Q>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let range = match inclusive {
            true => (Bound::Included(from), Bound::Included(to)),
            false => (Bound::Excluded(from), Bound::Excluded(to)),
        };
        self.range_by(range)
    }

    /// Iterate over live entries within the specified `range`.
    pub fn range_by<R, Q>(&self, range: R) -> Range<K, V, R, Q>
    where
        K: Borrow<Q>,
        R: RangeBounds<Q>,
        Q: Ord + ?Sized,
    {
        let mut paths = Vec::default();
        match range.start_bound() {
            Bound::Unbounded => build_iter(self, self.root, &mut paths),
            Bound::Included(low) => find_start(self, self.root, low, true, &mut paths),
            Bound::Excluded(low) => find_start(self, self.root, low, false, &mut paths),
        };
        let iter = Iter { tree: self, paths };

        Range {
            range,
            iter,
            fin: false,
            high: marker::PhantomData,
        }
    }

    fn find<Q>(&self, key: &Q) -> Option<NodeId>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut cursor = self.root;
        while let Some(id) = cursor {
            let node = &self.arena[id];
            cursor = match node.as_key().borrow().cmp(key) {
                Ordering::Less => node.higher,
                Ordering::Greater => node.lower,
                Ordering::Equal => return Some(id),
            };
        }
        None
    }
}

impl<K, V> Tree<K, V>
where
    K: Ord,
{
    /// Set `key`, `value` into the tree. If key is already present, live
    /// or deleted, its value is replaced in place.
    pub fn set(&mut self, key: K, value: V) -> Upsert<V> {
        let mut parent: Option<(NodeId, Ordering)> = None;
        let mut cursor = self.root;
        while let Some(id) = cursor {
            let node = &mut self.arena[id];
            let cmp = key.cmp(node.as_key());
            cursor = match cmp {
                Ordering::Less => node.lower,
                Ordering::Greater => node.higher,
                Ordering::Equal if node.is_deleted() => {
                    let old = node.set(value);
                    node.set_live();
                    self.n_deleted -= 1;
                    return Upsert::Resurrect(old);
                }
                Ordering::Equal => return Upsert::Update(node.set(value)),
            };
            parent = Some((id, cmp));
        }

        let pid = parent.map(|(pid, _)| pid);
        let id = self.arena.insert(Node::new(key, value, pid));
        match parent {
            None => self.root = Some(id),
            Some((pid, Ordering::Less)) => self.arena[pid].lower = Some(id),
            Some((pid, _)) => self.arena[pid].higher = Some(id),
        }
        self.rebalance(pid);

        Upsert::Insert
    }

    /// Physically remove the entry for `key` and re-balance the tree.
    /// Return the removed value. Removing a tombstone reclaims its node,
    /// but returns None, as the key was already logically absent.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let id = self.find(key)?;
        let (lower, higher, parent) = {
            let node = &self.arena[id];
            (node.lower, node.higher, node.parent)
        };

        let from = match (lower, higher) {
            (None, None) => {
                self.replace_child(parent, id, None);
                parent
            }
            (Some(child), None) | (None, Some(child)) => {
                self.replace_child(parent, id, Some(child));
                self.arena[child].parent = parent;
                parent
            }
            (Some(lower), Some(higher)) => Some(self.promote(id, lower, higher)),
        };

        let node = self.arena.remove(id);
        self.rebalance(from);

        match node.is_deleted() {
            true => {
                self.n_deleted -= 1;
                None
            }
            false => Some(node.value),
        }
    }

    /// Mark entries for `keys` as deleted. If any of the key is missing,
    /// nothing is marked and false is returned. Keys that are already
    /// deleted are left as is.
    pub fn delete<'k, Q, I>(&mut self, keys: I) -> bool
    where
        K: Borrow<Q>,
        Q: 'k + Ord + ?Sized,
        I: IntoIterator<Item = &'k Q>,
    {
        let mut ids = vec![];
        for key in keys {
            match self.find(key) {
                Some(id) => ids.push(id),
                None => return false,
            }
        }

        for id in ids.into_iter() {
            let node = &mut self.arena[id];
            if !node.is_deleted() {
                node.set_deleted();
                self.n_deleted += 1;
            }
        }
        true
    }

    /// Purge tombstones by re-building the tree from live entries, picked
    /// in level order. Return false if there are no tombstones.
    pub fn compact(&mut self) -> bool {
        if self.n_deleted == 0 {
            return false;
        }

        let mut old = mem::take(self);
        self.arena = Arena::with_capacity(old.len());
        for id in old.level_order().into_iter() {
            let node = old.arena.remove(id);
            if !node.is_deleted() {
                let (key, value) = node.into_entry();
                self.set(key, value);
            }
        }
        true
    }
}

impl<K, V> Tree<K, V> {
    #[inline]
    fn height(&self, node: Option<NodeId>) -> usize {
        node.map_or(0, |id| self.arena[id].height)
    }

    // Difference between the height of higher sub-tree and lower sub-tree.
    #[inline]
    fn balance_factor(&self, id: NodeId) -> isize {
        let node = &self.arena[id];
        (self.height(node.higher) as isize) - (self.height(node.lower) as isize)
    }

    #[inline]
    fn update_height(&mut self, id: NodeId) {
        let height = {
            let node = &self.arena[id];
            1 + usize::max(self.height(node.lower), self.height(node.higher))
        };
        self.arena[id].height = height;
    }

    // Point `parent`'s link from `old` to `new`, or the root if there is
    // no parent. Does not touch `new`'s parent link.
    fn replace_child(&mut self, parent: Option<NodeId>, old: NodeId, new: Option<NodeId>) {
        match parent {
            None => self.root = new,
            Some(pid) => {
                let parent = &mut self.arena[pid];
                if parent.lower == Some(old) {
                    parent.lower = new
                } else {
                    parent.higher = new
                }
            }
        }
    }

    // Walk up from `node` to the root, refreshing heights and rotating
    // where the balance factor goes beyond [-1, 1].
    fn rebalance(&mut self, mut node: Option<NodeId>) {
        while let Some(id) = node {
            self.update_height(id);
            let top = match self.balance_factor(id) {
                bf if bf > 1 => {
                    if let Some(higher) = self.arena[id].higher {
                        if self.balance_factor(higher) < 0 {
                            self.rotate_right(higher);
                        }
                    }
                    self.rotate_left(id)
                }
                bf if bf < -1 => {
                    if let Some(lower) = self.arena[id].lower {
                        if self.balance_factor(lower) > 0 {
                            self.rotate_left(lower);
                        }
                    }
                    self.rotate_right(id)
                }
                _ => id,
            };
            node = self.arena[top].parent;
        }
    }

    //              (p)                       (p)
    //               |                         |
    //              node                     pivot
    //              /  \                      / \
    //             /    \                    /   \
    //          lower   pivot             node   p-h
    //                   / \              /  \
    //                p-l  p-h        lower  p-l
    //
    fn rotate_left(&mut self, id: NodeId) -> NodeId {
        let pivot = match self.arena[id].higher {
            Some(pivot) => pivot,
            None => return id,
        };
        let parent = self.arena[id].parent;
        let inner = self.arena[pivot].lower;

        self.arena[id].higher = inner;
        if let Some(inner) = inner {
            self.arena[inner].parent = Some(id);
        }
        self.replace_child(parent, id, Some(pivot));
        self.arena[pivot].parent = parent;
        self.arena[pivot].lower = Some(id);
        self.arena[id].parent = Some(pivot);

        self.update_height(id);
        self.update_height(pivot);
        pivot
    }

    //              (p)                       (p)
    //               |                         |
    //              node                     pivot
    //              /  \                      / \
    //             /    \                    /   \
    //          pivot  higher              p-l   node
    //           / \                             /  \
    //         p-l p-h                         p-h  higher
    //
    fn rotate_right(&mut self, id: NodeId) -> NodeId {
        let pivot = match self.arena[id].lower {
            Some(pivot) => pivot,
            None => return id,
        };
        let parent = self.arena[id].parent;
        let inner = self.arena[pivot].higher;

        self.arena[id].lower = inner;
        if let Some(inner) = inner {
            self.arena[inner].parent = Some(id);
        }
        self.replace_child(parent, id, Some(pivot));
        self.arena[pivot].parent = parent;
        self.arena[pivot].higher = Some(id);
        self.arena[id].parent = Some(pivot);

        self.update_height(id);
        self.update_height(pivot);
        pivot
    }

    // Replace `id`, that has both children, with its in-order neighbour
    // picked from the deeper side, predecessor on a tie. Return the node
    // from where re-balancing shall start.
    fn promote(&mut self, id: NodeId, lower: NodeId, higher: NodeId) -> NodeId {
        let parent = self.arena[id].parent;
        let from_lower = self.height(Some(lower)) >= self.height(Some(higher));
        let sub = match from_lower {
            true => self.max_of(lower),
            false => self.min_of(higher),
        };

        let from = match self.arena[sub].parent {
            // neighbour is a direct child, it keeps its outer sub-tree
            // and adopts the other one.
            Some(sp) if sp == id => {
                match from_lower {
                    true => self.arena[sub].higher = Some(higher),
                    false => self.arena[sub].lower = Some(lower),
                }
                let other = if from_lower { higher } else { lower };
                self.arena[other].parent = Some(sub);
                sub
            }
            sub_parent => {
                let inner = match from_lower {
                    true => self.arena[sub].lower,
                    false => self.arena[sub].higher,
                };
                self.replace_child(sub_parent, sub, inner);
                if let Some(inner) = inner {
                    self.arena[inner].parent = sub_parent;
                }

                self.arena[sub].lower = Some(lower);
                self.arena[sub].higher = Some(higher);
                self.arena[lower].parent = Some(sub);
                self.arena[higher].parent = Some(sub);
                sub_parent.unwrap_or(sub)
            }
        };

        self.arena[sub].parent = parent;
        self.replace_child(parent, id, Some(sub));

        from
    }

    fn max_of(&self, mut id: NodeId) -> NodeId {
        while let Some(higher) = self.arena[id].higher {
            id = higher
        }
        id
    }

    fn min_of(&self, mut id: NodeId) -> NodeId {
        while let Some(lower) = self.arena[id].lower {
            id = lower
        }
        id
    }
}

// Minimum number of nodes in an AVL tree of `height`.
fn min_nodes(height: usize) -> usize {
    let (mut a, mut b) = (0_usize, 1_usize);
    for _ in 0..height {
        let c = a.saturating_add(b).saturating_add(1);
        a = b;
        b = c;
    }
    a
}

impl<K, V> Tree<K, V>
where
    K: Ord + fmt::Debug,
{
    /// Validate AVL tree with following rules:
    ///
    /// * Verify the sort order between a node and all its descendants.
    /// * Balance factor of every node is within [-1, 1].
    /// * Cached height of every node is accurate.
    /// * Parent link of every node point back to the node referring it.
    /// * Number of tombstones match the compaction counter.
    /// * Every node in the arena is reachable from root.
    /// * Tree height is within the AVL bound and within `max_depth`.
    /// * Leaf-nodes are spread within the AVL bound, refer [Depth::check].
    ///
    /// `max_depth` shall not exceed `MAX_DEPTH_LIMIT`. Return the tree shape.
    pub fn validate(&self, max_depth: usize) -> Result<Depth> {
        if max_depth > MAX_DEPTH_LIMIT {
            err_at!(Fatal, msg: "max_depth {} beyond {}", max_depth, MAX_DEPTH_LIMIT)?;
        }

        let mut depths = Depth::default();
        let bounds = (None, None);
        let (height, n_deleted, n_count) =
            self.validate_tree(self.root, None, 1, bounds, max_depth, &mut depths)?;

        if n_deleted != self.n_deleted {
            err_at!(Fatal, msg: "n_deleted {} != {}", n_deleted, self.n_deleted)?;
        }
        if n_count != self.arena.len() {
            err_at!(Fatal, msg: "n_count {} != {}", n_count, self.arena.len())?;
        }
        if n_count < min_nodes(height) {
            err_at!(Fatal, msg: "height {} too tall for {} nodes", height, n_count)?;
        }
        depths.check()?;

        Ok(depths)
    }

    #[allow(clippy::type_complexity)]
    fn validate_tree(
        &self,
        node: Option<NodeId>,
        parent: Option<NodeId>,
        depth: usize,
        (low, high): (Option<&K>, Option<&K>),
        max_depth: usize,
        depths: &mut Depth,
    ) -> Result<(usize, usize, usize)> {
        let id = match node {
            Some(id) => id,
            None => return Ok((0, 0, 0)),
        };
        let node = match self.arena.get(id) {
            Some(node) => node,
            None => err_at!(Fatal, msg: "dangling node {:?}", id)?,
        };

        if depth > max_depth {
            err_at!(Fatal, msg: "tree exceeds max_depth {}", max_depth)?;
        }
        if node.parent != parent {
            let key = node.as_key();
            err_at!(Fatal, msg: "parent {:?} != {:?} at {:?}", node.parent, parent, key)?;
        }

        // confirm sort order in the tree.
        match low {
            Some(low) if node.as_key().le(low) => {
                let (lk, nk) = (low, node.as_key());
                err_at!(Fatal, msg: "sort order lower:{:?}, node:{:?}", lk, nk)?
            }
            _ => (),
        }
        match high {
            Some(high) if node.as_key().ge(high) => {
                let (hk, nk) = (high, node.as_key());
                err_at!(Fatal, msg: "sort order higher:{:?}, node:{:?}", hk, nk)?
            }
            _ => (),
        }

        depths.sample(depth, node.is_leaf());

        let key = Some(node.as_key());
        let (lh, ld, lc) =
            self.validate_tree(node.lower, Some(id), depth + 1, (low, key), max_depth, depths)?;
        let (hh, hd, hc) =
            self.validate_tree(node.higher, Some(id), depth + 1, (key, high), max_depth, depths)?;

        if (hh as isize - lh as isize).abs() > 1 {
            let key = node.as_key();
            err_at!(Fatal, msg: "unbalanced at {:?} lower:{}, higher:{}", key, lh, hh)?;
        }
        let height = 1 + usize::max(lh, hh);
        if node.height != height {
            let key = node.as_key();
            err_at!(Fatal, msg: "height at {:?} {} != {}", key, node.height, height)?;
        }

        let n_deleted = ld + hd + if node.is_deleted() { 1 } else { 0 };

        Ok((height, n_deleted, lc + hc + 1))
    }
}

/// Iterator type, to do full table scan in sort order.
pub struct Iter<'a, K, V> {
    tree: &'a Tree<K, V>,
    paths: Vec<Fragment>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let tree: &'a Tree<K, V> = self.tree;
        loop {
            let path = self.paths.last_mut()?;
            match path.flag {
                IFlag::Left => {
                    path.flag = IFlag::Center;
                    let node = &tree.arena[path.id];
                    if !node.is_deleted() {
                        break Some((node.as_key(), node.as_value()));
                    }
                }
                IFlag::Center => {
                    path.flag = IFlag::Right;
                    let higher = tree.arena[path.id].higher;
                    build_iter(tree, higher, &mut self.paths)
                }
                IFlag::Right => {
                    self.paths.pop();
                }
            }
        }
    }
}

/// Iterator type, to do range scan between a _lower-bound_ and _higher-bound_.
pub struct Range<'a, K, V, R, Q>
where
    Q: ?Sized,
{
    range: R,
    iter: Iter<'a, K, V>,
    fin: bool,
    high: marker::PhantomData<Q>,
}

impl<'a, K, V, R, Q> Iterator for Range<'a, K, V, R, Q>
where
    K: Borrow<Q>,
    Q: Ord + ?Sized,
    R: RangeBounds<Q>,
{
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.fin {
            return None;
        }

        let (key, value) = self.iter.next()?;
        let qey = key.borrow();
        match self.range.end_bound() {
            Bound::Unbounded => Some((key, value)),
            Bound::Included(high) if qey.le(high) => Some((key, value)),
            Bound::Excluded(high) if qey.lt(high) => Some((key, value)),
            Bound::Included(_) | Bound::Excluded(_) => {
                self.fin = true;
                None
            }
        }
    }
}

// Continuous iteration without walking through the whole tree from root.
// Achieved by maintaining a stack of tree-path to the previous iterated
// node. Each entry in the stack is a tuple of node-handle and its current
// state (IFlag), together this tuple is called as a Fragment.
struct Fragment {
    flag: IFlag,
    id: NodeId,
}

#[derive(Copy, Clone)]
enum IFlag {
    Left,   // lower path is iterated.
    Center, // current node is iterated.
    Right,  // higher path is iterated.
}

fn build_iter<K, V>(tree: &Tree<K, V>, mut node: Option<NodeId>, paths: &mut Vec<Fragment>) {
    while let Some(id) = node {
        paths.push(Fragment {
            flag: IFlag::Left,
            id,
        });
        node = tree.arena[id].lower;
    }
}

fn find_start<K, V, Q>(
    tree: &Tree<K, V>,
    mut node: Option<NodeId>,
    low: &Q,
    incl: bool,
    paths: &mut Vec<Fragment>,
) where
    K: Borrow<Q>,
    Q: Ord + ?Sized,
{
    while let Some(id) = node {
        let nref = &tree.arena[id];
        let cmp = nref.as_key().borrow().cmp(low);

        let flag = match cmp {
            Ordering::Less => IFlag::Right,
            Ordering::Equal if incl => IFlag::Left,
            Ordering::Equal => IFlag::Center,
            Ordering::Greater => IFlag::Left,
        };
        paths.push(Fragment { flag, id });

        node = match cmp {
            Ordering::Equal => None,
            Ordering::Less => nref.higher,
            Ordering::Greater => nref.lower,
        };
    }
}

#[cfg(test)]
#[path = "tree_test.rs"]
mod tree_test;
