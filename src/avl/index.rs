// Module ``index`` implement a thread-safe [Index] over [Tree].
//
// Whole tree is guarded by a single reader-writer lock. Readers can
// proceed concurrently, writers are exclusive, and every operation on
// [Index] holds the lock for its full duration, including re-balancing.
//
// Batch mutations, set_many() and remove_many(), fan out each key as an
// independent operation on the rayon thread-pool. Each key's effect is
// atomic, the batch as a whole is not. On the other hand, delete() is an
// all-or-nothing batch that holds the write lock once.

use log::{debug, info};
use parking_lot::{RwLock, RwLockReadGuard};
use rayon::prelude::*;

use std::{
    borrow::Borrow,
    fmt, mem,
    ops::RangeBounds,
    sync::Arc,
};

use crate::{
    avl::{Node, Stats, Tree, Upsert},
    Config, Result,
};

/// Index type for thread-safe, concurrent reads and serialized writes.
///
/// Cloning an index is cheap, clones share the same underlying tree.
pub struct Index<K, V> {
    config: Config,
    inner: Arc<RwLock<Tree<K, V>>>,
}

impl<K, V> Clone for Index<K, V> {
    fn clone(&self) -> Self {
        Index {
            config: self.config.clone(),
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> Index<K, V> {
    /// Create an empty index with default configuration.
    pub fn new(name: &str) -> Index<K, V> {
        let config = Config::new(name);
        info!(target: "avlidx", "{:?}, new index", config.name);
        Index::from_tree(config, Tree::new())
    }

    /// Create an empty index with supplied configuration.
    pub fn from_config(config: Config) -> Result<Index<K, V>> {
        config.check()?;
        info!(
            target: "avlidx",
            "{:?}, new index max_depth:{} auto_compact:{:?}",
            config.name, config.max_depth, config.auto_compact
        );
        Ok(Index::from_tree(config, Tree::new()))
    }

    pub(crate) fn from_tree(config: Config, tree: Tree<K, V>) -> Index<K, V> {
        Index {
            config,
            inner: Arc::new(RwLock::new(tree)),
        }
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<Tree<K, V>> {
        self.inner.read()
    }

    /// Replace the entire tree, return the old one.
    pub(crate) fn swap(&self, tree: Tree<K, V>) -> Tree<K, V> {
        mem::replace(&mut *self.inner.write(), tree)
    }
}

impl<K, V> Index<K, V> {
    /// Return name of this index instance.
    #[inline]
    pub fn to_name(&self) -> String {
        self.config.name.clone()
    }

    #[inline]
    pub fn to_config(&self) -> Config {
        self.config.clone()
    }

    /// Return number of live entries in this instance.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Return whether index is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the number of levels in the tree, zero for empty index.
    #[inline]
    pub fn depth(&self) -> usize {
        self.inner.read().depth()
    }

    /// Return number of entries marked as deleted.
    #[inline]
    pub fn deleted_count(&self) -> usize {
        self.inner.read().deleted_count()
    }

    /// Return whether there are deleted entries awaiting compaction.
    #[inline]
    pub fn needs_compaction(&self) -> bool {
        self.inner.read().needs_compaction()
    }

    /// Return quickly with basic statisics, leaf-node depths are only
    /// computed by [Index::validate].
    pub fn to_stats(&self) -> Stats {
        self.stats_of(&self.inner.read())
    }

    fn stats_of(&self, tree: &Tree<K, V>) -> Stats {
        let mut stats = Stats::new(&self.config.name);
        stats.node_size = mem::size_of::<Node<K, V>>();
        stats.n_count = tree.node_count();
        stats.n_deleted = tree.deleted_count();
        stats.depth = tree.depth();
        // depths are available only from validate call.
        stats
    }
}

impl<K, V> Index<K, V>
where
    K: Ord,
{
    /// Set `key`, `value` into the index. If key is already present,
    /// including as a deleted entry, its value is replaced.
    pub fn set(&self, key: K, value: V) -> Upsert<V> {
        self.inner.write().set(key, value)
    }

    /// Set a batch of entries, each entry is applied independently.
    /// Return the number of newly inserted keys.
    pub fn set_many(&self, items: Vec<(K, V)>) -> usize
    where
        K: Send + Sync,
        V: Send + Sync,
    {
        debug!(target: "avlidx", "{:?}, set_many {} items", self.config.name, items.len());

        items
            .into_par_iter()
            .map(|(key, value)| self.set(key, value))
            .filter(|res| res.is_insert())
            .count()
    }

    /// Remove `key` from the index, tree is re-balanced right away.
    /// Return the value of the removed entry, if it was live.
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.inner.write().remove(key)
    }

    /// Remove a batch of keys, each key is applied independently. Return
    /// the number of live entries removed.
    pub fn remove_many<Q>(&self, keys: &[Q]) -> usize
    where
        K: Borrow<Q> + Send + Sync,
        V: Send + Sync,
        Q: Ord + Sync,
    {
        debug!(target: "avlidx", "{:?}, remove_many {} keys", self.config.name, keys.len());

        keys.par_iter()
            .filter_map(|key| self.remove(key))
            .count()
    }

    /// Mark entries for `keys` as deleted, return false and leave the
    /// index untouched if any of the key is missing. Deleted entries are
    /// purged by [Index::compact], or automatically when configured with
    /// `auto_compact`.
    pub fn delete<'k, Q, I>(&self, keys: I) -> bool
    where
        K: Borrow<Q>,
        Q: 'k + Ord + ?Sized,
        I: IntoIterator<Item = &'k Q>,
    {
        let mut inner = self.inner.write();
        if !inner.delete(keys) {
            return false;
        }

        if let Some(percent) = self.config.auto_compact {
            let (n_deleted, n_count) = (inner.deleted_count(), inner.node_count());
            if n_deleted > 0 && (n_deleted * 100) >= (n_count * percent) {
                debug!(
                    target: "avlidx",
                    "{:?}, auto-compact {}/{} deleted, threshold {}%",
                    self.config.name, n_deleted, n_count, percent
                );
                inner.compact();
            }
        }
        true
    }

    /// Purge all deleted entries by re-building the tree. Return false
    /// if there was nothing to purge.
    pub fn compact(&self) -> bool {
        let mut inner = self.inner.write();
        let n_deleted = inner.deleted_count();
        let ok = inner.compact();
        if ok {
            info!(
                target: "avlidx",
                "{:?}, compacted {} deleted entries, {} live",
                self.config.name, n_deleted, inner.len()
            );
        }
        ok
    }
}

impl<K, V> Index<K, V>
where
    K: Clone + Ord,
    V: Clone,
{
    /// Get value for `key`, deleted entries are treated as missing.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.inner.read().get(key).cloned()
    }

    /// Return values for live keys between `from` and `to`, in sort order.
    /// Bounds are included if `inclusive` is true.
    pub fn range<Q>(&self, from: &Q, to: &Q, inclusive: bool) -> Vec<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let inner = self.inner.read();
        let iter = inner.range(from, to, inclusive);
        iter.map(|(_, value)| value.clone()).collect()
    }

    /// Same as [Index::range], return keys instead of values.
    pub fn range_keys<Q>(&self, from: &Q, to: &Q, inclusive: bool) -> Vec<K>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let inner = self.inner.read();
        let iter = inner.range(from, to, inclusive);
        iter.map(|(key, _)| key.clone()).collect()
    }

    /// Return live entries within `range`, in sort order.
    pub fn range_by<R, Q>(&self, range: R) -> Vec<(K, V)>
    where
        K: Borrow<Q>,
        R: RangeBounds<Q>,
        Q: Ord + ?Sized,
    {
        let inner = self.inner.read();
        let iter = inner.range_by(range);
        iter.map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Return all live entries in sort order, same as range_by(..).
    pub fn to_entries(&self) -> Vec<(K, V)> {
        self.range_by::<_, K>(..)
    }

    /// Return live entries at level `depth` from the root, root being at
    /// level 1. With `depth` as ZERO, return all live entries.
    pub fn traverse(&self, depth: usize) -> Vec<(K, V)> {
        let inner = self.inner.read();
        inner
            .traverse(depth)
            .into_iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

impl<K, V> Index<K, V>
where
    K: Ord + fmt::Debug,
{
    /// Validate AVL tree, refer to [Tree::validate] for the rules. Return
    /// full statistics, with the tree shape.
    pub fn validate(&self) -> Result<Stats> {
        let inner = self.inner.read();
        let depths = inner.validate(self.config.max_depth)?;
        let mut stats = self.stats_of(&inner);
        stats.depths = Some(depths);
        Ok(stats)
    }
}

#[cfg(test)]
#[path = "index_test.rs"]
mod index_test;
