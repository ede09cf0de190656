use proptest::prelude::*;

use std::collections::BTreeMap;

use crate::{avl::Tree, config::MAX_TREE_DEPTH};

#[derive(Clone, Debug)]
enum Op {
    Set(u16, u32),
    Remove(u16),
    Delete(Vec<u16>),
    Compact,
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    let key = 0_u16..512;
    let op = prop_oneof![
        50 => (key.clone(), any::<u32>()).prop_map(|(k, v)| Op::Set(k, v)),
        20 => key.clone().prop_map(Op::Remove),
        20 => prop::collection::vec(key, 0..4).prop_map(Op::Delete),
        2 => Just(Op::Compact),
    ];
    prop::collection::vec(op, 0..=1000)
}

// Upper bound on AVL height for `n` nodes.
fn max_height(n: usize) -> usize {
    (1.4405 * ((n + 2) as f64).log2()).ceil() as usize
}

fn levels(tree: &Tree<u16, u32>) -> Vec<Vec<u16>> {
    (1..=tree.depth())
        .map(|d| tree.traverse(d).into_iter().map(|(k, _)| *k).collect())
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        max_shrink_iters: 10_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_ordered_and_balanced(ops in ops_strategy()) {
        let mut tree: Tree<u16, u32> = Tree::new();
        let mut m: BTreeMap<u16, (u32, bool)> = BTreeMap::new();

        for op in ops.into_iter() {
            match op {
                Op::Set(k, v) => {
                    tree.set(k, v);
                    m.insert(k, (v, false));
                }
                Op::Remove(k) => {
                    tree.remove(&k);
                    m.remove(&k);
                }
                Op::Delete(keys) => {
                    if tree.delete(keys.iter()) {
                        for k in keys.iter() {
                            if let Some(entry) = m.get_mut(k) {
                                entry.1 = true;
                            }
                        }
                    }
                }
                Op::Compact => {
                    tree.compact();
                    m.retain(|_, (_, deleted)| !*deleted);
                }
            }

            prop_assert!(tree.validate(MAX_TREE_DEPTH).is_ok());
            prop_assert!(tree.depth() <= max_height(tree.node_count()));
            prop_assert_eq!(tree.node_count(), m.len());
        }

        let keys: Vec<u16> = tree.iter().map(|(k, _)| *k).collect();
        prop_assert!(keys.windows(2).all(|w| w[0] < w[1]));

        let expected: Vec<(u16, u32)> = m
            .iter()
            .filter(|(_, (_, deleted))| !deleted)
            .map(|(k, (v, _))| (*k, *v))
            .collect();
        let got: Vec<(u16, u32)> = tree.iter().map(|(k, v)| (*k, *v)).collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_compact_keeps_live_entries(
        keys in prop::collection::btree_set(any::<u16>(), 0..500),
        dels in prop::collection::vec(any::<prop::sample::Index>(), 0..200),
    ) {
        let keys: Vec<u16> = keys.into_iter().collect();
        let mut tree: Tree<u16, u32> = Tree::new();
        for k in keys.iter() {
            tree.set(*k, u32::from(*k) * 2);
        }

        if !keys.is_empty() {
            let dels: Vec<u16> = dels.iter().map(|ix| keys[ix.index(keys.len())]).collect();
            prop_assert!(tree.delete(dels.iter()));
        }

        let before: Vec<(u16, u32)> = tree.iter().map(|(k, v)| (*k, *v)).collect();
        let had_tombstones = tree.needs_compaction();
        prop_assert_eq!(tree.compact(), had_tombstones);
        prop_assert!(!tree.needs_compaction());
        prop_assert_eq!(tree.deleted_count(), 0);

        let after: Vec<(u16, u32)> = tree.iter().map(|(k, v)| (*k, *v)).collect();
        prop_assert_eq!(after, before);
        prop_assert_eq!(tree.node_count(), tree.len());
        prop_assert!(tree.validate(MAX_TREE_DEPTH).is_ok());
    }

    #[test]
    fn prop_idempotent_updates(
        keys in prop::collection::vec(any::<u16>(), 1..300),
        pick in any::<prop::sample::Index>(),
    ) {
        let mut tree: Tree<u16, u32> = Tree::new();
        for k in keys.iter() {
            tree.set(*k, u32::from(*k));
        }
        let key = keys[pick.index(keys.len())];

        // same key, same value, shape unchanged.
        let shape = levels(&tree);
        tree.set(key, u32::from(key));
        prop_assert_eq!(levels(&tree), shape);

        // deleting a tombstone again leaves the counter as is.
        prop_assert!(tree.delete(&[key]));
        let n_deleted = tree.deleted_count();
        prop_assert!(tree.delete(&[key]));
        prop_assert_eq!(tree.deleted_count(), n_deleted);
        prop_assert_eq!(n_deleted, 1);
    }
}
