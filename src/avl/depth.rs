use std::{fmt, result};

use crate::Result;

/// Shape of an AVL tree, gathered level by level while validating it.
/// Root node is at level 1, tombstones are counted like live nodes.
///
/// In an AVL tree, sub-tree heights of siblings differ at most by one,
/// hence walking down from the root the height drops by at most two per
/// level. For a tree of height `h` it follows that:
///
/// * no leaf-node is shallower than `h/2 + 1`.
/// * every level above the shallowest leaf is completely filled.
///
/// [Depth::check] verify both.
#[derive(Clone, Default)]
pub struct Depth {
    levels: Vec<usize>,
    n_leaves: usize,
    min_leaf: Option<usize>,
    max_leaf: usize,
    total: usize,
}

impl Depth {
    /// Record a node at `level`, `leaf` if it has no children.
    pub fn sample(&mut self, level: usize, leaf: bool) {
        if level == 0 {
            return;
        }
        if self.levels.len() < level {
            self.levels.resize(level, 0);
        }
        self.levels[level - 1] += 1;

        if leaf {
            self.n_leaves += 1;
            self.total += level;
            self.min_leaf = Some(self.min_leaf.map_or(level, |m| usize::min(m, level)));
            self.max_leaf = usize::max(self.max_leaf, level);
        }
    }

    /// Return number of levels in the tree, same as its height.
    pub fn to_height(&self) -> usize {
        self.levels.len()
    }

    /// Return number of nodes at each level, starting from root.
    pub fn to_levels(&self) -> Vec<usize> {
        self.levels.clone()
    }

    /// Return total number of nodes sampled.
    pub fn to_nodes(&self) -> usize {
        self.levels.iter().sum()
    }

    /// Return number of leaf-nodes sampled.
    pub fn to_leaves(&self) -> usize {
        self.n_leaves
    }

    /// Return level of the shallowest leaf-node, ZERO for empty tree.
    pub fn to_min_leaf(&self) -> usize {
        self.min_leaf.unwrap_or(0)
    }

    /// Return level of the deepest leaf-node, ZERO for empty tree.
    pub fn to_max_leaf(&self) -> usize {
        self.max_leaf
    }

    /// Return average level of leaf-nodes.
    pub fn to_mean_leaf(&self) -> usize {
        match self.n_leaves {
            0 => 0,
            n => self.total / n,
        }
    }

    /// Return number of completely filled levels, from root.
    pub fn to_full_levels(&self) -> usize {
        self.levels
            .iter()
            .enumerate()
            .take_while(|(off, n)| 1_usize.checked_shl(*off as u32) == Some(**n))
            .count()
    }

    /// Check the sampled shape against AVL bounds on leaf spread.
    pub fn check(&self) -> Result<()> {
        let height = self.to_height();
        if height == 0 {
            return Ok(());
        }

        let (min_leaf, bound) = (self.to_min_leaf(), height / 2 + 1);
        if min_leaf < bound {
            err_at!(Fatal, msg: "leaf at level {} for height {}", min_leaf, height)?;
        }
        let full = self.to_full_levels();
        if (full + 1) < min_leaf {
            err_at!(Fatal, msg: "level {} not full, shallow leaf at {}", full + 1, min_leaf)?;
        }
        Ok(())
    }

    pub fn to_json(&self) -> String {
        let levels: Vec<String> = self.levels.iter().map(|n| n.to_string()).collect();
        let strs = [
            format!(r#""height": {}"#, self.to_height()),
            format!(r#""leaves": {}"#, self.to_leaves()),
            format!(r#""min_leaf": {}"#, self.to_min_leaf()),
            format!(r#""mean_leaf": {}"#, self.to_mean_leaf()),
            format!(r#""max_leaf": {}"#, self.to_max_leaf()),
            format!(r#""full_levels": {}"#, self.to_full_levels()),
            format!(r#""levels": [{}]"#, levels.join(", ")),
        ];
        format!(r#"{{ {} }}"#, strs.join(", "))
    }
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        let levels: Vec<String> = self.levels.iter().map(|n| n.to_string()).collect();
        write!(
            f,
            concat!(
                "{{ height={}, leaves={}, min_leaf={}, mean_leaf={}, max_leaf={}, ",
                "full_levels={}, levels=[{}] }}"
            ),
            self.to_height(),
            self.n_leaves,
            self.to_min_leaf(),
            self.to_mean_leaf(),
            self.max_leaf,
            self.to_full_levels(),
            levels.join(", ")
        )
    }
}

#[cfg(test)]
#[path = "depth_test.rs"]
mod depth_test;
