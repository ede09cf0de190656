use std::{fmt, result};

use crate::avl::Depth;

/// Statistic type, for [Index](crate::avl::Index) type.
pub struct Stats {
    pub name: String,
    pub node_size: usize,
    /// Number of nodes in the tree, including tombstones.
    pub n_count: usize,
    /// Number of nodes marked as deleted, waiting for compaction.
    pub n_deleted: usize,
    /// Height of the tree, zero for empty tree.
    pub depth: usize,
    /// Tree shape, available only from validate call.
    pub depths: Option<Depth>,
}

impl Stats {
    pub(crate) fn new(name: &str) -> Stats {
        Stats {
            name: name.to_string(),
            node_size: Default::default(),
            n_count: Default::default(),
            n_deleted: Default::default(),
            depth: Default::default(),
            depths: None,
        }
    }

    /// Return number of live entries.
    pub fn to_live(&self) -> usize {
        self.n_count.saturating_sub(self.n_deleted)
    }

    pub fn to_json(&self) -> String {
        let null = "null".to_string();
        // name is user supplied, quote and escape it.
        let name = serde_json::Value::from(self.name.as_str());
        format!(
            concat!(
                r#"{{ "avl": {{ "name": {}, "n_count": {}, "n_live": {}, "#,
                r#""n_deleted": {}, "node_size": {}, "depth": {}, "#,
                r#""depths": {} }} }}"#,
            ),
            name,
            self.n_count,
            self.to_live(),
            self.n_deleted,
            self.node_size,
            self.depth,
            self.depths.as_ref().map_or(null, |x| x.to_json()),
        )
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        let none = "none".to_string();
        let d = self.depths.as_ref().map_or(none, |x| x.to_string());
        writeln!(f, "avl.name = {}", self.name)?;
        writeln!(
            f,
            "avl = {{ n_count={}, n_live={}, n_deleted={}, node_size={}, depth={} }}",
            self.n_count,
            self.to_live(),
            self.n_deleted,
            self.node_size,
            self.depth,
        )?;
        writeln!(f, "avl.depths = {}", d)
    }
}
