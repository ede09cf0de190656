use serde::Deserialize;

use crate::Result;

/// Default value for maximum tree depth, beyond which [validate] shall
/// fail. An AVL tree holding `u64::MAX` entries is less than 93 levels
/// deep.
///
/// [validate]: crate::avl::Index::validate
pub const MAX_TREE_DEPTH: usize = 100;

/// Upper limit for configurable `max_depth`. Validation descends the tree
/// recursively, deeper trees are rejected before they can exhaust the stack.
pub const MAX_DEPTH_LIMIT: usize = 2 * MAX_TREE_DEPTH;

/// Configuration for [Index] type.
///
/// Use [Config::new] and the `set_*` methods, or load it from toml text
/// using [Config::from_toml], missing fields pick their default.
///
/// ```toml
/// name = "users"
/// max_depth = 64
/// auto_compact = 25
/// ```
///
/// [Index]: crate::avl::Index
#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
pub struct Config {
    /// Name of the index, used in logs and stats.
    pub name: String,
    /// Maximum depth tolerated by validation, shall not exceed
    /// [MAX_DEPTH_LIMIT].
    ///
    /// Default: [MAX_TREE_DEPTH]
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Compact the index right after a soft-delete batch, when the
    /// number of tombstones reach this percentage of nodes in the tree.
    /// `None` leaves compaction to the application.
    ///
    /// Default: None
    #[serde(default)]
    pub auto_compact: Option<usize>,
}

fn default_max_depth() -> usize {
    MAX_TREE_DEPTH
}

impl Default for Config {
    fn default() -> Config {
        Config::new("avl-index")
    }
}

impl Config {
    /// Create a new configuration value, use the `set_*` methods to add more
    /// configuration.
    pub fn new(name: &str) -> Config {
        Config {
            name: name.to_string(),
            max_depth: MAX_TREE_DEPTH,
            auto_compact: None,
        }
    }

    /// Parse configuration from toml text.
    pub fn from_toml(text: &str) -> Result<Config> {
        let config: Config = err_at!(InvalidConfig, toml::from_str(text))?;
        config.check()?;
        Ok(config)
    }

    /// Configure the depth bound for validation.
    pub fn set_max_depth(&mut self, max_depth: usize) -> &mut Self {
        self.max_depth = max_depth;
        self
    }

    /// Configure tombstone percentage that shall trigger compaction,
    /// `None` to disable automatic compaction.
    pub fn set_auto_compact(&mut self, percent: Option<usize>) -> &mut Self {
        self.auto_compact = percent;
        self
    }

    pub(crate) fn check(&self) -> Result<()> {
        if self.max_depth == 0 || self.max_depth > MAX_DEPTH_LIMIT {
            let (name, depth) = (&self.name, self.max_depth);
            let limit = MAX_DEPTH_LIMIT;
            err_at!(InvalidConfig, msg: "{}: max_depth {} not within 1..={}", name, depth, limit)?;
        }
        match self.auto_compact {
            Some(percent) if percent == 0 || percent > 100 => err_at!(
                InvalidConfig,
                msg: "{}: auto_compact {} not within 1..=100", self.name, percent
            ),
            Some(_) | None => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
