//! Build and query settings for a tree.
use crate::error::{Result, VpTreeError};

/// Default maximum number of points kept unpartitioned in a leaf.
pub const DEFAULT_LEAF_CAPACITY: usize = 8;

/// Default seed for pivot and vantage point sampling.
pub const DEFAULT_SEED: u64 = 0x5eed_1e55;

/// How the vantage point of each internal node is picked.
///
/// The choice only affects balance and speed; search results are the same
/// either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VantageSelection {
    /// The first index of the node's working set.
    #[default]
    First,
    /// A uniformly random member of the working set, drawn from the
    /// seeded per-node generator.
    Random,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VpTreeConfig {
    /// Maximum number of points stored in a leaf. Must be at least 1.
    pub leaf_capacity: usize,
    pub vantage: VantageSelection,
    /// Seeds every random choice made while building, so a given point set
    /// and config always produce the same tree.
    pub seed: u64,
    /// Build the inside and outside subtrees of the upper levels in
    /// parallel.
    pub parallel_build: bool,
    /// Size of a dedicated worker pool for batch queries and parallel
    /// builds. `None` uses rayon's global pool.
    pub num_threads: Option<usize>,
}

impl Default for VpTreeConfig {
    fn default() -> Self {
        VpTreeConfig {
            leaf_capacity: DEFAULT_LEAF_CAPACITY,
            vantage: VantageSelection::First,
            seed: DEFAULT_SEED,
            parallel_build: false,
            num_threads: None,
        }
    }
}

impl VpTreeConfig {
    pub fn with_leaf_capacity(mut self, leaf_capacity: usize) -> Self {
        self.leaf_capacity = leaf_capacity;
        self
    }

    pub fn with_vantage(mut self, vantage: VantageSelection) -> Self {
        self.vantage = vantage;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_parallel_build(mut self, parallel_build: bool) -> Self {
        self.parallel_build = parallel_build;
        self
    }

    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = Some(num_threads);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.leaf_capacity == 0 {
            return Err(VpTreeError::InvalidArgument(
                "leaf_capacity must be at least 1".into(),
            ));
        }
        if self.num_threads == Some(0) {
            return Err(VpTreeError::InvalidArgument(
                "num_threads must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
