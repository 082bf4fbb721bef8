//! Coordinator configuration.

use std::time::Duration;

/// Block coordinator configuration.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Minimum interval between blocks minted by this node.
    pub block_period: Duration,

    /// Proof difficulty for minted blocks, in leading zero bits.
    pub block_difficulty: u32,

    /// Number of execution lanes blocks must be packed for.
    /// Must be a power of two.
    pub num_lanes: u64,

    /// Number of slices blocks must carry.
    pub num_slices: usize,

    /// Upper bound on a single path-to-common-ancestor lookup.
    ///
    /// Longer reconciliations are truncated to the least recent blocks and
    /// completed across several lookups.
    pub common_path_limit: usize,

    /// Residual ancestor-path length below which the cached path is
    /// discarded in favour of per-step lookup.
    pub fast_sync_threshold: usize,

    /// How long to wait for transactions to arrive on their own before
    /// soliciting peers.
    pub wait_before_asking_for_missing_txs: Duration,

    /// How long to keep waiting after soliciting peers. When this also
    /// expires the block is deemed unreachable and discarded.
    pub wait_for_tx_timeout: Duration,

    /// Rate limit for "waiting for transactions" progress logs.
    pub tx_sync_notify_interval: Duration,

    /// Rate limit for "waiting for execution" progress logs.
    pub exec_notify_interval: Duration,

    /// Rate limit for state-change and synchronisation progress logs.
    pub notify_interval: Duration,

    /// Whether this node mints blocks at all.
    pub mining: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            block_period: Duration::from_secs(10),
            block_difficulty: 8,
            num_lanes: 1,
            num_slices: 1,
            common_path_limit: 1000,
            fast_sync_threshold: 100,
            wait_before_asking_for_missing_txs: Duration::from_secs(30),
            wait_for_tx_timeout: Duration::from_secs(30),
            tx_sync_notify_interval: Duration::from_secs(1),
            exec_notify_interval: Duration::from_millis(500),
            notify_interval: Duration::from_secs(10),
            mining: false,
        }
    }
}

impl CoordinatorConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the block period.
    pub fn with_block_period(mut self, period: Duration) -> Self {
        self.block_period = period;
        self
    }

    /// Set the proof difficulty for minted blocks.
    pub fn with_block_difficulty(mut self, difficulty: u32) -> Self {
        self.block_difficulty = difficulty;
        self
    }

    /// Set the lane and slice counts.
    pub fn with_layout(mut self, num_lanes: u64, num_slices: usize) -> Self {
        self.num_lanes = num_lanes;
        self.num_slices = num_slices;
        self
    }

    /// Set the missing-transaction ask delay and timeout.
    pub fn with_tx_wait(mut self, ask_after: Duration, timeout: Duration) -> Self {
        self.wait_before_asking_for_missing_txs = ask_after;
        self.wait_for_tx_timeout = timeout;
        self
    }

    /// Enable or disable mining.
    pub fn with_mining(mut self, mining: bool) -> Self {
        self.mining = mining;
        self
    }

    /// Set the fast-sync threshold.
    pub fn with_fast_sync_threshold(mut self, threshold: usize) -> Self {
        self.fast_sync_threshold = threshold;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.num_lanes, 1);
        assert_eq!(config.fast_sync_threshold, 100);
        assert!(!config.mining);
    }

    #[test]
    fn test_builders() {
        let config = CoordinatorConfig::new()
            .with_block_period(Duration::from_millis(100))
            .with_layout(4, 2)
            .with_mining(true);
        assert_eq!(config.block_period, Duration::from_millis(100));
        assert_eq!(config.num_lanes, 4);
        assert_eq!(config.num_slices, 2);
        assert!(config.mining);
    }
}
