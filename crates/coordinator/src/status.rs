//! Serializable coordinator status snapshot.

use serde::Serialize;

/// Point-in-time view of the coordinator for status endpoints and logs.
#[derive(Debug, Clone, Serialize)]
pub struct CoordinatorStatus {
    /// Current state machine tag.
    pub state: &'static str,
    /// Hex digest of the last executed block.
    pub last_executed: String,
    /// Number of the block currently being processed, if any.
    pub current_block_number: Option<u64>,
    /// Transactions the current block is still waiting for.
    pub pending_transactions: usize,
    /// Whether this node mints blocks.
    pub mining: bool,
    /// Total state machine steps taken.
    pub steps: u64,
}
