//! Capability traits for the coordinator's external collaborators.
//!
//! The main-chain store, the versioned state store and the execution engine
//! live outside the coordinator and outlive it. The coordinator calls them
//! from its single driver thread and observes results synchronously; each
//! implementation carries its own internal thread-safety contract, hence the
//! `Send + Sync` bounds.
//!
//! None of these calls may block indefinitely. Anything that takes time
//! (execution, transaction arrival, DAG completeness) is exposed as a state
//! to poll, and the coordinator re-enters with a delay instead of waiting.

use blockforge_types::{Block, BlockBody, DagEpoch, DigestSet, Hash, MinerId, TransactionStatus};
use std::sync::Arc;

use crate::state::{EngineState, ScheduleStatus};

/// Outcome of offering a block to the main-chain store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStatus {
    /// The block was added to the chain.
    Added,
    /// The chain already holds this block.
    AlreadyPresent,
    /// The chain refused the block.
    Rejected,
}

/// What to keep when an ancestor path exceeds the length limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TruncationPolicy {
    /// Keep the entries nearest the common ancestor.
    ReturnLeastRecent,
    /// Keep the entries nearest the tip.
    ReturnMostRecent,
}

/// The persistent block graph with heaviest-tip tracking.
pub trait MainChain: Send + Sync {
    /// The tip with the greatest accumulated weight.
    fn heaviest_block(&self) -> Option<Arc<Block>>;

    /// Digest of the heaviest tip.
    fn heaviest_block_hash(&self) -> Hash;

    /// Look up a block by digest.
    fn get_block(&self, hash: &Hash) -> Option<Arc<Block>>;

    /// Offer a fully formed block to the chain.
    fn add_block(&self, block: Block) -> BlockStatus;

    /// Purge a block (and anything built on it) from the chain.
    fn remove_block(&self, hash: &Hash);

    /// Blocks from `tip` down to the deepest ancestor shared with `target`,
    /// ordered tip first with the common ancestor last. Returns `None` when
    /// either digest cannot be resolved. Paths longer than `limit` are
    /// truncated according to `policy`.
    fn path_to_common_ancestor(
        &self,
        tip: &Hash,
        target: &Hash,
        limit: usize,
        policy: TruncationPolicy,
    ) -> Option<Vec<Arc<Block>>>;

    /// Drop everything back to the genesis block.
    fn reset(&self);
}

/// The Merkle-versioned state store.
///
/// Commits happen in strict block-number order along the executed prefix;
/// reverts may move backwards, but only onto a previously committed
/// snapshot.
pub trait StateStore: Send + Sync {
    /// Root of the working state, including uncommitted writes.
    fn current_hash(&self) -> Hash;

    /// Root of the most recent commit.
    fn last_commit_hash(&self) -> Hash;

    /// Whether a snapshot with this root exists at this block number.
    fn hash_exists(&self, root: &Hash, block_number: u64) -> bool;

    /// Restore the working state to a previously committed snapshot.
    fn revert_to_hash(&self, root: &Hash, block_number: u64) -> bool;

    /// Record the working state as the snapshot for `block_number`.
    fn commit(&self, block_number: u64);
}

/// The deterministic transaction execution engine.
pub trait ExecutionEngine: Send + Sync {
    /// Schedule a block body for execution.
    fn execute(&self, body: &BlockBody) -> ScheduleStatus;

    /// Raw engine state; poll this after scheduling.
    fn state(&self) -> EngineState;

    /// Overwrite the engine's record of the last executed block.
    fn set_last_processed_block(&self, hash: Hash);

    /// Digest of the block whose execution last completed.
    fn last_processed_block(&self) -> Hash;
}

/// The storage layer's view of locally held transactions.
pub trait TransactionIndex: Send + Sync {
    /// Whether the transaction with this digest is locally present.
    fn has_transaction(&self, digest: &Hash) -> bool;

    /// Solicit the given digests from peers.
    fn issue_call_for_missing_txs(&self, digests: &DigestSet);
}

/// Errors surfaced by the block packer.
#[derive(Debug, thiserror::Error)]
pub enum PackerError {
    /// The transaction pool could not be consulted.
    #[error("transaction pool unavailable")]
    PoolUnavailable,

    /// The packer failed to assemble a block.
    #[error("block assembly failed: {0}")]
    Assembly(String),
}

/// Selects and lays out transactions for a block being minted.
pub trait BlockPacker: Send + Sync {
    /// Fill the minted block's slices for the given lane and slice counts.
    fn generate_block(
        &self,
        block: &mut Block,
        num_lanes: u64,
        num_slices: usize,
        chain: &dyn MainChain,
    ) -> Result<(), PackerError>;
}

/// Receives fully formed blocks for broadcast.
pub trait BlockSink: Send + Sync {
    /// Called exactly once per successfully minted block.
    fn on_block(&self, block: Block);
}

/// Client-visible transaction status cache.
pub trait StatusCache: Send + Sync {
    /// Record a status change for the given transaction digest.
    fn update(&self, digest: Hash, status: TransactionStatus);
}

/// Consensus weight oracle for proof-of-stake deployments.
pub trait StakeOracle: Send + Sync {
    /// Whether this node may generate a block on top of `previous`.
    fn should_generate_block(&self, previous: &Block, miner: &MinerId) -> bool;

    /// Whether `miner` was entitled to produce a block on top of `previous`.
    fn valid_miner_for_block(&self, previous: &Block, miner: &MinerId) -> bool;

    /// The weight a block by `miner` on top of `previous` must carry.
    fn block_generation_weight(&self, previous: &Block, miner: &MinerId) -> u64;

    /// Notification that a block finished its lifecycle.
    fn update_current_block(&self, block: &Block);
}

/// Outcome of preparing a synergetic work queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynergeticStatus {
    /// The queue was prepared.
    Success,
    /// The block references malformed work.
    InvalidBlock,
    /// The referenced work failed validation.
    InvalidWork,
}

/// Optional validation of off-chain work referenced by blocks.
pub trait SynergeticExecutionManager: Send + Sync {
    /// Identify the work a block certifies and queue it for validation.
    fn prepare_work_queue(&self, current: &Block, previous: &Block) -> SynergeticStatus;

    /// Validate the queued work and fold its results into state.
    fn validate_work_and_update_state(&self, block_number: u64, num_lanes: u64) -> bool;
}

/// Optional per-block epoch management for off-chain data.
pub trait Dag: Send + Sync {
    /// Number of the most recently committed epoch.
    fn current_epoch(&self) -> u64;

    /// Open an epoch for a block being minted.
    fn create_epoch(&self, block_number: u64) -> DagEpoch;

    /// Whether all nodes required by the epoch have arrived.
    fn satisfy_epoch(&self, epoch: &DagEpoch) -> bool;

    /// Roll epochs back to the given block number.
    fn revert_to_epoch(&self, block_number: u64) -> bool;

    /// Finalize an epoch alongside its block's commit.
    fn commit_epoch(&self, epoch: &DagEpoch);
}

/// Cooperative proof search.
pub trait ProofMiner: Send + Sync {
    /// Try up to `attempt_budget` candidates; returns `true` when the
    /// block's proof satisfies its target. Callers re-invoke until it does.
    fn mine(&self, block: &mut Block, attempt_budget: usize) -> bool;
}
