//! Core types for the blockforge ledger.
//!
//! This crate provides the value types shared by the coordinator and its
//! collaborators:
//!
//! - [`Hash`]: 32-byte Blake3 content digest
//! - [`Block`], [`BlockBody`], [`ProofOfWork`]: the chain's block structure
//! - [`MinerId`]: opaque block-producer identity
//! - [`DagEpoch`]: handle for a block's off-chain data epoch
//! - [`TransactionStatus`]: lifecycle of a transaction as seen by clients
//!
//! All types are plain values with deterministic hashing; nothing here
//! performs I/O.

mod block;
mod hash;
mod identity;

pub use block::{
    Block, BlockBody, DagEpoch, ProofOfWork, Slice, TransactionSummary, GENESIS_DIGEST,
    GENESIS_MERKLE_ROOT,
};
pub use hash::{Hash, HexError};
pub use identity::MinerId;

use std::collections::HashSet;

/// Unordered set of transaction digests.
pub type DigestSet = HashSet<Hash>;

/// Lifecycle of a transaction as tracked by the status cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Never seen by this node.
    Unknown,
    /// Held in the pool, not yet packed.
    Pending,
    /// Included in a block that has not executed yet.
    Mined,
    /// Executed as part of a committed or transmitted block.
    Executed,
}

impl TransactionStatus {
    /// String form for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Unknown => "unknown",
            TransactionStatus::Pending => "pending",
            TransactionStatus::Mined => "mined",
            TransactionStatus::Executed => "executed",
        }
    }
}
