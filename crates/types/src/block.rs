//! Block structure, proof-of-work header and genesis constants.

use crate::{DigestSet, Hash, MinerId};

/// Sentinel digest marking the genesis boundary of the chain.
///
/// The genesis block's `previous_hash` is this value, and a freshly started
/// execution engine reports it as the last processed block; the genesis
/// block's own hash is computed over its body like any other block. It is
/// deliberately distinct from `Hash::ZERO`, which marks a block whose proof
/// has not yet closed its digest.
pub const GENESIS_DIGEST: Hash = Hash::new(*b"genesis-genesis-genesis-genesis-");

/// State root of the empty state store.
pub const GENESIS_MERKLE_ROOT: Hash = Hash::ZERO;

/// Summary of a transaction as referenced from a block slice.
///
/// The full transaction lives in the storage layer; blocks only carry the
/// digest plus the fee charged for inclusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionSummary {
    /// Content digest of the transaction.
    pub digest: Hash,
    /// Fee charged for executing the transaction.
    pub charge: u64,
}

impl TransactionSummary {
    /// Create a summary with no fee attached.
    pub fn new(digest: Hash) -> Self {
        Self { digest, charge: 0 }
    }
}

/// One execution lane's worth of transactions.
pub type Slice = Vec<TransactionSummary>;

/// Handle grouping the off-chain data attached to a block.
///
/// The DAG subsystem creates one per minted block and reports whether all
/// required nodes have arrived for a received block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DagEpoch {
    /// Block number the epoch was created for.
    pub block_number: u64,
}

/// Proof-of-work header with a mutable difficulty target.
///
/// The target counts the leading zero bits a candidate digest must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProofOfWork {
    /// Nonce folded into the block digest.
    pub nonce: u64,
    /// Required leading zero bits.
    pub target: u32,
}

impl ProofOfWork {
    /// Update the difficulty target.
    pub fn set_target(&mut self, target: u32) {
        self.target = target;
    }

    /// Check whether a candidate digest satisfies the target.
    pub fn is_satisfied_by(&self, digest: &Hash) -> bool {
        digest.leading_zero_bits() >= self.target
    }
}

/// The hashed portion of a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockBody {
    /// Hash of the preceding block; `GENESIS_DIGEST` for the genesis block.
    pub previous_hash: Hash,
    /// Content digest of this body. `Hash::ZERO` until the proof closes it.
    pub hash: Hash,
    /// Position in the chain; genesis is 0.
    pub block_number: u64,
    /// Identity of the producing node.
    pub miner: MinerId,
    /// State root the chain must hold after executing this block.
    pub merkle_hash: Hash,
    /// Base-2 logarithm of the lane count the block was packed for.
    pub log2_num_lanes: u8,
    /// Transactions grouped into execution slices.
    pub slices: Vec<Slice>,
    /// Off-chain data epoch, when the DAG subsystem is enabled.
    pub dag_epoch: Option<DagEpoch>,
}

/// A block together with its consensus weight and proof header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Hashed block contents.
    pub body: BlockBody,
    /// Consensus weight granted to the producer for this block.
    pub weight: u64,
    /// Proof-of-work header.
    pub proof: ProofOfWork,
}

impl Block {
    /// The genesis block: empty, built on the `GENESIS_DIGEST` sentinel,
    /// carrying the empty state root, with its digest computed like any
    /// other block's.
    pub fn genesis() -> Self {
        let mut genesis = Self {
            body: BlockBody {
                previous_hash: GENESIS_DIGEST,
                hash: Hash::ZERO,
                block_number: 0,
                miner: MinerId::default(),
                merkle_hash: GENESIS_MERKLE_ROOT,
                log2_num_lanes: 0,
                slices: Vec::new(),
                dag_epoch: None,
            },
            weight: 0,
            proof: ProofOfWork::default(),
        };
        genesis.update_digest();
        genesis
    }

    /// Start a new block on top of the given parent digest.
    ///
    /// The body hash stays zero until a proof is found and
    /// [`update_digest`](Self::update_digest) closes it.
    pub fn new(previous_hash: Hash, block_number: u64, miner: MinerId) -> Self {
        Self {
            body: BlockBody {
                previous_hash,
                hash: Hash::ZERO,
                block_number,
                miner,
                merkle_hash: Hash::ZERO,
                log2_num_lanes: 0,
                slices: Vec::new(),
                dag_epoch: None,
            },
            weight: 1,
            proof: ProofOfWork::default(),
        }
    }

    /// Compute the content digest over the current body and nonce.
    pub fn candidate_digest(&self) -> Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.body.previous_hash.as_bytes());
        hasher.update(&self.body.block_number.to_le_bytes());
        hasher.update(self.body.miner.as_bytes());
        hasher.update(self.body.merkle_hash.as_bytes());
        hasher.update(&[self.body.log2_num_lanes]);
        for slice in &self.body.slices {
            for tx in slice {
                hasher.update(tx.digest.as_bytes());
                hasher.update(&tx.charge.to_le_bytes());
            }
        }
        hasher.update(&self.weight.to_le_bytes());
        hasher.update(&self.proof.nonce.to_le_bytes());
        Hash::new(*hasher.finalize().as_bytes())
    }

    /// Close the body digest over the current contents and nonce.
    pub fn update_digest(&mut self) {
        self.body.hash = self.candidate_digest();
    }

    /// Whether this is the genesis block, i.e. it builds directly on the
    /// genesis sentinel. The genesis block skips the structural and
    /// state-root checks that need an executed predecessor.
    pub fn is_genesis(&self) -> bool {
        self.body.previous_hash == GENESIS_DIGEST
    }

    /// Total number of transactions across all slices.
    pub fn transaction_count(&self) -> usize {
        self.body.slices.iter().map(Vec::len).sum()
    }

    /// Iterate the digests of every transaction in slice order.
    pub fn transaction_digests(&self) -> impl Iterator<Item = Hash> + '_ {
        self.body
            .slices
            .iter()
            .flat_map(|slice| slice.iter().map(|tx| tx.digest))
    }

    /// Collect all transaction digests into a set.
    pub fn digest_set(&self) -> DigestSet {
        self.transaction_digests().collect()
    }
}
