//! Nonce-candidate proof miner.

use blockforge_core::ProofMiner;
use blockforge_types::Block;

/// Proof search by random nonce candidates.
///
/// Each [`mine`](ProofMiner::mine) call checks the block's current nonce
/// first, then tries fresh random candidates up to the attempt budget. The
/// coordinator re-invokes from its proof-search state until a candidate
/// digest satisfies the block's target, so a single call never holds the
/// driver thread for long.
pub struct NonceMiner;

impl NonceMiner {
    /// Create a miner.
    pub fn new() -> Self {
        Self
    }
}

impl Default for NonceMiner {
    fn default() -> Self {
        Self::new()
    }
}

impl ProofMiner for NonceMiner {
    fn mine(&self, block: &mut Block, attempt_budget: usize) -> bool {
        for _ in 0..attempt_budget {
            if block.proof.is_satisfied_by(&block.candidate_digest()) {
                return true;
            }
            block.proof.nonce = rand::random();
        }
        false
    }
}
