//! In-memory main chain.

use blockforge_core::{BlockStatus, MainChain, TruncationPolicy};
use blockforge_types::{Block, Hash};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

struct ChainInner {
    blocks: HashMap<Hash, Arc<Block>>,
    children: HashMap<Hash, Vec<Hash>>,
    /// Accumulated weight from genesis up to and including each block.
    total_weight: HashMap<Hash, u64>,
    heaviest: Hash,
}

impl ChainInner {
    fn genesis_only() -> Self {
        let genesis = Arc::new(Block::genesis());
        let genesis_hash = genesis.body.hash;
        let mut blocks = HashMap::new();
        let mut total_weight = HashMap::new();
        blocks.insert(genesis_hash, genesis);
        total_weight.insert(genesis_hash, 0);
        Self {
            blocks,
            children: HashMap::new(),
            total_weight,
            heaviest: genesis_hash,
        }
    }

    fn recompute_heaviest(&mut self) {
        // The genesis entry is always present, so the maximum exists.
        if let Some(best) = self.total_weight.iter().map(|(hash, w)| (*w, *hash)).max() {
            self.heaviest = best.1;
        }
    }
}

/// Block graph held entirely in memory, seeded with the genesis block.
///
/// Tracks accumulated weight per block and keeps the heaviest tip current
/// across insertions and removals. Ties are broken on the block digest so
/// that every node picks the same tip.
pub struct InMemoryMainChain {
    inner: RwLock<ChainInner>,
}

impl InMemoryMainChain {
    /// Create a chain holding only the genesis block.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(ChainInner::genesis_only()),
        }
    }

    /// Number of blocks currently held, genesis included.
    pub fn block_count(&self) -> usize {
        self.inner.read().blocks.len()
    }
}

impl Default for InMemoryMainChain {
    fn default() -> Self {
        Self::new()
    }
}

impl MainChain for InMemoryMainChain {
    fn heaviest_block(&self) -> Option<Arc<Block>> {
        let inner = self.inner.read();
        inner.blocks.get(&inner.heaviest).cloned()
    }

    fn heaviest_block_hash(&self) -> Hash {
        self.inner.read().heaviest
    }

    fn get_block(&self, hash: &Hash) -> Option<Arc<Block>> {
        self.inner.read().blocks.get(hash).cloned()
    }

    fn add_block(&self, block: Block) -> BlockStatus {
        let hash = block.body.hash;
        if hash.is_zero() {
            warn!("refusing block with open digest");
            return BlockStatus::Rejected;
        }

        let mut inner = self.inner.write();
        if inner.blocks.contains_key(&hash) {
            return BlockStatus::AlreadyPresent;
        }

        let parent = block.body.previous_hash;
        let Some(parent_weight) = inner.total_weight.get(&parent).copied() else {
            warn!(block = %hash, parent = %parent, "refusing block with unknown parent");
            return BlockStatus::Rejected;
        };

        let total = parent_weight + block.weight;
        inner.total_weight.insert(hash, total);
        inner.children.entry(parent).or_default().push(hash);
        inner.blocks.insert(hash, Arc::new(block));

        if (total, hash) > (inner.total_weight[&inner.heaviest], inner.heaviest) {
            inner.heaviest = hash;
        }

        debug!(block = %hash, total_weight = total, "block added");
        BlockStatus::Added
    }

    fn remove_block(&self, hash: &Hash) {
        let mut inner = self.inner.write();
        match inner.blocks.get(hash) {
            Some(block) if block.is_genesis() => {
                warn!("refusing to remove the genesis block");
                return;
            }
            Some(_) => {}
            None => return,
        }

        // Purge the block and everything built on it.
        let mut doomed = vec![*hash];
        let mut index = 0;
        while index < doomed.len() {
            if let Some(children) = inner.children.get(&doomed[index]) {
                doomed.extend(children.iter().copied());
            }
            index += 1;
        }

        for hash in &doomed {
            if let Some(block) = inner.blocks.remove(hash) {
                let parent = block.body.previous_hash;
                if let Some(siblings) = inner.children.get_mut(&parent) {
                    siblings.retain(|sibling| sibling != hash);
                }
            }
            inner.total_weight.remove(hash);
            inner.children.remove(hash);
        }

        inner.recompute_heaviest();
        debug!(block = %hash, purged = doomed.len(), "block removed");
    }

    fn path_to_common_ancestor(
        &self,
        tip: &Hash,
        target: &Hash,
        limit: usize,
        policy: TruncationPolicy,
    ) -> Option<Vec<Arc<Block>>> {
        let inner = self.inner.read();

        // Every ancestor of the target, target included, down to genesis.
        let mut target_ancestors = HashSet::new();
        let mut cursor = inner.blocks.get(target)?;
        loop {
            target_ancestors.insert(cursor.body.hash);
            if cursor.is_genesis() {
                break;
            }
            cursor = inner.blocks.get(&cursor.body.previous_hash)?;
        }

        // Walk down from the tip until the walks meet.
        let mut path = Vec::new();
        let mut cursor = inner.blocks.get(tip)?;
        loop {
            path.push(cursor.clone());
            if target_ancestors.contains(&cursor.body.hash) {
                break;
            }
            if cursor.is_genesis() {
                return None;
            }
            cursor = inner.blocks.get(&cursor.body.previous_hash)?;
        }

        if path.len() > limit {
            match policy {
                TruncationPolicy::ReturnLeastRecent => {
                    path.drain(..path.len() - limit);
                }
                TruncationPolicy::ReturnMostRecent => {
                    path.truncate(limit);
                }
            }
        }

        Some(path)
    }

    fn reset(&self) {
        *self.inner.write() = ChainInner::genesis_only();
    }
}
