//! Atomically publishable last-executed block digest.

use arc_swap::ArcSwap;
use blockforge_types::{Hash, GENESIS_DIGEST};
use std::sync::Arc;

/// The digest of the most recently executed block, readable from any thread.
///
/// The coordinator advances this only after a block passes post-execution
/// validation and its state is committed; other node subsystems (RPC, peer
/// handshakes) read it without taking a lock.
pub struct LastExecutedBlock {
    inner: ArcSwap<Hash>,
}

impl LastExecutedBlock {
    /// Create a container holding the genesis digest.
    pub fn new() -> Self {
        Self {
            inner: ArcSwap::from_pointee(GENESIS_DIGEST),
        }
    }

    /// Read the current digest.
    pub fn get(&self) -> Hash {
        **self.inner.load()
    }

    /// Publish a new digest.
    pub fn set(&self, hash: Hash) {
        self.inner.store(Arc::new(hash));
    }
}

impl Default for LastExecutedBlock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_genesis() {
        let last = LastExecutedBlock::new();
        assert_eq!(last.get(), GENESIS_DIGEST);
    }

    #[test]
    fn test_set_publishes() {
        let last = LastExecutedBlock::new();
        let hash = Hash::from_bytes(b"block");
        last.set(hash);
        assert_eq!(last.get(), hash);
    }

    #[test]
    fn test_readable_across_threads() {
        let last = Arc::new(LastExecutedBlock::new());
        let hash = Hash::from_bytes(b"block");

        let writer = last.clone();
        let handle = std::thread::spawn(move || writer.set(hash));
        handle.join().unwrap();

        assert_eq!(last.get(), hash);
    }
}
