//! In-memory Merkle-versioned state store.

use blockforge_core::StateStore;
use blockforge_types::{Hash, GENESIS_MERKLE_ROOT};
use parking_lot::RwLock;
use std::collections::HashSet;
use tracing::debug;

struct StateInner {
    /// Root of the working state.
    current: Hash,
    /// Commits in the order they were recorded.
    commits: Vec<(u64, Hash)>,
    /// Snapshot lookup for `hash_exists` / `revert_to_hash`.
    snapshots: HashSet<(Hash, u64)>,
}

/// State store that tracks roots and committed snapshots without holding any
/// actual ledger state.
///
/// The working root is set by the execution engine through
/// [`set_current`](InMemoryStateStore::set_current); commits record the
/// working root as the snapshot for a block number. The empty-state snapshot
/// `(GENESIS_MERKLE_ROOT, 0)` always exists.
pub struct InMemoryStateStore {
    inner: RwLock<StateInner>,
    revert_log: RwLock<Vec<(Hash, u64)>>,
}

impl InMemoryStateStore {
    /// Create a store holding only the empty-state snapshot.
    pub fn new() -> Self {
        let mut snapshots = HashSet::new();
        snapshots.insert((GENESIS_MERKLE_ROOT, 0));
        Self {
            inner: RwLock::new(StateInner {
                current: GENESIS_MERKLE_ROOT,
                commits: Vec::new(),
                snapshots,
            }),
            revert_log: RwLock::new(Vec::new()),
        }
    }

    /// Overwrite the working root; called by the execution engine after
    /// applying a block's writes.
    pub fn set_current(&self, root: Hash) {
        self.inner.write().current = root;
    }

    /// All commits recorded so far, in order.
    pub fn commits(&self) -> Vec<(u64, Hash)> {
        self.inner.read().commits.clone()
    }

    /// All reverts observed so far, in order.
    pub fn reverts(&self) -> Vec<(Hash, u64)> {
        self.revert_log.read().clone()
    }
}

impl Default for InMemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore for InMemoryStateStore {
    fn current_hash(&self) -> Hash {
        self.inner.read().current
    }

    fn last_commit_hash(&self) -> Hash {
        self.inner
            .read()
            .commits
            .last()
            .map(|(_, root)| *root)
            .unwrap_or(GENESIS_MERKLE_ROOT)
    }

    fn hash_exists(&self, root: &Hash, block_number: u64) -> bool {
        self.inner.read().snapshots.contains(&(*root, block_number))
    }

    fn revert_to_hash(&self, root: &Hash, block_number: u64) -> bool {
        let mut inner = self.inner.write();
        if !inner.snapshots.contains(&(*root, block_number)) {
            return false;
        }
        inner.current = *root;
        self.revert_log.write().push((*root, block_number));
        debug!(root = %root, block_number, "state reverted");
        true
    }

    fn commit(&self, block_number: u64) {
        let mut inner = self.inner.write();
        let root = inner.current;
        inner.commits.push((block_number, root));
        inner.snapshots.insert((root, block_number));
        debug!(root = %root, block_number, "state committed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let store = InMemoryStateStore::new();
        assert_eq!(store.current_hash(), GENESIS_MERKLE_ROOT);
        assert_eq!(store.last_commit_hash(), GENESIS_MERKLE_ROOT);
        assert!(store.hash_exists(&GENESIS_MERKLE_ROOT, 0));
        assert!(store.commits().is_empty());
    }

    #[test]
    fn test_commit_records_snapshot() {
        let store = InMemoryStateStore::new();
        let root = Hash::from_bytes(b"root-1");
        store.set_current(root);
        store.commit(1);

        assert_eq!(store.last_commit_hash(), root);
        assert!(store.hash_exists(&root, 1));
        assert!(!store.hash_exists(&root, 2));
        assert_eq!(store.commits(), vec![(1, root)]);
    }

    #[test]
    fn test_revert_requires_known_snapshot() {
        let store = InMemoryStateStore::new();
        let root = Hash::from_bytes(b"root-1");
        assert!(!store.revert_to_hash(&root, 1));

        store.set_current(root);
        store.commit(1);
        store.set_current(Hash::from_bytes(b"root-2"));

        assert!(store.revert_to_hash(&root, 1));
        assert_eq!(store.current_hash(), root);
        assert_eq!(store.reverts(), vec![(root, 1)]);
    }

    #[test]
    fn test_revert_to_genesis_always_possible() {
        let store = InMemoryStateStore::new();
        store.set_current(Hash::from_bytes(b"dirty"));
        assert!(store.revert_to_hash(&GENESIS_MERKLE_ROOT, 0));
        assert_eq!(store.current_hash(), GENESIS_MERKLE_ROOT);
    }
}
