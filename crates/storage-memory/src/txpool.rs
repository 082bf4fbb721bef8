//! In-memory transaction pool index and status cache.

use blockforge_core::{StatusCache, TransactionIndex};
use blockforge_types::{DigestSet, Hash, TransactionStatus};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use tracing::debug;

/// Transaction presence index with recorded peer solicitations.
///
/// Transactions are represented by digest only; arrival is modelled by
/// [`add`](InMemoryTransactionPool::add). Calls to
/// [`issue_call_for_missing_txs`](TransactionIndex::issue_call_for_missing_txs)
/// are recorded so tests can assert how and when peers were asked.
pub struct InMemoryTransactionPool {
    present: RwLock<DigestSet>,
    requests: Mutex<Vec<DigestSet>>,
}

impl InMemoryTransactionPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self {
            present: RwLock::new(DigestSet::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Mark a transaction as locally present.
    pub fn add(&self, digest: Hash) {
        self.present.write().insert(digest);
    }

    /// Mark several transactions as locally present.
    pub fn add_all(&self, digests: impl IntoIterator<Item = Hash>) {
        self.present.write().extend(digests);
    }

    /// Every peer solicitation issued so far, in order.
    pub fn missing_tx_requests(&self) -> Vec<DigestSet> {
        self.requests.lock().clone()
    }
}

impl Default for InMemoryTransactionPool {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionIndex for InMemoryTransactionPool {
    fn has_transaction(&self, digest: &Hash) -> bool {
        self.present.read().contains(digest)
    }

    fn issue_call_for_missing_txs(&self, digests: &DigestSet) {
        debug!(count = digests.len(), "solicited missing transactions");
        self.requests.lock().push(digests.clone());
    }
}

/// Map-backed transaction status cache.
pub struct InMemoryStatusCache {
    statuses: RwLock<HashMap<Hash, TransactionStatus>>,
}

impl InMemoryStatusCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            statuses: RwLock::new(HashMap::new()),
        }
    }

    /// The last recorded status for a digest.
    pub fn status_of(&self, digest: &Hash) -> TransactionStatus {
        self.statuses
            .read()
            .get(digest)
            .copied()
            .unwrap_or(TransactionStatus::Unknown)
    }
}

impl Default for InMemoryStatusCache {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusCache for InMemoryStatusCache {
    fn update(&self, digest: Hash, status: TransactionStatus) {
        self.statuses.write().insert(digest, status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_presence() {
        let pool = InMemoryTransactionPool::new();
        let digest = Hash::from_bytes(b"tx");
        assert!(!pool.has_transaction(&digest));

        pool.add(digest);
        assert!(pool.has_transaction(&digest));
    }

    #[test]
    fn test_pool_records_solicitations() {
        let pool = InMemoryTransactionPool::new();
        let wanted: DigestSet = [Hash::from_bytes(b"a"), Hash::from_bytes(b"b")]
            .into_iter()
            .collect();

        pool.issue_call_for_missing_txs(&wanted);
        let requests = pool.missing_tx_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0], wanted);
    }

    #[test]
    fn test_status_cache_defaults_to_unknown() {
        let cache = InMemoryStatusCache::new();
        let digest = Hash::from_bytes(b"tx");
        assert_eq!(cache.status_of(&digest), TransactionStatus::Unknown);

        cache.update(digest, TransactionStatus::Executed);
        assert_eq!(cache.status_of(&digest), TransactionStatus::Executed);
    }
}
