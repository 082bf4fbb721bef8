//! Metrics facade for blockforge.
//!
//! Provides a [`MetricsRecorder`] trait with domain-specific methods and
//! default no-op implementations. A global singleton recorder is accessed
//! via [`recorder()`], and convenience free functions delegate to it.
//!
//! # Usage
//!
//! Callers record metrics via free functions:
//! ```ignore
//! blockforge_metrics::record_state_visit("synchronising");
//! blockforge_metrics::record_block_committed(height);
//! ```
//!
//! At startup, install a backend with [`set_global_recorder`]. Without one,
//! all recording is a no-op.

use std::sync::OnceLock;

/// Domain-specific metrics recording trait.
///
/// All methods have default no-op implementations so backends only need
/// to override the metrics they care about.
#[allow(unused_variables)]
pub trait MetricsRecorder: Send + Sync + 'static {
    // ── Coordinator ──────────────────────────────────────────────────

    /// Record a visit to a coordinator state.
    fn record_state_visit(&self, state: &'static str) {}

    /// Record a block committed after post-execution validation.
    fn record_block_committed(&self, block_number: u64) {}

    /// Record a block rejected and purged from the chain.
    fn record_block_rejected(&self, reason: &'static str) {}

    /// Record a block minted and transmitted by this node.
    fn record_block_mined(&self, block_number: u64) {}

    /// Record a revert of the state store during fork reconciliation.
    fn record_chain_revert(&self, block_number: u64) {}

    /// Set the executed block height gauge.
    fn set_block_height(&self, block_number: u64) {}

    // ── Transaction synchronisation ──────────────────────────────────

    /// Set the gauge of transactions the current block still waits for.
    fn set_pending_transactions(&self, count: usize) {}

    /// Record a peer solicitation for missing transactions.
    fn record_missing_tx_request(&self, count: usize) {}
}

struct NoopRecorder;
impl MetricsRecorder for NoopRecorder {}

static RECORDER: OnceLock<Box<dyn MetricsRecorder>> = OnceLock::new();

/// Install a global metrics recorder.
///
/// Can only be called once. Subsequent calls are silently ignored.
pub fn set_global_recorder(recorder: Box<dyn MetricsRecorder>) {
    let _ = RECORDER.set(recorder);
}

/// Get the global metrics recorder.
///
/// Returns a no-op recorder if none has been installed.
#[inline]
fn recorder() -> &'static dyn MetricsRecorder {
    RECORDER.get().map(|r| r.as_ref()).unwrap_or(&NoopRecorder)
}

// ── Coordinator ──────────────────────────────────────────────────────

/// Record a visit to a coordinator state.
#[inline]
pub fn record_state_visit(state: &'static str) {
    recorder().record_state_visit(state);
}

/// Record a block committed after post-execution validation.
#[inline]
pub fn record_block_committed(block_number: u64) {
    recorder().record_block_committed(block_number);
}

/// Record a block rejected and purged from the chain.
#[inline]
pub fn record_block_rejected(reason: &'static str) {
    recorder().record_block_rejected(reason);
}

/// Record a block minted and transmitted by this node.
#[inline]
pub fn record_block_mined(block_number: u64) {
    recorder().record_block_mined(block_number);
}

/// Record a revert of the state store during fork reconciliation.
#[inline]
pub fn record_chain_revert(block_number: u64) {
    recorder().record_chain_revert(block_number);
}

/// Set the executed block height gauge.
#[inline]
pub fn set_block_height(block_number: u64) {
    recorder().set_block_height(block_number);
}

// ── Transaction synchronisation ──────────────────────────────────────

/// Set the gauge of transactions the current block still waits for.
#[inline]
pub fn set_pending_transactions(count: usize) {
    recorder().set_pending_transactions(count);
}

/// Record a peer solicitation for missing transactions.
#[inline]
pub fn record_missing_tx_request(count: usize) {
    recorder().record_missing_tx_request(count);
}
