//! The block coordinator state machine.
//!
//! A single-threaded cooperative state machine that drives the node through
//! chain reconciliation, transaction synchronisation, block execution, state
//! commitment and block production. Each [`step`](BlockCoordinator::step)
//! runs exactly one state handler to completion and returns the next state
//! plus an optional delay; the driver honours the delay between steps, so no
//! handler ever blocks its host thread.
//!
//! Two pipelines hang off the synchronisation loop:
//!
//! ```text
//!                        ┌──────────────► Synchronised ──► (mint pipeline)
//! ReloadState ──► Reset ──► Synchronising
//!                        └──────────────► PreExecBlockValidation
//!                                         WaitForTransactions
//!                                         SynergeticExecution
//!                                         ScheduleBlockExecution
//!                                         WaitForExecution
//!                                         PostExecBlockValidation ──► Reset
//! ```
//!
//! Every failure maps to a `Reset` transition with a log line; errors are
//! never propagated across handler boundaries, and the last-executed digest
//! only advances on blocks whose post-execution validation passed.

use crate::{CoordinatorConfig, CoordinatorStatus, LastExecutedBlock};
use blockforge_core::{
    map_engine_status, BlockPacker, BlockSink, BlockStatus, Clock, CoordinatorState, Dag, Deadline,
    ExecutionEngine, ExecutionStatus, MainChain, Periodic, ProofMiner, ScheduleStatus, StakeOracle,
    StateStore, StatusCache, SynergeticExecutionManager, SynergeticStatus, TransactionIndex,
    TruncationPolicy,
};
use blockforge_metrics as metrics;
use blockforge_types::{
    Block, BlockBody, DigestSet, MinerId, TransactionStatus, GENESIS_DIGEST, GENESIS_MERKLE_ROOT,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Delay after observing an unusable heaviest tip.
const INVALID_TIP_DELAY: Duration = Duration::from_millis(500);
/// Delay after a failed state revert, to let the network catch up and to
/// keep the logs readable.
const REVERT_FAILURE_DELAY: Duration = Duration::from_secs(5);
/// Idle delay while synchronised with nothing to do.
const IDLE_DELAY: Duration = Duration::from_millis(100);
/// Re-entry delay while waiting for transactions to arrive.
const TX_WAIT_DELAY: Duration = Duration::from_millis(200);
/// Re-entry delay while polling the execution engine.
const EXEC_POLL_DELAY: Duration = Duration::from_millis(20);
/// Proof candidates tried per proof-search entry.
const PROOF_SEARCH_BUDGET: usize = 100;

/// Result of a single state machine step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepOutcome {
    /// State whose handler just ran.
    pub previous: CoordinatorState,
    /// State the machine is now in.
    pub current: CoordinatorState,
    /// Delay the handler requested before the next step.
    pub delay: Option<Duration>,
}

/// The block coordinator.
///
/// Construct with [`new`](BlockCoordinator::new), attach the optional
/// collaborators with the `with_*` builders, then either drive it manually
/// with [`step`](BlockCoordinator::step) or hand it to a
/// [`CoordinatorDriver`](crate::CoordinatorDriver).
pub struct BlockCoordinator {
    config: CoordinatorConfig,
    clock: Arc<dyn Clock>,

    chain: Arc<dyn MainChain>,
    state_store: Arc<dyn StateStore>,
    execution: Arc<dyn ExecutionEngine>,
    tx_index: Arc<dyn TransactionIndex>,
    packer: Arc<dyn BlockPacker>,
    block_sink: Arc<dyn BlockSink>,
    status_cache: Arc<dyn StatusCache>,
    miner: Arc<dyn ProofMiner>,
    stake: Option<Arc<dyn StakeOracle>>,
    synergetic: Option<Arc<dyn SynergeticExecutionManager>>,
    dag: Option<Arc<dyn Dag>>,

    mining_identity: MinerId,
    mining_enabled: Arc<AtomicBool>,

    state: CoordinatorState,
    previous_state: CoordinatorState,
    steps: u64,
    pending_delay: Option<Duration>,

    /// Block currently being validated and executed; shared with the chain.
    current_block: Option<Arc<Block>>,
    /// Block being minted; exclusively owned until transmitted.
    next_block: Option<Block>,
    /// Digests the current block still waits for.
    pending_txs: Option<DigestSet>,
    /// Cached path from the tip down to the last common ancestor, tip first.
    ancestor_path: Vec<Arc<Block>>,
    /// Published digest of the last successfully executed block.
    last_executed: Arc<LastExecutedBlock>,

    have_asked_for_missing_txs: bool,
    wait_before_asking: Deadline,
    wait_for_tx_timeout: Deadline,

    tx_wait_periodic: Periodic,
    exec_wait_periodic: Periodic,
    syncing_periodic: Periodic,
    periodic_print: Periodic,

    /// Earliest time the next block may be minted.
    next_block_time: Duration,
}

impl BlockCoordinator {
    /// Create a coordinator over the mandatory collaborators.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: CoordinatorConfig,
        clock: Arc<dyn Clock>,
        chain: Arc<dyn MainChain>,
        state_store: Arc<dyn StateStore>,
        execution: Arc<dyn ExecutionEngine>,
        tx_index: Arc<dyn TransactionIndex>,
        packer: Arc<dyn BlockPacker>,
        block_sink: Arc<dyn BlockSink>,
        status_cache: Arc<dyn StatusCache>,
        miner: Arc<dyn ProofMiner>,
        mining_identity: MinerId,
    ) -> Self {
        let now = clock.now();
        let tx_wait_periodic = Periodic::new(config.tx_sync_notify_interval);
        let exec_wait_periodic = Periodic::new(config.exec_notify_interval);
        let syncing_periodic = Periodic::new(config.notify_interval);
        let periodic_print = Periodic::new(config.notify_interval);
        let next_block_time = now + config.block_period;

        Self {
            config,
            clock,
            chain,
            state_store,
            execution,
            tx_index,
            packer,
            block_sink,
            status_cache,
            miner,
            stake: None,
            synergetic: None,
            dag: None,
            mining_identity,
            mining_enabled: Arc::new(AtomicBool::new(true)),
            state: CoordinatorState::ReloadState,
            previous_state: CoordinatorState::ReloadState,
            steps: 0,
            pending_delay: None,
            current_block: None,
            next_block: None,
            pending_txs: None,
            ancestor_path: Vec::new(),
            last_executed: Arc::new(LastExecutedBlock::new()),
            have_asked_for_missing_txs: false,
            wait_before_asking: Deadline::new(),
            wait_for_tx_timeout: Deadline::new(),
            tx_wait_periodic,
            exec_wait_periodic,
            syncing_periodic,
            periodic_print,
            next_block_time,
        }
    }

    /// Attach a stake oracle.
    pub fn with_stake(mut self, stake: Arc<dyn StakeOracle>) -> Self {
        self.stake = Some(stake);
        self
    }

    /// Attach a synergetic execution manager.
    pub fn with_synergetic(mut self, synergetic: Arc<dyn SynergeticExecutionManager>) -> Self {
        self.synergetic = Some(synergetic);
        self
    }

    /// Attach a DAG epoch manager.
    pub fn with_dag(mut self, dag: Arc<dyn Dag>) -> Self {
        self.dag = Some(dag);
        self
    }

    /// Current state machine tag.
    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    /// Shared handle to the last-executed digest, for other subsystems.
    pub fn last_executed_block(&self) -> Arc<LastExecutedBlock> {
        self.last_executed.clone()
    }

    /// Shared switch that enables or disables minting at runtime.
    pub fn mining_enabled_handle(&self) -> Arc<AtomicBool> {
        self.mining_enabled.clone()
    }

    /// Force the mint deadline to now so the next synchronised step can
    /// generate a block.
    pub fn trigger_block_generation(&mut self) {
        if self.config.mining {
            self.next_block_time = self.clock.now();
        }
    }

    /// Reset the executed prefix and the chain back to genesis.
    pub fn hard_reset(&mut self) {
        self.last_executed.set(GENESIS_DIGEST);
        self.execution.set_last_processed_block(GENESIS_DIGEST);
        self.chain.reset();
    }

    /// Point-in-time status snapshot.
    pub fn status(&self) -> CoordinatorStatus {
        CoordinatorStatus {
            state: self.state.as_str(),
            last_executed: self.last_executed.get().to_hex(),
            current_block_number: self.current_block.as_ref().map(|b| b.body.block_number),
            pending_transactions: self.pending_txs.as_ref().map_or(0, DigestSet::len),
            mining: self.config.mining,
            steps: self.steps,
        }
    }

    /// Run one state handler and advance the machine.
    pub fn step(&mut self) -> StepOutcome {
        let entered = self.state;
        self.steps += 1;
        metrics::record_state_visit(entered.as_str());

        let next = match entered {
            CoordinatorState::ReloadState => self.on_reload_state(),
            CoordinatorState::Synchronising => self.on_synchronising(),
            CoordinatorState::Synchronised => self.on_synchronised(),
            CoordinatorState::PreExecBlockValidation => self.on_pre_exec_block_validation(),
            CoordinatorState::WaitForTransactions => self.on_wait_for_transactions(),
            CoordinatorState::SynergeticExecution => self.on_synergetic_execution(),
            CoordinatorState::ScheduleBlockExecution => self.on_schedule_block_execution(),
            CoordinatorState::WaitForExecution => self.on_wait_for_execution(),
            CoordinatorState::PostExecBlockValidation => self.on_post_exec_block_validation(),
            CoordinatorState::NewSynergeticExecution => self.on_new_synergetic_execution(),
            CoordinatorState::PackNewBlock => self.on_pack_new_block(),
            CoordinatorState::ExecuteNewBlock => self.on_execute_new_block(),
            CoordinatorState::WaitForNewBlockExecution => self.on_wait_for_new_block_execution(),
            CoordinatorState::ProofSearch => self.on_proof_search(),
            CoordinatorState::TransmitBlock => self.on_transmit_block(),
            CoordinatorState::Reset => self.on_reset(),
        };

        if next != entered && self.periodic_print.poll(self.clock.now()) {
            info!(current = %next, previous = %entered, "coordinator state");
        }

        self.previous_state = entered;
        self.state = next;

        StepOutcome {
            previous: entered,
            current: next,
            delay: self.pending_delay.take(),
        }
    }

    /// Request a delay before the next step.
    fn delay(&mut self, duration: Duration) {
        self.pending_delay = Some(duration);
    }

    // ═══════════════════════════════════════════════════════════════════
    // Synchronisation loop
    // ═══════════════════════════════════════════════════════════════════

    /// Startup recovery: restore the state store to the heaviest block and
    /// line the execution engine up behind it.
    fn on_reload_state(&mut self) -> CoordinatorState {
        if self.current_block.is_none() {
            self.current_block = self.chain.heaviest_block();
        }

        if let Some(block) = self.current_block.clone() {
            if !block.is_genesis() {
                let reverted = self
                    .state_store
                    .revert_to_hash(&block.body.merkle_hash, block.body.block_number);
                let dag_reverted = match &self.dag {
                    Some(dag) => dag.revert_to_epoch(block.body.block_number),
                    None => true,
                };

                if reverted && dag_reverted {
                    self.execution.set_last_processed_block(block.body.hash);
                    self.last_executed.set(block.body.hash);
                    info!(
                        block = %block.body.hash,
                        number = block.body.block_number,
                        "recovered ledger state"
                    );
                } else {
                    warn!(
                        block = %block.body.hash,
                        number = block.body.block_number,
                        "unable to recover ledger state, resynchronising from genesis"
                    );
                }
            }
        }

        CoordinatorState::Reset
    }

    fn on_synchronising(&mut self) -> CoordinatorState {
        let now = self.clock.now();

        if self.current_block.is_none() {
            self.current_block = self.chain.heaviest_block();
        }

        let Some(current) = self.current_block.clone() else {
            error!("no heaviest block available");
            self.delay(INVALID_TIP_DELAY);
            return CoordinatorState::Reset;
        };

        if current.body.hash.is_zero() {
            error!("invalid heaviest block, empty block hash");
            self.delay(INVALID_TIP_DELAY);
            return CoordinatorState::Reset;
        }

        let extra_debug = self.syncing_periodic.poll(now);

        let current_hash = current.body.hash;
        let previous_hash = current.body.previous_hash;
        let last_processed = self.execution.last_processed_block();

        if extra_debug {
            debug!(
                heaviest = %self.chain.heaviest_block_hash(),
                current = %current_hash,
                previous = %previous_hash,
                desired_state = %current.body.merkle_hash,
                current_state = %self.state_store.current_hash(),
                last_commit_state = %self.state_store.last_commit_hash(),
                last_processed = %last_processed,
                last_executed = %self.last_executed.get(),
                "synchronisation progress"
            );
        }

        if last_processed == GENESIS_DIGEST {
            // Nothing executed yet: walk back to the genesis block and
            // start executing from there.
            if previous_hash == GENESIS_DIGEST {
                return CoordinatorState::PreExecBlockValidation;
            }

            match self.chain.get_block(&previous_hash) {
                Some(previous) => {
                    self.current_block = Some(previous);
                    CoordinatorState::Synchronising
                }
                None => {
                    warn!(block = %current_hash, "unable to look up previous block");
                    CoordinatorState::Reset
                }
            }
        } else if current_hash == last_processed {
            // The executed prefix has caught up with the tip.
            CoordinatorState::Synchronised
        } else {
            self.reconcile_fork(&current, extra_debug)
        }
    }

    /// The executed prefix and the heaviest tip have diverged: revert to the
    /// common ancestor and execute the tip's side of the fork.
    fn reconcile_fork(&mut self, current: &Arc<Block>, extra_debug: bool) -> CoordinatorState {
        let current_hash = current.body.hash;
        let last_processed = self.execution.last_processed_block();

        if self.ancestor_path.is_empty() {
            match self.chain.path_to_common_ancestor(
                &current_hash,
                &last_processed,
                self.config.common_path_limit,
                TruncationPolicy::ReturnLeastRecent,
            ) {
                Some(path) => self.ancestor_path = path,
                None => {
                    warn!(block = %current_hash, "unable to look up common ancestor");
                    return CoordinatorState::Reset;
                }
            }
        }

        debug_assert!(
            self.ancestor_path.len() >= 2,
            "ancestor path must hold the common parent and the next block",
        );
        if self.ancestor_path.len() < 2 {
            self.ancestor_path.clear();
            return CoordinatorState::Reset;
        }

        let common_parent = self.ancestor_path[self.ancestor_path.len() - 1].clone();
        let next = self.ancestor_path[self.ancestor_path.len() - 2].clone();

        if extra_debug {
            let completion =
                next.body.block_number as f64 * 100.0 / current.body.block_number.max(1) as f64;
            info!(
                "synchronisation in progress: {completion:.1}% (block {} of {})",
                next.body.block_number, current.body.block_number,
            );
        }

        // The common parent must still be a known snapshot; losing it means
        // the executed prefix is unrecoverable and the node starts over.
        if !self
            .state_store
            .hash_exists(&common_parent.body.merkle_hash, common_parent.body.block_number)
        {
            error!(
                block = %current_hash,
                ancestor = %common_parent.body.hash,
                number = common_parent.body.block_number,
                "ancestor state is unreachable, reverting to genesis"
            );

            self.execution.set_last_processed_block(GENESIS_DIGEST);
            if !self.state_store.revert_to_hash(&GENESIS_MERKLE_ROOT, 0) {
                error!("unable to revert state store to genesis");
            }
            if let Some(dag) = &self.dag {
                if !dag.revert_to_epoch(0) {
                    error!("unable to revert dag to genesis");
                }
            }

            self.delay(REVERT_FAILURE_DELAY);
            return CoordinatorState::Reset;
        }

        if !self
            .state_store
            .revert_to_hash(&common_parent.body.merkle_hash, common_parent.body.block_number)
        {
            error!(
                block = %current_hash,
                ancestor = %common_parent.body.hash,
                "unable to restore ancestor state"
            );
            self.delay(REVERT_FAILURE_DELAY);
            return CoordinatorState::Reset;
        }

        if let Some(dag) = &self.dag {
            if !dag.revert_to_epoch(common_parent.body.block_number) {
                error!(
                    number = common_parent.body.block_number,
                    "unable to revert dag to ancestor epoch"
                );
                self.delay(REVERT_FAILURE_DELAY);
                return CoordinatorState::Reset;
            }
        }

        metrics::record_chain_revert(common_parent.body.block_number);

        self.current_block = Some(next);
        self.ancestor_path.pop();

        // Short residuals are cheaper to re-derive step by step than to
        // keep consistent across tip changes.
        if self.ancestor_path.len() < self.config.fast_sync_threshold {
            self.ancestor_path.clear();
        }

        CoordinatorState::PreExecBlockValidation
    }

    fn on_synchronised(&mut self) -> CoordinatorState {
        let now = self.clock.now();
        self.syncing_periodic.reset(now);

        let Some(current) = self.current_block.clone() else {
            return CoordinatorState::Reset;
        };

        if self.chain.heaviest_block_hash() != current.body.hash {
            // The tip moved underneath us; re-evaluate the chain.
            return CoordinatorState::Reset;
        }

        if self.config.mining
            && self.mining_enabled.load(Ordering::Relaxed)
            && now >= self.next_block_time
        {
            if let Some(stake) = &self.stake {
                if !stake.should_generate_block(&current, &self.mining_identity) {
                    self.delay(IDLE_DELAY);
                    return CoordinatorState::Synchronised;
                }
            }

            let mut next = Block::new(
                current.body.hash,
                current.body.block_number + 1,
                self.mining_identity,
            );

            if let Some(stake) = &self.stake {
                next.weight = stake.block_generation_weight(&current, &self.mining_identity);
            }

            if let Some(dag) = &self.dag {
                next.body.dag_epoch = Some(dag.create_epoch(next.body.block_number));
            }

            next.proof.set_target(self.config.block_difficulty);

            // The minted block replaces the tip as the block being worked on.
            self.next_block = Some(next);
            self.current_block = None;

            return CoordinatorState::NewSynergeticExecution;
        }

        if self.previous_state == CoordinatorState::Synchronising {
            info!(
                block = %current.body.hash,
                number = current.body.block_number,
                previous = %current.body.previous_hash,
                "chain synchronisation complete"
            );
        } else {
            self.delay(IDLE_DELAY);
        }

        CoordinatorState::Synchronised
    }

    // ═══════════════════════════════════════════════════════════════════
    // Pipeline 1: validate and execute received blocks
    // ═══════════════════════════════════════════════════════════════════

    /// Purge a block that failed validation and restart coordination.
    fn reject_current(&mut self, block: &Block, reason: &'static str) -> CoordinatorState {
        warn!(block = %block.body.hash, reason, "block validation failed");
        self.chain.remove_block(&block.body.hash);
        metrics::record_block_rejected(reason);
        CoordinatorState::Reset
    }

    fn on_pre_exec_block_validation(&mut self) -> CoordinatorState {
        let Some(current) = self.current_block.clone() else {
            return CoordinatorState::Reset;
        };

        if !current.is_genesis() {
            let Some(previous) = self.chain.get_block(&current.body.previous_hash) else {
                return self.reject_current(&current, "no previous block in chain");
            };

            if let Some(stake) = &self.stake {
                if !stake.valid_miner_for_block(&previous, &current.body.miner) {
                    return self.reject_current(&current, "miner not entitled to block");
                }
                if current.weight
                    != stake.block_generation_weight(&previous, &current.body.miner)
                {
                    return self.reject_current(&current, "incorrect generation weight");
                }
            }

            if previous.body.block_number + 1 != current.body.block_number {
                return self.reject_current(&current, "block number mismatch");
            }

            if self.config.num_lanes != 1u64 << current.body.log2_num_lanes {
                return self.reject_current(&current, "lane count mismatch");
            }

            if self.config.num_slices != current.body.slices.len() {
                return self.reject_current(&current, "slice count mismatch");
            }

            // Work certified by the block is identified up front so a block
            // carrying malformed work never reaches execution.
            if let Some(synergetic) = self.synergetic.clone() {
                let status = synergetic.prepare_work_queue(&current, &previous);
                if status != SynergeticStatus::Success {
                    return self.reject_current(&current, "block certifies invalid work");
                }
            }
        }

        let now = self.clock.now();
        self.tx_wait_periodic.reset(now);

        CoordinatorState::WaitForTransactions
    }

    fn on_wait_for_transactions(&mut self) -> CoordinatorState {
        let now = self.clock.now();

        let Some(current) = self.current_block.clone() else {
            return CoordinatorState::Reset;
        };

        if self.previous_state == CoordinatorState::WaitForTransactions {
            if self.have_asked_for_missing_txs {
                if self.wait_for_tx_timeout.has_expired(now) {
                    // The network never produced the transactions; treat the
                    // block as unreachable and discard it.
                    return self.reject_current(&current, "transactions never arrived");
                }
            } else if self.wait_before_asking.has_expired(now) {
                if let Some(pending) = &self.pending_txs {
                    self.tx_index.issue_call_for_missing_txs(pending);
                    metrics::record_missing_tx_request(pending.len());
                }
                self.have_asked_for_missing_txs = true;
                self.wait_for_tx_timeout
                    .restart(now, self.config.wait_for_tx_timeout);
            }
        } else {
            // Only just started waiting: arm the countdown to soliciting
            // peers.
            self.wait_before_asking
                .restart(now, self.config.wait_before_asking_for_missing_txs);
            self.have_asked_for_missing_txs = false;
        }

        let dag_ready = match (&self.dag, &current.body.dag_epoch) {
            (Some(dag), Some(epoch)) => dag.satisfy_epoch(epoch),
            _ => true,
        };

        if self.pending_txs.is_none() {
            self.pending_txs = Some(current.digest_set());
        }

        let tx_index = self.tx_index.clone();
        let remaining = match self.pending_txs.as_mut() {
            Some(pending) => {
                pending.retain(|digest| !tx_index.has_transaction(digest));
                pending.len()
            }
            None => 0,
        };
        metrics::set_pending_transactions(remaining);

        if remaining == 0 && dag_ready {
            debug!(block = %current.body.hash, "all transactions synchronised");
            self.pending_txs = None;
            return CoordinatorState::SynergeticExecution;
        }

        if self.tx_wait_periodic.poll(now) {
            info!(
                remaining,
                block = %current.body.hash,
                "waiting for transactions to synchronise"
            );
        }
        if !dag_ready {
            debug!(block = %current.body.hash, "waiting for dag epoch");
        }

        self.delay(TX_WAIT_DELAY);
        CoordinatorState::WaitForTransactions
    }

    fn on_synergetic_execution(&mut self) -> CoordinatorState {
        let Some(current) = self.current_block.clone() else {
            return CoordinatorState::Reset;
        };

        if !current.is_genesis() {
            if let Some(synergetic) = self.synergetic.clone() {
                let Some(previous) = self.chain.get_block(&current.body.previous_hash) else {
                    warn!(block = %current.body.hash, "unable to look up previous block");
                    return CoordinatorState::Reset;
                };

                let status = synergetic.prepare_work_queue(&current, &previous);
                if status != SynergeticStatus::Success {
                    warn!(?status, "error preparing synergetic work queue");
                    return CoordinatorState::Reset;
                }

                if !synergetic
                    .validate_work_and_update_state(current.body.block_number, self.config.num_lanes)
                {
                    return self.reject_current(&current, "synergetic work did not execute");
                }
            }
        }

        CoordinatorState::ScheduleBlockExecution
    }

    fn on_schedule_block_execution(&mut self) -> CoordinatorState {
        let Some(current) = self.current_block.clone() else {
            error!("no block to schedule for execution");
            return CoordinatorState::Reset;
        };

        if self.schedule_block(&current.body) {
            let now = self.clock.now();
            self.exec_wait_periodic.reset(now);
            CoordinatorState::WaitForExecution
        } else {
            CoordinatorState::Reset
        }
    }

    fn on_wait_for_execution(&mut self) -> CoordinatorState {
        match self.query_executor_status() {
            ExecutionStatus::Idle => CoordinatorState::PostExecBlockValidation,
            ExecutionStatus::Running => {
                let now = self.clock.now();
                if self.exec_wait_periodic.poll(now) {
                    if let Some(current) = &self.current_block {
                        info!(block = %current.body.hash, "waiting for block execution");
                    }
                }
                self.delay(EXEC_POLL_DELAY);
                CoordinatorState::WaitForExecution
            }
            ExecutionStatus::Stalled | ExecutionStatus::Error => CoordinatorState::Reset,
        }
    }

    fn on_post_exec_block_validation(&mut self) -> CoordinatorState {
        let Some(current) = self.current_block.clone() else {
            return CoordinatorState::Reset;
        };

        let state_hash = self.state_store.current_hash();
        let invalid_block = !current.is_genesis() && state_hash != current.body.merkle_hash;

        if invalid_block {
            warn!(
                block = %current.body.hash,
                expected = %current.body.merkle_hash,
                actual = %state_hash,
                "block validation failed: state root mismatch"
            );

            // Restore the predecessor's state; failing that, start over
            // from genesis.
            let mut reverted = false;
            if let Some(previous) = self.chain.get_block(&current.body.previous_hash) {
                let dag_reverted = match &self.dag {
                    Some(dag) => dag.revert_to_epoch(previous.body.block_number),
                    None => true,
                };
                if dag_reverted
                    && self
                        .state_store
                        .revert_to_hash(&previous.body.merkle_hash, previous.body.block_number)
                {
                    self.execution.set_last_processed_block(previous.body.hash);
                    reverted = true;
                }
            }

            if !reverted {
                if let Some(dag) = &self.dag {
                    dag.revert_to_epoch(0);
                }
                self.state_store.revert_to_hash(&GENESIS_MERKLE_ROOT, 0);
                self.execution.set_last_processed_block(GENESIS_DIGEST);
            }

            self.chain.remove_block(&current.body.hash);
            metrics::record_block_rejected("state root mismatch");
        } else {
            self.update_tx_status(&current);
            self.state_store.commit(current.body.block_number);
            if let (Some(dag), Some(epoch)) = (&self.dag, &current.body.dag_epoch) {
                dag.commit_epoch(epoch);
            }
            self.last_executed.set(current.body.hash);
            metrics::record_block_committed(current.body.block_number);
            metrics::set_block_height(current.body.block_number);
        }

        CoordinatorState::Reset
    }

    // ═══════════════════════════════════════════════════════════════════
    // Pipeline 2: mint a new block
    // ═══════════════════════════════════════════════════════════════════

    fn on_new_synergetic_execution(&mut self) -> CoordinatorState {
        if let (Some(synergetic), Some(_)) = (self.synergetic.clone(), &self.dag) {
            let Some(next) = self.next_block.as_ref() else {
                return CoordinatorState::Reset;
            };
            let Some(previous) = self.chain.get_block(&next.body.previous_hash) else {
                warn!(parent = %next.body.previous_hash, "unable to look up mint parent");
                return CoordinatorState::Reset;
            };

            let status = synergetic.prepare_work_queue(next, &previous);
            if status != SynergeticStatus::Success {
                warn!(?status, "error preparing synergetic work queue");
                return CoordinatorState::Reset;
            }

            let block_number = next.body.block_number;
            if !synergetic.validate_work_and_update_state(block_number, self.config.num_lanes) {
                warn!("unable to validate work queue for minted block");
                return CoordinatorState::Reset;
            }
        }

        CoordinatorState::PackNewBlock
    }

    fn on_pack_new_block(&mut self) -> CoordinatorState {
        let packed = {
            let Some(next) = self.next_block.as_mut() else {
                return CoordinatorState::Reset;
            };
            self.packer.generate_block(
                next,
                self.config.num_lanes,
                self.config.num_slices,
                self.chain.as_ref(),
            )
        };

        match packed {
            Ok(()) => {
                self.update_next_block_time();
                CoordinatorState::ExecuteNewBlock
            }
            Err(error) => {
                error!(%error, "error generated performing block packing");
                CoordinatorState::Reset
            }
        }
    }

    fn on_execute_new_block(&mut self) -> CoordinatorState {
        let body = match self.next_block.as_ref() {
            Some(next) => next.body.clone(),
            None => {
                error!("no minted block to execute");
                return CoordinatorState::Reset;
            }
        };

        if self.schedule_block(&body) {
            let now = self.clock.now();
            self.exec_wait_periodic.reset(now);
            CoordinatorState::WaitForNewBlockExecution
        } else {
            CoordinatorState::Reset
        }
    }

    fn on_wait_for_new_block_execution(&mut self) -> CoordinatorState {
        match self.query_executor_status() {
            ExecutionStatus::Idle => {
                let state_store = self.state_store.clone();
                let dag = self.dag.clone();

                let Some(next) = self.next_block.as_mut() else {
                    return CoordinatorState::Reset;
                };

                // The state root was unknown when the block was packed;
                // capture it now that execution has applied the writes.
                next.body.merkle_hash = state_store.current_hash();
                debug!(merkle = %next.body.merkle_hash, "captured minted state root");

                state_store.commit(next.body.block_number);
                if let (Some(dag), Some(epoch)) = (&dag, &next.body.dag_epoch) {
                    dag.commit_epoch(epoch);
                }

                CoordinatorState::ProofSearch
            }
            ExecutionStatus::Running => {
                let now = self.clock.now();
                if self.exec_wait_periodic.poll(now) {
                    if let Some(next) = &self.next_block {
                        info!(
                            parent = %next.body.previous_hash,
                            "waiting for minted block execution"
                        );
                    }
                }
                self.delay(EXEC_POLL_DELAY);
                CoordinatorState::WaitForNewBlockExecution
            }
            ExecutionStatus::Stalled | ExecutionStatus::Error => CoordinatorState::Reset,
        }
    }

    fn on_proof_search(&mut self) -> CoordinatorState {
        let miner = self.miner.clone();
        let Some(next) = self.next_block.as_mut() else {
            return CoordinatorState::Reset;
        };

        if !miner.mine(next, PROOF_SEARCH_BUDGET) {
            return CoordinatorState::ProofSearch;
        }

        next.update_digest();
        let hash = next.body.hash;
        debug!(block = %hash, "proof found for minted block");

        // The engine executed this block before its digest existed, so its
        // last-processed record has to be set explicitly.
        self.execution.set_last_processed_block(hash);

        CoordinatorState::TransmitBlock
    }

    fn on_transmit_block(&mut self) -> CoordinatorState {
        let Some(next) = self.next_block.clone() else {
            return CoordinatorState::Reset;
        };

        match self.chain.add_block(next.clone()) {
            BlockStatus::Added => {
                info!(
                    block = %next.body.hash,
                    number = next.body.block_number,
                    txs = next.transaction_count(),
                    "broadcasting minted block"
                );

                self.update_tx_status(&next);
                self.last_executed.set(next.body.hash);
                metrics::record_block_mined(next.body.block_number);
                metrics::set_block_height(next.body.block_number);

                self.block_sink.on_block(next);
            }
            status => {
                warn!(?status, block = %next.body.hash, "minted block not accepted by chain");
            }
        }

        CoordinatorState::Reset
    }

    // ═══════════════════════════════════════════════════════════════════
    // Reset
    // ═══════════════════════════════════════════════════════════════════

    fn on_reset(&mut self) -> CoordinatorState {
        // The stake oracle hears about whichever block just finished its
        // lifecycle, minted or received.
        if let Some(stake) = &self.stake {
            if let Some(next) = &self.next_block {
                stake.update_current_block(next);
            } else if let Some(current) = &self.current_block {
                stake.update_current_block(current);
            }
        }

        self.current_block = None;
        self.next_block = None;
        self.pending_txs = None;
        self.ancestor_path.clear();
        self.have_asked_for_missing_txs = false;
        self.wait_before_asking.clear();
        self.wait_for_tx_timeout.clear();

        self.update_next_block_time();

        CoordinatorState::Synchronising
    }

    // ═══════════════════════════════════════════════════════════════════
    // Helpers
    // ═══════════════════════════════════════════════════════════════════

    fn schedule_block(&self, body: &BlockBody) -> bool {
        debug!(block = %body.hash, number = body.block_number, "scheduling block for execution");

        match self.execution.execute(body) {
            ScheduleStatus::Scheduled => true,
            status => {
                error!(?status, "execution engine refused block");
                false
            }
        }
    }

    fn query_executor_status(&self) -> ExecutionStatus {
        let engine_state = self.execution.state();
        let status = map_engine_status(engine_state);
        if status == ExecutionStatus::Error {
            warn!(?engine_state, "execution engine in error state");
        }
        status
    }

    fn update_tx_status(&self, block: &Block) {
        for digest in block.transaction_digests() {
            self.status_cache.update(digest, TransactionStatus::Executed);
        }
    }

    fn update_next_block_time(&mut self) {
        self.next_block_time = self.clock.now() + self.config.block_period;
    }
}

