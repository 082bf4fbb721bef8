//! Shared fixtures for coordinator integration tests.
//!
//! Tests drive the coordinator deterministically: a [`ManualClock`] advances
//! by exactly the delay each step requested, the in-memory stores stand in
//! for real storage, and [`ScriptedEngine`] plays the execution engine with
//! scriptable completion latency, per-block state-root overrides and forced
//! failure states.

use blockforge_coordinator::{BlockCoordinator, CoordinatorConfig, NonceMiner, StepOutcome};
use blockforge_core::{
    BlockPacker, BlockSink, CoordinatorState, Dag, EngineState, ExecutionEngine, MainChain,
    ManualClock, PackerError, ScheduleStatus, StakeOracle, SynergeticExecutionManager,
    SynergeticStatus,
};
use blockforge_storage_memory::{
    InMemoryMainChain, InMemoryStateStore, InMemoryStatusCache, InMemoryTransactionPool,
};
use blockforge_types::{
    Block, BlockBody, DagEpoch, Hash, MinerId, TransactionSummary, GENESIS_DIGEST,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// State root the scripted engine produces for a block body.
///
/// Derived from everything but the body's own `merkle_hash`, so a block
/// builder can predict the root the engine will report and stamp it into the
/// block up front.
pub fn derived_root(body: &BlockBody) -> Hash {
    let mut parts: Vec<Vec<u8>> = vec![
        b"state".to_vec(),
        body.previous_hash.as_bytes().to_vec(),
        body.block_number.to_le_bytes().to_vec(),
    ];
    for slice in &body.slices {
        for tx in slice {
            parts.push(tx.digest.as_bytes().to_vec());
        }
    }
    let slices: Vec<&[u8]> = parts.iter().map(Vec::as_slice).collect();
    Hash::from_parts(&slices)
}

/// Build a valid child block carrying the given transaction digests.
///
/// The state root is pre-computed to match what [`ScriptedEngine`] will
/// produce, so the block passes post-execution validation.
pub fn build_block(parent: &Block, txs: &[Hash], num_lanes: u64, num_slices: usize) -> Block {
    let mut block = Block::new(
        parent.body.hash,
        parent.body.block_number + 1,
        MinerId::from_seed(b"peer-miner"),
    );
    block.body.log2_num_lanes = num_lanes.trailing_zeros() as u8;
    block.body.slices = vec![Vec::new(); num_slices];
    for (index, tx) in txs.iter().enumerate() {
        block.body.slices[index % num_slices].push(TransactionSummary::new(*tx));
    }
    block.body.merkle_hash = derived_root(&block.body);
    block.update_digest();
    block
}

// ═══════════════════════════════════════════════════════════════════════
// Scripted execution engine
// ═══════════════════════════════════════════════════════════════════════

struct EngineInner {
    pending: Option<BlockBody>,
    remaining_active_polls: u32,
    last_processed: Hash,
    root_overrides: HashMap<Hash, Hash>,
    forced_state: Option<EngineState>,
}

/// Execution engine stand-in.
///
/// `execute` accepts any body; `state()` reports `Active` for a configured
/// number of polls, then applies the block's state root to the state store
/// and reports `Idle`. The root applied is, in order of precedence: a
/// scripted override for the block's digest, [`derived_root`] when the
/// body's own digest is still open (minted blocks), or the body's
/// `merkle_hash`.
pub struct ScriptedEngine {
    store: Arc<InMemoryStateStore>,
    inner: Mutex<EngineInner>,
    active_polls_per_block: u32,
}

impl ScriptedEngine {
    /// Engine that reports `Active` for `polls` status queries per block
    /// before completing.
    pub fn with_active_polls(store: Arc<InMemoryStateStore>, polls: u32) -> Self {
        Self {
            store,
            inner: Mutex::new(EngineInner {
                pending: None,
                remaining_active_polls: 0,
                last_processed: GENESIS_DIGEST,
                root_overrides: HashMap::new(),
                forced_state: None,
            }),
            active_polls_per_block: polls,
        }
    }

    /// Script the state root produced when executing the given block.
    pub fn override_root(&self, block_hash: Hash, root: Hash) {
        self.inner.lock().root_overrides.insert(block_hash, root);
    }

    /// Force `state()` to report the given state until cleared.
    pub fn force_state(&self, state: Option<EngineState>) {
        self.inner.lock().forced_state = state;
    }

    fn complete(&self, inner: &mut EngineInner) {
        if let Some(body) = inner.pending.take() {
            let root = match inner.root_overrides.get(&body.hash) {
                Some(root) => *root,
                None if body.hash.is_zero() => derived_root(&body),
                None => body.merkle_hash,
            };
            self.store.set_current(root);
            inner.last_processed = body.hash;
        }
    }
}

impl ExecutionEngine for ScriptedEngine {
    fn execute(&self, body: &BlockBody) -> ScheduleStatus {
        let mut inner = self.inner.lock();
        inner.pending = Some(body.clone());
        inner.remaining_active_polls = self.active_polls_per_block;
        ScheduleStatus::Scheduled
    }

    fn state(&self) -> EngineState {
        let mut inner = self.inner.lock();
        if let Some(forced) = inner.forced_state {
            return forced;
        }
        if inner.pending.is_some() {
            if inner.remaining_active_polls > 0 {
                inner.remaining_active_polls -= 1;
                return EngineState::Active;
            }
            self.complete(&mut inner);
        }
        EngineState::Idle
    }

    fn set_last_processed_block(&self, hash: Hash) {
        self.inner.lock().last_processed = hash;
    }

    fn last_processed_block(&self) -> Hash {
        self.inner.lock().last_processed
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Packer, sink, stake, synergetic, dag stubs
// ═══════════════════════════════════════════════════════════════════════

/// Packer that lays out a queued list of transaction digests.
pub struct TestPacker {
    queued: Mutex<Vec<Hash>>,
    fail: AtomicBool,
}

impl TestPacker {
    pub fn new() -> Self {
        Self {
            queued: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    pub fn queue(&self, txs: impl IntoIterator<Item = Hash>) {
        self.queued.lock().extend(txs);
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::Relaxed);
    }
}

impl BlockPacker for TestPacker {
    fn generate_block(
        &self,
        block: &mut Block,
        num_lanes: u64,
        num_slices: usize,
        _chain: &dyn MainChain,
    ) -> Result<(), PackerError> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(PackerError::Assembly("scripted failure".into()));
        }

        block.body.log2_num_lanes = num_lanes.trailing_zeros() as u8;
        block.body.slices = vec![Vec::new(); num_slices];
        for (index, tx) in self.queued.lock().drain(..).enumerate() {
            block.body.slices[index % num_slices].push(TransactionSummary::new(tx));
        }
        Ok(())
    }
}

/// Sink recording every transmitted block.
pub struct RecordingSink {
    blocks: Mutex<Vec<Block>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            blocks: Mutex::new(Vec::new()),
        }
    }

    pub fn blocks(&self) -> Vec<Block> {
        self.blocks.lock().clone()
    }
}

impl BlockSink for RecordingSink {
    fn on_block(&self, block: Block) {
        self.blocks.lock().push(block);
    }
}

/// Stake oracle scripted to allow or deny generation.
pub struct TestStake {
    allow_generation: bool,
    weight: u64,
    updates: Mutex<Vec<Hash>>,
}

impl TestStake {
    pub fn permissive(weight: u64) -> Self {
        Self {
            allow_generation: true,
            weight,
            updates: Mutex::new(Vec::new()),
        }
    }

    pub fn denying() -> Self {
        Self {
            allow_generation: false,
            weight: 1,
            updates: Mutex::new(Vec::new()),
        }
    }

    pub fn updates(&self) -> Vec<Hash> {
        self.updates.lock().clone()
    }
}

impl StakeOracle for TestStake {
    fn should_generate_block(&self, _previous: &Block, _miner: &MinerId) -> bool {
        self.allow_generation
    }

    fn valid_miner_for_block(&self, _previous: &Block, _miner: &MinerId) -> bool {
        true
    }

    fn block_generation_weight(&self, _previous: &Block, _miner: &MinerId) -> u64 {
        self.weight
    }

    fn update_current_block(&self, block: &Block) {
        self.updates.lock().push(block.body.hash);
    }
}

/// Synergetic manager whose work validation fails at one block height.
pub struct TestSynergetic {
    prepare_status: SynergeticStatus,
    reject_at: u64,
}

impl TestSynergetic {
    pub fn rejecting_work_at(block_number: u64) -> Self {
        Self {
            prepare_status: SynergeticStatus::Success,
            reject_at: block_number,
        }
    }
}

impl SynergeticExecutionManager for TestSynergetic {
    fn prepare_work_queue(&self, _current: &Block, _previous: &Block) -> SynergeticStatus {
        self.prepare_status
    }

    fn validate_work_and_update_state(&self, block_number: u64, _num_lanes: u64) -> bool {
        block_number != self.reject_at
    }
}

/// DAG stub that satisfies every epoch and records commits.
pub struct TestDag {
    commits: Mutex<Vec<u64>>,
}

impl TestDag {
    pub fn new() -> Self {
        Self {
            commits: Mutex::new(Vec::new()),
        }
    }

    pub fn committed_epochs(&self) -> Vec<u64> {
        self.commits.lock().clone()
    }
}

impl Dag for TestDag {
    fn current_epoch(&self) -> u64 {
        self.commits.lock().last().copied().unwrap_or(0)
    }

    fn create_epoch(&self, block_number: u64) -> DagEpoch {
        DagEpoch { block_number }
    }

    fn satisfy_epoch(&self, _epoch: &DagEpoch) -> bool {
        true
    }

    fn revert_to_epoch(&self, _block_number: u64) -> bool {
        true
    }

    fn commit_epoch(&self, epoch: &DagEpoch) {
        self.commits.lock().push(epoch.block_number);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Harness
// ═══════════════════════════════════════════════════════════════════════

/// A coordinator wired to in-memory collaborators under a manual clock.
pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub chain: Arc<InMemoryMainChain>,
    pub store: Arc<InMemoryStateStore>,
    pub engine: Arc<ScriptedEngine>,
    pub pool: Arc<InMemoryTransactionPool>,
    pub packer: Arc<TestPacker>,
    pub sink: Arc<RecordingSink>,
    pub statuses: Arc<InMemoryStatusCache>,
    pub coordinator: BlockCoordinator,
}

impl Harness {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self::with_engine_polls(config, 0)
    }

    /// Harness whose engine stays `Active` for `polls` status queries per
    /// block before completing.
    pub fn with_engine_polls(config: CoordinatorConfig, polls: u32) -> Self {
        let clock = Arc::new(ManualClock::new());
        let chain = Arc::new(InMemoryMainChain::new());
        let store = Arc::new(InMemoryStateStore::new());
        let engine = Arc::new(ScriptedEngine::with_active_polls(store.clone(), polls));
        let pool = Arc::new(InMemoryTransactionPool::new());
        let packer = Arc::new(TestPacker::new());
        let sink = Arc::new(RecordingSink::new());
        let statuses = Arc::new(InMemoryStatusCache::new());

        let coordinator = BlockCoordinator::new(
            config,
            clock.clone(),
            chain.clone(),
            store.clone(),
            engine.clone(),
            pool.clone(),
            packer.clone(),
            sink.clone(),
            statuses.clone(),
            Arc::new(NonceMiner::new()),
            MinerId::from_seed(b"local-miner"),
        );

        Self {
            clock,
            chain,
            store,
            engine,
            pool,
            packer,
            sink,
            statuses,
            coordinator,
        }
    }

    /// Attach a stake oracle to the coordinator under test.
    pub fn with_stake(mut self, stake: Arc<dyn StakeOracle>) -> Self {
        self.coordinator = self.coordinator.with_stake(stake);
        self
    }

    /// Attach a synergetic execution manager to the coordinator under test.
    pub fn with_synergetic(mut self, synergetic: Arc<dyn SynergeticExecutionManager>) -> Self {
        self.coordinator = self.coordinator.with_synergetic(synergetic);
        self
    }

    /// Attach a DAG epoch manager to the coordinator under test.
    pub fn with_dag(mut self, dag: Arc<dyn Dag>) -> Self {
        self.coordinator = self.coordinator.with_dag(dag);
        self
    }

    /// Genesis block as held by the chain store.
    pub fn genesis(&self) -> Block {
        Block::genesis()
    }

    /// Step once and advance the clock by the requested delay.
    pub fn step(&mut self) -> StepOutcome {
        let outcome = self.coordinator.step();
        self.clock
            .advance(outcome.delay.unwrap_or(Duration::from_millis(1)));
        outcome
    }

    /// Step until the machine arrives in `target`, returning the visited
    /// states with the delay each step requested.
    pub fn run_until_state(
        &mut self,
        target: CoordinatorState,
        max_steps: usize,
    ) -> Vec<(CoordinatorState, Option<Duration>)> {
        let mut trace = Vec::new();
        for _ in 0..max_steps {
            let outcome = self.step();
            trace.push((outcome.current, outcome.delay));
            if outcome.current == target {
                return trace;
            }
        }
        panic!("state {target:?} not reached within {max_steps} steps; trace: {trace:?}");
    }

    /// Step until the predicate holds, returning the visited states.
    pub fn run_until(
        &mut self,
        mut done: impl FnMut(&Harness, &StepOutcome) -> bool,
        max_steps: usize,
    ) -> Vec<CoordinatorState> {
        let mut trace = Vec::new();
        for _ in 0..max_steps {
            let outcome = self.coordinator.step();
            self.clock
                .advance(outcome.delay.unwrap_or(Duration::from_millis(1)));
            trace.push(outcome.current);
            if done(self, &outcome) {
                return trace;
            }
        }
        panic!("condition not reached within {max_steps} steps; trace: {trace:?}");
    }
}
