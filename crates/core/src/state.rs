//! State vocabulary for the block coordinator.

use std::fmt;

/// The states of the block coordinator.
///
/// The machine starts in [`ReloadState`](CoordinatorState::ReloadState) and
/// loops forever; there is no terminal state. Two pipelines hang off the
/// synchronisation loop: validation and execution of received blocks
/// (`PreExecBlockValidation` through `PostExecBlockValidation`) and minting
/// of new blocks (`NewSynergeticExecution` through `TransmitBlock`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoordinatorState {
    /// Startup recovery: restore the state store to the heaviest block.
    ReloadState,
    /// Catch up the executed prefix with the heaviest tip.
    Synchronising,
    /// Tip is executed; idle, or branch into the mint pipeline.
    Synchronised,

    /// Structural validation of the block about to execute.
    PreExecBlockValidation,
    /// Gate execution on transaction availability.
    WaitForTransactions,
    /// Optional validation of off-chain work referenced by the block.
    SynergeticExecution,
    /// Hand the block to the execution engine.
    ScheduleBlockExecution,
    /// Poll the engine until it goes idle.
    WaitForExecution,
    /// Verify the resulting state root and commit.
    PostExecBlockValidation,

    /// Optional off-chain work validation for the minted block.
    NewSynergeticExecution,
    /// Invoke the block packer.
    PackNewBlock,
    /// Schedule execution of the minted block.
    ExecuteNewBlock,
    /// Poll the engine, then capture the minted block's state root.
    WaitForNewBlockExecution,
    /// Search for a proof in bounded slices.
    ProofSearch,
    /// Add the minted block to the chain and broadcast it.
    TransmitBlock,

    /// Clear per-cycle fields and return to synchronisation.
    Reset,
}

impl CoordinatorState {
    /// String form for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            CoordinatorState::ReloadState => "reload_state",
            CoordinatorState::Synchronising => "synchronising",
            CoordinatorState::Synchronised => "synchronised",
            CoordinatorState::PreExecBlockValidation => "pre_exec_block_validation",
            CoordinatorState::WaitForTransactions => "wait_for_transactions",
            CoordinatorState::SynergeticExecution => "synergetic_execution",
            CoordinatorState::ScheduleBlockExecution => "schedule_block_execution",
            CoordinatorState::WaitForExecution => "wait_for_execution",
            CoordinatorState::PostExecBlockValidation => "post_exec_block_validation",
            CoordinatorState::NewSynergeticExecution => "new_synergetic_execution",
            CoordinatorState::PackNewBlock => "pack_new_block",
            CoordinatorState::ExecuteNewBlock => "execute_new_block",
            CoordinatorState::WaitForNewBlockExecution => "wait_for_new_block_execution",
            CoordinatorState::ProofSearch => "proof_search",
            CoordinatorState::TransmitBlock => "transmit_block",
            CoordinatorState::Reset => "reset",
        }
    }
}

impl fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The coordinator's simplified view of the execution engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    /// No block is executing.
    Idle,
    /// A block is executing.
    Running,
    /// The engine cannot make progress without more transactions.
    Stalled,
    /// The engine aborted or failed the current block.
    Error,
}

impl ExecutionStatus {
    /// String form for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Idle => "idle",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Stalled => "stalled",
            ExecutionStatus::Error => "error",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw states reported by the execution engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No block scheduled.
    Idle,
    /// Executing a block.
    Active,
    /// Blocked on transactions that are not locally present.
    TransactionsUnavailable,
    /// The current execution was aborted.
    Aborted,
    /// The current execution failed.
    Failed,
}

/// Outcome of handing a block body to the execution engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleStatus {
    /// The block was accepted for execution.
    Scheduled,
    /// The engine is still busy with a previous block.
    AlreadyRunning,
    /// The engine refused to start the block.
    NotStarted,
}

/// Map the raw engine state onto the coordinator's simplified view.
///
/// | Engine state              | Coordinator view |
/// |---------------------------|------------------|
/// | `Idle`                    | `Idle`           |
/// | `Active`                  | `Running`        |
/// | `TransactionsUnavailable` | `Stalled`        |
/// | `Aborted`, `Failed`       | `Error`          |
pub fn map_engine_status(state: EngineState) -> ExecutionStatus {
    match state {
        EngineState::Idle => ExecutionStatus::Idle,
        EngineState::Active => ExecutionStatus::Running,
        EngineState::TransactionsUnavailable => ExecutionStatus::Stalled,
        EngineState::Aborted | EngineState::Failed => ExecutionStatus::Error,
    }
}
