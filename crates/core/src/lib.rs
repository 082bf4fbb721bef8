//! Core abstractions for the blockforge coordinator.
//!
//! This crate provides the vocabulary the coordinator is written against:
//!
//! - [`CoordinatorState`]: the tags of the coordination state machine
//! - [`ExecutionStatus`] / [`map_engine_status`]: the simplified view of the
//!   execution engine
//! - [`Clock`], [`Periodic`], [`Deadline`]: deterministic time handling
//! - Collaborator traits ([`MainChain`], [`StateStore`], [`ExecutionEngine`],
//!   and friends): capability interfaces for everything external
//!
//! # Architecture
//!
//! The coordinator is a single-threaded cooperative state machine. Each
//! handler runs to completion, returns the next state and may request a
//! delay before re-entry; nothing here blocks. All I/O happens behind the
//! collaborator traits, which makes the state-transition trace a pure
//! function of collaborator responses — the property the simulation tests
//! rely on.

mod clock;
mod state;
mod timer;
mod traits;

pub use clock::{Clock, ManualClock, SystemClock};
pub use state::{
    map_engine_status, CoordinatorState, EngineState, ExecutionStatus, ScheduleStatus,
};
pub use timer::{Deadline, Periodic};
pub use traits::{
    BlockPacker, BlockSink, BlockStatus, Dag, ExecutionEngine, MainChain, PackerError, ProofMiner,
    StakeOracle, StateStore, StatusCache, SynergeticExecutionManager, SynergeticStatus,
    TransactionIndex, TruncationPolicy,
};
