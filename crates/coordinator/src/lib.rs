//! Block coordination for the blockforge node.
//!
//! The coordinator links the main-chain store, the Merkle-versioned state
//! store, the execution engine, the block packer and the block sink into one
//! deterministic control loop. It reconciles the locally executed prefix of
//! the chain with the heaviest tip (including fork surgery through state
//! reverts), gates execution on transaction availability, enforces pre- and
//! post-execution validation, and — when mining is enabled — packs, executes,
//! proves and broadcasts new blocks.
//!
//! See [`BlockCoordinator`] for the state machine itself,
//! [`CoordinatorDriver`] for the production driver thread, and
//! [`CoordinatorConfig`] for the tunables.

mod config;
mod coordinator;
mod driver;
mod last_executed;
mod miner;
mod status;

pub use config::CoordinatorConfig;
pub use coordinator::{BlockCoordinator, StepOutcome};
pub use driver::CoordinatorDriver;
pub use last_executed::LastExecutedBlock;
pub use miner::NonceMiner;
pub use status::CoordinatorStatus;
