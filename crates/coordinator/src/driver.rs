//! Driver thread for the coordinator.
//!
//! The coordinator is a cooperative state machine; something has to step it.
//! Production spawns one [`CoordinatorDriver`] thread that steps the machine,
//! sleeps whatever delay the handler requested, and exits between states
//! when the stop signal fires — there is no in-handler preemption.
//! Deterministic tests skip the driver and call
//! [`step`](crate::BlockCoordinator::step) directly under a manual clock.

use crate::BlockCoordinator;
use crossbeam_channel::{bounded, RecvTimeoutError, Sender, TryRecvError};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info};

/// Idle pause between steps whose handler requested no delay, so a hot
/// coordinator still yields the core.
const STEP_PAUSE: Duration = Duration::from_millis(1);

/// Owns the thread that steps a [`BlockCoordinator`].
pub struct CoordinatorDriver {
    stop: Sender<()>,
    handle: JoinHandle<BlockCoordinator>,
}

impl CoordinatorDriver {
    /// Spawn the driver thread and start stepping the coordinator.
    pub fn spawn(mut coordinator: BlockCoordinator) -> Self {
        let (stop, stop_rx) = bounded::<()>(1);

        let handle = std::thread::Builder::new()
            .name("block-coordinator".into())
            .spawn(move || {
                info!("coordinator driver started");

                loop {
                    match stop_rx.try_recv() {
                        Ok(()) | Err(TryRecvError::Disconnected) => break,
                        Err(TryRecvError::Empty) => {}
                    }

                    let outcome = coordinator.step();
                    let pause = outcome.delay.unwrap_or(STEP_PAUSE);

                    // Sleeping on the stop channel keeps shutdown prompt even
                    // through long handler delays.
                    match stop_rx.recv_timeout(pause) {
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                        Err(RecvTimeoutError::Timeout) => {}
                    }
                }

                info!("coordinator driver stopped");
                coordinator
            })
            .expect("failed to spawn coordinator driver thread");

        Self { stop, handle }
    }

    /// Signal the driver to stop and wait for it, returning the coordinator.
    pub fn stop(self) -> BlockCoordinator {
        debug!("stopping coordinator driver");
        let _ = self.stop.send(());
        self.handle
            .join()
            .expect("coordinator driver thread panicked")
    }
}
