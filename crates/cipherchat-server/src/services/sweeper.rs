// ============================================
// File: crates/cipherchat-server/src/services/sweeper.rs
// ============================================
//! # Session Sweeper
//!
//! ## Creation Reason
//! Expired sessions hold key material; they must be dropped on a timer
//! even when nobody touches the pair again.
//!
//! ## Main Functionality
//! - `Sweeper::spawn`: Starts the periodic sweep on the tokio runtime
//! - `Sweeper::shutdown`: Stops it and waits for the task to exit
//!
//! ## ⚠️ Important Note for Next Developer
//! - The sweep itself is synchronous and holds one shard lock at a time
//! - Dropping a `Sweeper` without `shutdown` detaches the task; it keeps
//!   running until the runtime stops
//!
//! ## Last Modified
//! v0.1.0 - Initial sweeper task

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use super::session::SessionStore;

/// How long `shutdown` waits for the task before giving up.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Owned background task that sweeps expired sessions.
pub struct Sweeper {
    shutdown_tx: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

impl Sweeper {
    /// Spawns the sweep loop. Must be called inside a tokio runtime.
    #[must_use]
    pub fn spawn(store: Arc<SessionStore>, interval: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
        let period = interval.max(Duration::from_millis(1));

        let handle = tokio::spawn(async move {
            let mut timer = tokio::time::interval(period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        debug!("Sweeper received shutdown signal");
                        break;
                    }
                    _ = timer.tick() => {
                        let removed = store.sweep(Instant::now());
                        debug!(
                            removed = removed,
                            sessions = store.len(),
                            "Sweep cycle complete"
                        );
                    }
                }
            }

            debug!("Sweeper exiting");
        });

        Self {
            shutdown_tx,
            handle,
        }
    }

    /// Returns `true` while the task is alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Signals the task and waits for it to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());

        match tokio::time::timeout(SHUTDOWN_TIMEOUT, self.handle).await {
            Ok(Ok(())) => debug!("Sweeper stopped"),
            Ok(Err(e)) => warn!("Sweeper task failed: {}", e),
            Err(_) => warn!("Sweeper timed out during shutdown"),
        }
    }
}

impl std::fmt::Debug for Sweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sweeper")
            .field("running", &self.is_running())
            .finish()
    }
}
