// ============================================
// File: crates/cipherchat-server/src/server.rs
// ============================================
//! # Server Orchestrator
//!
//! ## Creation Reason
//! Wires the session store, relay, coordinator and sweeper together from
//! one `ServerConfig` and owns their lifecycle.
//!
//! ## Main Functionality
//! - `Server`: Component construction and lifecycle
//! - Sweeper task start/stop
//! - Graceful shutdown on Ctrl+C or programmatic signal
//!
//! ## Server Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Server                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌──────────────────────┐      ┌────────────────────────┐  │
//! │  │ ExchangeCoordinator  │─────►│       LocalRelay       │  │
//! │  │  initiate / respond  │      │  per-user mpsc queues  │  │
//! │  │  complete / encrypt  │      └────────────────────────┘  │
//! │  └──────────┬───────────┘                                  │
//! │             │                                              │
//! │             ▼                                              │
//! │  ┌──────────────────────┐      ┌────────────────────────┐  │
//! │  │     SessionStore     │◄─────│     Sweeper Task       │  │
//! │  │  pairs + id index    │      │  every sweep_interval  │  │
//! │  └──────────────────────┘      └────────────────────────┘  │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - `start` must run inside a tokio runtime (it spawns the sweeper)
//! - All services are Arc-wrapped for sharing with request handlers
//! - `stop` is safe to call more than once
//!
//! ## Last Modified
//! v0.1.0 - Initial server implementation

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, info};

use cipherchat_relay::LocalRelay;

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};
use crate::services::{ExchangeCoordinator, SessionStore, Sweeper};

// ============================================
// Server
// ============================================

/// Main cipherchat server.
///
/// # Lifecycle
/// 1. Create with `Server::new(config)`
/// 2. Run with `server.run().await`, or `start` / `stop` manually
/// 3. Shutdown via `shutdown()` or Ctrl+C
pub struct Server {
    /// Server configuration.
    config: ServerConfig,
    /// Session store shared with the coordinator and sweeper.
    store: Arc<SessionStore>,
    /// In-process relay.
    relay: Arc<LocalRelay>,
    /// Handshake and message coordinator.
    coordinator: Arc<ExchangeCoordinator>,
    /// Running sweeper, if started.
    sweeper: Mutex<Option<Sweeper>>,
    /// Shutdown flag.
    shutdown: AtomicBool,
    /// Shutdown signal sender.
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    /// Creates a new server instance. Does not spawn anything.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        let store = Arc::new(SessionStore::from_config(&config.session));
        let relay = Arc::new(LocalRelay::new(config.relay.queue_depth));
        let coordinator = Arc::new(
            ExchangeCoordinator::new(Arc::clone(&store), relay.clone())
                .with_presence_precheck(config.relay.presence_precheck),
        );
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            store,
            relay,
            coordinator,
            sweeper: Mutex::new(None),
            shutdown: AtomicBool::new(false),
            shutdown_tx,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    #[must_use]
    pub fn coordinator(&self) -> &Arc<ExchangeCoordinator> {
        &self.coordinator
    }

    #[must_use]
    pub fn relay(&self) -> &Arc<LocalRelay> {
        &self.relay
    }

    #[must_use]
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Returns `true` while the sweeper task is alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.sweeper.lock().as_ref().is_some_and(Sweeper::is_running)
    }

    /// Spawns the sweeper. Calling it again while running is a no-op.
    pub fn start(&self) {
        let mut slot = self.sweeper.lock();
        if slot.is_some() {
            debug!("Server already started");
            return;
        }

        *slot = Some(Sweeper::spawn(
            Arc::clone(&self.store),
            self.config.session.sweep_interval(),
        ));

        info!(
            ttl_secs = self.config.session.ttl_secs,
            sweep_interval_secs = self.config.session.sweep_interval_secs,
            max_sessions = self.config.session.max_sessions,
            reuse_policy = ?self.config.session.reuse_policy,
            "Server started"
        );
    }

    /// Stops the sweeper and waits for it to exit.
    pub async fn stop(&self) {
        let sweeper = self.sweeper.lock().take();
        if let Some(sweeper) = sweeper {
            sweeper.shutdown().await;
            info!(sessions = self.store.len(), "Server stopped");
        }
    }

    /// Runs the server until Ctrl+C or `shutdown()`.
    ///
    /// # Errors
    /// Returns error if the Ctrl+C handler cannot be installed.
    pub async fn run(&self) -> Result<()> {
        info!("Starting cipherchat server v{}", env!("CARGO_PKG_VERSION"));

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        self.start();

        let waited = if self.shutdown.load(Ordering::SeqCst) {
            Ok(())
        } else {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    result.map_err(|e| ServerError::internal(format!("failed to listen for Ctrl+C: {e}")))
                }
                _ = shutdown_rx.recv() => Ok(()),
            }
        };

        info!("Shutting down server...");
        self.stop().await;
        info!("Server shutdown complete");

        waited
    }

    /// Triggers server shutdown programmatically.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(());
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("sessions", &self.store.len())
            .field("connections", &self.relay.connection_count())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}
