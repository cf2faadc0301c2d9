// ============================================
// File: crates/cipherchat-server/src/services/mod.rs
// ============================================
//! # Server Services
//!
//! ## Creation Reason
//! Business logic of the key exchange, separated from configuration and
//! process lifecycle.
//!
//! ### Submodules
//! - [`session`]: Handshake session store
//! - [`sweeper`]: Background expiry task
//! - [`exchange`]: Handshake and message coordinator
//!
//! ## Service Interactions
//! 1. `ExchangeCoordinator` mutates sessions only through `SessionStore`
//! 2. `Sweeper` calls `SessionStore::sweep` on a timer
//! 3. Relay pushes happen in the coordinator, outside store locks
//!
//! ## Last Modified
//! v0.1.0 - Initial services structure

pub mod exchange;
pub mod session;
pub mod sweeper;

// Re-export primary types
pub use exchange::{ExchangeCoordinator, InitiateOutcome, RespondOutcome, SentMessage};
pub use session::{HandshakeSession, SessionSnapshot, SessionState, SessionStore};
pub use sweeper::Sweeper;
