// ============================================
// File: crates/cipherchat-server/src/lib.rs
// ============================================
//! # cipherchat Server Library
//!
//! ## Creation Reason
//! Hosts the end-to-end key exchange for chat participant pairs: session
//! bookkeeping, the handshake state machine and message encryption.
//!
//! ## Main Functionality
//!
//! ### Modules
//! - [`config`]: Server configuration management
//! - [`server`]: Component wiring and lifecycle
//! - [`services`]: Business logic services
//!   - [`services::session`]: Session store
//!   - [`services::sweeper`]: Expiry task
//!   - [`services::exchange`]: Exchange coordinator
//! - [`error`]: Server-specific error types
//!
//! ## Data Flow
//! ```text
//! initiate → keypair → store (Pending) → relay: keyExchangeRequest
//! respond  → X25519 + HKDF → store (Completed) → relay: keyExchangeResponse
//! send     → store key → XChaCha20-Poly1305 → relay: newMessage
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Configuration changes require restart (no hot-reload)
//! - Keys never leave the store; use `with_session_key`
//!
//! ## Last Modified
//! v0.1.0 - Initial server library

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod server;
pub mod services;

// Re-export primary types
pub use config::{ReusePolicy, ServerConfig};
pub use error::{Result, ServerError};
pub use server::Server;
pub use services::{ExchangeCoordinator, InitiateOutcome, RespondOutcome, SessionStore};
