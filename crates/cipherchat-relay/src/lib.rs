// ============================================
// File: crates/cipherchat-relay/src/lib.rs
// ============================================
//! # cipherchat Relay - Real-Time Event Delivery
//!
//! ## Creation Reason
//! Carries handshake and message events to the one participant they are
//! addressed to, and tells the caller when that participant is offline.
//!
//! ## Main Functionality
//! - [`traits`]: `Relay` contract, `RelayEvent`, `Delivery`
//! - [`local`]: `LocalRelay`, an in-process implementation
//! - [`error`]: Relay error types
//!
//! ## Architecture Overview
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                 Exchange Coordinator                     │
//! │                       │ deliver(to, event)               │
//! │                       ▼                                  │
//! │            ┌─────────────────────┐                       │
//! │            │    dyn Relay        │                       │
//! │            └──────────┬──────────┘                       │
//! │          Delivered ◄──┴──► Unreachable                   │
//! │                       │                                  │
//! │            ┌──────────┴──────────┐                       │
//! │            │ per-participant     │                       │
//! │            │ bounded queue       │                       │
//! │            └──────────┬──────────┘                       │
//! │                       ▼                                  │
//! │                Connected client                          │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Always go through the `Relay` trait for testability
//! - Never call a relay while holding a session store lock
//!
//! ## Last Modified
//! v0.1.0 - Initial relay implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod local;
pub mod traits;

pub use error::{RelayError, Result};
pub use local::{Connection, LocalRelay, DEFAULT_QUEUE_DEPTH};
pub use traits::{Delivery, Relay, RelayEvent};
