// ============================================
// File: crates/cipherchat-common/src/lib.rs
// ============================================
//! # cipherchat Common - Shared Types
//!
//! ## Creation Reason
//! Provides the identifiers and small utilities every cipherchat crate
//! agrees on, so participants, pairs and sessions mean the same thing
//! from the crypto core up to the relay.
//!
//! ## Main Functionality
//! - [`types`]: `ParticipantId`, `PairKey`, `SessionId`
//! - [`time`]: Millisecond timestamps and the TTL check
//! - [`error`]: Common error types and result aliases
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              cipherchat-server                      │
//! │                    │                                │
//! │         ┌──────────┴──────────┐                     │
//! │         ▼                     ▼                     │
//! │   cipherchat-core      cipherchat-relay             │
//! │         │                     │                     │
//! │         └──────────┬──────────┘                     │
//! │                    ▼                                │
//! │           cipherchat-common  ◄── You are here       │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - This crate is the foundation; changes affect everything
//! - Keep dependencies minimal
//! - Security-sensitive types must implement Zeroize
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod time;
pub mod types;

pub use error::{CommonError, Result};
pub use types::{PairKey, ParticipantId, SessionId};
