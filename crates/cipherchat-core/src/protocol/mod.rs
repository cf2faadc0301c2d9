// ============================================
// File: crates/cipherchat-core/src/protocol/mod.rs
// ============================================
//! # Protocol Module
//!
//! ## Creation Reason
//! Defines the byte layouts that leave the process: encoded public values
//! in handshake events and encrypted payloads in message events.
//!
//! ### Submodules
//! - [`codec`]: Binary encoding/decoding
//! - [`version`]: Wire version and algorithm identifiers
//!
//! ## Wire Format Principles
//! - One leading version byte on every encoded object
//! - Fixed-size fields first, variable-length data last
//! - Text transports carry the bytes as standard base64
//!
//! ## Last Modified
//! v0.1.0 - Initial protocol definitions

pub mod codec;
pub mod version;

pub use version::{AeadAlgorithm, WireVersion, CURRENT_WIRE_VERSION};
