// ============================================
// File: crates/cipherchat-core/src/lib.rs
// ============================================
//! # cipherchat Core - Handshake & Message Cryptography
//!
//! ## Creation Reason
//! Provides the cryptographic operations behind end-to-end encrypted
//! chat between two participants. This crate is the security backbone
//! of the system and holds no session state of its own.
//!
//! ## Main Functionality
//!
//! ### Crypto Module ([`crypto`])
//! - Ephemeral X25519 key pairs and key agreement
//! - Key derivation (HKDF-SHA256)
//! - Message encryption (XChaCha20-Poly1305)
//!
//! ### Protocol Module ([`protocol`])
//! - Versioned wire encoding of public values and payloads
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              cipherchat-server                      │
//! │                    │                                │
//! │         ┌──────────┴──────────┐                     │
//! │         ▼                     ▼                     │
//! │   cipherchat-core ◄──  cipherchat-relay             │
//! │   You are here                │                     │
//! │         │                     │                     │
//! │         └──────────┬──────────┘                     │
//! │                    ▼                                │
//! │           cipherchat-common                         │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - ALL cryptographic code uses audited implementations
//! - ALL keys MUST implement Zeroize for secure cleanup
//! - Wire changes MUST bump the wire version
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod crypto;
pub mod error;
pub mod protocol;

pub use crypto::{EncryptedPayload, EphemeralKeyPair, PublicValue, SessionKey};
pub use error::{CoreError, Result};
pub use protocol::{AeadAlgorithm, WireVersion};
