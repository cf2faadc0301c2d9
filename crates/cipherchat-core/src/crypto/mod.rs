// ============================================
// File: crates/cipherchat-core/src/crypto/mod.rs
// ============================================
//! # Cryptography Module
//!
//! ## Creation Reason
//! Centralizes every cryptographic operation of the pair handshake and
//! message encryption, using audited RustCrypto / dalek implementations.
//!
//! ## Main Functionality
//!
//! ### Submodules
//! - [`keys`]: Key types (X25519 key pairs, shared secret, session key)
//! - [`handshake`]: Key pair generation and key agreement
//! - [`kdf`]: Key derivation (HKDF-SHA256)
//! - [`aead`]: Message encryption (XChaCha20-Poly1305)
//!
//! ## Cryptographic Design
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Handshake Phase                          │
//! │  Initiator                                   Responder      │
//! │    │  X25519 Ephemeral Key ──────────────────────► │        │
//! │    │ ◄────────────────────── X25519 Ephemeral Key  │        │
//! │    │        X25519 Key Exchange                    │        │
//! │    │              ▼                                │        │
//! │    │      HKDF-SHA256 ─────► Session Key           │        │
//! └─────────────────────────────────────────────────────────────┘
//!
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Message Phase                            │
//! │                                                             │
//! │   Session Key + random 24-byte nonce + (sender, recipient)  │
//! │        ──► XChaCha20-Poly1305 ──► ciphertext + tag          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - NEVER roll your own crypto
//! - ALL sensitive keys implement Zeroize
//! - Nonces are random; the 192-bit XChaCha nonce makes collisions
//!   negligible, the 96-bit ChaCha one does not
//!
//! ## Last Modified
//! v0.1.0 - Pair handshake and message crypto

pub mod aead;
pub mod handshake;
pub mod kdf;
pub mod keys;

pub use aead::EncryptedPayload;
pub use keys::{EphemeralKeyPair, PublicValue, SessionKey, SharedSecret};

// ============================================
// Constants
// ============================================

/// Key agreement in use. Fixed; there is no negotiation.
pub const KEY_AGREEMENT: &str = "x25519";

/// Size of X25519 public key in bytes.
pub const X25519_PUBLIC_KEY_SIZE: usize = 32;

/// Size of the derived session key in bytes.
pub const SESSION_KEY_SIZE: usize = 32;

/// Size of XChaCha20-Poly1305 nonce in bytes.
pub const XCHACHA20_NONCE_SIZE: usize = 24;

/// Size of Poly1305 authentication tag in bytes.
pub const POLY1305_TAG_SIZE: usize = 16;

/// HKDF info for session key derivation.
pub const HKDF_SESSION_INFO: &[u8] = b"cipherchat-v1-session-key";

/// Prefix of the associated data bound into every message.
pub const MESSAGE_AD_LABEL: &[u8] = b"cipherchat-v1-message";
