// ============================================
// File: crates/cipherchat-core/src/error.rs
// ============================================
//! # Core Error Types
//!
//! ## Creation Reason
//! Defines the failure vocabulary of the handshake and message crypto.
//!
//! ## Error Categories
//! 1. **Peer input**: `InvalidPeerKey` (malformed or degenerate public value)
//! 2. **AEAD**: `EncryptionFailed`, `AuthenticationFailed`
//! 3. **Internal**: `KeyDerivation`, `SecretDiscarded`
//!
//! ## ⚠️ Important Note for Next Developer
//! - NEVER include key material in error messages
//! - `InvalidPeerKey` and `AuthenticationFailed` carry no detail on
//!   purpose; log the cause at debug where it is detected
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

use cipherchat_common::error::CommonError;

// ============================================
// Result Type Alias
// ============================================

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

// ============================================
// CoreError
// ============================================

/// Core error types for cryptographic operations.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Peer public value is malformed, of an unknown version, or yields a
    /// non-contributory shared secret.
    #[error("Invalid peer public key")]
    InvalidPeerKey,

    /// Encryption primitive failed.
    #[error("Encryption failed: {context}")]
    EncryptionFailed {
        /// What was being encrypted
        context: String,
    },

    /// Payload did not authenticate.
    #[error("Decryption failed: authentication error")]
    AuthenticationFailed,

    /// Key derivation failed.
    #[error("Key derivation failed: {reason}")]
    KeyDerivation {
        /// Why derivation failed
        reason: String,
    },

    /// The private half of a key pair was used after being discarded.
    #[error("Ephemeral secret already discarded")]
    SecretDiscarded,

    /// Error from common crate.
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl CoreError {
    /// Creates an `EncryptionFailed` error.
    pub fn encryption(context: impl Into<String>) -> Self {
        Self::EncryptionFailed {
            context: context.into(),
        }
    }

    /// Creates a `KeyDerivation` error.
    pub fn key_derivation(reason: impl Into<String>) -> Self {
        Self::KeyDerivation {
            reason: reason.into(),
        }
    }

    /// Returns `true` if this is a cryptographic error.
    #[must_use]
    pub const fn is_crypto_error(&self) -> bool {
        !matches!(self, Self::Common(_))
    }

    /// Returns `true` if this error might indicate an attack.
    ///
    /// These errors warrant additional logging/monitoring.
    #[must_use]
    pub const fn is_suspicious(&self) -> bool {
        matches!(self, Self::InvalidPeerKey | Self::AuthenticationFailed)
    }
}

// ============================================
// Tests
// ============================================
