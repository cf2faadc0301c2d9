// ============================================
// File: crates/cipherchat-core/src/crypto/keys.rs
// ============================================
//! # Cryptographic Key Types
//!
//! ## Creation Reason
//! Defines the key material that moves through a pair handshake with the
//! security properties it needs (Zeroize on drop, constant-time
//! comparison, redacted Debug).
//!
//! ## Main Functionality
//! - `EphemeralKeyPair`: Per-attempt X25519 key pair
//! - `PublicValue`: The shareable half, with its versioned wire form
//! - `SharedSecret`: Raw Diffie-Hellman output
//! - `SessionKey`: Derived symmetric key for message encryption
//!
//! ## Key Lifecycle
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  EphemeralKeyPair (per handshake attempt)                  │
//! │  ├─ Initiator: retained in the session store until the     │
//! │  │  initiator confirms, then the secret is discarded       │
//! │  └─ Responder: used once and dropped                       │
//! │                                                            │
//! │  SharedSecret                                              │
//! │  └─ Lives only long enough to feed HKDF                    │
//! │                                                            │
//! │  SessionKey (per completed session)                        │
//! │  ├─ Owned by the session store                             │
//! │  └─ Zeroized when the session is deleted or swept          │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - ALL key types MUST implement Zeroize
//! - Private keys should NEVER be logged or serialized
//! - The initiator secret is a `StaticSecret` only because it must be
//!   used twice (respond side never sees it; `complete` may retry);
//!   it is still ephemeral and discarded after confirmation
//!
//! ## Last Modified
//! v0.1.0 - X25519 pair handshake keys

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::{SESSION_KEY_SIZE, X25519_PUBLIC_KEY_SIZE};
use crate::error::{CoreError, Result};
use crate::protocol::codec;

// ============================================
// PublicValue
// ============================================

/// Public half of an X25519 key pair.
///
/// Displays and serializes as base64 of the versioned wire form
/// (`0x01 || 32-byte point`).
#[derive(Clone, Copy)]
pub struct PublicValue([u8; X25519_PUBLIC_KEY_SIZE]);

impl PublicValue {
    /// Wraps raw point bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; X25519_PUBLIC_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Returns the raw point bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; X25519_PUBLIC_KEY_SIZE] {
        &self.0
    }

    /// Returns the versioned wire encoding.
    #[must_use]
    pub fn to_wire(&self) -> Vec<u8> {
        codec::encode_public_value(self)
    }

    /// Parses the versioned wire encoding.
    ///
    /// # Errors
    /// `InvalidPeerKey` on wrong length or unsupported version.
    pub fn from_wire(bytes: &[u8]) -> Result<Self> {
        codec::decode_public_value(bytes)
    }
}

impl PartialEq for PublicValue {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for PublicValue {}

impl fmt::Debug for PublicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PublicValue({:02x}{:02x}{:02x}{:02x}...)",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

impl fmt::Display for PublicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&BASE64.encode(self.to_wire()))
    }
}

impl FromStr for PublicValue {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = BASE64.decode(s).map_err(|_| CoreError::InvalidPeerKey)?;
        Self::from_wire(&bytes)
    }
}

impl Serialize for PublicValue {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PublicValue {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================
// EphemeralKeyPair (X25519)
// ============================================

/// X25519 key pair for one handshake attempt.
///
/// # Security
/// - Private key is zeroed on drop and on [`discard_secret`](Self::discard_secret)
/// - Generated from the OS random number generator
///
/// # Example
/// ```
/// use cipherchat_core::crypto::EphemeralKeyPair;
///
/// let alice = EphemeralKeyPair::generate();
/// let bob = EphemeralKeyPair::generate();
///
/// let a = alice.diffie_hellman(&bob.public_value()).unwrap();
/// let b = bob.diffie_hellman(&alice.public_value()).unwrap();
/// assert_eq!(a.as_bytes(), b.as_bytes());
/// ```
pub struct EphemeralKeyPair {
    secret: Option<StaticSecret>,
    public: X25519PublicKey,
}

impl EphemeralKeyPair {
    /// Generates a new random key pair.
    #[must_use]
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = X25519PublicKey::from(&secret);
        Self {
            secret: Some(secret),
            public,
        }
    }

    /// Returns the public value.
    #[must_use]
    pub fn public_value(&self) -> PublicValue {
        PublicValue(self.public.to_bytes())
    }

    /// Performs X25519 with the peer's public value.
    ///
    /// # Errors
    /// - `InvalidPeerKey`: the result is non-contributory (low-order or
    ///   all-zero peer point)
    /// - `SecretDiscarded`: the private half was already dropped
    pub fn diffie_hellman(&self, peer: &PublicValue) -> Result<SharedSecret> {
        let secret = self.secret.as_ref().ok_or(CoreError::SecretDiscarded)?;
        let shared = secret.diffie_hellman(&X25519PublicKey::from(peer.0));
        if !shared.was_contributory() {
            return Err(CoreError::InvalidPeerKey);
        }
        Ok(SharedSecret(shared))
    }

    /// Drops (and zeroizes) the private half, keeping the public value.
    pub fn discard_secret(&mut self) {
        self.secret = None;
    }

    /// Checks if the private key has been discarded.
    #[must_use]
    pub fn is_consumed(&self) -> bool {
        self.secret.is_none()
    }
}

impl fmt::Debug for EphemeralKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EphemeralKeyPair")
            .field("public", &self.public_value())
            .field("consumed", &self.is_consumed())
            .finish()
    }
}

// ============================================
// SharedSecret
// ============================================

/// Raw X25519 output. Zeroized on drop; feed it to HKDF and let it go.
pub struct SharedSecret(x25519_dalek::SharedSecret);

impl SharedSecret {
    /// Returns the 32 secret bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedSecret([REDACTED])")
    }
}

// ============================================
// SessionKey
// ============================================

/// Symmetric key for one completed pair session.
///
/// # Security
/// - Zeroed on drop
/// - Never logged or serialized
/// - Not `Clone`; it stays inside the session store
/// - Constant-time comparison
///
/// # Derivation
/// ```text
/// shared_secret = X25519(initiator_ephemeral, responder_ephemeral)
/// session_key = HKDF-SHA256(
///     ikm: shared_secret,
///     salt: none,
///     info: "cipherchat-v1-session-key"
/// )
/// ```
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SessionKey([u8; SESSION_KEY_SIZE]);

impl SessionKey {
    /// Creates a session key from raw bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; SESSION_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Returns the raw key bytes.
    ///
    /// # Security Warning
    /// Do not log or store the returned bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; SESSION_KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print key material
        write!(f, "SessionKey([REDACTED])")
    }
}

impl PartialEq for SessionKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for SessionKey {}

// ============================================
// Tests
// ============================================
