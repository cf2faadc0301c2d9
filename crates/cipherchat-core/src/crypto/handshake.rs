// ============================================
// File: crates/cipherchat-core/src/crypto/handshake.rs
// ============================================
//! # Handshake Engine
//!
//! ## Creation Reason
//! Wraps the X25519 step of the pair handshake behind a small surface
//! that speaks wire bytes, so callers never touch curve points directly.
//!
//! ## Handshake Flow
//! ```text
//! Initiator (A)                                     Responder (B)
//!   │                                                  │
//!   │  generate_keypair() ── A_pub ─────────────────►  │
//!   │                                                  │
//!   │                       generate_keypair()         │
//!   │                       compute_shared_secret(A_pub)
//!   │                       derive_session_key()       │
//!   │                                                  │
//!   │  ◄──────────────────────────────────── B_pub     │
//!   │                                                  │
//!   │  compute_shared_secret(B_pub)                    │
//!   │  derive_session_key()                            │
//!   │                                                  │
//!   │ ═══════════ same 32-byte session key ══════════  │
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Peer input is untrusted: malformed encodings and low-order points
//!   both surface as the same `InvalidPeerKey`
//! - There is no identity binding here; who may respond is decided by
//!   the session store, not by the crypto
//!
//! ## Last Modified
//! v0.1.0 - Ephemeral X25519 handshake

use tracing::debug;

use crate::crypto::kdf::derive_session_key;
use crate::crypto::keys::{EphemeralKeyPair, PublicValue, SessionKey, SharedSecret};
use crate::error::Result;

/// Generates a fresh X25519 key pair from the OS RNG.
#[must_use]
pub fn generate_keypair() -> EphemeralKeyPair {
    EphemeralKeyPair::generate()
}

/// Returns the versioned wire encoding of a public value.
///
/// Deterministic: the same key always encodes to the same bytes.
#[must_use]
pub fn encode_public(public: &PublicValue) -> Vec<u8> {
    public.to_wire()
}

/// Decodes the peer's public value and runs X25519 against it.
///
/// # Errors
/// - `InvalidPeerKey`: wrong length, unknown version, or a
///   non-contributory (low-order / all-zero) point
/// - `SecretDiscarded`: `private` no longer holds its secret half
pub fn compute_shared_secret(
    private: &EphemeralKeyPair,
    peer_public_bytes: &[u8],
) -> Result<SharedSecret> {
    let peer = PublicValue::from_wire(peer_public_bytes).map_err(|e| {
        debug!(len = peer_public_bytes.len(), "Rejected peer public value encoding");
        e
    })?;
    private.diffie_hellman(&peer)
}

/// Runs X25519 against an already-decoded peer value and derives the
/// session key.
///
/// # Errors
/// Same as [`compute_shared_secret`].
pub fn agree(private: &EphemeralKeyPair, peer: &PublicValue) -> Result<SessionKey> {
    let shared = private.diffie_hellman(peer)?;
    derive_session_key(&shared)
}

// ============================================
// Tests
// ============================================
