// ============================================
// File: crates/cipherchat-core/src/crypto/kdf.rs
// ============================================
//! # Key Derivation Functions
//!
//! ## Main Functionality
//! - `derive_key`: HKDF-SHA256 over a raw secret with a caller label
//! - `derive_session_key`: The same with the fixed session label
//!
//! Both participants feed the same X25519 output and label, so both end
//! up with the same 32-byte key. No salt is used; the label provides
//! domain separation.
//!
//! ## Last Modified
//! v0.1.0 - Session key derivation

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

use super::{HKDF_SESSION_INFO, SESSION_KEY_SIZE};
use crate::crypto::keys::{SessionKey, SharedSecret};
use crate::error::{CoreError, Result};

// ============================================
// Key Derivation
// ============================================

/// Derives a 32-byte key from raw secret material.
///
/// # Arguments
/// * `raw_secret` - Input keying material (the X25519 output)
/// * `context_label` - HKDF info; different labels give unrelated keys
///
/// # Errors
/// `KeyDerivation` if HKDF refuses the output length (cannot happen for
/// 32 bytes with SHA-256).
pub fn derive_key(raw_secret: &[u8], context_label: &[u8]) -> Result<SessionKey> {
    let hk = Hkdf::<Sha256>::new(None, raw_secret);

    let mut key_bytes = [0u8; SESSION_KEY_SIZE];
    hk.expand(context_label, &mut key_bytes)
        .map_err(|_| CoreError::key_derivation("HKDF expansion failed"))?;

    let key = SessionKey::from_bytes(key_bytes);
    key_bytes.zeroize();
    Ok(key)
}

/// Derives the pair session key from an X25519 shared secret.
pub fn derive_session_key(shared: &SharedSecret) -> Result<SessionKey> {
    derive_key(shared.as_bytes(), HKDF_SESSION_INFO)
}

// ============================================
// Tests
// ============================================
