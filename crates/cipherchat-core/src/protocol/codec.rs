// ============================================
// File: crates/cipherchat-core/src/protocol/codec.rs
// ============================================
//! # Wire Codec
//!
//! ## Creation Reason
//! Turns public values and encrypted payloads into the byte layouts the
//! relay and storage carry (base64 on top is the caller's concern).
//!
//! ## Wire Layouts
//! ```text
//! Public value:  version(1) || x25519_public(32)                 = 33 bytes
//! Payload:       version(1) || algorithm(1) || nonce(24)
//!                || tag(16) || ciphertext(n)                     >= 42 bytes
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Decode errors are deliberately coarse: public values fail with
//!   `InvalidPeerKey`, payloads with `AuthenticationFailed`
//! - The precise reason is logged at debug level only
//!
//! ## Last Modified
//! v0.1.0 - Initial codec implementation

use tracing::debug;

use crate::crypto::aead::EncryptedPayload;
use crate::crypto::keys::PublicValue;
use crate::crypto::{POLY1305_TAG_SIZE, X25519_PUBLIC_KEY_SIZE, XCHACHA20_NONCE_SIZE};
use crate::error::{CoreError, Result};
use crate::protocol::version::{AeadAlgorithm, WireVersion};

// ============================================
// Sizes
// ============================================

/// Encoded size of a public value.
pub const PUBLIC_VALUE_WIRE_SIZE: usize = 1 + X25519_PUBLIC_KEY_SIZE;

/// Encoded size of a payload header (everything before the ciphertext).
pub const PAYLOAD_HEADER_SIZE: usize = 1 + 1 + XCHACHA20_NONCE_SIZE + POLY1305_TAG_SIZE;

// ============================================
// Public Value
// ============================================

/// Encodes a public value.
#[must_use]
pub fn encode_public_value(public: &PublicValue) -> Vec<u8> {
    let mut buf = Vec::with_capacity(PUBLIC_VALUE_WIRE_SIZE);
    buf.push(WireVersion::current().as_u8());
    buf.extend_from_slice(public.as_bytes());
    buf
}

/// Decodes a public value.
///
/// # Errors
/// `InvalidPeerKey` on wrong length or unsupported version.
pub fn decode_public_value(buf: &[u8]) -> Result<PublicValue> {
    if buf.len() != PUBLIC_VALUE_WIRE_SIZE {
        debug!(expected = PUBLIC_VALUE_WIRE_SIZE, actual = buf.len(), "Public value length mismatch");
        return Err(CoreError::InvalidPeerKey);
    }
    let version = WireVersion::new(buf[0]);
    if !version.is_supported() {
        debug!(%version, "Unsupported public value version");
        return Err(CoreError::InvalidPeerKey);
    }
    let mut point = [0u8; X25519_PUBLIC_KEY_SIZE];
    point.copy_from_slice(&buf[1..]);
    Ok(PublicValue::from_bytes(point))
}

// ============================================
// Encrypted Payload
// ============================================

/// Encodes an encrypted payload.
#[must_use]
pub fn encode_payload(payload: &EncryptedPayload) -> Vec<u8> {
    let mut buf = Vec::with_capacity(PAYLOAD_HEADER_SIZE + payload.ciphertext.len());
    buf.push(WireVersion::current().as_u8());
    buf.push(payload.algorithm.as_byte());
    buf.extend_from_slice(&payload.nonce);
    buf.extend_from_slice(&payload.tag);
    buf.extend_from_slice(&payload.ciphertext);
    buf
}

/// Decodes an encrypted payload.
///
/// # Errors
/// `AuthenticationFailed` when truncated or when the version or
/// algorithm byte is unknown.
pub fn decode_payload(buf: &[u8]) -> Result<EncryptedPayload> {
    if buf.len() < PAYLOAD_HEADER_SIZE {
        debug!(min = PAYLOAD_HEADER_SIZE, actual = buf.len(), "Payload too short");
        return Err(CoreError::AuthenticationFailed);
    }
    let version = WireVersion::new(buf[0]);
    if !version.is_supported() {
        debug!(%version, "Unsupported payload version");
        return Err(CoreError::AuthenticationFailed);
    }
    let algorithm = AeadAlgorithm::from_byte(buf[1]).ok_or_else(|| {
        debug!(algorithm = buf[1], "Unknown payload algorithm");
        CoreError::AuthenticationFailed
    })?;

    let mut offset = 2;
    let mut nonce = [0u8; XCHACHA20_NONCE_SIZE];
    nonce.copy_from_slice(&buf[offset..offset + XCHACHA20_NONCE_SIZE]);
    offset += XCHACHA20_NONCE_SIZE;

    let mut tag = [0u8; POLY1305_TAG_SIZE];
    tag.copy_from_slice(&buf[offset..offset + POLY1305_TAG_SIZE]);
    offset += POLY1305_TAG_SIZE;

    Ok(EncryptedPayload {
        algorithm,
        nonce,
        ciphertext: buf[offset..].to_vec(),
        tag,
    })
}

// ============================================
// Tests
// ============================================
