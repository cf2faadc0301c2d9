// ============================================
// File: crates/cipherchat-core/src/crypto/aead.rs
// ============================================
//! # Message Encryption
//!
//! ## Creation Reason
//! Provides authenticated encryption for chat payloads using
//! XChaCha20-Poly1305 before they reach storage or the wire.
//!
//! ## Main Functionality
//! - `encrypt` / `decrypt`: AEAD with detached tag
//! - `EncryptedPayload`: Algorithm tag, nonce, ciphertext, tag
//! - `message_associated_data`: Binds sender and recipient into the tag
//!
//! ## Payload Format
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │ Version (1 byte) = 0x01                              │
//! ├──────────────────────────────────────────────────────┤
//! │ Algorithm (1 byte) = 0x01 XChaCha20-Poly1305         │
//! ├──────────────────────────────────────────────────────┤
//! │ Nonce (24 bytes, random per message)                 │
//! ├──────────────────────────────────────────────────────┤
//! │ Poly1305 Tag (16 bytes)                              │
//! ├──────────────────────────────────────────────────────┤
//! │ Ciphertext (same length as plaintext)                │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security Properties
//! - **AEAD**: Authenticated Encryption with Associated Data
//! - **Uniform failure**: every decrypt failure is `AuthenticationFailed`
//! - **Direction binding**: the associated data names sender then
//!   recipient, so a payload cannot be replayed in the other direction
//!
//! ## ⚠️ Important Note for Next Developer
//! - Never reuse a (key, nonce) pair; nonces come from `OsRng` each call
//! - Do not return partial plaintext on failure
//!
//! ## Last Modified
//! v0.1.0 - XChaCha20-Poly1305 message encryption

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chacha20poly1305::{
    aead::{AeadInPlace, KeyInit},
    Tag, XChaCha20Poly1305, XNonce,
};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;

use cipherchat_common::types::ParticipantId;

use super::{MESSAGE_AD_LABEL, POLY1305_TAG_SIZE, XCHACHA20_NONCE_SIZE};
use crate::crypto::keys::SessionKey;
use crate::error::{CoreError, Result};
use crate::protocol::codec;
use crate::protocol::version::AeadAlgorithm;

// ============================================
// EncryptedPayload
// ============================================

/// Output of [`encrypt`]. Never carries key material.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptedPayload {
    /// Cipher used
    pub algorithm: AeadAlgorithm,
    /// Random nonce
    pub nonce: [u8; XCHACHA20_NONCE_SIZE],
    /// Encrypted bytes (same length as the plaintext)
    pub ciphertext: Vec<u8>,
    /// Detached authentication tag
    pub tag: [u8; POLY1305_TAG_SIZE],
}

impl EncryptedPayload {
    /// Returns the versioned wire encoding.
    #[must_use]
    pub fn to_wire(&self) -> Vec<u8> {
        codec::encode_payload(self)
    }

    /// Parses the versioned wire encoding.
    ///
    /// # Errors
    /// `AuthenticationFailed` for any malformed input.
    pub fn from_wire(bytes: &[u8]) -> Result<Self> {
        codec::decode_payload(bytes)
    }
}

impl fmt::Debug for EncryptedPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedPayload")
            .field("algorithm", &self.algorithm)
            .field("ciphertext_len", &self.ciphertext.len())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for EncryptedPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&BASE64.encode(self.to_wire()))
    }
}

impl FromStr for EncryptedPayload {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = BASE64.decode(s).map_err(|_| {
            debug!("Payload is not valid base64");
            CoreError::AuthenticationFailed
        })?;
        Self::from_wire(&bytes)
    }
}

impl Serialize for EncryptedPayload {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for EncryptedPayload {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================
// Associated Data
// ============================================

/// Builds the associated data for a message from `sender` to `recipient`.
///
/// ```text
/// label || u32_be(len(sender)) || sender || u32_be(len(recipient)) || recipient
/// ```
#[must_use]
pub fn message_associated_data(sender: &ParticipantId, recipient: &ParticipantId) -> Vec<u8> {
    let s = sender.as_str().as_bytes();
    let r = recipient.as_str().as_bytes();
    let mut ad = Vec::with_capacity(MESSAGE_AD_LABEL.len() + 8 + s.len() + r.len());
    ad.extend_from_slice(MESSAGE_AD_LABEL);
    ad.extend_from_slice(&u32::try_from(s.len()).unwrap_or(u32::MAX).to_be_bytes());
    ad.extend_from_slice(s);
    ad.extend_from_slice(&u32::try_from(r.len()).unwrap_or(u32::MAX).to_be_bytes());
    ad.extend_from_slice(r);
    ad
}

// ============================================
// Encrypt / Decrypt
// ============================================

/// Encrypts `plaintext` under `key` with a fresh random nonce.
///
/// # Errors
/// `EncryptionFailed` only if the primitive itself fails.
pub fn encrypt(key: &SessionKey, plaintext: &[u8], associated_data: &[u8]) -> Result<EncryptedPayload> {
    let cipher = XChaCha20Poly1305::new_from_slice(key.as_bytes())
        .map_err(|_| CoreError::encryption("failed to create cipher"))?;

    let mut nonce = [0u8; XCHACHA20_NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);

    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(XNonce::from_slice(&nonce), associated_data, &mut buffer)
        .map_err(|_| CoreError::encryption("XChaCha20-Poly1305 encryption failed"))?;

    let mut tag_bytes = [0u8; POLY1305_TAG_SIZE];
    tag_bytes.copy_from_slice(tag.as_slice());

    Ok(EncryptedPayload {
        algorithm: AeadAlgorithm::XChaCha20Poly1305,
        nonce,
        ciphertext: buffer,
        tag: tag_bytes,
    })
}

/// Verifies and decrypts `payload`.
///
/// The tag is checked before any plaintext is released.
///
/// # Errors
/// `AuthenticationFailed` for every failure: wrong key, tampered
/// ciphertext, tag, nonce or associated data.
pub fn decrypt(key: &SessionKey, payload: &EncryptedPayload, associated_data: &[u8]) -> Result<Vec<u8>> {
    match payload.algorithm {
        AeadAlgorithm::XChaCha20Poly1305 => {}
    }

    let cipher = XChaCha20Poly1305::new_from_slice(key.as_bytes())
        .map_err(|_| CoreError::AuthenticationFailed)?;

    let mut buffer = payload.ciphertext.clone();
    cipher
        .decrypt_in_place_detached(
            XNonce::from_slice(&payload.nonce),
            associated_data,
            &mut buffer,
            Tag::from_slice(&payload.tag),
        )
        .map_err(|_| {
            debug!(ciphertext_len = payload.ciphertext.len(), "AEAD tag verification failed");
            CoreError::AuthenticationFailed
        })?;

    Ok(buffer)
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: u8) -> SessionKey {
        SessionKey::from_bytes([byte; 32])
    }

    fn pid(s: &str) -> ParticipantId {
        ParticipantId::new(s).unwrap()
    }

    #[test]
    fn test_encrypt_decrypt() {
        let k = key(0x42);
        let ad = b"ad";
        let payload = encrypt(&k, b"hello", ad).unwrap();

        assert_eq!(payload.ciphertext.len(), 5);
        assert_eq!(decrypt(&k, &payload, ad).unwrap(), b"hello");
    }

    #[test]
    fn test_empty_plaintext() {
        let k = key(0x42);
        let payload = encrypt(&k, b"", b"").unwrap();
        assert!(payload.ciphertext.is_empty());
        assert!(decrypt(&k, &payload, b"").unwrap().is_empty());
    }

    #[test]
    fn test_fresh_nonce_per_call() {
        let k = key(0x42);
        let p1 = encrypt(&k, b"same", b"").unwrap();
        let p2 = encrypt(&k, b"same", b"").unwrap();
        assert_ne!(p1.nonce, p2.nonce);
        assert_ne!(p1.ciphertext, p2.ciphertext);
    }

    #[test]
    fn test_wrong_key_fails() {
        let payload = encrypt(&key(1), b"secret", b"").unwrap();
        assert!(matches!(
            decrypt(&key(2), &payload, b""),
            Err(CoreError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let k = key(0x42);
        let mut payload = encrypt(&k, b"hello", b"").unwrap();
        payload.ciphertext[0] ^= 0x01;
        assert!(matches!(decrypt(&k, &payload, b""), Err(CoreError::AuthenticationFailed)));
    }

    #[test]
    fn test_tampered_tag_fails() {
        let k = key(0x42);
        let mut payload = encrypt(&k, b"hello", b"").unwrap();
        payload.tag[15] ^= 0x80;
        assert!(matches!(decrypt(&k, &payload, b""), Err(CoreError::AuthenticationFailed)));
    }

    #[test]
    fn test_tampered_nonce_fails() {
        let k = key(0x42);
        let mut payload = encrypt(&k, b"hello", b"").unwrap();
        payload.nonce[0] ^= 0x01;
        assert!(matches!(decrypt(&k, &payload, b""), Err(CoreError::AuthenticationFailed)));
    }

    #[test]
    fn test_wrong_associated_data_fails() {
        let k = key(0x42);
        let alice = pid("alice");
        let bob = pid("bob");

        let ad_ab = message_associated_data(&alice, &bob);
        let ad_ba = message_associated_data(&bob, &alice);
        assert_ne!(ad_ab, ad_ba);

        let payload = encrypt(&k, b"hi", &ad_ab).unwrap();
        assert!(matches!(decrypt(&k, &payload, &ad_ba), Err(CoreError::AuthenticationFailed)));
        assert_eq!(decrypt(&k, &payload, &ad_ab).unwrap(), b"hi");
    }

    #[test]
    fn test_associated_data_is_length_prefixed() {
        let ad1 = message_associated_data(&pid("ab"), &pid("c"));
        let ad2 = message_associated_data(&pid("a"), &pid("bc"));
        assert_ne!(ad1, ad2);
    }

    #[test]
    fn test_payload_string_roundtrip_and_decrypt() {
        let k = key(9);
        let payload = encrypt(&k, b"over the wire", b"x").unwrap();
        let parsed: EncryptedPayload = payload.to_string().parse().unwrap();
        assert_eq!(parsed, payload);
        assert_eq!(decrypt(&k, &parsed, b"x").unwrap(), b"over the wire");
    }

    #[test]
    fn test_debug_hides_contents() {
        let payload = encrypt(&key(1), b"plaintext", b"").unwrap();
        let debug = format!("{payload:?}");
        assert!(debug.contains("ciphertext_len"));
        assert!(!debug.contains("nonce"));
    }
}
