// ============================================
// File: crates/cipherchat-core/src/protocol/version.rs
// ============================================
//! # Wire Versioning
//!
//! ## Creation Reason
//! Every encoded public value and payload starts with a version byte so
//! the format can change without ambiguity; payloads also name their
//! cipher.
//!
//! ## Version History
//! | Version | Description |
//! |---------|-------------|
//! | 0x01    | X25519 public values, XChaCha20-Poly1305 payloads |
//!
//! ## ⚠️ Important Note for Next Developer
//! - ALWAYS increment the version for wire format changes
//! - Unknown versions are rejected, never guessed at
//!
//! ## Last Modified
//! v0.1.0 - Initial version definitions

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================
// Constants
// ============================================

/// Current wire version.
pub const CURRENT_WIRE_VERSION: u8 = 0x01;

// ============================================
// WireVersion
// ============================================

/// Wire format version.
///
/// # Example
/// ```
/// use cipherchat_core::protocol::WireVersion;
///
/// assert!(WireVersion::current().is_supported());
/// assert!(!WireVersion::new(0).is_supported());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WireVersion(u8);

impl WireVersion {
    /// Creates a version from its byte.
    #[must_use]
    pub const fn new(version: u8) -> Self {
        Self(version)
    }

    /// Returns the current version.
    #[must_use]
    pub const fn current() -> Self {
        Self(CURRENT_WIRE_VERSION)
    }

    /// Returns the raw version number.
    #[must_use]
    pub const fn as_u8(&self) -> u8 {
        self.0
    }

    /// Checks if this version can be decoded.
    #[must_use]
    pub const fn is_supported(&self) -> bool {
        self.0 == CURRENT_WIRE_VERSION
    }
}

impl Default for WireVersion {
    fn default() -> Self {
        Self::current()
    }
}

impl fmt::Display for WireVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

// ============================================
// AeadAlgorithm
// ============================================

/// Cipher named by a payload's algorithm byte.
///
/// | Value | Algorithm |
/// |-------|-----------|
/// | 0x01 | XChaCha20-Poly1305 |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AeadAlgorithm {
    /// XChaCha20-Poly1305 with a 24-byte nonce.
    XChaCha20Poly1305 = 0x01,
}

impl AeadAlgorithm {
    /// Converts a byte to an algorithm, `None` if unknown.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::XChaCha20Poly1305),
            _ => None,
        }
    }

    /// Converts the algorithm to its byte representation.
    #[must_use]
    pub const fn as_byte(&self) -> u8 {
        *self as u8
    }
}

impl TryFrom<u8> for AeadAlgorithm {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_byte(value).ok_or(value)
    }
}

impl From<AeadAlgorithm> for u8 {
    fn from(alg: AeadAlgorithm) -> Self {
        alg.as_byte()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_version() {
        let v = WireVersion::current();
        assert_eq!(v.as_u8(), CURRENT_WIRE_VERSION);
        assert!(v.is_supported());
        assert_eq!(WireVersion::default(), v);
        assert_eq!(v.to_string(), "v1");
    }

    #[test]
    fn test_unsupported_versions() {
        assert!(!WireVersion::new(0x00).is_supported());
        assert!(!WireVersion::new(0x02).is_supported());
    }

    #[test]
    fn test_algorithm_byte_mapping() {
        assert_eq!(AeadAlgorithm::from_byte(0x01), Some(AeadAlgorithm::XChaCha20Poly1305));
        assert_eq!(AeadAlgorithm::XChaCha20Poly1305.as_byte(), 0x01);
        assert_eq!(AeadAlgorithm::try_from(0x02), Err(0x02));
        assert_eq!(AeadAlgorithm::from_byte(0x00), None);
    }
}
