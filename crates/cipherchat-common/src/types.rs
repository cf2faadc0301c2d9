// ============================================
// File: crates/cipherchat-common/src/types.rs
// ============================================
//! # Core Type Definitions
//!
//! ## Creation Reason
//! Centralizes the identifiers every cipherchat crate agrees on, so a
//! participant pair always resolves to the same session record no matter
//! which side asks.
//!
//! ## Main Functionality
//! - `ParticipantId`: Opaque, externally issued user identifier
//! - `PairKey`: Canonical unordered pair of two distinct participants
//! - `SessionId`: Random identifier for one handshake attempt (16 bytes)
//!
//! ## Main Logical Flow
//! 1. Participant ids arrive from the identity collaborator as strings
//! 2. Two ids are canonicalized into a `PairKey` (sorted)
//! 3. Each handshake attempt for a pair gets a fresh `SessionId`
//! 4. Session ids travel in relay events as base64
//!
//! ## ⚠️ Important Note for Next Developer
//! - SessionId is security-relevant: stale or replayed ids must never
//!   resolve to a newer attempt, so always generate it from the OS RNG
//! - PairKey ordering is lexicographic on the raw id bytes; do not change
//!   it without migrating every live session
//!
//! ## Last Modified
//! v0.1.0 - Participant, pair and session identifiers

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::{CommonError, Result};

// ============================================
// Constants
// ============================================

/// Size of SessionId in bytes
pub const SESSION_ID_SIZE: usize = 16;

// ============================================
// ParticipantId
// ============================================

/// Opaque identifier of a chat participant.
///
/// Issued by the user directory; the core only compares ids for equality
/// and ordering. Cloning is cheap (shared string).
///
/// # Example
/// ```
/// use cipherchat_common::types::ParticipantId;
///
/// let alice = ParticipantId::new("alice").unwrap();
/// assert_eq!(alice.as_str(), "alice");
/// assert!(ParticipantId::new("").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ParticipantId(Arc<str>);

impl ParticipantId {
    /// Creates a participant id.
    ///
    /// # Errors
    /// Returns `InvalidInput` if `id` is empty.
    pub fn new(id: impl AsRef<str>) -> Result<Self> {
        let id = id.as_ref();
        if id.is_empty() {
            return Err(CommonError::invalid_input("participant_id", "cannot be empty"));
        }
        Ok(Self(Arc::from(id)))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ParticipantId({})", self.0)
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ParticipantId {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for ParticipantId {
    type Error = CommonError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ParticipantId> for String {
    fn from(id: ParticipantId) -> Self {
        id.0.as_ref().to_owned()
    }
}

// ============================================
// PairKey
// ============================================

/// Canonical unordered pair of two distinct participants.
///
/// `PairKey::new(a, b) == PairKey::new(b, a)` for every `a != b`; this is
/// what lets both sides of a conversation find the same session.
///
/// # Example
/// ```
/// use cipherchat_common::types::{PairKey, ParticipantId};
///
/// let a = ParticipantId::new("alice").unwrap();
/// let b = ParticipantId::new("bob").unwrap();
/// assert_eq!(PairKey::new(&a, &b).unwrap(), PairKey::new(&b, &a).unwrap());
/// assert!(PairKey::new(&a, &a).is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PairKey {
    low: ParticipantId,
    high: ParticipantId,
}

impl PairKey {
    /// Canonicalizes two participant ids into a pair key.
    ///
    /// # Errors
    /// Returns `SamePair` if both ids are equal.
    pub fn new(a: &ParticipantId, b: &ParticipantId) -> Result<Self> {
        match a.cmp(b) {
            Ordering::Less => Ok(Self {
                low: a.clone(),
                high: b.clone(),
            }),
            Ordering::Greater => Ok(Self {
                low: b.clone(),
                high: a.clone(),
            }),
            Ordering::Equal => Err(CommonError::SamePair),
        }
    }

    /// Returns `true` if `id` is one of the two participants.
    #[must_use]
    pub fn contains(&self, id: &ParticipantId) -> bool {
        &self.low == id || &self.high == id
    }

    /// Returns the participant opposite to `id`, if `id` is in the pair.
    #[must_use]
    pub fn other(&self, id: &ParticipantId) -> Option<&ParticipantId> {
        if &self.low == id {
            Some(&self.high)
        } else if &self.high == id {
            Some(&self.low)
        } else {
            None
        }
    }

    /// Returns both participants in canonical order.
    #[must_use]
    pub fn participants(&self) -> (&ParticipantId, &ParticipantId) {
        (&self.low, &self.high)
    }
}

impl fmt::Debug for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PairKey({}|{})", self.low, self.high)
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.low, self.high)
    }
}

// ============================================
// SessionId
// ============================================

/// Identifier of one handshake attempt.
///
/// # Security Properties
/// - Generated from the OS random number generator
/// - 128 bits of entropy, so ids of deleted attempts are never reissued
/// - Zeroized on drop
///
/// # Example
/// ```
/// use cipherchat_common::types::SessionId;
///
/// let id = SessionId::generate();
/// let parsed: SessionId = id.to_string().parse().unwrap();
/// assert_eq!(id, parsed);
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Zeroize)]
pub struct SessionId([u8; SESSION_ID_SIZE]);

impl Drop for SessionId {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl SessionId {
    /// Creates a `SessionId` from raw bytes.
    ///
    /// Returns `None` if `bytes` is not exactly 16 bytes long.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != SESSION_ID_SIZE {
            return None;
        }
        let mut id = [0u8; SESSION_ID_SIZE];
        id.copy_from_slice(bytes);
        Some(Self(id))
    }

    /// Generates a new random `SessionId`.
    #[must_use]
    pub fn generate() -> Self {
        let mut id = [0u8; SESSION_ID_SIZE];
        OsRng.fill_bytes(&mut id);
        Self(id)
    }

    /// Returns the raw bytes of the session ID.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; SESSION_ID_SIZE] {
        &self.0
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SessionId({:02x}{:02x}{:02x}{:02x}...)",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", BASE64.encode(self.0))
    }
}

impl FromStr for SessionId {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = BASE64.decode(s)?;
        Self::from_bytes(&bytes)
            .ok_or_else(|| CommonError::invalid_length(SESSION_ID_SIZE, bytes.len()))
    }
}

impl Serialize for SessionId {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&BASE64.encode(self.0))
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> Deserialize<'de> for SessionId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            s.parse().map_err(serde::de::Error::custom)
        } else {
            let bytes = <Vec<u8>>::deserialize(deserializer)?;
            Self::from_bytes(&bytes)
                .ok_or_else(|| serde::de::Error::invalid_length(bytes.len(), &"16 bytes"))
        }
    }
}

impl AsRef<[u8]> for SessionId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

// ============================================
// Tests
// ============================================
