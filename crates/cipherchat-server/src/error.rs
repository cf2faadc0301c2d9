// ============================================
// File: crates/cipherchat-server/src/error.rs
// ============================================
//! # Server Error Types
//!
//! ## Creation Reason
//! One error type for every exchange and store operation, so callers can
//! map outcomes to responses without peeking into the crypto crate.
//!
//! ## ⚠️ Important Note for Next Developer
//! - `InvalidPeerKey` and `AuthenticationFailed` stay detail-free
//! - Crypto errors are mapped variant by variant; do not wrap `CoreError`
//!   transparently or its internals leak into responses
//!
//! ## Last Modified
//! v0.1.0 - Exchange error definitions

use thiserror::Error;

use cipherchat_common::error::CommonError;
use cipherchat_core::error::CoreError;

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Server error types.
#[derive(Error, Debug)]
pub enum ServerError {
    // ========================================
    // Configuration
    // ========================================
    /// Configuration file could not be read or parsed.
    #[error("Failed to load configuration from '{path}': {reason}")]
    ConfigLoad {
        /// Source of the configuration
        path: String,
        /// Underlying failure
        reason: String,
    },

    /// Configuration parsed but holds an unusable value.
    #[error("Invalid configuration: {field} - {reason}")]
    ConfigInvalid {
        /// Offending key
        field: String,
        /// Why it was rejected
        reason: String,
    },

    // ========================================
    // Exchange / Store
    // ========================================
    /// Initiator and target are the same participant.
    #[error("Cannot exchange keys with yourself")]
    SelfExchange,

    /// A live session already exists for the pair.
    #[error("A key exchange session is already active for this pair")]
    SessionAlreadyActive,

    /// No live session with the given id.
    #[error("Key exchange session not found")]
    SessionNotFound,

    /// The session has already been answered.
    #[error("Key exchange session is not pending")]
    NotPending,

    /// Caller is not the participant allowed to answer.
    #[error("Not authorized to respond to this key exchange")]
    Unauthorized,

    /// Caller is not the initiator of the session.
    #[error("Only the initiator can complete this key exchange")]
    NotAuthorizedInitiator,

    /// Peer public value is malformed or unusable.
    #[error("Invalid peer public key")]
    InvalidPeerKey,

    /// Target participant is not reachable.
    #[error("Target user is offline")]
    PeerOffline,

    /// The pair has no completed session.
    #[error("No active key exchange session for this pair")]
    NoActiveSession,

    /// Encryption primitive failed.
    #[error("Encryption failed")]
    EncryptionFailed,

    /// Ciphertext failed authentication.
    #[error("Message authentication failed")]
    AuthenticationFailed,

    /// Store is at capacity.
    #[error("Session limit reached: max {limit} sessions")]
    SessionLimitReached {
        /// Configured maximum
        limit: usize,
    },

    /// Malformed identifier or similar input.
    #[error(transparent)]
    InvalidInput(CommonError),

    /// Unexpected internal condition.
    #[error("Internal error: {message}")]
    Internal {
        /// Description
        message: String,
    },
}

impl ServerError {
    /// Creates a `ConfigLoad` error.
    pub fn config_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `ConfigInvalid` error.
    pub fn config_invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates an `Internal` error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` for configuration errors.
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::ConfigLoad { .. } | Self::ConfigInvalid { .. })
    }

    /// Returns `true` if retrying later may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::PeerOffline | Self::SessionLimitReached { .. })
    }

    /// Returns `true` if this error might indicate an attack.
    #[must_use]
    pub const fn is_suspicious(&self) -> bool {
        matches!(
            self,
            Self::InvalidPeerKey
                | Self::AuthenticationFailed
                | Self::Unauthorized
                | Self::NotAuthorizedInitiator
        )
    }

    /// Returns `true` for failures of the cryptographic step itself.
    #[must_use]
    pub const fn is_crypto_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidPeerKey | Self::EncryptionFailed | Self::AuthenticationFailed
        )
    }
}

impl From<CommonError> for ServerError {
    fn from(err: CommonError) -> Self {
        match err {
            CommonError::SamePair => Self::SelfExchange,
            other => Self::InvalidInput(other),
        }
    }
}

impl From<CoreError> for ServerError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidPeerKey => Self::InvalidPeerKey,
            CoreError::AuthenticationFailed => Self::AuthenticationFailed,
            CoreError::EncryptionFailed { .. } => Self::EncryptionFailed,
            CoreError::Common(e) => e.into(),
            other @ (CoreError::KeyDerivation { .. } | CoreError::SecretDiscarded) => {
                Self::internal(other.to_string())
            }
        }
    }
}
