// ============================================
// File: crates/cipherchat-relay/src/error.rs
// ============================================
//! # Relay Error Types
//!
//! ## Creation Reason
//! Delivery itself never fails with an error (it reports `Unreachable`),
//! but the receiving side of a connection and event encoding can.
//!
//! ## ⚠️ Important Note for Next Developer
//! - A closed connection is normal after `disconnect` or reconnect
//! - Event payloads are ciphertext; never echo them into error text
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

use cipherchat_common::types::ParticipantId;

// ============================================
// Result Type Alias
// ============================================

/// Result type for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;

// ============================================
// RelayError
// ============================================

/// Relay error types.
#[derive(Error, Debug)]
pub enum RelayError {
    /// The connection was closed by disconnect or a newer connection.
    #[error("Connection closed for participant {participant}")]
    ConnectionClosed {
        /// Owner of the closed connection
        participant: ParticipantId,
    },

    /// An event could not be encoded or decoded as JSON.
    #[error("Event encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl RelayError {
    /// Returns `true` if reconnecting may resolve this error.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ConnectionClosed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let closed = RelayError::ConnectionClosed {
            participant: ParticipantId::new("bob").unwrap(),
        };
        assert!(closed.is_retryable());
        assert!(closed.to_string().contains("bob"));

        let encoding: RelayError = serde_json::from_str::<u8>("x").unwrap_err().into();
        assert!(!encoding.is_retryable());
    }
}
