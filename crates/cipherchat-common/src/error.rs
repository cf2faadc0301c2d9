// ============================================
// File: crates/cipherchat-common/src/error.rs
// ============================================
//! # Common Error Types
//!
//! ## Creation Reason
//! Identifier parsing happens at every crate boundary; this keeps the
//! failure vocabulary for it in one place.
//!
//! ## Main Functionality
//! - `CommonError`: Validation and decoding failures for shared types
//! - `Result<T>`: Type alias using `CommonError`
//!
//! ## ⚠️ Important Note for Next Developer
//! - Never include key material in error messages
//! - Higher crates wrap this error; keep variants few and specific
//!
//! ## Last Modified
//! v0.1.0 - Identifier validation errors

use thiserror::Error;

// ============================================
// Result Type Alias
// ============================================

/// Common result type for operations that may fail.
pub type Result<T> = std::result::Result<T, CommonError>;

// ============================================
// CommonError
// ============================================

/// Errors produced while building or parsing shared identifiers.
///
/// # Example
/// ```
/// use cipherchat_common::error::{CommonError, Result};
///
/// fn validate_input(data: &str) -> Result<()> {
///     if data.is_empty() {
///         return Err(CommonError::invalid_input("data", "cannot be empty"));
///     }
///     Ok(())
/// }
/// ```
#[derive(Error, Debug)]
pub enum CommonError {
    /// Invalid input data provided.
    #[error("Invalid input for '{field}': {reason}")]
    InvalidInput {
        /// Name of the field or parameter
        field: String,
        /// Description of what's wrong
        reason: String,
    },

    /// Data length doesn't match expected size.
    #[error("Invalid length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected length in bytes
        expected: usize,
        /// Actual length received
        actual: usize,
    },

    /// A pair was requested for a participant and itself.
    #[error("A participant cannot be paired with itself")]
    SamePair,

    /// Failed to decode data.
    #[error("Decoding error: {context}")]
    Decoding {
        /// What was being decoded
        context: String,
        /// Error details
        details: String,
    },
}

impl CommonError {
    /// Creates an `InvalidInput` error.
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates an `InvalidLength` error.
    #[must_use]
    pub const fn invalid_length(expected: usize, actual: usize) -> Self {
        Self::InvalidLength { expected, actual }
    }

    /// Returns `true` if this error indicates a client mistake.
    ///
    /// Every variant currently does; the helper exists so callers do not
    /// have to track that.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput { .. }
                | Self::InvalidLength { .. }
                | Self::SamePair
                | Self::Decoding { .. }
        )
    }
}

impl From<base64::DecodeError> for CommonError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Decoding {
            context: "base64 decode".into(),
            details: err.to_string(),
        }
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CommonError::invalid_input("participant_id", "cannot be empty");
        assert!(err.to_string().contains("participant_id"));
        assert!(err.to_string().contains("cannot be empty"));
    }

    #[test]
    fn test_error_classification() {
        assert!(CommonError::SamePair.is_client_error());
        assert!(CommonError::invalid_length(16, 3).is_client_error());
    }

    #[test]
    fn test_base64_error_conversion() {
        use base64::{engine::general_purpose::STANDARD, Engine};
        let err: CommonError = STANDARD.decode("@@@").unwrap_err().into();
        assert!(matches!(err, CommonError::Decoding { .. }));
    }
}
