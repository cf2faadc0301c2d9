// ============================================
// File: crates/cipherchat-relay/src/traits.rs
// ============================================
//! # Relay Traits
//!
//! ## Creation Reason
//! The exchange coordinator pushes handshake and message events to a
//! specific participant without knowing how that participant is
//! connected. This module is that contract.
//!
//! ## Main Functionality
//! - `Relay`: Deliver an event to one participant, or report unreachable
//! - `Delivery`: Outcome of a single delivery attempt
//! - `RelayEvent`: The three event kinds the core emits
//!
//! ## Event JSON
//! ```text
//! {"type":"keyExchangeRequest","from":"alice","publicKey":"AQ..","sessionId":"..."}
//! {"type":"keyExchangeResponse","from":"bob","sessionId":"...","publicKey":"AQ..","accepted":true}
//! {"type":"newMessage","from":"alice","payload":"AQE..","sentAt":1700000000000}
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - `deliver` must not block on a slow receiver; report `Unreachable`
//! - Implementations must be Send + Sync for use in async contexts
//!
//! ## Last Modified
//! v0.1.0 - Initial trait definitions

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use cipherchat_common::time::Timestamp;
use cipherchat_common::types::{ParticipantId, SessionId};
use cipherchat_core::crypto::{EncryptedPayload, PublicValue};

use crate::error::Result;

// ============================================
// Delivery
// ============================================

/// Outcome of one delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Delivery {
    /// The event was handed to the participant's connection.
    Delivered,
    /// The participant is offline or cannot accept events right now.
    Unreachable,
}

impl Delivery {
    /// Returns `true` for [`Delivery::Delivered`].
    #[must_use]
    pub const fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

// ============================================
// RelayEvent
// ============================================

/// Event pushed to a participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RelayEvent {
    /// A peer started a handshake with the recipient.
    #[serde(rename_all = "camelCase")]
    KeyExchangeRequest {
        /// Initiator
        from: ParticipantId,
        /// Initiator's public value
        public_key: PublicValue,
        /// Attempt to answer
        session_id: SessionId,
    },

    /// The responder accepted or declined the recipient's handshake.
    #[serde(rename_all = "camelCase")]
    KeyExchangeResponse {
        /// Responder
        from: ParticipantId,
        /// Attempt being answered
        session_id: SessionId,
        /// Responder's public value, present only when accepted
        #[serde(default, skip_serializing_if = "Option::is_none")]
        public_key: Option<PublicValue>,
        /// Whether the handshake was accepted
        accepted: bool,
    },

    /// An encrypted chat message.
    #[serde(rename = "newMessage", rename_all = "camelCase")]
    Message {
        /// Sender
        from: ParticipantId,
        /// Encrypted body
        payload: EncryptedPayload,
        /// Wall-clock send time
        sent_at: Timestamp,
    },
}

impl RelayEvent {
    /// Returns the wire tag of the event.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::KeyExchangeRequest { .. } => "keyExchangeRequest",
            Self::KeyExchangeResponse { .. } => "keyExchangeResponse",
            Self::Message { .. } => "newMessage",
        }
    }

    /// Returns the participant the event originates from.
    #[must_use]
    pub const fn sender(&self) -> &ParticipantId {
        match self {
            Self::KeyExchangeRequest { from, .. }
            | Self::KeyExchangeResponse { from, .. }
            | Self::Message { from, .. } => from,
        }
    }

    /// Encodes the event as JSON.
    ///
    /// # Errors
    /// `Encoding` if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes an event from JSON.
    ///
    /// # Errors
    /// `Encoding` on malformed input.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

// ============================================
// Relay Trait
// ============================================

/// Push channel to online participants.
///
/// # Example
/// ```ignore
/// async fn notify<R: Relay>(relay: &R, to: &ParticipantId, event: RelayEvent) {
///     if !relay.deliver(to, event).await.is_delivered() {
///         // peer offline
///     }
/// }
/// ```
#[async_trait]
pub trait Relay: Send + Sync {
    /// Delivers `event` to `to`.
    ///
    /// Never fails with an error; anything that prevents delivery is
    /// [`Delivery::Unreachable`].
    async fn deliver(&self, to: &ParticipantId, event: RelayEvent) -> Delivery;

    /// Returns `true` if `participant` currently has a live connection.
    ///
    /// Advisory only; a `true` answer can be stale by the time of delivery.
    fn is_online(&self, participant: &ParticipantId) -> bool;
}

// ============================================
// Tests
// ============================================
