// ============================================
// File: crates/cipherchat-relay/src/local.rs
// ============================================
//! # In-Process Relay
//!
//! ## Creation Reason
//! Routes events between participants connected to the same process,
//! and stands in for the real push channel in tests and the demo.
//!
//! ## Main Functionality
//! - `LocalRelay`: Registry of per-participant bounded channels
//! - `Connection`: Receiving end handed to a connected participant
//!
//! ## Usage
//! ```
//! use cipherchat_common::types::{ParticipantId, SessionId};
//! use cipherchat_core::crypto::EphemeralKeyPair;
//! use cipherchat_relay::{Delivery, LocalRelay, Relay, RelayEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let relay = LocalRelay::new(8);
//! let bob = ParticipantId::new("bob").unwrap();
//! let mut conn = relay.connect(&bob);
//!
//! let event = RelayEvent::KeyExchangeRequest {
//!     from: ParticipantId::new("alice").unwrap(),
//!     public_key: EphemeralKeyPair::generate().public_value(),
//!     session_id: SessionId::generate(),
//! };
//! assert_eq!(relay.deliver(&bob, event).await, Delivery::Delivered);
//! assert!(conn.try_recv().is_some());
//! # }
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Queues are bounded; a full queue reports `Unreachable` rather than
//!   waiting, so a stalled client cannot stall the coordinator
//! - One connection per participant; connecting again replaces it
//!
//! ## Last Modified
//! v0.1.0 - Initial in-process relay

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use cipherchat_common::types::ParticipantId;

use crate::error::{RelayError, Result};
use crate::traits::{Delivery, Relay, RelayEvent};

// ============================================
// Constants
// ============================================

/// Default per-connection queue depth.
pub const DEFAULT_QUEUE_DEPTH: usize = 256;

// ============================================
// Connection
// ============================================

/// Receiving end of a participant's connection.
#[derive(Debug)]
pub struct Connection {
    participant: ParticipantId,
    receiver: mpsc::Receiver<RelayEvent>,
}

impl Connection {
    /// Returns the participant this connection belongs to.
    #[must_use]
    pub fn participant(&self) -> &ParticipantId {
        &self.participant
    }

    /// Waits for the next event.
    ///
    /// # Errors
    /// `ConnectionClosed` once the relay dropped this connection and the
    /// queue is drained.
    pub async fn recv(&mut self) -> Result<RelayEvent> {
        self.receiver
            .recv()
            .await
            .ok_or_else(|| RelayError::ConnectionClosed {
                participant: self.participant.clone(),
            })
    }

    /// Returns the next queued event without waiting.
    pub fn try_recv(&mut self) -> Option<RelayEvent> {
        self.receiver.try_recv().ok()
    }
}

// ============================================
// LocalRelay
// ============================================

/// Relay for participants connected to this process.
pub struct LocalRelay {
    connections: DashMap<ParticipantId, mpsc::Sender<RelayEvent>>,
    queue_depth: usize,
}

impl LocalRelay {
    /// Creates a relay whose connections queue up to `queue_depth` events.
    ///
    /// A depth of zero is raised to one.
    #[must_use]
    pub fn new(queue_depth: usize) -> Self {
        Self {
            connections: DashMap::new(),
            queue_depth: queue_depth.max(1),
        }
    }

    /// Registers `participant` and returns its receiving end.
    ///
    /// An existing connection for the same participant is replaced and
    /// its receiver observes the close.
    pub fn connect(&self, participant: &ParticipantId) -> Connection {
        self.prune_closed();

        let (tx, rx) = mpsc::channel(self.queue_depth);
        if self.connections.insert(participant.clone(), tx).is_some() {
            debug!(participant = %participant, "Replaced existing connection");
        } else {
            debug!(participant = %participant, "Participant connected");
        }
        Connection {
            participant: participant.clone(),
            receiver: rx,
        }
    }

    /// Removes `participant`'s connection. Returns whether one existed.
    pub fn disconnect(&self, participant: &ParticipantId) -> bool {
        let removed = self.connections.remove(participant).is_some();
        if removed {
            debug!(participant = %participant, "Participant disconnected");
        }
        removed
    }

    /// Drops every connection whose receiver is gone. Returns how many.
    pub fn prune_closed(&self) -> usize {
        let before = self.connections.len();
        self.connections.retain(|_, s| !s.is_closed());
        let pruned = before.saturating_sub(self.connections.len());
        if pruned > 0 {
            debug!(pruned, "Pruned closed connections");
        }
        pruned
    }

    /// Returns the number of registered connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

impl Default for LocalRelay {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_DEPTH)
    }
}

impl std::fmt::Debug for LocalRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalRelay")
            .field("connections", &self.connection_count())
            .field("queue_depth", &self.queue_depth)
            .finish()
    }
}

#[async_trait]
impl Relay for LocalRelay {
    async fn deliver(&self, to: &ParticipantId, event: RelayEvent) -> Delivery {
        // Clone the sender so no map guard is held past this line.
        let Some(sender) = self.connections.get(to).map(|s| s.value().clone()) else {
            debug!(to = %to, kind = event.kind(), "Recipient not connected");
            return Delivery::Unreachable;
        };

        let kind = event.kind();
        match sender.try_send(event) {
            Ok(()) => Delivery::Delivered,
            Err(TrySendError::Full(_)) => {
                warn!(to = %to, kind, "Recipient queue full, dropping event");
                Delivery::Unreachable
            }
            Err(TrySendError::Closed(_)) => {
                // Only remove if nobody reconnected in the meantime.
                self.connections.remove_if(to, |_, s| s.is_closed());
                debug!(to = %to, kind, "Recipient connection closed");
                Delivery::Unreachable
            }
        }
    }

    fn is_online(&self, participant: &ParticipantId) -> bool {
        let open = self.connections.get(participant).map(|s| !s.is_closed());
        match open {
            Some(true) => true,
            Some(false) => {
                self.connections.remove_if(participant, |_, s| s.is_closed());
                false
            }
            None => false,
        }
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use cipherchat_common::types::SessionId;

    fn pid(s: &str) -> ParticipantId {
        ParticipantId::new(s).unwrap()
    }

    fn response(from: &str) -> RelayEvent {
        RelayEvent::KeyExchangeResponse {
            from: pid(from),
            session_id: SessionId::generate(),
            public_key: None,
            accepted: false,
        }
    }

    #[tokio::test]
    async fn test_deliver_to_connected() {
        let relay = LocalRelay::new(4);
        let bob = pid("bob");
        let mut conn = relay.connect(&bob);

        assert!(relay.is_online(&bob));
        assert_eq!(relay.deliver(&bob, response("alice")).await, Delivery::Delivered);

        let event = conn.recv().await.unwrap();
        assert_eq!(event.kind(), "keyExchangeResponse");
        assert_eq!(conn.participant(), &bob);
    }

    #[tokio::test]
    async fn test_deliver_to_unknown_is_unreachable() {
        let relay = LocalRelay::default();
        let carol = pid("carol");
        assert!(!relay.is_online(&carol));
        assert_eq!(relay.deliver(&carol, response("alice")).await, Delivery::Unreachable);
    }

    #[tokio::test]
    async fn test_full_queue_is_unreachable() {
        let relay = LocalRelay::new(1);
        let bob = pid("bob");
        let _conn = relay.connect(&bob);

        assert_eq!(relay.deliver(&bob, response("a")).await, Delivery::Delivered);
        assert_eq!(relay.deliver(&bob, response("a")).await, Delivery::Unreachable);
        // Still registered; a full queue is not a disconnect.
        assert!(relay.is_online(&bob));
    }

    #[tokio::test]
    async fn test_dropped_receiver_is_unreachable_and_removed() {
        let relay = LocalRelay::new(4);
        let bob = pid("bob");
        drop(relay.connect(&bob));

        assert!(!relay.is_online(&bob));
        assert_eq!(relay.deliver(&bob, response("a")).await, Delivery::Unreachable);
        assert_eq!(relay.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_is_online_forgets_dropped_receiver() {
        let relay = LocalRelay::new(4);
        let bob = pid("bob");
        drop(relay.connect(&bob));
        assert_eq!(relay.connection_count(), 1);

        assert!(!relay.is_online(&bob));
        assert_eq!(relay.connection_count(), 0);
    }

    #[test]
    fn test_connect_prunes_idle_disconnects() {
        let relay = LocalRelay::new(4);
        for name in ["a", "b", "c"] {
            drop(relay.connect(&pid(name)));
        }
        let _dave = relay.connect(&pid("dave"));

        assert_eq!(relay.connection_count(), 1);
        assert_eq!(relay.prune_closed(), 0);
    }

    #[tokio::test]
    async fn test_reconnect_replaces_connection() {
        let relay = LocalRelay::new(4);
        let bob = pid("bob");
        let mut old = relay.connect(&bob);
        let mut new = relay.connect(&bob);

        assert!(matches!(old.recv().await, Err(RelayError::ConnectionClosed { .. })));
        assert_eq!(relay.deliver(&bob, response("a")).await, Delivery::Delivered);
        assert!(new.try_recv().is_some());
        assert_eq!(relay.connection_count(), 1);
    }

    #[tokio::test]
    async fn test_disconnect() {
        let relay = LocalRelay::new(4);
        let bob = pid("bob");
        let mut conn = relay.connect(&bob);

        assert!(relay.disconnect(&bob));
        assert!(!relay.disconnect(&bob));
        assert!(!relay.is_online(&bob));
        assert!(conn.recv().await.is_err());
    }
}
