// ============================================
// File: crates/cipherchat-server/src/services/exchange.rs
// ============================================
//! # Exchange Coordinator
//!
//! ## Creation Reason
//! Drives the two-party handshake across the session store and the relay,
//! and encrypts chat traffic with the resulting pair key.
//!
//! ## Main Functionality
//! - `initiate`: New attempt, push request to the target
//! - `respond`: Accept (derive key) or decline an attempt
//! - `complete`: Initiator confirms the key from the responder's value
//! - `encrypt` / `decrypt` / `send_message`: Chat payloads under the pair key
//! - `teardown`: Drop the pair's session
//!
//! ## Handshake Flow
//! ```text
//! Initiator (A)            Coordinator                 Responder (B)
//!      │                        │                            │
//!      │ initiate(A, B)         │                            │
//!      │───────────────────────►│ store: Pending             │
//!      │                        │ keyExchangeRequest         │
//!      │                        │───────────────────────────►│
//!      │                        │                            │
//!      │                        │ respond(B, id, A_pub, yes) │
//!      │                        │◄───────────────────────────│
//!      │                        │ X25519 + HKDF              │
//!      │                        │ store: Completed           │
//!      │ keyExchangeResponse    │                            │
//!      │◄───────────────────────│                            │
//!      │ complete(A, id, B_pub) │                            │
//!      │───────────────────────►│ confirm, zeroize A secret  │
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Relay delivery always happens after the store call returns; never
//!   `await` inside a store closure
//! - A failed `initiate` delivery removes the session it just created and
//!   restores any live session it superseded
//! - Response delivery failures are logged, not returned: the store state
//!   is already committed and the peer can recover with `has_active_session`
//! - Rejections never carry detail; causes go to the log with ids only
//!
//! ## Last Modified
//! v0.1.0 - Initial exchange coordinator

use std::sync::Arc;

use tracing::{debug, info, warn};

use cipherchat_common::time::Timestamp;
use cipherchat_common::types::{PairKey, ParticipantId, SessionId};
use cipherchat_core::crypto::{aead, handshake, kdf, EncryptedPayload, PublicValue};
use cipherchat_relay::{Delivery, Relay, RelayEvent};

use super::session::{SessionState, SessionStore};
use crate::error::{Result, ServerError};

// ============================================
// Outcomes
// ============================================

/// Result of a successful `initiate`.
#[derive(Debug, Clone)]
pub struct InitiateOutcome {
    /// Id the responder must answer.
    pub session_id: SessionId,
    /// Initiator's ephemeral public value.
    pub public_key: PublicValue,
}

/// Result of a successful `respond`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RespondOutcome {
    /// Key derived and stored.
    Accepted {
        /// Responder's ephemeral public value.
        public_key: PublicValue,
        /// Whether the initiator received the response.
        delivery: Delivery,
    },
    /// Session deleted.
    Declined {
        /// Whether the initiator received the notice.
        delivery: Delivery,
    },
}

impl RespondOutcome {
    /// Returns `true` for [`RespondOutcome::Accepted`].
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

/// Result of `send_message`.
#[derive(Debug, Clone)]
pub struct SentMessage {
    /// Ciphertext for the storage layer; returned even if undelivered.
    pub payload: EncryptedPayload,
    /// Relay outcome for the recipient.
    pub delivery: Delivery,
}

// ============================================
// ExchangeCoordinator
// ============================================

/// Orchestrates handshakes and message encryption for participant pairs.
pub struct ExchangeCoordinator {
    store: Arc<SessionStore>,
    relay: Arc<dyn Relay>,
    presence_precheck: bool,
}

impl ExchangeCoordinator {
    /// Creates a coordinator with the presence precheck enabled.
    #[must_use]
    pub fn new(store: Arc<SessionStore>, relay: Arc<dyn Relay>) -> Self {
        Self {
            store,
            relay,
            presence_precheck: true,
        }
    }

    /// Enables or disables the `is_online` check before `initiate`.
    #[must_use]
    pub fn with_presence_precheck(mut self, enabled: bool) -> Self {
        self.presence_precheck = enabled;
        self
    }

    #[must_use]
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    // ========================================
    // Handshake
    // ========================================

    /// Starts a key exchange from `initiator` to `target`.
    ///
    /// # Errors
    /// - `SelfExchange`
    /// - `PeerOffline`: target offline, or delivery failed (session rolled
    ///   back)
    /// - `SessionAlreadyActive` / `SessionLimitReached`
    pub async fn initiate(
        &self,
        initiator: &ParticipantId,
        target: &ParticipantId,
    ) -> Result<InitiateOutcome> {
        PairKey::new(initiator, target)?;

        if self.presence_precheck && !self.relay.is_online(target) {
            debug!(initiator = %initiator, target = %target, "Target offline, not initiating");
            return Err(ServerError::PeerOffline);
        }

        let keypair = handshake::generate_keypair();
        let public_key = keypair.public_value();
        let (session_id, superseded) = self.store.begin_pending(initiator, target, keypair)?;

        let event = RelayEvent::KeyExchangeRequest {
            from: initiator.clone(),
            public_key,
            session_id: session_id.clone(),
        };

        match self.relay.deliver(target, event).await {
            Delivery::Delivered => Ok(InitiateOutcome {
                session_id,
                public_key,
            }),
            Delivery::Unreachable => {
                self.store.rollback_pending(&session_id, superseded);
                info!(
                    session_id = %session_id,
                    target = %target,
                    "Key exchange request undeliverable, session rolled back"
                );
                Err(ServerError::PeerOffline)
            }
        }
    }

    /// Answers a pending exchange.
    ///
    /// `offered_public` is the encoded initiator value the responder
    /// received in the request; it must match the stored one.
    ///
    /// # Errors
    /// - `SessionNotFound`, `Unauthorized`, `NotPending`
    /// - `InvalidPeerKey`: `offered_public` malformed or not the stored
    ///   initiator value (accept only)
    pub async fn respond(
        &self,
        responder: &ParticipantId,
        session_id: &SessionId,
        offered_public: &[u8],
        accept: bool,
    ) -> Result<RespondOutcome> {
        if !accept {
            let initiator = self
                .store
                .decline_pending(session_id, responder)
                .map_err(|e| log_rejection("respond", session_id, responder, e))?;

            let event = RelayEvent::KeyExchangeResponse {
                from: responder.clone(),
                session_id: session_id.clone(),
                public_key: None,
                accepted: false,
            };
            let delivery = self.relay.deliver(&initiator, event).await;
            if !delivery.is_delivered() {
                debug!(session_id = %session_id, "Decline notice undeliverable");
            }
            return Ok(RespondOutcome::Declined { delivery });
        }

        let (initiator, initiator_public) = self
            .store
            .update(session_id, |session| {
                session.authorize_responder(responder)?;
                session.ensure_pending()?;
                Ok((session.initiator().clone(), session.initiator_public()))
            })
            .map_err(|e| log_rejection("respond", session_id, responder, e))?;

        let offered = PublicValue::from_wire(offered_public)
            .map_err(ServerError::from)
            .and_then(|offered| {
                if offered == initiator_public {
                    Ok(offered)
                } else {
                    Err(ServerError::InvalidPeerKey)
                }
            })
            .map_err(|e| log_rejection("respond", session_id, responder, e))?;

        let keypair = handshake::generate_keypair();
        let public_key = keypair.public_value();
        let key = handshake::agree(&keypair, &offered)?;
        drop(keypair);

        self.store
            .mark_completed(session_id, responder, public_key, key)
            .map_err(|e| log_rejection("respond", session_id, responder, e))?;

        let event = RelayEvent::KeyExchangeResponse {
            from: responder.clone(),
            session_id: session_id.clone(),
            public_key: Some(public_key),
            accepted: true,
        };
        let delivery = self.relay.deliver(&initiator, event).await;
        if !delivery.is_delivered() {
            warn!(
                session_id = %session_id,
                initiator = %initiator,
                "Key exchange response undeliverable"
            );
        }

        Ok(RespondOutcome::Accepted {
            public_key,
            delivery,
        })
    }

    /// Initiator-side confirmation from the responder's encoded value.
    ///
    /// Only a session the responder has accepted can be confirmed.
    /// Idempotent: repeating it with the same value succeeds. The
    /// initiator's private half is zeroized after the first success.
    ///
    /// # Errors
    /// - `SessionNotFound`, `NotAuthorizedInitiator`
    /// - `NotPending`: the responder has not accepted yet
    /// - `InvalidPeerKey`: malformed value, or not the one the session
    ///   was completed with
    pub fn complete(
        &self,
        initiator: &ParticipantId,
        session_id: &SessionId,
        peer_public: &[u8],
    ) -> Result<()> {
        self.store
            .update(session_id, |session| {
                if session.initiator() != initiator {
                    return Err(ServerError::NotAuthorizedInitiator);
                }

                match session.state() {
                    SessionState::Pending => return Err(ServerError::NotPending),
                    SessionState::Completed if session.initiator_keypair().is_consumed() => {
                        let offered = PublicValue::from_wire(peer_public)?;
                        if session.responder_public() != Some(offered) {
                            return Err(ServerError::InvalidPeerKey);
                        }
                    }
                    SessionState::Completed => {
                        let shared =
                            handshake::compute_shared_secret(session.initiator_keypair(), peer_public)?;
                        let key = kdf::derive_session_key(&shared)?;
                        if session.session_key() != Some(&key) {
                            return Err(ServerError::InvalidPeerKey);
                        }
                    }
                }

                session.discard_initiator_secret();
                Ok(())
            })
            .map_err(|e| log_rejection("complete", session_id, initiator, e))?;

        debug!(session_id = %session_id, initiator = %initiator, "Key exchange confirmed");
        Ok(())
    }

    /// Returns `true` if the pair holds a completed, unexpired session.
    #[must_use]
    pub fn has_active_session(&self, a: &ParticipantId, b: &ParticipantId) -> bool {
        self.store.has_active_session(a, b)
    }

    /// Drops the pair's session (logout, chat reset).
    ///
    /// # Errors
    /// `SelfExchange` if `a == b`.
    pub fn teardown(&self, a: &ParticipantId, b: &ParticipantId) -> Result<bool> {
        self.store.delete_pair(a, b)
    }

    // ========================================
    // Messages
    // ========================================

    /// Encrypts a message from `sender` to `recipient`.
    ///
    /// # Errors
    /// `NoActiveSession`, `EncryptionFailed`.
    pub fn encrypt(
        &self,
        sender: &ParticipantId,
        recipient: &ParticipantId,
        plaintext: &[u8],
    ) -> Result<EncryptedPayload> {
        let ad = aead::message_associated_data(sender, recipient);
        self.store
            .with_session_key(sender, recipient, |key| Ok(aead::encrypt(key, plaintext, &ad)?))
    }

    /// Decrypts a message `sender` sent to `recipient`.
    ///
    /// # Errors
    /// `NoActiveSession`, `AuthenticationFailed`.
    pub fn decrypt(
        &self,
        payload: &EncryptedPayload,
        sender: &ParticipantId,
        recipient: &ParticipantId,
    ) -> Result<Vec<u8>> {
        let ad = aead::message_associated_data(sender, recipient);
        self.store
            .with_session_key(sender, recipient, |key| Ok(aead::decrypt(key, payload, &ad)?))
            .map_err(|e| {
                if matches!(e, ServerError::AuthenticationFailed) {
                    warn!(sender = %sender, recipient = %recipient, "Message authentication failed");
                }
                e
            })
    }

    /// Encrypts and pushes a `newMessage` event to `recipient`.
    ///
    /// # Errors
    /// Same as [`Self::encrypt`]; an offline recipient is reported in
    /// [`SentMessage::delivery`], not as an error.
    pub async fn send_message(
        &self,
        sender: &ParticipantId,
        recipient: &ParticipantId,
        plaintext: &[u8],
    ) -> Result<SentMessage> {
        let payload = self.encrypt(sender, recipient, plaintext)?;

        let event = RelayEvent::Message {
            from: sender.clone(),
            payload: payload.clone(),
            sent_at: Timestamp::now(),
        };
        let delivery = self.relay.deliver(recipient, event).await;

        Ok(SentMessage { payload, delivery })
    }
}

impl std::fmt::Debug for ExchangeCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeCoordinator")
            .field("store", &self.store)
            .field("presence_precheck", &self.presence_precheck)
            .finish_non_exhaustive()
    }
}

fn log_rejection(
    operation: &'static str,
    session_id: &SessionId,
    caller: &ParticipantId,
    err: ServerError,
) -> ServerError {
    if err.is_suspicious() {
        warn!(operation, session_id = %session_id, caller = %caller, error = %err, "Rejected handshake call");
    } else {
        debug!(operation, session_id = %session_id, caller = %caller, error = %err, "Handshake call failed");
    }
    err
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReusePolicy;
    use cipherchat_relay::{Connection, LocalRelay};
    use std::time::Duration;

    struct Fixture {
        coordinator: ExchangeCoordinator,
        alice: ParticipantId,
        bob: ParticipantId,
        _alice_conn: Connection,
        bob_conn: Connection,
    }

    fn fixture() -> Fixture {
        let relay = Arc::new(LocalRelay::new(16));
        let alice = ParticipantId::new("alice").unwrap();
        let bob = ParticipantId::new("bob").unwrap();
        let alice_conn = relay.connect(&alice);
        let bob_conn = relay.connect(&bob);
        let store = Arc::new(SessionStore::new(
            Duration::from_secs(3600),
            100,
            ReusePolicy::Reject,
        ));
        Fixture {
            coordinator: ExchangeCoordinator::new(store, relay),
            alice,
            bob,
            _alice_conn: alice_conn,
            bob_conn,
        }
    }

    #[tokio::test]
    async fn test_initiate_pushes_request() {
        let mut fx = fixture();
        let outcome = fx.coordinator.initiate(&fx.alice, &fx.bob).await.unwrap();

        match fx.bob_conn.try_recv() {
            Some(RelayEvent::KeyExchangeRequest {
                from,
                public_key,
                session_id,
            }) => {
                assert_eq!(from, fx.alice);
                assert_eq!(public_key, outcome.public_key);
                assert_eq!(session_id, outcome.session_id);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_self_exchange() {
        let fx = fixture();
        let err = fx.coordinator.initiate(&fx.alice, &fx.alice).await.unwrap_err();
        assert!(matches!(err, ServerError::SelfExchange));
    }

    #[tokio::test]
    async fn test_respond_rejects_wrong_offered_value() {
        let fx = fixture();
        let outcome = fx.coordinator.initiate(&fx.alice, &fx.bob).await.unwrap();
        let stranger = handshake::generate_keypair().public_value();

        let err = fx
            .coordinator
            .respond(&fx.bob, &outcome.session_id, &stranger.to_wire(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::InvalidPeerKey));

        let err = fx
            .coordinator
            .respond(&fx.bob, &outcome.session_id, &[0x01, 0x02], true)
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::InvalidPeerKey));

        // Still answerable with the right value
        let accepted = fx
            .coordinator
            .respond(&fx.bob, &outcome.session_id, &outcome.public_key.to_wire(), true)
            .await
            .unwrap();
        assert!(accepted.is_accepted());
    }

    #[tokio::test]
    async fn test_initiator_cannot_respond() {
        let fx = fixture();
        let outcome = fx.coordinator.initiate(&fx.alice, &fx.bob).await.unwrap();
        let err = fx
            .coordinator
            .respond(&fx.alice, &outcome.session_id, &outcome.public_key.to_wire(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::Unauthorized));
    }

    #[tokio::test]
    async fn test_second_respond_not_pending() {
        let fx = fixture();
        let outcome = fx.coordinator.initiate(&fx.alice, &fx.bob).await.unwrap();
        let wire = outcome.public_key.to_wire();

        fx.coordinator
            .respond(&fx.bob, &outcome.session_id, &wire, true)
            .await
            .unwrap();
        let err = fx
            .coordinator
            .respond(&fx.bob, &outcome.session_id, &wire, true)
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::NotPending));
    }

    #[tokio::test]
    async fn test_complete_is_idempotent_and_checks_caller() {
        let fx = fixture();
        let outcome = fx.coordinator.initiate(&fx.alice, &fx.bob).await.unwrap();
        let RespondOutcome::Accepted { public_key, .. } = fx
            .coordinator
            .respond(&fx.bob, &outcome.session_id, &outcome.public_key.to_wire(), true)
            .await
            .unwrap()
        else {
            panic!("expected accept");
        };
        let wire = public_key.to_wire();

        let err = fx
            .coordinator
            .complete(&fx.bob, &outcome.session_id, &wire)
            .unwrap_err();
        assert!(matches!(err, ServerError::NotAuthorizedInitiator));

        fx.coordinator.complete(&fx.alice, &outcome.session_id, &wire).unwrap();
        fx.coordinator.complete(&fx.alice, &outcome.session_id, &wire).unwrap();

        let other = handshake::generate_keypair().public_value().to_wire();
        let err = fx
            .coordinator
            .complete(&fx.alice, &outcome.session_id, &other)
            .unwrap_err();
        assert!(matches!(err, ServerError::InvalidPeerKey));

        assert!(fx.coordinator.has_active_session(&fx.alice, &fx.bob));
    }

    #[tokio::test]
    async fn test_complete_with_mismatched_key_before_discard() {
        let fx = fixture();
        let outcome = fx.coordinator.initiate(&fx.alice, &fx.bob).await.unwrap();
        fx.coordinator
            .respond(&fx.bob, &outcome.session_id, &outcome.public_key.to_wire(), true)
            .await
            .unwrap();

        // Secret still retained: a different peer value derives a different key
        let other = handshake::generate_keypair().public_value().to_wire();
        let err = fx
            .coordinator
            .complete(&fx.alice, &outcome.session_id, &other)
            .unwrap_err();
        assert!(matches!(err, ServerError::InvalidPeerKey));
    }

    #[tokio::test]
    async fn test_complete_requires_responder_accept() {
        let mut fx = fixture();
        let outcome = fx.coordinator.initiate(&fx.alice, &fx.bob).await.unwrap();
        let _request = fx.bob_conn.try_recv().unwrap();

        // An initiator cannot bypass the responder with a value of its choosing
        let forged = handshake::generate_keypair().public_value().to_wire();
        let err = fx
            .coordinator
            .complete(&fx.alice, &outcome.session_id, &forged)
            .unwrap_err();
        assert!(matches!(err, ServerError::NotPending));

        assert!(!fx.coordinator.has_active_session(&fx.alice, &fx.bob));
        let snapshot = fx.coordinator.store().get(&outcome.session_id).unwrap();
        assert_eq!(snapshot.state, SessionState::Pending);
        assert!(snapshot.responder.is_none());
        assert!(fx.coordinator.encrypt(&fx.alice, &fx.bob, b"hi").is_err());

        // The responder still decides
        let declined = fx
            .coordinator
            .respond(&fx.bob, &outcome.session_id, &outcome.public_key.to_wire(), false)
            .await
            .unwrap();
        assert!(!declined.is_accepted());
        assert!(fx.coordinator.store().is_empty());
    }

    #[tokio::test]
    async fn test_decline_after_accept_keeps_session() {
        let fx = fixture();
        let outcome = fx.coordinator.initiate(&fx.alice, &fx.bob).await.unwrap();
        let wire = outcome.public_key.to_wire();
        fx.coordinator
            .respond(&fx.bob, &outcome.session_id, &wire, true)
            .await
            .unwrap();

        let err = fx
            .coordinator
            .respond(&fx.bob, &outcome.session_id, &wire, false)
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::NotPending));
        assert!(fx.coordinator.has_active_session(&fx.alice, &fx.bob));

        let outsider = ParticipantId::new("mallory").unwrap();
        let err = fx
            .coordinator
            .respond(&outsider, &outcome.session_id, &wire, false)
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::Unauthorized));
        assert!(fx.coordinator.has_active_session(&fx.alice, &fx.bob));
    }

    #[tokio::test]
    async fn test_encrypt_requires_session() {
        let fx = fixture();
        let err = fx.coordinator.encrypt(&fx.alice, &fx.bob, b"hi").unwrap_err();
        assert!(matches!(err, ServerError::NoActiveSession));
    }

    #[tokio::test]
    async fn test_teardown() {
        let fx = fixture();
        let outcome = fx.coordinator.initiate(&fx.alice, &fx.bob).await.unwrap();
        fx.coordinator
            .respond(&fx.bob, &outcome.session_id, &outcome.public_key.to_wire(), true)
            .await
            .unwrap();

        assert!(fx.coordinator.teardown(&fx.bob, &fx.alice).unwrap());
        assert!(!fx.coordinator.has_active_session(&fx.alice, &fx.bob));
        assert!(!fx.coordinator.teardown(&fx.bob, &fx.alice).unwrap());
    }
}
