// ============================================
// File: crates/cipherchat-server/src/services/session.rs
// ============================================
//! # Handshake Session Store
//!
//! ## Creation Reason
//! Holds every in-flight and completed key exchange, one per participant
//! pair, together with the key material it owns.
//!
//! ## Main Functionality
//! - `HandshakeSession`: One handshake attempt and its secrets
//! - `SessionSnapshot`: Copy of the non-secret fields
//! - `SessionStore`: Per-pair storage, id index, expiry sweep
//!
//! ## Session Lifecycle
//! ```text
//! ┌──────────┐  create_pending  ┌─────────┐  mark_completed  ┌───────────┐
//! │  (none)  │ ───────────────► │ Pending │ ───────────────► │ Completed │
//! └──────────┘                  └────┬────┘                  └─────┬─────┘
//!                                    │                             │
//!                         decline / teardown / TTL sweep / supersede
//!                                    │                             │
//!                                    ▼                             ▼
//!                               ┌──────────────────────────────────────┐
//!                               │          Deleted (zeroized)          │
//!                               └──────────────────────────────────────┘
//! ```
//!
//! ## Storage Layout
//! ```text
//! pairs: PairKey   → HandshakeSession   (authoritative)
//! index: SessionId → PairKey            (lookup only)
//! ```
//! An index entry whose pair no longer holds the same session id is stale
//! and treated as absent.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Lock order is always `pairs` then `index`; never hold an `index`
//!   guard while touching `pairs`
//! - Never call `pairs.len()` while holding a `pairs` guard (it read-locks
//!   every shard); capacity checks use `index.len()`
//! - Closures passed to `update` / `with_session_key` run under the pair's
//!   shard lock: no store calls and no relay I/O inside them
//! - Expired sessions are invisible to every lookup even before the sweep
//!   removes them
//!
//! ## Last Modified
//! v0.1.0 - Initial session store

use std::fmt;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info};

use cipherchat_common::time::has_expired;
use cipherchat_common::types::{PairKey, ParticipantId, SessionId};
use cipherchat_core::crypto::{EphemeralKeyPair, PublicValue, SessionKey};

use crate::config::{ReusePolicy, SessionConfig};
use crate::error::{Result, ServerError};

// ============================================
// SessionState
// ============================================

/// Handshake session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Request sent, waiting for the responder.
    Pending,
    /// Both sides hold the derived key.
    Completed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

// ============================================
// HandshakeSession
// ============================================

/// One key exchange attempt between two participants.
///
/// Owned by [`SessionStore`]; callers only see it through `update`
/// closures or as a [`SessionSnapshot`].
pub struct HandshakeSession {
    id: SessionId,
    pair: PairKey,
    initiator: ParticipantId,
    initiator_keypair: EphemeralKeyPair,
    initiator_public: PublicValue,
    responder: Option<ParticipantId>,
    responder_public: Option<PublicValue>,
    key: Option<SessionKey>,
    state: SessionState,
    created_at: Instant,
}

impl HandshakeSession {
    fn new(
        id: SessionId,
        pair: PairKey,
        initiator: ParticipantId,
        initiator_keypair: EphemeralKeyPair,
        created_at: Instant,
    ) -> Self {
        let initiator_public = initiator_keypair.public_value();
        Self {
            id,
            pair,
            initiator,
            initiator_keypair,
            initiator_public,
            responder: None,
            responder_public: None,
            key: None,
            state: SessionState::Pending,
            created_at,
        }
    }

    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    #[must_use]
    pub fn pair(&self) -> &PairKey {
        &self.pair
    }

    #[must_use]
    pub fn initiator(&self) -> &ParticipantId {
        &self.initiator
    }

    #[must_use]
    pub fn initiator_public(&self) -> PublicValue {
        self.initiator_public
    }

    #[must_use]
    pub fn responder(&self) -> Option<&ParticipantId> {
        self.responder.as_ref()
    }

    #[must_use]
    pub fn responder_public(&self) -> Option<PublicValue> {
        self.responder_public
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// The initiator's ephemeral key pair (private half may be discarded).
    #[must_use]
    pub fn initiator_keypair(&self) -> &EphemeralKeyPair {
        &self.initiator_keypair
    }

    /// The derived key, present once completed.
    #[must_use]
    pub fn session_key(&self) -> Option<&SessionKey> {
        self.key.as_ref()
    }

    #[must_use]
    pub fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        has_expired(self.created_at, ttl, now)
    }

    /// Checks that `responder` is the participant allowed to answer.
    ///
    /// # Errors
    /// `Unauthorized` if `responder` is outside the pair or is the
    /// initiator.
    pub fn authorize_responder(&self, responder: &ParticipantId) -> Result<()> {
        if !self.pair.contains(responder) || responder == &self.initiator {
            return Err(ServerError::Unauthorized);
        }
        Ok(())
    }

    /// Checks that the session has not been answered yet.
    ///
    /// # Errors
    /// `NotPending` once completed.
    pub fn ensure_pending(&self) -> Result<()> {
        match self.state {
            SessionState::Pending => Ok(()),
            SessionState::Completed => Err(ServerError::NotPending),
        }
    }

    /// Moves the session to `Completed`.
    ///
    /// Callers authorize the responder first; a completed session is
    /// never overwritten.
    ///
    /// # Errors
    /// `NotPending` once completed.
    pub(crate) fn complete(
        &mut self,
        responder: ParticipantId,
        responder_public: PublicValue,
        key: SessionKey,
    ) -> Result<()> {
        self.ensure_pending()?;
        self.responder = Some(responder);
        self.responder_public = Some(responder_public);
        self.key = Some(key);
        self.state = SessionState::Completed;
        Ok(())
    }

    /// Drops the initiator's private half once the key is confirmed.
    pub(crate) fn discard_initiator_secret(&mut self) {
        self.initiator_keypair.discard_secret();
    }

    /// Copies the non-secret fields.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id.clone(),
            pair: self.pair.clone(),
            initiator: self.initiator.clone(),
            initiator_public: self.initiator_public,
            responder: self.responder.clone(),
            responder_public: self.responder_public,
            state: self.state,
            created_at: self.created_at,
        }
    }
}

impl fmt::Debug for HandshakeSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandshakeSession")
            .field("id", &self.id)
            .field("pair", &self.pair)
            .field("initiator", &self.initiator)
            .field("state", &self.state)
            .field("has_key", &self.key.is_some())
            .finish_non_exhaustive()
    }
}

// ============================================
// SessionSnapshot
// ============================================

/// Non-secret view of a [`HandshakeSession`].
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub pair: PairKey,
    pub initiator: ParticipantId,
    pub initiator_public: PublicValue,
    pub responder: Option<ParticipantId>,
    pub responder_public: Option<PublicValue>,
    pub state: SessionState,
    pub created_at: Instant,
}

impl SessionSnapshot {
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.state == SessionState::Completed
    }
}

// ============================================
// SessionStore
// ============================================

/// Concurrent store of handshake sessions, at most one per pair.
pub struct SessionStore {
    pairs: DashMap<PairKey, HandshakeSession>,
    index: DashMap<SessionId, PairKey>,
    ttl: Duration,
    max_sessions: usize,
    reuse_policy: ReusePolicy,
}

impl SessionStore {
    #[must_use]
    pub fn new(ttl: Duration, max_sessions: usize, reuse_policy: ReusePolicy) -> Self {
        Self {
            pairs: DashMap::new(),
            index: DashMap::new(),
            ttl,
            max_sessions,
            reuse_policy,
        }
    }

    #[must_use]
    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.ttl(), config.max_sessions, config.reuse_policy)
    }

    /// Stores a new pending session for `initiator → responder`.
    ///
    /// An expired session for the pair is replaced silently. A live one
    /// is rejected or superseded according to the reuse policy.
    ///
    /// # Errors
    /// - `SelfExchange`: both ids are equal
    /// - `SessionAlreadyActive`: live session and `ReusePolicy::Reject`
    /// - `SessionLimitReached`: store is full
    pub fn create_pending(
        &self,
        initiator: &ParticipantId,
        responder: &ParticipantId,
        keypair: EphemeralKeyPair,
    ) -> Result<SessionId> {
        let (id, _superseded) = self.begin_pending(initiator, responder, keypair)?;
        Ok(id)
    }

    /// Same as `create_pending`, but hands back the live session it
    /// superseded so a failed delivery can put it back with
    /// `rollback_pending`.
    pub(crate) fn begin_pending(
        &self,
        initiator: &ParticipantId,
        responder: &ParticipantId,
        keypair: EphemeralKeyPair,
    ) -> Result<(SessionId, Option<HandshakeSession>)> {
        let pair = PairKey::new(initiator, responder)?;
        let now = Instant::now();
        let id = SessionId::generate();
        let session = HandshakeSession::new(
            id.clone(),
            pair.clone(),
            initiator.clone(),
            keypair,
            now,
        );

        let superseded = match self.pairs.entry(pair.clone()) {
            Entry::Occupied(mut occupied) => {
                let live = !occupied.get().is_expired(self.ttl, now);
                if live && self.reuse_policy == ReusePolicy::Reject {
                    debug!(pair = %pair, "Session already active");
                    return Err(ServerError::SessionAlreadyActive);
                }

                let previous = occupied.insert(session);
                self.index.remove(&previous.id);
                self.index.insert(id.clone(), pair.clone());

                debug!(
                    pair = %pair,
                    previous = %previous.id,
                    expired = !live,
                    "Previous session replaced"
                );
                live.then_some(previous)
            }
            Entry::Vacant(vacant) => {
                if self.index.len() >= self.max_sessions {
                    return Err(ServerError::SessionLimitReached {
                        limit: self.max_sessions,
                    });
                }
                self.index.insert(id.clone(), pair.clone());
                vacant.insert(session);
                None
            }
        };

        info!(
            session_id = %id,
            initiator = %initiator,
            responder = %responder,
            "Key exchange session created"
        );

        Ok((id, superseded))
    }

    /// Undoes `begin_pending` for session `id`.
    ///
    /// The superseded session comes back if it is still unexpired and the
    /// pair still holds `id`; otherwise the pair is simply cleared of
    /// `id`. A newer session that replaced `id` in the meantime is left
    /// alone.
    pub(crate) fn rollback_pending(&self, id: &SessionId, superseded: Option<HandshakeSession>) {
        let Some(pair) = self.pair_of(id) else {
            return;
        };
        let now = Instant::now();

        match self.pairs.entry(pair) {
            Entry::Occupied(mut occupied) if occupied.get().id == *id => {
                match superseded.filter(|s| !s.is_expired(self.ttl, now)) {
                    Some(previous) => {
                        let previous_id = previous.id.clone();
                        let pair = occupied.key().clone();
                        occupied.insert(previous);
                        self.index.remove(id);
                        self.index.insert(previous_id.clone(), pair);
                        debug!(
                            session_id = %id,
                            restored = %previous_id,
                            "Pending session rolled back"
                        );
                    }
                    None => {
                        occupied.remove();
                        self.index.remove(id);
                        debug!(session_id = %id, "Pending session rolled back");
                    }
                }
            }
            _ => {
                self.index.remove(id);
            }
        }
    }

    /// Looks up a live session by id.
    #[must_use]
    pub fn get(&self, id: &SessionId) -> Option<SessionSnapshot> {
        let pair = self.pair_of(id)?;
        let session = self.pairs.get(&pair)?;
        if session.id != *id || session.is_expired(self.ttl, Instant::now()) {
            return None;
        }
        Some(session.snapshot())
    }

    /// Runs `f` against a live session while holding its pair lock.
    ///
    /// `f` must validate before it mutates: an error returned after a
    /// mutation leaves that mutation in place.
    ///
    /// # Errors
    /// `SessionNotFound` if the id is unknown, superseded or expired;
    /// otherwise whatever `f` returns.
    pub fn update<R>(
        &self,
        id: &SessionId,
        f: impl FnOnce(&mut HandshakeSession) -> Result<R>,
    ) -> Result<R> {
        let pair = self.pair_of(id).ok_or(ServerError::SessionNotFound)?;
        let mut session = self
            .pairs
            .get_mut(&pair)
            .ok_or(ServerError::SessionNotFound)?;

        if session.id != *id || session.is_expired(self.ttl, Instant::now()) {
            return Err(ServerError::SessionNotFound);
        }

        f(session.value_mut())
    }

    /// Records the responder's side and moves the session to `Completed`.
    ///
    /// # Errors
    /// `SessionNotFound`, then `Unauthorized`, then `NotPending`.
    pub fn mark_completed(
        &self,
        id: &SessionId,
        responder: &ParticipantId,
        responder_public: PublicValue,
        key: SessionKey,
    ) -> Result<()> {
        self.update(id, |session| {
            session.authorize_responder(responder)?;
            session.complete(responder.clone(), responder_public, key)
        })?;

        info!(session_id = %id, responder = %responder, "Key exchange completed");
        Ok(())
    }

    /// Deletes a pending session on behalf of its responder.
    ///
    /// Validation and removal happen under one pair lock, so a session
    /// completed concurrently is never deleted here. Returns the
    /// initiator to notify.
    ///
    /// # Errors
    /// `SessionNotFound`, then `Unauthorized`, then `NotPending`.
    pub fn decline_pending(
        &self,
        id: &SessionId,
        responder: &ParticipantId,
    ) -> Result<ParticipantId> {
        let pair = self.pair_of(id).ok_or(ServerError::SessionNotFound)?;

        let Entry::Occupied(occupied) = self.pairs.entry(pair) else {
            return Err(ServerError::SessionNotFound);
        };
        let session = occupied.get();
        if session.id != *id || session.is_expired(self.ttl, Instant::now()) {
            return Err(ServerError::SessionNotFound);
        }
        session.authorize_responder(responder)?;
        session.ensure_pending()?;

        let (_, declined) = occupied.remove_entry();
        self.index.remove(id);

        info!(session_id = %id, responder = %responder, "Key exchange declined");
        Ok(declined.initiator)
    }

    /// Deletes the session with this id. Returns `true` if it existed.
    pub fn delete(&self, id: &SessionId) -> bool {
        let Some(pair) = self.pair_of(id) else {
            return false;
        };

        let removed = self.pairs.remove_if(&pair, |_, s| s.id == *id).is_some();
        self.index.remove(id);

        if removed {
            debug!(session_id = %id, "Session deleted");
        }
        removed
    }

    /// Deletes whatever session the pair holds. Returns `true` if one
    /// existed.
    ///
    /// # Errors
    /// `SelfExchange` if `a == b`.
    pub fn delete_pair(&self, a: &ParticipantId, b: &ParticipantId) -> Result<bool> {
        let pair = PairKey::new(a, b)?;
        match self.pairs.remove(&pair) {
            Some((_, session)) => {
                self.index.remove(&session.id);
                info!(pair = %pair, session_id = %session.id, "Session torn down");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Removes every session older than the TTL, regardless of state.
    ///
    /// Returns the number of sessions removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let mut removed = 0usize;

        self.pairs.retain(|pair, session| {
            if session.is_expired(self.ttl, now) {
                self.index.remove(&session.id);
                removed += 1;
                debug!(
                    pair = %pair,
                    session_id = %session.id,
                    state = %session.state,
                    "Session expired"
                );
                false
            } else {
                true
            }
        });

        if removed > 0 {
            info!("Swept {} expired sessions", removed);
        }
        removed
    }

    /// Returns `true` if the pair has a completed, unexpired session.
    #[must_use]
    pub fn has_active_session(&self, a: &ParticipantId, b: &ParticipantId) -> bool {
        let Ok(pair) = PairKey::new(a, b) else {
            return false;
        };
        self.pairs.get(&pair).is_some_and(|s| {
            s.state == SessionState::Completed && !s.is_expired(self.ttl, Instant::now())
        })
    }

    /// Runs `f` with the pair's completed key under the pair lock.
    ///
    /// # Errors
    /// `NoActiveSession` if the pair has no completed, unexpired session;
    /// otherwise whatever `f` returns.
    pub fn with_session_key<R>(
        &self,
        a: &ParticipantId,
        b: &ParticipantId,
        f: impl FnOnce(&SessionKey) -> Result<R>,
    ) -> Result<R> {
        let pair = PairKey::new(a, b)?;
        let session = self.pairs.get(&pair).ok_or(ServerError::NoActiveSession)?;
        if session.is_expired(self.ttl, Instant::now()) {
            return Err(ServerError::NoActiveSession);
        }
        let key = session.session_key().ok_or(ServerError::NoActiveSession)?;
        f(key)
    }

    /// Number of stored sessions, including expired ones not yet swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn pair_of(&self, id: &SessionId) -> Option<PairKey> {
        self.index.get(id).map(|r| r.value().clone())
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("sessions", &self.len())
            .field("max_sessions", &self.max_sessions)
            .field("ttl", &self.ttl)
            .field("reuse_policy", &self.reuse_policy)
            .finish()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(3600);

    fn pid(s: &str) -> ParticipantId {
        ParticipantId::new(s).unwrap()
    }

    fn store() -> SessionStore {
        SessionStore::new(TTL, 100, ReusePolicy::Reject)
    }

    fn key(byte: u8) -> SessionKey {
        SessionKey::from_bytes([byte; 32])
    }

    #[test]
    fn test_create_and_get() {
        let store = store();
        let (a, b) = (pid("alice"), pid("bob"));
        let keypair = EphemeralKeyPair::generate();
        let public = keypair.public_value();

        let id = store.create_pending(&a, &b, keypair).unwrap();
        let snap = store.get(&id).unwrap();

        assert_eq!(snap.id, id);
        assert_eq!(snap.initiator, a);
        assert_eq!(snap.initiator_public, public);
        assert_eq!(snap.state, SessionState::Pending);
        assert!(snap.responder.is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_self_exchange_rejected() {
        let store = store();
        let a = pid("alice");
        let err = store
            .create_pending(&a, &a, EphemeralKeyPair::generate())
            .unwrap_err();
        assert!(matches!(err, ServerError::SelfExchange));
        assert!(store.is_empty());
    }

    #[test]
    fn test_reject_policy_blocks_second_session() {
        let store = store();
        let (a, b) = (pid("alice"), pid("bob"));
        let first = store.create_pending(&a, &b, EphemeralKeyPair::generate()).unwrap();

        // Either side of the pair collides with the same record
        let err = store
            .create_pending(&b, &a, EphemeralKeyPair::generate())
            .unwrap_err();
        assert!(matches!(err, ServerError::SessionAlreadyActive));
        assert!(store.get(&first).is_some());
    }

    #[test]
    fn test_supersede_policy_replaces_session() {
        let store = SessionStore::new(TTL, 100, ReusePolicy::Supersede);
        let (a, b) = (pid("alice"), pid("bob"));
        let first = store.create_pending(&a, &b, EphemeralKeyPair::generate()).unwrap();
        let second = store.create_pending(&b, &a, EphemeralKeyPair::generate()).unwrap();

        assert_ne!(first, second);
        assert!(store.get(&first).is_none());
        assert_eq!(store.get(&second).unwrap().initiator, b);
        assert_eq!(store.len(), 1);

        let err = store.mark_completed(&first, &a, EphemeralKeyPair::generate().public_value(), key(1));
        assert!(matches!(err, Err(ServerError::SessionNotFound)));
    }

    #[test]
    fn test_expired_session_replaced_under_reject() {
        let store = SessionStore::new(Duration::from_millis(1), 100, ReusePolicy::Reject);
        let (a, b) = (pid("alice"), pid("bob"));
        let first = store.create_pending(&a, &b, EphemeralKeyPair::generate()).unwrap();

        std::thread::sleep(Duration::from_millis(10));
        assert!(store.get(&first).is_none());

        let second = store.create_pending(&a, &b, EphemeralKeyPair::generate()).unwrap();
        assert_ne!(first, second);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_session_limit() {
        let store = SessionStore::new(TTL, 2, ReusePolicy::Reject);
        store.create_pending(&pid("a"), &pid("b"), EphemeralKeyPair::generate()).unwrap();
        store.create_pending(&pid("a"), &pid("c"), EphemeralKeyPair::generate()).unwrap();

        let err = store
            .create_pending(&pid("b"), &pid("c"), EphemeralKeyPair::generate())
            .unwrap_err();
        assert!(matches!(err, ServerError::SessionLimitReached { limit: 2 }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_mark_completed() {
        let store = store();
        let (a, b) = (pid("alice"), pid("bob"));
        let id = store.create_pending(&a, &b, EphemeralKeyPair::generate()).unwrap();
        let responder_public = EphemeralKeyPair::generate().public_value();

        store.mark_completed(&id, &b, responder_public, key(9)).unwrap();

        let snap = store.get(&id).unwrap();
        assert!(snap.is_completed());
        assert_eq!(snap.responder, Some(b.clone()));
        assert_eq!(snap.responder_public, Some(responder_public));
        assert!(store.has_active_session(&a, &b));
        assert!(store.has_active_session(&b, &a));
    }

    #[test]
    fn test_mark_completed_authorization() {
        let store = store();
        let (a, b, c) = (pid("alice"), pid("bob"), pid("carol"));
        let id = store.create_pending(&a, &b, EphemeralKeyPair::generate()).unwrap();
        let public = EphemeralKeyPair::generate().public_value();

        // Outsider
        assert!(matches!(
            store.mark_completed(&id, &c, public, key(1)),
            Err(ServerError::Unauthorized)
        ));
        // Initiator answering its own request
        assert!(matches!(
            store.mark_completed(&id, &a, public, key(1)),
            Err(ServerError::Unauthorized)
        ));
        assert_eq!(store.get(&id).unwrap().state, SessionState::Pending);

        store.mark_completed(&id, &b, public, key(1)).unwrap();
        assert!(matches!(
            store.mark_completed(&id, &b, public, key(2)),
            Err(ServerError::NotPending)
        ));
        // Authorization is checked before state
        assert!(matches!(
            store.mark_completed(&id, &c, public, key(2)),
            Err(ServerError::Unauthorized)
        ));
        // The first key stays
        store
            .with_session_key(&a, &b, |k| {
                assert_eq!(k, &key(1));
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_complete_never_overwrites() {
        let store = store();
        let (a, b) = (pid("alice"), pid("bob"));
        let id = store.create_pending(&a, &b, EphemeralKeyPair::generate()).unwrap();
        let first_public = EphemeralKeyPair::generate().public_value();
        store.mark_completed(&id, &b, first_public, key(1)).unwrap();

        let err = store
            .update(&id, |session| {
                session.complete(b.clone(), EphemeralKeyPair::generate().public_value(), key(2))
            })
            .unwrap_err();
        assert!(matches!(err, ServerError::NotPending));

        assert_eq!(store.get(&id).unwrap().responder_public, Some(first_public));
        store
            .with_session_key(&a, &b, |k| {
                assert_eq!(k, &key(1));
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_decline_pending() {
        let store = store();
        let (a, b, c) = (pid("alice"), pid("bob"), pid("carol"));
        let id = store.create_pending(&a, &b, EphemeralKeyPair::generate()).unwrap();

        assert!(matches!(store.decline_pending(&id, &c), Err(ServerError::Unauthorized)));
        assert!(matches!(store.decline_pending(&id, &a), Err(ServerError::Unauthorized)));
        assert!(store.get(&id).is_some());

        assert_eq!(store.decline_pending(&id, &b).unwrap(), a);
        assert!(store.is_empty());
        assert!(matches!(
            store.decline_pending(&id, &b),
            Err(ServerError::SessionNotFound)
        ));
    }

    #[test]
    fn test_decline_keeps_completed_session() {
        let store = store();
        let (a, b) = (pid("alice"), pid("bob"));
        let id = store.create_pending(&a, &b, EphemeralKeyPair::generate()).unwrap();
        store
            .mark_completed(&id, &b, EphemeralKeyPair::generate().public_value(), key(4))
            .unwrap();

        assert!(matches!(store.decline_pending(&id, &b), Err(ServerError::NotPending)));
        assert!(store.has_active_session(&a, &b));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_rollback_restores_superseded_session() {
        let store = SessionStore::new(TTL, 100, ReusePolicy::Supersede);
        let (a, b) = (pid("alice"), pid("bob"));
        let first = store.create_pending(&a, &b, EphemeralKeyPair::generate()).unwrap();
        store
            .mark_completed(&first, &b, EphemeralKeyPair::generate().public_value(), key(6))
            .unwrap();

        let (second, superseded) = store
            .begin_pending(&a, &b, EphemeralKeyPair::generate())
            .unwrap();
        assert_eq!(superseded.as_ref().map(|s| s.id().clone()), Some(first.clone()));
        assert!(!store.has_active_session(&a, &b));

        store.rollback_pending(&second, superseded);

        assert!(store.get(&second).is_none());
        assert!(store.get(&first).unwrap().is_completed());
        assert!(store.has_active_session(&a, &b));
        assert!(store.delete(&first));
        assert!(store.is_empty());
    }

    #[test]
    fn test_rollback_without_previous_clears_pair() {
        let store = store();
        let (a, b) = (pid("alice"), pid("bob"));
        let (id, superseded) = store
            .begin_pending(&a, &b, EphemeralKeyPair::generate())
            .unwrap();
        assert!(superseded.is_none());

        store.rollback_pending(&id, None);
        assert!(store.is_empty());
        assert!(store.get(&id).is_none());

        // A second rollback of the same id is a no-op
        store.rollback_pending(&id, None);
        store.create_pending(&a, &b, EphemeralKeyPair::generate()).unwrap();
    }

    #[test]
    fn test_rollback_leaves_newer_session() {
        let store = SessionStore::new(TTL, 100, ReusePolicy::Supersede);
        let (a, b) = (pid("alice"), pid("bob"));
        let (stale, superseded) = store
            .begin_pending(&a, &b, EphemeralKeyPair::generate())
            .unwrap();
        let newer = store.create_pending(&b, &a, EphemeralKeyPair::generate()).unwrap();

        store.rollback_pending(&stale, superseded);
        assert_eq!(store.get(&newer).unwrap().initiator, b);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_unknown_session() {
        let store = store();
        let id = SessionId::generate();
        assert!(store.get(&id).is_none());
        assert!(!store.delete(&id));
        assert!(matches!(
            store.update(&id, |_| Ok(())),
            Err(ServerError::SessionNotFound)
        ));
    }

    #[test]
    fn test_delete_and_delete_pair() {
        let store = store();
        let (a, b, c) = (pid("alice"), pid("bob"), pid("carol"));
        let ab = store.create_pending(&a, &b, EphemeralKeyPair::generate()).unwrap();
        let ac = store.create_pending(&a, &c, EphemeralKeyPair::generate()).unwrap();

        assert!(store.delete(&ab));
        assert!(!store.delete(&ab));
        assert!(store.get(&ab).is_none());

        assert!(store.delete_pair(&c, &a).unwrap());
        assert!(!store.delete_pair(&c, &a).unwrap());
        assert!(store.get(&ac).is_none());
        assert!(store.is_empty());

        assert!(matches!(store.delete_pair(&a, &a), Err(ServerError::SelfExchange)));
    }

    #[test]
    fn test_sweep_removes_expired_regardless_of_state() {
        let store = store();
        let (a, b, c) = (pid("alice"), pid("bob"), pid("carol"));
        let pending = store.create_pending(&a, &b, EphemeralKeyPair::generate()).unwrap();
        let completed = store.create_pending(&a, &c, EphemeralKeyPair::generate()).unwrap();
        store
            .mark_completed(&completed, &c, EphemeralKeyPair::generate().public_value(), key(3))
            .unwrap();

        assert_eq!(store.sweep(Instant::now()), 0);
        assert_eq!(store.len(), 2);

        let later = Instant::now() + TTL + Duration::from_secs(1);
        assert_eq!(store.sweep(later), 2);
        assert!(store.is_empty());
        assert!(store.get(&pending).is_none());
        assert!(!store.delete(&completed));
    }

    #[test]
    fn test_with_session_key_requires_completion() {
        let store = store();
        let (a, b) = (pid("alice"), pid("bob"));

        let err = store.with_session_key(&a, &b, |_| Ok(())).unwrap_err();
        assert!(matches!(err, ServerError::NoActiveSession));

        let id = store.create_pending(&a, &b, EphemeralKeyPair::generate()).unwrap();
        let err = store.with_session_key(&a, &b, |_| Ok(())).unwrap_err();
        assert!(matches!(err, ServerError::NoActiveSession));
        assert!(!store.has_active_session(&a, &b));

        store
            .mark_completed(&id, &b, EphemeralKeyPair::generate().public_value(), key(5))
            .unwrap();
        let first_byte = store.with_session_key(&b, &a, |k| Ok(k.as_bytes()[0])).unwrap();
        assert_eq!(first_byte, 5);
    }

    #[test]
    fn test_concurrent_create_single_winner() {
        use std::sync::Arc;

        let store = Arc::new(store());
        let (a, b) = (pid("alice"), pid("bob"));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                let (from, to) = if i % 2 == 0 {
                    (a.clone(), b.clone())
                } else {
                    (b.clone(), a.clone())
                };
                std::thread::spawn(move || {
                    store.create_pending(&from, &to, EphemeralKeyPair::generate())
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let ok = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(ok, 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, ServerError::SessionAlreadyActive)));
        assert_eq!(store.len(), 1);
    }
}
