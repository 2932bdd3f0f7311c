//! The session registry: all in-flight logins, keyed by origin.
//!
//! Responsibilities:
//! - Starting a session when a login start is admitted (replacing any
//!   older one from the same origin)
//! - Recording the name check's decision, but only for the attempt that
//!   is still current
//! - Handing a session to exactly one verification, then forgetting it
//! - Expiring sessions that were never finished
//!
//! # Concurrency note
//!
//! Unlike a registry owned by a single accept loop, this one is hit from
//! the packet thread and from many tasks at once, so it is backed by a
//! sharded concurrent map (`DashMap`). Every operation that reads and then
//! writes an entry does so through the entry API, which holds the shard
//! lock for the whole check-and-modify. Nothing awaits while a shard is
//! locked.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use gatekeep_intercept::ConnectionId;
use gatekeep_protocol::OriginKey;
use tokio::time::Instant;

use crate::{AttemptTicket, LoginSession, SessionConfig, SessionError, SessionKind};

/// Tracks every in-flight login session.
///
/// ## Lifecycle
///
/// ```text
/// start_or_replace() ──→ [Pending] ──establish()──→ [Premium | Offline]
///        ▲                   │                              │
///        │ (same origin)     │ timeout                      ├── take() ──→ verification
///        └── replaces ───────┤                              │
///                            ▼                              ▼
///                        expired: invisible to get(), removed by purge_expired()
/// ```
pub struct SessionRegistry {
    /// At most one session per origin: the map key enforces it.
    sessions: DashMap<OriginKey, LoginSession>,

    /// Source of attempt numbers.
    next_ticket: AtomicU64,

    config: SessionConfig,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: DashMap::new(),
            next_ticket: AtomicU64::new(1),
            config,
        }
    }

    /// How long a session stays valid.
    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    /// Starts a `Pending` session for `origin`, atomically replacing any
    /// session that was there. A new person may reuse an address/port
    /// tuple, so the newest login start always wins.
    pub fn start_or_replace(
        &self,
        origin: OriginKey,
        connection: ConnectionId,
        username: &str,
    ) -> AttemptTicket {
        let number = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let session = LoginSession {
            origin,
            connection,
            ticket: number,
            username: username.to_string(),
            kind: SessionKind::Pending,
            created_at: Instant::now(),
        };

        if let Some(previous) = self.sessions.insert(origin, session) {
            tracing::debug!(
                %origin,
                previous_user = %previous.username,
                username,
                "login session replaced"
            );
        } else {
            tracing::trace!(%origin, username, "login session started");
        }

        AttemptTicket { origin, number }
    }

    /// Records the name check's decision for the attempt `ticket`.
    ///
    /// # Errors
    /// - [`SessionError::Superseded`]: a newer login start replaced it
    /// - [`SessionError::Expired`]: it timed out (and is removed now)
    /// - [`SessionError::NotFound`]: it was ended or purged
    pub fn establish(&self, ticket: &AttemptTicket, kind: SessionKind) -> Result<(), SessionError> {
        match self.sessions.entry(ticket.origin) {
            Entry::Occupied(mut slot) => {
                if slot.get().ticket != ticket.number {
                    return Err(SessionError::Superseded(ticket.origin));
                }
                if slot.get().is_expired_at(Instant::now(), self.config.timeout) {
                    slot.remove();
                    return Err(SessionError::Expired(ticket.origin));
                }
                slot.get_mut().kind = kind;
                Ok(())
            }
            Entry::Vacant(_) => Err(SessionError::NotFound(ticket.origin)),
        }
    }

    /// Looks up the live session for `origin`.
    ///
    /// Never returns an expired session, even if it has not been purged.
    pub fn get(&self, origin: &OriginKey) -> Option<LoginSession> {
        let session = self.sessions.get(origin)?;
        if session.is_expired_at(Instant::now(), self.config.timeout) {
            return None;
        }
        Some(session.value().clone())
    }

    /// Removes and returns the session for `origin` so that exactly one
    /// verification can use it.
    ///
    /// # Errors
    /// - [`SessionError::NotFound`]: no session
    /// - [`SessionError::ForeignConnection`]: the session was started by
    ///   another connection; it stays in place
    /// - [`SessionError::Expired`]: timed out (removed anyway)
    pub fn take(
        &self,
        origin: OriginKey,
        connection: ConnectionId,
    ) -> Result<LoginSession, SessionError> {
        match self.sessions.entry(origin) {
            Entry::Occupied(slot) => {
                if slot.get().connection != connection {
                    return Err(SessionError::ForeignConnection(origin));
                }
                let session = slot.remove();
                if session.is_expired_at(Instant::now(), self.config.timeout) {
                    return Err(SessionError::Expired(origin));
                }
                Ok(session)
            }
            Entry::Vacant(_) => Err(SessionError::NotFound(origin)),
        }
    }

    /// Removes the session for `origin`, whoever owns it.
    /// Returns `true` if there was one.
    pub fn end(&self, origin: &OriginKey) -> bool {
        self.sessions.remove(origin).is_some()
    }

    /// Removes the session only if it still belongs to `ticket`.
    /// Returns `true` if it was removed.
    pub fn end_attempt(&self, ticket: &AttemptTicket) -> bool {
        self.sessions
            .remove_if(&ticket.origin, |_, session| session.ticket == ticket.number)
            .is_some()
    }

    /// Drops every expired session. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let timeout = self.config.timeout;
        let mut purged = 0;
        self.sessions.retain(|_, session| {
            let keep = !session.is_expired_at(now, timeout);
            if !keep {
                purged += 1;
            }
            keep
        });
        purged
    }

    /// Number of stored sessions, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

// =========================================================================
// Tests
// =========================================================================
