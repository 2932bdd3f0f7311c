//! Session types: what the server remembers about one login attempt.
//!
//! A login session lives from the client's login start until its
//! encryption response is verified (or until it times out). It records:
//! - WHERE the attempt comes from (`OriginKey`, `ConnectionId`)
//! - WHO it claims to be (the username)
//! - WHAT we challenged it with (the verify token, for premium accounts)
//! - WHEN it started (so it can expire)

use std::time::Duration;

use gatekeep_intercept::ConnectionId;
use gatekeep_protocol::{OriginKey, PremiumProfile};
use tokio::time::Instant;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for session lifetime.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long an unfinished login session stays valid.
    ///
    /// Default: 2 minutes. A client that has not answered the challenge
    /// by then has to start over.
    pub timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionKind
// ---------------------------------------------------------------------------

/// How far the login has progressed, and what was decided.
///
/// ```text
///   Pending ──(premium account)──→ Premium { verify_token }
///      │
///      └──(unknown name / lookup failed)──→ Offline
/// ```
#[derive(Clone, PartialEq, Eq)]
pub enum SessionKind {
    /// Login start admitted, name check still running.
    Pending,

    /// The name belongs to a premium account and the client was sent an
    /// encryption request carrying `verify_token`.
    Premium {
        profile: PremiumProfile,
        verify_token: Vec<u8>,
    },

    /// The server handles this login the normal (offline) way.
    Offline,
}

impl SessionKind {
    /// Whether the name check decided this is a premium login.
    pub fn is_premium(&self) -> bool {
        matches!(self, Self::Premium { .. })
    }
}

impl std::fmt::Debug for SessionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => f.write_str("Pending"),
            Self::Premium { profile, .. } => f
                .debug_struct("Premium")
                .field("profile", profile)
                .field("verify_token", &"<redacted>")
                .finish(),
            Self::Offline => f.write_str("Offline"),
        }
    }
}

// ---------------------------------------------------------------------------
// AttemptTicket
// ---------------------------------------------------------------------------

/// Proof that a caller started a specific login attempt.
///
/// Issued by [`SessionRegistry::start_or_replace`](crate::SessionRegistry::start_or_replace).
/// Tickets increase monotonically, so a ticket that no longer matches the
/// stored session means the attempt was replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttemptTicket {
    pub(crate) origin: OriginKey,
    pub(crate) number: u64,
}

impl AttemptTicket {
    /// The origin this attempt belongs to.
    pub fn origin(&self) -> OriginKey {
        self.origin
    }

    /// The attempt number.
    pub fn number(&self) -> u64 {
        self.number
    }
}

// ---------------------------------------------------------------------------
// LoginSession
// ---------------------------------------------------------------------------

/// One in-flight login, keyed by its origin in the registry.
#[derive(Debug, Clone)]
pub struct LoginSession {
    /// Where the attempt comes from.
    pub origin: OriginKey,

    /// The connection that sent the login start. Only this connection may
    /// consume the session.
    pub connection: ConnectionId,

    /// Attempt number, see [`AttemptTicket`].
    pub ticket: u64,

    /// The name from the login start packet.
    pub username: String,

    /// What the name check decided.
    pub kind: SessionKind,

    /// When the login start was admitted (monotonic clock).
    pub created_at: Instant,
}

impl LoginSession {
    /// Whether the session is older than `timeout` at `now`.
    pub fn is_expired_at(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.created_at) >= timeout
    }
}
