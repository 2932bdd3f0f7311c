//! Error types for the Gatekeep meta-crate.

use gatekeep_crypto::CryptoError;
use gatekeep_intercept::InterceptError;
use gatekeep_protocol::ProtocolError;
use gatekeep_session::{ResolveError, SessionError};

/// Top-level error that wraps all crate-specific errors.
///
/// Returned by setup code (building the listener, installing telemetry)
/// and by [`LoginTask::outcome`](crate::LoginTask::outcome). Nothing that
/// happens *inside* a login task surfaces here; those failures become a
/// [`LoginError`] in the task's outcome.
#[derive(Debug, thiserror::Error)]
pub enum GatekeepError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Intercept(#[from] InterceptError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The task was aborted or panicked.
    #[error("login task did not complete: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// `build()` ran outside a tokio runtime and no handle was given.
    #[error("no tokio runtime to run login tasks on")]
    NoRuntime,

    #[error("failed to install tracing subscriber: {0}")]
    Telemetry(String),
}

/// Why a login attempt did not go through.
///
/// The client never sees these: every denial shows the same configured
/// message. The variant is only logged and reported in the task outcome.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoginError {
    /// The admission budget was exhausted; the login start was dropped.
    #[error("join limit hit")]
    AdmissionRejected,

    /// The profile service could not answer the premium lookup.
    #[error("profile lookup failed: {0}")]
    ProfileLookup(String),

    /// The shared secret or verify token did not decrypt with our key.
    #[error("encrypted payload did not decrypt")]
    Decryption,

    /// The shared secret decrypted but has the wrong length.
    #[error("shared secret has the wrong length")]
    MalformedSecret,

    /// The verify token the client returned is not the one we sent.
    #[error("verify token mismatch")]
    TokenMismatch,

    /// No live session for this connection: never started, replaced,
    /// already consumed or timed out.
    #[error("login session expired or missing")]
    SessionExpiredOrMissing,

    /// The session exists but no challenge was ever sent for it.
    #[error("no encryption request was sent for this login")]
    NotChallenged,

    /// The session service did not confirm the client's join.
    #[error("session service did not confirm the join")]
    JoinNotConfirmed,

    /// Verification passed but the connection refused the identity.
    #[error("could not hand the verified identity to the connection: {0}")]
    HandoffFailed(String),
}

impl LoginError {
    /// Whether this error refuses the connection.
    ///
    /// Admission rejection and lookup failure are not denials: the first
    /// silently drops the packet, the second falls back to offline login.
    pub fn is_denial(&self) -> bool {
        !matches!(self, Self::AdmissionRejected | Self::ProfileLookup(_))
    }
}
