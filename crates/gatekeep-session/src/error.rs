//! Error types for the session layer.

use gatekeep_protocol::OriginKey;

/// Errors that can occur when a task touches the session registry.
///
/// None of these are reported to the client; the tasks turn them into a
/// generic denial (or, for the name check, into "do nothing").
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// No session exists for the origin. It was never started, was ended
    /// by a verification, or was purged after expiring.
    #[error("no login session for {0}")]
    NotFound(OriginKey),

    /// The session outlived the timeout. Expired sessions are treated as
    /// absent and removed when touched.
    #[error("login session for {0} expired")]
    Expired(OriginKey),

    /// A newer login start from the same origin replaced the session this
    /// caller was working on.
    #[error("login session for {0} was superseded")]
    Superseded(OriginKey),

    /// The session belongs to a different connection that shares the
    /// origin (NAT, proxy). It is left untouched.
    #[error("login session for {0} belongs to another connection")]
    ForeignConnection(OriginKey),
}
