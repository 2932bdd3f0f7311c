//! Error types for the protocol layer.
//!
//! Each crate in Gatekeep defines its own error enum. When you see a
//! `ProtocolError`, the problem is the *shape* of some input (a username,
//! a profile payload), not cryptography or session state.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The claimed username is empty, too long, or contains characters
    /// the game never allows in an account name.
    #[error("invalid username: {0:?}")]
    InvalidUsername(String),

    /// A profile service response could not be parsed.
    ///
    /// Common causes: an error page instead of JSON, a missing `id`
    /// field, or an id that is not a valid UUID.
    #[cfg(feature = "json")]
    #[error("profile decode failed: {0}")]
    ProfileDecode(serde_json::Error),
}
