//! The seam to the central account service.
//!
//! Gatekeep does not talk HTTP itself. It needs two answers from the
//! account service, and the embedding server supplies them through the
//! [`ProfileResolver`] trait:
//!
//! 1. "Does this name belong to a premium account?" (asked on login start)
//! 2. "Did this player just join with this server hash?" (asked when the
//!    encryption response arrives)
//!
//! Both are asked from background tasks, never from the packet thread.

use gatekeep_protocol::{PremiumProfile, ProtocolError};

/// Why the account service could not give an answer.
///
/// A resolve error is never a "no". The name check treats it as "treat
/// this login as offline"; the verification treats it as a denial.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// Network failure, timeout, 5xx, ...
    #[error("profile service unavailable: {0}")]
    Unavailable(String),

    /// The service asked us to slow down.
    #[error("profile service rate limited the lookup")]
    RateLimited,

    /// The service answered with something we could not read.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Looks up premium accounts and confirms joins.
///
/// # Example
///
/// ```rust
/// use gatekeep_protocol::PremiumProfile;
/// use gatekeep_session::{ProfileResolver, ResolveError};
///
/// /// Knows no premium accounts; every login goes the offline path.
/// struct NoPremiumAccounts;
///
/// impl ProfileResolver for NoPremiumAccounts {
///     async fn resolve_premium(
///         &self,
///         _username: &str,
///     ) -> Result<Option<PremiumProfile>, ResolveError> {
///         Ok(None)
///     }
///
///     async fn has_joined(
///         &self,
///         _username: &str,
///         _server_hash: &str,
///     ) -> Result<Option<PremiumProfile>, ResolveError> {
///         Ok(None)
///     }
/// }
/// ```
pub trait ProfileResolver: Send + Sync + 'static {
    /// Returns the premium profile owning `username`, or `Ok(None)` when
    /// no premium account has that name.
    fn resolve_premium(
        &self,
        username: &str,
    ) -> impl std::future::Future<Output = Result<Option<PremiumProfile>, ResolveError>> + Send;

    /// Asks the account service whether `username` announced a join with
    /// `server_hash`.
    ///
    /// # Returns
    /// - `Ok(Some(profile))`: confirmed; `profile` is authoritative
    /// - `Ok(None)`: the service does not know about this join
    fn has_joined(
        &self,
        username: &str,
        server_hash: &str,
    ) -> impl std::future::Future<Output = Result<Option<PremiumProfile>, ResolveError>> + Send;
}
