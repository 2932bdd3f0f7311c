//! The verification task: runs when the encryption response arrives.
//!
//! Every failure ends in the same place: the session is gone, the client
//! is disconnected with the generic deny message, and the held packet is
//! released. Which check failed is only logged.

use std::sync::Arc;

use gatekeep_crypto::{server_hash, tokens_match, CryptoError};
use gatekeep_intercept::{DeliveryHold, LoginConnection};
use gatekeep_protocol::VerifiedIdentity;
use gatekeep_session::{ProfileResolver, SessionKind};
use tracing::{debug, info, trace, warn};

use crate::listener::ListenerShared;
use crate::task::guard_resolver;
use crate::LoginError;

/// What the verification decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// The client owns the premium account; the connection continues with
    /// this identity.
    Verified(VerifiedIdentity),

    /// The connection was refused.
    Denied(LoginError),
}

impl VerifyOutcome {
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified(_))
    }
}

/// Runs the verification and releases `hold` when done.
pub(crate) async fn run<R, C>(
    shared: Arc<ListenerShared<R>>,
    connection: Arc<C>,
    encrypted_secret: Vec<u8>,
    encrypted_token: Vec<u8>,
    hold: DeliveryHold,
) -> VerifyOutcome
where
    R: ProfileResolver,
    C: LoginConnection,
{
    let origin = connection.origin();
    let conn_id = connection.id();

    let verdict = verify(&shared, connection.as_ref(), &encrypted_secret, &encrypted_token).await;
    let outcome = match verdict {
        Ok(identity) => match connection.complete_login(identity.clone()) {
            Ok(()) => {
                info!(
                    %origin,
                    %conn_id,
                    username = %identity.profile.name,
                    "premium login verified"
                );
                VerifyOutcome::Verified(identity)
            }
            Err(err) => {
                warn!(%origin, %conn_id, error = %err, "verified login could not be completed");
                connection.disconnect(&shared.config.deny_message);
                VerifyOutcome::Denied(LoginError::HandoffFailed(err.to_string()))
            }
        },
        Err(err) => {
            debug!(%origin, %conn_id, error = %err, "premium login denied");
            connection.disconnect(&shared.config.deny_message);
            VerifyOutcome::Denied(err)
        }
    };

    hold.release();
    outcome
}

async fn verify<R, C>(
    shared: &ListenerShared<R>,
    connection: &C,
    encrypted_secret: &[u8],
    encrypted_token: &[u8],
) -> Result<VerifiedIdentity, LoginError>
where
    R: ProfileResolver,
    C: LoginConnection,
{
    let origin = connection.origin();
    let conn_id = connection.id();

    let secret = match shared.keys.decrypt_shared_secret(encrypted_secret) {
        Ok(secret) => secret,
        Err(err) => {
            // The attempt is over either way; only our own session goes.
            if let Err(session_err) = shared.sessions.take(origin, conn_id) {
                trace!(error = %session_err, "no session to end");
            }
            return Err(match err {
                CryptoError::SecretLength { .. } => LoginError::MalformedSecret,
                _ => LoginError::Decryption,
            });
        }
    };

    let session = shared.sessions.take(origin, conn_id).map_err(|err| {
        trace!(error = %err, "session unavailable");
        LoginError::SessionExpiredOrMissing
    })?;

    let SessionKind::Premium { verify_token: expected, .. } = session.kind else {
        return Err(LoginError::NotChallenged);
    };

    let returned = shared
        .keys
        .decrypt(encrypted_token)
        .map_err(|_| LoginError::Decryption)?;
    if !tokens_match(&expected, &returned) {
        return Err(LoginError::TokenMismatch);
    }

    let hash = server_hash(&shared.config.server_id, &secret, shared.keys.public_key_der());
    match guard_resolver(shared.resolver.has_joined(&session.username, &hash)).await {
        Ok(Some(profile)) => Ok(VerifiedIdentity {
            profile,
            shared_secret: secret,
            server_hash: hash,
        }),
        Ok(None) => Err(LoginError::JoinNotConfirmed),
        Err(err) => {
            warn!(%origin, username = %session.username, error = %err, "join check failed");
            Err(LoginError::JoinNotConfirmed)
        }
    }
}
