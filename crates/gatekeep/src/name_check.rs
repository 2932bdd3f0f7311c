//! The name-check task: runs after an admitted login start.
//!
//! The flow is:
//!   1. Ask the profile service whether the name is a premium account
//!   2. Premium → store a verify token and send the encryption request
//!   3. Anything else → mark the session offline and let the server's
//!      normal login continue
//!   4. Release the held login start, whatever happened

use std::sync::Arc;

use gatekeep_crypto::verify_token;
use gatekeep_intercept::{DeliveryHold, LoginConnection};
use gatekeep_protocol::{validate_username, EncryptionRequest, PremiumProfile};
use gatekeep_session::{AttemptTicket, ProfileResolver, SessionKind};
use tracing::{debug, trace, warn};

use crate::listener::ListenerShared;
use crate::task::guard_resolver;
use crate::LoginError;

/// What the name check decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameCheckOutcome {
    /// Premium account: the encryption request is on its way.
    Challenged,

    /// The login continues offline. `lookup_failed` is set when the
    /// profile service could not answer (as opposed to "no such account").
    Offline { lookup_failed: bool },

    /// A newer login start from the same origin replaced this attempt, or
    /// it timed out. Nothing was sent.
    Superseded,

    /// The login start carried no name; the connection was refused.
    Rejected,

    /// The encryption request could not be sent; the attempt was ended.
    SendFailed,
}

/// Runs the name check and releases `hold` when done.
///
/// A panicking resolver counts as a failed lookup. Any other panic drops
/// `hold`, which releases it as well.
pub(crate) async fn run<R, C>(
    shared: Arc<ListenerShared<R>>,
    connection: Arc<C>,
    ticket: AttemptTicket,
    username: String,
    hold: DeliveryHold,
) -> NameCheckOutcome
where
    R: ProfileResolver,
    C: LoginConnection,
{
    let outcome = check(&shared, connection.as_ref(), &ticket, &username).await;

    debug!(
        origin = %ticket.origin(),
        conn_id = %connection.id(),
        username = %username,
        ?outcome,
        "name check finished"
    );

    hold.release();
    outcome
}

async fn check<R, C>(
    shared: &ListenerShared<R>,
    connection: &C,
    ticket: &AttemptTicket,
    username: &str,
) -> NameCheckOutcome
where
    R: ProfileResolver,
    C: LoginConnection,
{
    if username.is_empty() {
        shared.sessions.end_attempt(ticket);
        connection.disconnect(&shared.config.deny_message);
        return NameCheckOutcome::Rejected;
    }

    let (profile, lookup_failed) = match lookup(shared, username).await {
        Ok(profile) => (profile, false),
        Err(err) => {
            warn!(
                origin = %ticket.origin(),
                username,
                error = %err,
                "treating login as offline"
            );
            (None, true)
        }
    };

    match profile {
        Some(profile) => challenge(shared, connection, ticket, profile),
        None => match shared.sessions.establish(ticket, SessionKind::Offline) {
            Ok(()) => NameCheckOutcome::Offline { lookup_failed },
            Err(err) => {
                trace!(error = %err, "offline result discarded");
                NameCheckOutcome::Superseded
            }
        },
    }
}

/// Asks the profile service, skipping names no premium account can have.
async fn lookup<R: ProfileResolver>(
    shared: &ListenerShared<R>,
    username: &str,
) -> Result<Option<PremiumProfile>, LoginError> {
    if validate_username(username).is_err() {
        return Ok(None);
    }
    guard_resolver(shared.resolver.resolve_premium(username))
        .await
        .map_err(|e| LoginError::ProfileLookup(e.to_string()))
}

fn challenge<R, C>(
    shared: &ListenerShared<R>,
    connection: &C,
    ticket: &AttemptTicket,
    profile: PremiumProfile,
) -> NameCheckOutcome
where
    R: ProfileResolver,
    C: LoginConnection,
{
    let token = verify_token(shared.config.verify_token_len);
    let kind = SessionKind::Premium {
        profile,
        verify_token: token.clone(),
    };
    if let Err(err) = shared.sessions.establish(ticket, kind) {
        trace!(error = %err, "premium result discarded");
        return NameCheckOutcome::Superseded;
    }

    let request = EncryptionRequest {
        server_id: shared.config.server_id.clone(),
        public_key: shared.keys.public_key_der().to_vec(),
        verify_token: token,
    };
    match connection.send_encryption_request(request) {
        Ok(()) => NameCheckOutcome::Challenged,
        Err(err) => {
            warn!(
                origin = %ticket.origin(),
                conn_id = %connection.id(),
                error = %err,
                "failed to send encryption request"
            );
            shared.sessions.end_attempt(ticket);
            NameCheckOutcome::SendFailed
        }
    }
}
