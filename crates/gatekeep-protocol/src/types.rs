//! Core protocol types for the login phase.
//!
//! These are the values Gatekeep reads out of the two intercepted client
//! packets, the challenge it sends back, and the identity it hands to the
//! server once a premium login is confirmed.

use std::fmt;
use std::net::SocketAddr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ProtocolError;

/// Longest account name the game allows.
pub const MAX_USERNAME_LEN: usize = 16;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The network origin of a connection: remote IP address plus port.
///
/// Login sessions are keyed by origin. This is an approximation of
/// "one person": two clients behind the same NAT or proxy that end up with
/// the same (address, port) tuple share a key, and the later login
/// replaces the earlier one. Gatekeep keeps that behavior on purpose.
///
/// `#[serde(transparent)]` serializes this as the inner address string,
/// e.g. `"203.0.113.7:51234"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OriginKey(pub SocketAddr);

impl From<SocketAddr> for OriginKey {
    fn from(addr: SocketAddr) -> Self {
        Self(addr)
    }
}

impl fmt::Display for OriginKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A premium account as known by the central profile service.
///
/// The service answers with `{"id": "<32 hex digits>", "name": "..."}`;
/// `Uuid` accepts the undashed form, so this derives straight from that
/// JSON. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PremiumProfile {
    /// Stable account id.
    pub id: Uuid,
    /// Canonical spelling of the account name.
    pub name: String,
}

// ---------------------------------------------------------------------------
// Inbound packets
// ---------------------------------------------------------------------------

/// The two packet kinds Gatekeep registers interest in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    /// Client → Server: "my name is ...".
    LoginStart,
    /// Client → Server: answer to our encryption request.
    EncryptionResponse,
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoginStart => f.write_str("login-start"),
            Self::EncryptionResponse => f.write_str("encryption-response"),
        }
    }
}

/// A decoded login-phase packet sent by the client.
///
/// The interception framework has already parsed the wire bytes; Gatekeep
/// only checks that the payload is *present*. Whether it makes sense is
/// decided by the task that handles it.
#[derive(Clone, PartialEq, Eq)]
pub enum ClientLoginPacket {
    /// The client announces the account name it wants to play as.
    LoginStart { username: String },

    /// The client's reply to an [`EncryptionRequest`]: the shared secret
    /// it picked and the verify token we sent, both RSA-encrypted with the
    /// server's public key.
    EncryptionResponse {
        shared_secret: Vec<u8>,
        verify_token: Vec<u8>,
    },
}

impl ClientLoginPacket {
    /// Which of the two intercepted kinds this packet is.
    pub fn kind(&self) -> PacketKind {
        match self {
            Self::LoginStart { .. } => PacketKind::LoginStart,
            Self::EncryptionResponse { .. } => PacketKind::EncryptionResponse,
        }
    }
}

impl fmt::Debug for ClientLoginPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoginStart { username } => f
                .debug_struct("LoginStart")
                .field("username", username)
                .finish(),
            Self::EncryptionResponse {
                shared_secret,
                verify_token,
            } => f
                .debug_struct("EncryptionResponse")
                .field("shared_secret_len", &shared_secret.len())
                .field("verify_token_len", &verify_token.len())
                .finish(),
        }
    }
}

// ---------------------------------------------------------------------------
// Outbound challenge
// ---------------------------------------------------------------------------

/// Server → Client: "prove you own this account".
///
/// Carries the server's RSA public key (X.509 SubjectPublicKeyInfo DER)
/// and a fresh verify token. The client encrypts a shared secret and the
/// token with the key and asks the session service to record the join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionRequest {
    /// Server id mixed into the join hash. Modern servers send `""`.
    pub server_id: String,
    /// DER-encoded public key.
    pub public_key: Vec<u8>,
    /// Random challenge bytes the client must echo back encrypted.
    pub verify_token: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Verified identity
// ---------------------------------------------------------------------------

/// What a successful premium verification hands to the connection.
///
/// The connection uses `shared_secret` to install its stream cipher and
/// `profile` as the player's identity from then on.
#[derive(Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    /// The account the session service confirmed.
    pub profile: PremiumProfile,
    /// The decrypted 16-byte shared secret.
    pub shared_secret: Vec<u8>,
    /// The server-id hash that was confirmed with the session service.
    pub server_hash: String,
}

/// Never print the shared secret.
impl fmt::Debug for VerifiedIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifiedIdentity")
            .field("profile", &self.profile)
            .field("shared_secret", &"<redacted>")
            .field("server_hash", &self.server_hash)
            .finish()
    }
}

/// Checks that `name` could be a premium account name: 1 to 16 ASCII
/// letters, digits or underscores.
///
/// # Errors
/// Returns [`ProtocolError::InvalidUsername`] otherwise.
pub fn validate_username(name: &str) -> Result<(), ProtocolError> {
    let valid = !name.is_empty()
        && name.len() <= MAX_USERNAME_LEN
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_');
    if valid {
        Ok(())
    } else {
        Err(ProtocolError::InvalidUsername(name.to_string()))
    }
}
