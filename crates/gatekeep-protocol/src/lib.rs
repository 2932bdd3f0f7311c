//! Login-phase protocol types for Gatekeep.
//!
//! This crate defines the values that cross the boundary between the game
//! client, the packet interception framework and the profile service:
//!
//! - **Types** ([`ClientLoginPacket`], [`EncryptionRequest`],
//!   [`OriginKey`], etc.): what the two intercepted packets carry and
//!   what the server sends back.
//! - **Profiles** ([`PremiumProfile`], [`VerifiedIdentity`]): who a
//!   premium account is, and what a finished verification hands over.
//! - **Errors** ([`ProtocolError`]): malformed usernames and profile
//!   payloads.
//!
//! # Architecture
//!
//! The protocol layer does not know how packets are framed on the wire:
//! the interception framework decodes them before Gatekeep sees them.
//!
//! ```text
//! Interception framework (typed packets) → Protocol (values) → Session / tasks
//! ```

mod error;
#[cfg(feature = "json")]
mod profile;
mod types;

pub use error::ProtocolError;
pub use types::{
    validate_username, ClientLoginPacket, EncryptionRequest, OriginKey,
    PacketKind, PremiumProfile, VerifiedIdentity, MAX_USERNAME_LEN,
};
