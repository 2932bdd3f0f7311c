//! Packet interception seam for Gatekeep.
//!
//! The packet interception framework is a black box: it decodes login
//! packets, hands them to observers, and lets an observer park a packet
//! ("hold delivery") until some asynchronous work is done. This crate
//! describes that black box as traits so Gatekeep can be driven by any
//! framework (and by mocks in tests):
//!
//! - [`LoginConnection`]: the connection a packet came from, and the
//!   outbound actions Gatekeep may take on it.
//! - [`PacketGate`]: the framework's hold/release primitive.
//! - [`PacketEvent`]: one delivered packet.
//! - [`DeliveryHold`]: a held packet, released exactly once.

mod error;
mod event;
mod hold;

pub use error::InterceptError;
pub use event::{DeliveryMarker, PacketEvent};
pub use hold::DeliveryHold;

use std::fmt;

use gatekeep_protocol::{EncryptionRequest, OriginKey, VerifiedIdentity};

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Opaque identifier for one delivered packet event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventId(u64);

impl EventId {
    /// Creates a new `EventId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "evt-{}", self.0)
    }
}

/// A client connection that is still in the login phase.
///
/// All methods are synchronous: the framework queues outbound packets
/// and returns immediately, so they are safe to call from async tasks.
pub trait LoginConnection: Send + Sync + 'static {
    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;

    /// Returns the remote address + port the connection came from.
    fn origin(&self) -> OriginKey;

    /// Sends the encryption challenge to the client.
    fn send_encryption_request(&self, request: EncryptionRequest) -> Result<(), InterceptError>;

    /// Switches the connection to the verified premium identity and lets
    /// the server's login sequence continue with it.
    fn complete_login(&self, identity: VerifiedIdentity) -> Result<(), InterceptError>;

    /// Refuses the login with a client-visible reason and closes the
    /// connection.
    fn disconnect(&self, reason: &str);
}

/// The framework's "processing delay" primitive.
///
/// `hold` parks delivery of an event to the rest of the pipeline;
/// `release` resumes it. Every `hold` must be matched by exactly one
/// `release` or that connection's login stalls forever. Gatekeep never
/// calls these directly: it goes through [`DeliveryHold`], which makes
/// double release impossible and releases on drop.
pub trait PacketGate: Send + Sync + 'static {
    /// Parks delivery of `event`.
    fn hold(&self, event: EventId);

    /// Resumes delivery of `event`.
    fn release(&self, event: EventId);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::new(7);
        assert_eq!(id.to_string(), "conn-7");
    }

    #[test]
    fn test_event_id_display() {
        let id = EventId::new(3);
        assert_eq!(id.to_string(), "evt-3");
    }

    #[test]
    fn test_event_id_hash_works_as_map_key() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(EventId::new(1), "login-start");
        map.insert(EventId::new(2), "encryption-response");
        assert_eq!(map[&EventId::new(1)], "login-start");
    }
}
