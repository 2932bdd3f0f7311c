//! A single packet delivered by the interception framework.

use std::sync::Arc;

use gatekeep_protocol::{ClientLoginPacket, PacketKind};

use crate::{DeliveryHold, EventId, LoginConnection, PacketGate};

/// One intercepted login packet, plus what is needed to park it.
pub struct PacketEvent<C> {
    id: EventId,
    connection: Arc<C>,
    packet: ClientLoginPacket,
    cancelled: bool,
    gate: Arc<dyn PacketGate>,
}

impl<C: LoginConnection> PacketEvent<C> {
    /// Wraps a packet delivered on `connection`.
    pub fn new(
        id: EventId,
        connection: Arc<C>,
        packet: ClientLoginPacket,
        gate: Arc<dyn PacketGate>,
    ) -> Self {
        Self {
            id,
            connection,
            packet,
            cancelled: false,
            gate,
        }
    }

    /// Marks the event as cancelled by an earlier observer.
    pub fn with_cancelled(mut self, cancelled: bool) -> Self {
        self.cancelled = cancelled;
        self
    }

    /// The event's id.
    pub fn id(&self) -> EventId {
        self.id
    }

    /// Whether another observer already cancelled this event.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Which kind of packet this is.
    pub fn kind(&self) -> PacketKind {
        self.packet.kind()
    }

    /// The connection the packet arrived on.
    pub fn connection(&self) -> &Arc<C> {
        &self.connection
    }

    /// The decoded packet.
    pub fn packet(&self) -> &ClientLoginPacket {
        &self.packet
    }

    /// Takes the event apart. The returned [`DeliveryMarker`] can park the
    /// packet later; dropping it unused lets delivery continue normally.
    pub fn split(self) -> (Arc<C>, ClientLoginPacket, DeliveryMarker) {
        let marker = DeliveryMarker {
            event: self.id,
            gate: self.gate,
        };
        (self.connection, self.packet, marker)
    }
}

/// The right to park one event's delivery.
pub struct DeliveryMarker {
    event: EventId,
    gate: Arc<dyn PacketGate>,
}

impl DeliveryMarker {
    /// The event this marker belongs to.
    pub fn event(&self) -> EventId {
        self.event
    }

    /// Parks delivery until the returned hold is released.
    pub fn hold(self) -> DeliveryHold {
        DeliveryHold::acquire(self.event, self.gate)
    }
}
