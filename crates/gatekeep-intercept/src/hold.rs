//! Held packet delivery as a linear resource.
//!
//! A [`DeliveryHold`] is created when an event is parked and must be given
//! back exactly once. Because it is not `Clone` and [`release`] takes
//! `self`, releasing twice does not compile. Forgetting to release (an
//! early return, a panic inside a task) is caught by `Drop`, which
//! releases the event and logs a warning so the leak is visible.
//!
//! [`release`]: DeliveryHold::release

use std::sync::Arc;

use crate::{EventId, PacketGate};

/// A parked packet event. Resume it with [`release`](Self::release).
#[must_use = "a hold that is never released stalls the login"]
pub struct DeliveryHold {
    event: EventId,
    gate: Arc<dyn PacketGate>,
    armed: bool,
}

impl DeliveryHold {
    /// Parks `event` on `gate` and returns the hold.
    pub fn acquire(event: EventId, gate: Arc<dyn PacketGate>) -> Self {
        gate.hold(event);
        tracing::trace!(%event, "packet delivery held");
        Self {
            event,
            gate,
            armed: true,
        }
    }

    /// The event this hold parks.
    pub fn event(&self) -> EventId {
        self.event
    }

    /// Resumes delivery of the event.
    pub fn release(mut self) {
        self.armed = false;
        self.gate.release(self.event);
        tracing::trace!(event = %self.event, "packet delivery released");
    }
}

impl Drop for DeliveryHold {
    fn drop(&mut self) {
        if self.armed {
            tracing::warn!(
                event = %self.event,
                "delivery hold dropped without release, releasing now"
            );
            self.gate.release(self.event);
        }
    }
}

impl std::fmt::Debug for DeliveryHold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryHold")
            .field("event", &self.event)
            .field("armed", &self.armed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct CountingGate {
        log: Mutex<Vec<(&'static str, EventId)>>,
    }

    impl PacketGate for CountingGate {
        fn hold(&self, event: EventId) {
            self.log.lock().unwrap().push(("hold", event));
        }

        fn release(&self, event: EventId) {
            self.log.lock().unwrap().push(("release", event));
        }
    }

    #[test]
    fn test_acquire_then_release_pairs_calls() {
        let gate = Arc::new(CountingGate::default());

        let hold = DeliveryHold::acquire(EventId::new(1), gate.clone());
        assert_eq!(hold.event(), EventId::new(1));
        hold.release();

        let log = gate.log.lock().unwrap();
        assert_eq!(
            *log,
            vec![("hold", EventId::new(1)), ("release", EventId::new(1))]
        );
    }

    #[test]
    fn test_drop_without_release_still_releases_once() {
        let gate = Arc::new(CountingGate::default());

        {
            let _hold = DeliveryHold::acquire(EventId::new(2), gate.clone());
        }

        let log = gate.log.lock().unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[1], ("release", EventId::new(2)));
    }

    #[test]
    fn test_panic_while_holding_releases_on_unwind() {
        let gate = Arc::new(CountingGate::default());
        let gate_for_panic = gate.clone();

        let result = std::panic::catch_unwind(move || {
            let _hold = DeliveryHold::acquire(EventId::new(3), gate_for_panic);
            panic!("task blew up");
        });

        assert!(result.is_err());
        let log = gate.log.lock().unwrap();
        assert_eq!(
            log.iter().filter(|(op, _)| *op == "release").count(),
            1
        );
    }
}
