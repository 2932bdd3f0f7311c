//! Registry behavior under arbitrary operation sequences and under
//! contention.
//!
//! The model is a plain `HashMap` of origin → (ticket, connection). The
//! timeout is long enough that nothing expires during a case.

use std::collections::HashMap;
use std::sync::Arc;

use gatekeep_intercept::ConnectionId;
use gatekeep_protocol::OriginKey;
use gatekeep_session::{SessionConfig, SessionError, SessionKind, SessionRegistry};
use proptest::prelude::*;

fn origin(port: u16) -> OriginKey {
    OriginKey(format!("203.0.113.9:{port}").parse().unwrap())
}

#[derive(Debug, Clone)]
enum Op {
    Start { port: u16, conn: u64 },
    EstablishLatest { port: u16 },
    Take { port: u16, conn: u64 },
    End { port: u16 },
}

fn op() -> impl Strategy<Value = Op> {
    let port = 1u16..4;
    let conn = 1u64..4;
    prop_oneof![
        (port.clone(), conn.clone()).prop_map(|(port, conn)| Op::Start { port, conn }),
        port.clone().prop_map(|port| Op::EstablishLatest { port }),
        (port.clone(), conn).prop_map(|(port, conn)| Op::Take { port, conn }),
        port.prop_map(|port| Op::End { port }),
    ]
}

proptest! {
    #[test]
    fn test_registry_matches_model(ops in proptest::collection::vec(op(), 1..64)) {
        let reg = SessionRegistry::new(SessionConfig::default());
        let mut model: HashMap<u16, (u64, u64)> = HashMap::new();
        let mut tickets = HashMap::new();

        for op in ops {
            match op {
                Op::Start { port, conn } => {
                    let ticket =
                        reg.start_or_replace(origin(port), ConnectionId::new(conn), "Steve");
                    model.insert(port, (ticket.number(), conn));
                    tickets.insert(port, ticket);
                }
                Op::EstablishLatest { port } => {
                    if let Some(ticket) = tickets.get(&port) {
                        let result = reg.establish(ticket, SessionKind::Offline);
                        let live = model.get(&port).map(|(n, _)| *n);
                        let expected_live = live == Some(ticket.number());
                        prop_assert_eq!(result.is_ok(), expected_live);
                    }
                }
                Op::Take { port, conn } => {
                    let result = reg.take(origin(port), ConnectionId::new(conn));
                    match model.get(&port).copied() {
                        None => {
                            let expected = SessionError::NotFound(origin(port));
                            prop_assert_eq!(result.unwrap_err(), expected);
                        }
                        Some((_, owner)) if owner != conn => {
                            let expected = SessionError::ForeignConnection(origin(port));
                            prop_assert_eq!(result.unwrap_err(), expected);
                        }
                        Some((number, _)) => {
                            prop_assert_eq!(result.unwrap().ticket, number);
                            model.remove(&port);
                        }
                    }
                }
                Op::End { port } => {
                    prop_assert_eq!(reg.end(&origin(port)), model.remove(&port).is_some());
                }
            }

            prop_assert_eq!(reg.len(), model.len());
        }
    }
}

#[test]
fn test_concurrent_starts_leave_one_session_per_origin() {
    let reg = Arc::new(SessionRegistry::default());

    let issued: Vec<u64> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8u64)
            .map(|conn| {
                let reg = Arc::clone(&reg);
                scope.spawn(move || {
                    (0..100)
                        .map(|_| {
                            reg.start_or_replace(origin(1), ConnectionId::new(conn), "Steve")
                                .number()
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect()
    });

    assert_eq!(reg.len(), 1);
    let survivor = reg.get(&origin(1)).unwrap();
    assert!(issued.contains(&survivor.ticket));

    let mut unique = issued.clone();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(unique.len(), issued.len(), "tickets are never reused");
}

#[test]
fn test_concurrent_takes_hand_out_session_once() {
    let reg = Arc::new(SessionRegistry::default());
    reg.start_or_replace(origin(1), ConnectionId::new(1), "Steve");

    let winners: usize = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let reg = Arc::clone(&reg);
                scope.spawn(move || reg.take(origin(1), ConnectionId::new(1)).is_ok())
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap() as usize)
            .sum()
    });

    assert_eq!(winners, 1);
    assert!(reg.is_empty());
}
