//! Many login starts at once, delivered from threads that are not tokio
//! threads, as a packet framework would.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use futures_util::future::join_all;
use gatekeep::{Dispatch, LoginListener, NameCheckOutcome};
use gatekeep_intercept::LoginConnection;
use gatekeep_limit::SlidingWindowLimiter;
use gatekeep_session::SessionKind;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_login_starts_same_origin_leave_one_session() {
    let h = Harness::new();
    h.resolver.premium("Steve");
    let connections: Vec<_> = (0..8).map(|i| RecordingConnection::new(i, origin(1))).collect();

    let tasks: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = connections
            .iter()
            .map(|conn| {
                let h = &h;
                scope.spawn(move || {
                    (0..10)
                        .map(|_| expect_name_check(h.login_start(conn, "Steve")))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect()
    });

    let outcomes: Vec<_> = join_all(tasks.into_iter().map(|task| task.outcome()))
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();

    assert_eq!(h.listener.sessions().len(), 1);
    assert!(outcomes.contains(&NameCheckOutcome::Challenged));
    assert!(outcomes
        .iter()
        .all(|o| matches!(o, NameCheckOutcome::Challenged | NameCheckOutcome::Superseded)));

    // The survivor carries a token that was actually sent to its owner.
    let session = h.listener.sessions().get(&origin(1)).unwrap();
    let SessionKind::Premium { verify_token, .. } = session.kind else {
        panic!("survivor should be premium");
    };
    let owner = connections
        .iter()
        .find(|c| c.id() == session.connection)
        .unwrap();
    assert!(owner.requests().iter().any(|r| r.verify_token == verify_token));

    assert_eq!(h.gate.held_events(), 80);
    assert!(h.gate.all_released_once());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_storm_admits_exactly_the_budget() {
    let h = Arc::new(Harness::with_builder(
        LoginListener::<ScriptedResolver>::builder().rate_limiter(Arc::new(
            SlidingWindowLimiter::new(10, Duration::from_secs(600)),
        )),
    ));

    let dispatches: Vec<Dispatch> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..50u16)
            .map(|port| {
                let h = Arc::clone(&h);
                scope.spawn(move || {
                    let conn = RecordingConnection::new(u64::from(port), origin(port));
                    h.login_start(&conn, "Steve")
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    let mut tasks = Vec::new();
    let mut dropped = 0;
    for dispatch in dispatches {
        match dispatch {
            Dispatch::NameCheck(task) => tasks.push(task.outcome()),
            Dispatch::Dropped(_) => dropped += 1,
            other => panic!("unexpected dispatch {other:?}"),
        }
    }
    let admitted = tasks.len();
    for outcome in join_all(tasks).await {
        assert_eq!(outcome.unwrap(), NameCheckOutcome::Offline { lookup_failed: false });
    }

    assert_eq!(admitted, 10);
    assert_eq!(dropped, 40);
    assert_eq!(h.listener.sessions().len(), 10);
    assert_eq!(h.gate.held_events(), 10);
    assert!(h.gate.all_released_once());
}
