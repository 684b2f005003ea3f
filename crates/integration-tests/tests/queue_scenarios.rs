//! End-to-end queue scenarios against SQLite

mod common;

use common::Harness;
use waitline_core::domain::{DestinationId, DomainError, RequesterId};
use waitline_core::error::AppError;

fn req(name: &str) -> RequesterId {
    RequesterId::new(name)
}

#[tokio::test]
async fn test_positions_follow_joins_and_leaves() {
    let h = Harness::memory().await;
    let d = h.register("Museum", 10).await.id;

    h.queue.join(&d, &req("a"), 1).await.unwrap();
    h.queue.join(&d, &req("b"), 3).await.unwrap();
    h.queue.join(&d, &req("c"), 2).await.unwrap();

    assert_eq!(h.resolver.position_of(&d, &req("a")).await.unwrap(), 1);
    assert_eq!(h.resolver.position_of(&d, &req("b")).await.unwrap(), 4);
    assert_eq!(h.resolver.position_of(&d, &req("c")).await.unwrap(), 6);
    assert_eq!(h.resolver.total_waiting(&d).await.unwrap(), 6);

    h.queue.leave(&d, &req("a")).await.unwrap();

    assert_eq!(h.resolver.position_of(&d, &req("b")).await.unwrap(), 3);
    assert_eq!(h.resolver.position_of(&d, &req("c")).await.unwrap(), 5);
    assert_eq!(h.resolver.total_waiting(&d).await.unwrap(), 5);

    // Survivors keep their sequence numbers
    let sequences: Vec<_> = h
        .queue
        .snapshot(&d)
        .await
        .unwrap()
        .iter()
        .map(|m| m.sequence)
        .collect();
    assert_eq!(sequences, vec![2, 3]);

    h.cleanup().await;
}

#[tokio::test]
async fn test_interleaved_operations_never_drift() {
    let h = Harness::memory().await;
    let d = h.register("Fair", 10).await.id;

    let mut expected = std::collections::BTreeMap::new();
    for round in 0..5i64 {
        for i in 0..6i64 {
            let name = format!("p{}", i);
            let size = (round + i) % 4 + 1;
            if expected.contains_key(&name) {
                h.queue.leave(&d, &req(&name)).await.unwrap();
                expected.remove(&name);
            } else {
                h.queue.join(&d, &req(&name), size).await.unwrap();
                expected.insert(name, size as u64);
            }

            let total: u64 = expected.values().sum();
            assert_eq!(h.resolver.total_waiting(&d).await.unwrap(), total);
        }
    }

    // Positions increase along the line
    let snapshot = h.queue.snapshot(&d).await.unwrap();
    let mut last = 0;
    for member in &snapshot {
        let position = h.resolver.position_of(&d, &member.requester).await.unwrap();
        assert!(position > last);
        last = position;
    }

    h.cleanup().await;
}

#[tokio::test]
async fn test_join_errors_leave_no_trace() {
    let h = Harness::memory().await;
    let d = h.register("Gallery", 4).await.id;
    h.queue.join(&d, &req("a"), 2).await.unwrap();

    let err = h
        .queue
        .join(&DestinationId::from_name("Nowhere"), &req("a"), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::UnknownDestination(_)));
    assert!(h
        .queue
        .snapshot(&DestinationId::from_name("Nowhere"))
        .await
        .unwrap()
        .is_empty());

    let err = h.queue.join(&d, &req("a"), 1).await.unwrap_err();
    assert!(matches!(err, AppError::AlreadyQueued { .. }));

    let err = h.queue.join(&d, &req("b"), 0).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Domain(DomainError::InvalidPartySize(0))
    ));

    assert_eq!(h.resolver.total_waiting(&d).await.unwrap(), 2);

    h.cleanup().await;
}

#[tokio::test]
async fn test_leave_twice_keeps_others_in_place() {
    let h = Harness::memory().await;
    let d = h.register("Gallery", 4).await.id;
    h.queue.join(&d, &req("a"), 1).await.unwrap();
    h.queue.join(&d, &req("b"), 2).await.unwrap();

    h.queue.leave(&d, &req("a")).await.unwrap();
    let err = h.queue.leave(&d, &req("a")).await.unwrap_err();
    assert!(matches!(err, AppError::NotQueued { .. }));

    assert_eq!(h.resolver.position_of(&d, &req("b")).await.unwrap(), 2);

    h.cleanup().await;
}

#[tokio::test]
async fn test_sequence_survives_restart() {
    let h = Harness::file().await;
    let path = h.db_file().unwrap();
    let d = h.register("Bakery", 3).await.id;

    h.queue.join(&d, &req("a"), 1).await.unwrap();
    h.queue.join(&d, &req("b"), 2).await.unwrap();
    h.queue.leave(&d, &req("b")).await.unwrap();
    h.pool.close().await;

    let h = Harness::reopen(path).await;
    let rejoined = h.queue.join(&d, &req("b"), 2).await.unwrap();
    assert_eq!(rejoined.sequence, 3);
    assert_eq!(h.resolver.position_of(&d, &req("a")).await.unwrap(), 1);
    assert_eq!(h.resolver.position_of(&d, &req("b")).await.unwrap(), 3);

    h.cleanup().await;
}

#[tokio::test]
async fn test_serve_admits_up_to_entry_rate() {
    let h = Harness::memory().await;
    let d = h.register("Ride", 4).await.id;
    h.queue.join(&d, &req("a"), 1).await.unwrap();
    h.queue.join(&d, &req("b"), 3).await.unwrap();
    h.queue.join(&d, &req("c"), 2).await.unwrap();

    let outcome = h.queue.serve_next_batch(&d).await.unwrap();
    let admitted: Vec<_> = outcome
        .admitted
        .iter()
        .map(|m| m.requester.as_str().to_string())
        .collect();
    assert_eq!(admitted, vec!["a", "b"]);
    assert_eq!(outcome.people_admitted, 4);
    assert_eq!(outcome.day_count, 4);

    assert_eq!(h.resolver.position_of(&d, &req("c")).await.unwrap(), 2);
    assert_eq!(h.registry.get("ride").await.unwrap().day_count, 4);

    // An oversized head party is still admitted on its own
    h.queue.join(&d, &req("big"), 9).await.unwrap();
    let outcome = h.queue.serve_next_batch(&d).await.unwrap();
    assert_eq!(outcome.people_admitted, 2);
    let outcome = h.queue.serve_next_batch(&d).await.unwrap();
    assert_eq!(outcome.people_admitted, 9);
    assert_eq!(outcome.day_count, 15);

    h.cleanup().await;
}

#[tokio::test]
async fn test_registry_find_and_duplicates() {
    let h = Harness::memory().await;
    h.register("cafe", 2).await;
    h.register("Cat Cafe", 2).await;

    let err = h
        .registry
        .register(common::registration("Cafe", 5))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DuplicateName(_)));

    assert_eq!(h.registry.find("caf").await.unwrap().len(), 2);
    assert_eq!(h.registry.find("CAT").await.unwrap().len(), 1);
    assert!(h.registry.find("zzz").await.unwrap().is_empty());
    assert_eq!(h.registry.find("").await.unwrap().len(), 2);

    h.cleanup().await;
}

#[tokio::test]
async fn test_feedback_after_leaving() {
    let h = Harness::memory().await;
    let d = h.register("Zoo", 4).await.id;
    h.queue.join(&d, &req("a"), 2).await.unwrap();
    h.queue.leave(&d, &req("a")).await.unwrap();

    h.feedback.submit(&d, &req("a"), 4, "Short wait").await.unwrap();
    h.clock.advance(1_000);
    h.feedback.submit(&d, &req("b"), 2, "").await.unwrap();

    let list = h.feedback.list(&d, 10).await.unwrap();
    assert_eq!(list.len(), 2);
    // Newest first
    assert_eq!(list[0].requester, req("b"));
    assert_eq!(list[1].comment, "Short wait");

    let err = h
        .feedback
        .submit(&DestinationId::from_name("Nowhere"), &req("a"), 5, "")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::UnknownDestination(_)));

    h.cleanup().await;
}
