//! Queue store behaviour against the in-memory store

use super::*;
use crate::application::position::PositionResolver;
use crate::domain::{ContactInfo, Destination, DomainError, Registration};
use crate::error::AppError;
use crate::port::in_memory::InMemoryStore;
use crate::port::time_provider::mocks::ManualTimeProvider;
use crate::port::DestinationRepository;
use std::collections::HashSet;

struct Fixture {
    store: InMemoryStore,
    queue: Arc<QueueService>,
    resolver: PositionResolver,
    cafe: DestinationId,
}

async fn register(store: &InMemoryStore, name: &str, entry_rate: u32) -> DestinationId {
    let destination = Destination::register(
        Registration {
            name: name.to_string(),
            contact: ContactInfo {
                website: "https://example.com".to_string(),
                phone: "0123456789".to_string(),
            },
            entry_rate,
        },
        0,
    )
    .unwrap();
    DestinationRepository::insert(store, &destination)
        .await
        .unwrap();
    destination.id
}

async fn fixture() -> Fixture {
    let store = InMemoryStore::new();
    let cafe = register(&store, "Cafe", 5).await;
    let queue = Arc::new(QueueService::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(ManualTimeProvider::new(1_000)),
        RetryPolicy::new(1, 1.0, 3),
        Duration::from_secs(1),
    ));
    let resolver = PositionResolver::new(queue.clone(), 30);
    Fixture {
        store,
        queue,
        resolver,
        cafe,
    }
}

fn req(name: &str) -> RequesterId {
    RequesterId::new(name)
}

#[tokio::test]
async fn test_positions_are_people_based() {
    let f = fixture().await;
    f.queue.join(&f.cafe, &req("a"), 1).await.unwrap();
    f.queue.join(&f.cafe, &req("b"), 3).await.unwrap();
    f.queue.join(&f.cafe, &req("c"), 2).await.unwrap();

    assert_eq!(f.resolver.position_of(&f.cafe, &req("a")).await.unwrap(), 1);
    assert_eq!(f.resolver.position_of(&f.cafe, &req("b")).await.unwrap(), 4);
    assert_eq!(f.resolver.position_of(&f.cafe, &req("c")).await.unwrap(), 6);
    assert_eq!(f.resolver.total_waiting(&f.cafe).await.unwrap(), 6);

    f.queue.leave(&f.cafe, &req("a")).await.unwrap();

    assert_eq!(f.resolver.position_of(&f.cafe, &req("b")).await.unwrap(), 3);
    assert_eq!(f.resolver.position_of(&f.cafe, &req("c")).await.unwrap(), 5);
    assert_eq!(f.resolver.total_waiting(&f.cafe).await.unwrap(), 5);
}

#[tokio::test]
async fn test_join_assigns_increasing_sequences() {
    let f = fixture().await;
    let a = f.queue.join(&f.cafe, &req("a"), 1).await.unwrap();
    let b = f.queue.join(&f.cafe, &req("b"), 1).await.unwrap();

    assert_eq!(a.sequence, 1);
    assert_eq!(b.sequence, 2);
    assert_eq!(a.joined_at, 1_000);

    let snapshot = f.queue.snapshot(&f.cafe).await.unwrap();
    assert_eq!(snapshot, vec![a, b]);
}

#[tokio::test]
async fn test_sequence_numbers_are_never_reused() {
    let f = fixture().await;
    f.queue.join(&f.cafe, &req("a"), 1).await.unwrap();
    f.queue.join(&f.cafe, &req("b"), 1).await.unwrap();
    f.queue.leave(&f.cafe, &req("b")).await.unwrap();

    let again = f.queue.join(&f.cafe, &req("b"), 1).await.unwrap();
    assert_eq!(again.sequence, 3);

    // Rejoining goes to the back
    let snapshot = f.queue.snapshot(&f.cafe).await.unwrap();
    assert_eq!(snapshot.last().unwrap().requester, req("b"));
}

#[tokio::test]
async fn test_join_twice_is_rejected() {
    let f = fixture().await;
    f.queue.join(&f.cafe, &req("a"), 2).await.unwrap();

    let err = f.queue.join(&f.cafe, &req("a"), 4).await.unwrap_err();
    assert!(matches!(err, AppError::AlreadyQueued { .. }));

    // The existing membership is untouched
    let snapshot = f.queue.snapshot(&f.cafe).await.unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].party_size.get(), 2);
}

#[tokio::test]
async fn test_same_requester_may_queue_at_several_destinations() {
    let f = fixture().await;
    let bakery = register(&f.store, "Bakery", 2).await;

    f.queue.join(&f.cafe, &req("a"), 1).await.unwrap();
    f.queue.join(&bakery, &req("a"), 1).await.unwrap();

    let active: HashSet<_> = f
        .queue
        .active_destinations()
        .await
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(active, HashSet::from([f.cafe.clone(), bakery]));
}

#[tokio::test]
async fn test_join_unknown_destination() {
    let f = fixture().await;
    let err = f
        .queue
        .join(&DestinationId::from_name("nowhere"), &req("a"), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::UnknownDestination(name) if name == "nowhere"));
}

#[tokio::test]
async fn test_invalid_party_size_is_rejected_before_store() {
    let f = fixture().await;
    // A store failure would surface if the store were touched
    f.store.fail_next_writes(1);

    for size in [0, -3] {
        let err = f.queue.join(&f.cafe, &req("a"), size).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Domain(DomainError::InvalidPartySize(s)) if s == size
        ));
    }

    // The injected failure was never consumed
    let err = f.queue.join(&f.cafe, &req("a"), 1).await.unwrap_err();
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_leave_twice_reports_not_queued() {
    let f = fixture().await;
    f.queue.join(&f.cafe, &req("a"), 1).await.unwrap();
    f.queue.leave(&f.cafe, &req("a")).await.unwrap();

    let err = f.queue.leave(&f.cafe, &req("a")).await.unwrap_err();
    assert!(matches!(err, AppError::NotQueued { .. }));

    let err = f
        .resolver
        .position_of(&f.cafe, &req("a"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotQueued { .. }));
}

#[tokio::test]
async fn test_transient_write_failure_is_surfaced_not_retried() {
    let f = fixture().await;
    f.store.fail_next_writes(1);

    let err = f.queue.join(&f.cafe, &req("a"), 1).await.unwrap_err();
    assert!(err.is_transient());
    assert!(f.queue.snapshot(&f.cafe).await.unwrap().is_empty());

    // A manual retry succeeds
    f.queue.join(&f.cafe, &req("a"), 1).await.unwrap();
}

#[tokio::test]
async fn test_snapshot_retries_transient_reads() {
    let f = fixture().await;
    f.queue.join(&f.cafe, &req("a"), 2).await.unwrap();

    f.store.fail_next_reads(2);
    assert_eq!(f.resolver.total_waiting(&f.cafe).await.unwrap(), 2);

    // Retry budget is 3 attempts
    f.store.fail_next_reads(3);
    assert!(f.queue.snapshot(&f.cafe).await.unwrap_err().is_transient());
}

#[tokio::test]
async fn test_concurrent_joins_get_distinct_sequences() {
    let f = fixture().await;

    let handles: Vec<_> = (0..50)
        .map(|i| {
            let queue = f.queue.clone();
            let cafe = f.cafe.clone();
            tokio::spawn(async move { queue.join(&cafe, &req(&format!("r{i}")), 1).await })
        })
        .collect();

    let mut sequences = HashSet::new();
    for handle in handles {
        let membership = handle.await.unwrap().unwrap();
        assert!(sequences.insert(membership.sequence));
    }

    assert_eq!(sequences.len(), 50);
    assert_eq!(f.resolver.total_waiting(&f.cafe).await.unwrap(), 50);
}

#[tokio::test]
async fn test_concurrent_duplicate_joins_admit_exactly_one() {
    let f = fixture().await;

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let queue = f.queue.clone();
            let cafe = f.cafe.clone();
            tokio::spawn(async move { queue.join(&cafe, &req("same"), 1).await })
        })
        .collect();

    let mut ok = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => ok += 1,
            Err(AppError::AlreadyQueued { .. }) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(ok, 1);
}

#[tokio::test]
async fn test_serve_next_batch_admits_head_and_counts_people() {
    let f = fixture().await;
    f.queue.join(&f.cafe, &req("a"), 2).await.unwrap();
    f.queue.join(&f.cafe, &req("b"), 3).await.unwrap();
    f.queue.join(&f.cafe, &req("c"), 2).await.unwrap();

    let outcome = f.queue.serve_next_batch(&f.cafe).await.unwrap();
    let admitted: Vec<_> = outcome.admitted.iter().map(|m| m.requester.clone()).collect();
    assert_eq!(admitted, vec![req("a"), req("b")]);
    assert_eq!(outcome.people_admitted, 5);
    assert_eq!(outcome.day_count, 5);

    assert_eq!(f.resolver.position_of(&f.cafe, &req("c")).await.unwrap(), 2);

    let outcome = f.queue.serve_next_batch(&f.cafe).await.unwrap();
    assert_eq!(outcome.day_count, 7);

    let outcome = f.queue.serve_next_batch(&f.cafe).await.unwrap();
    assert!(outcome.admitted.is_empty());
    assert_eq!(outcome.day_count, 7);
}

#[tokio::test]
async fn test_serve_unknown_destination() {
    let f = fixture().await;
    let err = f
        .queue
        .serve_next_batch(&DestinationId::from_name("nowhere"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::UnknownDestination(_)));
}

#[tokio::test]
async fn test_destination_locks_are_released_after_use() {
    let f = fixture().await;

    for i in 0..100 {
        let nowhere = DestinationId::from_name(&format!("nowhere-{i}"));
        assert!(f.queue.join(&nowhere, &req("a"), 1).await.is_err());
        assert!(f.queue.leave(&nowhere, &req("a")).await.is_err());
        assert!(f.queue.serve_next_batch(&nowhere).await.is_err());
    }
    assert_eq!(f.queue.locks.tracked(), 0);

    f.queue.join(&f.cafe, &req("a"), 2).await.unwrap();
    f.queue.leave(&f.cafe, &req("a")).await.unwrap();
    assert_eq!(f.queue.locks.tracked(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_contended_destination_lock_is_released_once_idle() {
    let f = fixture().await;

    let joins: Vec<_> = (0..20)
        .map(|i| {
            let queue = Arc::clone(&f.queue);
            let cafe = f.cafe.clone();
            tokio::spawn(async move { queue.join(&cafe, &req(&format!("r{i}")), 1).await })
        })
        .collect();
    for join in joins {
        join.await.unwrap().unwrap();
    }

    assert_eq!(f.queue.locks.tracked(), 0);
    assert_eq!(f.resolver.total_waiting(&f.cafe).await.unwrap(), 20);
}

#[tokio::test]
async fn test_committed_changes_are_published() {
    let f = fixture().await;
    let mut events = f.queue.subscribe();

    f.queue.join(&f.cafe, &req("a"), 1).await.unwrap();
    f.queue.leave(&f.cafe, &req("a")).await.unwrap();
    // Rejected mutations publish nothing
    let _ = f.queue.leave(&f.cafe, &req("a")).await;
    f.queue.join(&f.cafe, &req("b"), 1).await.unwrap();
    f.queue.serve_next_batch(&f.cafe).await.unwrap();

    assert_eq!(
        events.recv().await.unwrap(),
        QueueEvent::Joined {
            destination: f.cafe.clone(),
            requester: req("a"),
            sequence: 1,
        }
    );
    assert_eq!(
        events.recv().await.unwrap(),
        QueueEvent::Left {
            destination: f.cafe.clone(),
            requester: req("a"),
        }
    );
    assert!(matches!(
        events.recv().await.unwrap(),
        QueueEvent::Joined { sequence: 2, .. }
    ));
    assert_eq!(
        events.recv().await.unwrap(),
        QueueEvent::Served {
            destination: f.cafe.clone(),
            admitted: vec![req("b")],
        }
    );
    assert!(events.try_recv().is_err());
}
