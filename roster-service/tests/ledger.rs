mod support;

use std::time::Duration;

use diesel_async::{AsyncConnection, AsyncPgConnection};
use futures::future::join_all;
use roster_service::guards::lock_user;
use roster_service::ledger::apply_ownership_delta;
use roster_service::{HardwareLedger, ServiceError};
use rstest::rstest;
use shared::{DomainError, Entity};
use tokio::time::timeout;

use support::{
    create_hardware, create_user, hardware_state, is_balanced, owned_by, test_db, unique, TestDb,
};

fn domain(result: Result<bool, ServiceError>) -> DomainError {
    match result {
        Err(ServiceError::Domain(e)) => e,
        other => panic!("expected a domain error, got {other:?}"),
    }
}

#[rstest]
#[tokio::test]
async fn checkout_then_checkin_follows_the_ledger(#[future] test_db: TestDb) {
    let db = test_db.await;
    let pool = db.pool.clone();
    let ledger = HardwareLedger::new(pool.clone());
    let item = create_hardware(&pool, 5).await;
    let alice = create_user(&pool, &unique("alice")).await;
    let bob = create_user(&pool, &unique("bob")).await;

    assert!(ledger.check_out(item, alice, 3).await.unwrap());
    let state = hardware_state(&pool, item).await;
    assert_eq!(state.available_quantity, 2);
    assert_eq!(owned_by(&state, alice), Some(3));

    let err = domain(ledger.check_out(item, bob, 3).await);
    assert_eq!(
        err,
        DomainError::InsufficientStock {
            hardware_id: item,
            requested: 3,
            available: 2,
        }
    );
    let state = hardware_state(&pool, item).await;
    assert_eq!(state.available_quantity, 2);
    assert_eq!(owned_by(&state, bob), None);

    assert!(ledger.check_in(item, alice, 1).await.unwrap());
    let state = hardware_state(&pool, item).await;
    assert_eq!(state.available_quantity, 3);
    assert_eq!(owned_by(&state, alice), Some(2));
    assert!(is_balanced(&state));
}

#[rstest]
#[tokio::test]
async fn round_trip_restores_previous_counts(#[future] test_db: TestDb) {
    let db = test_db.await;
    let pool = db.pool.clone();
    let ledger = HardwareLedger::new(pool.clone());
    let item = create_hardware(&pool, 4).await;
    let user = create_user(&pool, &unique("carol")).await;

    ledger.check_out(item, user, 1).await.unwrap();
    let before = hardware_state(&pool, item).await;

    ledger.check_out(item, user, 2).await.unwrap();
    ledger.check_in(item, user, 2).await.unwrap();

    let after = hardware_state(&pool, item).await;
    assert_eq!(after.available_quantity, before.available_quantity);
    assert_eq!(owned_by(&after, user), owned_by(&before, user));
}

#[rstest]
#[tokio::test]
async fn returning_everything_keeps_a_zero_row(#[future] test_db: TestDb) {
    let db = test_db.await;
    let pool = db.pool.clone();
    let ledger = HardwareLedger::new(pool.clone());
    let item = create_hardware(&pool, 2).await;
    let user = create_user(&pool, &unique("dan")).await;

    ledger.check_out(item, user, 2).await.unwrap();
    ledger.check_in(item, user, 2).await.unwrap();

    let state = hardware_state(&pool, item).await;
    assert_eq!(state.available_quantity, 2);
    assert_eq!(owned_by(&state, user), Some(0));
}

#[rstest]
#[tokio::test]
async fn over_checkin_is_rejected_without_side_effects(#[future] test_db: TestDb) {
    let db = test_db.await;
    let pool = db.pool.clone();
    let ledger = HardwareLedger::new(pool.clone());
    let item = create_hardware(&pool, 5).await;
    let user = create_user(&pool, &unique("erin")).await;

    ledger.check_out(item, user, 2).await.unwrap();

    let err = domain(ledger.check_in(item, user, 3).await);
    assert_eq!(
        err,
        DomainError::InsufficientOwnership {
            hardware_id: item,
            user_id: user,
            requested: 3,
            owned: 2,
        }
    );

    let state = hardware_state(&pool, item).await;
    assert_eq!(state.available_quantity, 3);
    assert_eq!(owned_by(&state, user), Some(2));
}

#[rstest]
#[tokio::test]
async fn checkin_without_ownership_is_not_found(#[future] test_db: TestDb) {
    let db = test_db.await;
    let pool = db.pool.clone();
    let ledger = HardwareLedger::new(pool.clone());
    let item = create_hardware(&pool, 1).await;
    let user = create_user(&pool, &unique("fay")).await;

    let err = domain(ledger.check_in(item, user, 1).await);
    assert!(matches!(
        err,
        DomainError::NotFound {
            entity: Entity::Ownership,
            ..
        }
    ));
}

#[rstest]
#[tokio::test]
async fn unknown_references_are_not_found(#[future] test_db: TestDb) {
    let db = test_db.await;
    let pool = db.pool.clone();
    let ledger = HardwareLedger::new(pool.clone());
    let item = create_hardware(&pool, 1).await;
    let user = create_user(&pool, &unique("gus")).await;

    let err = domain(ledger.check_out(i32::MAX, user, 1).await);
    assert!(matches!(err, DomainError::NotFound { entity: Entity::Hardware, .. }));

    let err = domain(ledger.check_out(item, i32::MAX, 1).await);
    assert!(matches!(err, DomainError::NotFound { entity: Entity::User, .. }));

    let state = hardware_state(&pool, item).await;
    assert_eq!(state.available_quantity, 1);
    assert!(state.owners.is_empty());
}

#[rstest]
#[tokio::test]
async fn concurrent_checkouts_never_oversell(#[future] test_db: TestDb) {
    let db = test_db.await;
    let pool = db.pool.clone();
    let ledger = HardwareLedger::new(pool.clone());
    let item = create_hardware(&pool, 5).await;
    let mut people = Vec::new();
    for _ in 0..3 {
        people.push(create_user(&pool, &unique("rush")).await);
    }

    let attempts = (0..12).map(|i| {
        let ledger = ledger.clone();
        let user = people[i % people.len()];
        async move { ledger.check_out(item, user, 1).await }
    });
    let results = join_all(attempts).await;

    let granted = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(granted, 5);
    assert!(results.iter().filter_map(|r| r.as_ref().err()).all(|e| matches!(
        e.domain(),
        Some(DomainError::InsufficientStock { .. })
    )));

    let state = hardware_state(&pool, item).await;
    assert_eq!(state.available_quantity, 0);
    assert!(is_balanced(&state));
}

#[rstest]
#[tokio::test]
async fn interleaved_traffic_conserves_stock(#[future] test_db: TestDb) {
    let db = test_db.await;
    let pool = db.pool.clone();
    let ledger = HardwareLedger::new(pool.clone());
    let item = create_hardware(&pool, 6).await;
    let user = create_user(&pool, &unique("mix")).await;
    ledger.check_out(item, user, 3).await.unwrap();

    let moves = (0..10).map(|i| {
        let ledger = ledger.clone();
        async move {
            if i % 2 == 0 {
                ledger.check_in(item, user, 1).await
            } else {
                ledger.check_out(item, user, 1).await
            }
        }
    });
    join_all(moves).await;

    let state = hardware_state(&pool, item).await;
    assert!(state.available_quantity >= 0);
    assert!(owned_by(&state, user).unwrap_or(0) >= 0);
    assert!(is_balanced(&state));
}

#[rstest]
#[tokio::test]
async fn negative_delta_cannot_create_or_overdraw_a_row(#[future] test_db: TestDb) {
    let db = test_db.await;
    let pool = db.pool.clone();
    let item = create_hardware(&pool, 3).await;
    let user = create_user(&pool, &unique("delta")).await;
    let mut conn = pool.get().await.unwrap();

    let err = apply_ownership_delta(&mut conn, item, user, -1).await.unwrap_err();
    assert!(matches!(
        err.domain(),
        Some(DomainError::NotFound { entity: Entity::Ownership, .. })
    ));

    assert_eq!(apply_ownership_delta(&mut conn, item, user, 2).await.unwrap(), 2);
    assert_eq!(apply_ownership_delta(&mut conn, item, user, 1).await.unwrap(), 3);

    let err = apply_ownership_delta(&mut conn, item, user, -4).await.unwrap_err();
    assert!(matches!(
        err.domain(),
        Some(DomainError::InsufficientOwnership { owned: 3, requested: 4, .. })
    ));
    assert_eq!(apply_ownership_delta(&mut conn, item, user, -3).await.unwrap(), 0);
}

#[rstest]
#[tokio::test]
async fn profile_lock_leaves_checkout_by_the_same_user_free(#[future] test_db: TestDb) {
    let db = test_db.await;
    let pool = db.pool.clone();
    let ledger = HardwareLedger::new(pool.clone());
    let item = create_hardware(&pool, 2).await;
    let user = create_user(&pool, &unique("busy")).await;

    let mut pooled = pool.get().await.unwrap();
    let conn: &mut AsyncPgConnection = &mut pooled;
    let checkout = conn
        .transaction::<_, ServiceError, _>(|conn| {
            Box::pin(async move {
                lock_user(conn, user).await?;
                Ok(timeout(Duration::from_secs(5), ledger.check_out(item, user, 1)).await)
            })
        })
        .await
        .unwrap();

    let granted = checkout.expect("checkout waited on the user row lock");
    assert!(granted.unwrap());

    let state = hardware_state(&pool, item).await;
    assert_eq!(owned_by(&state, user), Some(1));
    assert!(is_balanced(&state));
}
