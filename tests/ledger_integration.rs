// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ledger integration tests.
//!
//! These tests require the Firestore emulator to be running
//! (FIRESTORE_EMULATOR_HOST set). The emulator provides a clean state for
//! each test run.

use banco_raices::models::profile::POINT_REMOVAL_LABEL;
use banco_raices::models::{Profile, Role};
use banco_raices::services::LedgerService;
use banco_raices::time_utils::now_rfc3339;

mod common;
use common::test_db;

/// Generate a unique profile ID for test isolation.
fn unique_id(prefix: &str) -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{prefix}-{nanos}")
}

fn test_student(id: &str) -> Profile {
    Profile::new(
        id.to_string(),
        "Test Student".to_string(),
        "1A".to_string(),
        Role::Student,
        None,
        &now_rfc3339(),
    )
}

#[tokio::test]
async fn test_grant_accumulates_without_history() {
    require_emulator!();

    let db = test_db().await;
    let ledger = LedgerService::new(db.clone());
    let id = unique_id("student");
    db.upsert_profile(&test_student(&id)).await.unwrap();

    ledger.grant(&id, 5).await.unwrap();
    let profile = ledger.grant(&id, 10).await.unwrap();

    assert_eq!(profile.balance, 15);
    assert!(profile.redemption_history.is_empty());

    // And the stored document agrees
    let stored = db.get_profile(&id).await.unwrap().unwrap();
    assert_eq!(stored.balance, 15);
}

#[tokio::test]
async fn test_revoke_appends_point_removal_entry() {
    require_emulator!();

    let db = test_db().await;
    let ledger = LedgerService::new(db.clone());
    let id = unique_id("student");
    db.upsert_profile(&test_student(&id)).await.unwrap();

    ledger.grant(&id, 10).await.unwrap();
    let profile = ledger.revoke(&id, 4).await.unwrap();

    assert_eq!(profile.balance, 6);
    assert_eq!(profile.redemption_history.len(), 1);
    assert_eq!(profile.redemption_history[0].label, POINT_REMOVAL_LABEL);
    assert_eq!(profile.redemption_history[0].cost, 4);
}

#[tokio::test]
async fn test_insufficient_balance_leaves_document_untouched() {
    require_emulator!();

    let db = test_db().await;
    let ledger = LedgerService::new(db.clone());
    let id = unique_id("student");
    db.upsert_profile(&test_student(&id)).await.unwrap();
    ledger.grant(&id, 5).await.unwrap();

    let err = ledger.revoke(&id, 10).await.unwrap_err();
    assert!(matches!(
        err,
        banco_raices::error::AppError::InsufficientBalance {
            available: 5,
            requested: 10
        }
    ));

    let stored = db.get_profile(&id).await.unwrap().unwrap();
    assert_eq!(stored.balance, 5);
    assert!(stored.redemption_history.is_empty());
}

#[tokio::test]
async fn test_redeem_pairs_debit_with_one_entry() {
    require_emulator!();

    let db = test_db().await;
    let ledger = LedgerService::new(db.clone());
    let id = unique_id("student");
    db.upsert_profile(&test_student(&id)).await.unwrap();
    ledger.grant(&id, 20).await.unwrap();

    let profile = ledger.redeem(&id, "Libro", 8).await.unwrap();

    assert_eq!(profile.balance, 12);
    assert_eq!(profile.redemption_history.len(), 1);
    assert_eq!(profile.redemption_history[0].label, "Libro");
    assert_eq!(profile.redemption_history[0].cost, 8);
}

#[tokio::test]
async fn test_add_prize_keeps_duplicates() {
    require_emulator!();

    let db = test_db().await;
    let ledger = LedgerService::new(db.clone());
    let id = unique_id("student");
    db.upsert_profile(&test_student(&id)).await.unwrap();

    ledger.add_prize(&id, "Libro", 5).await.unwrap();
    let profile = ledger.add_prize(&id, "Libro", 5).await.unwrap();

    assert_eq!(profile.available_prizes.len(), 2);
    assert_eq!(profile.balance, 0);
}

#[tokio::test]
async fn test_missing_student_is_not_found() {
    require_emulator!();

    let db = test_db().await;
    let ledger = LedgerService::new(db);

    let err = ledger.grant("does-not-exist", 5).await.unwrap_err();
    assert!(matches!(err, banco_raices::error::AppError::NotFound(_)));
}

#[tokio::test]
async fn test_teacher_profile_is_not_a_ledger_target() {
    require_emulator!();

    let db = test_db().await;
    let ledger = LedgerService::new(db.clone());
    let id = unique_id("teacher");
    let teacher = Profile::new(
        id.clone(),
        "Profe".to_string(),
        String::new(),
        Role::Teacher,
        None,
        &now_rfc3339(),
    );
    db.upsert_profile(&teacher).await.unwrap();

    let err = ledger.grant(&id, 5).await.unwrap_err();
    assert!(matches!(err, banco_raices::error::AppError::NotFound(_)));
}

const NUM_CONCURRENT_GRANTS: u32 = 10;
const GRANT_AMOUNT: u32 = 5;

#[tokio::test]
async fn test_concurrent_grants_do_not_lose_updates() {
    // Reproduces the lost-update failure mode of a naive read-modify-write:
    // two concurrent writers read the same balance, both add, one add is
    // lost. The transactional path must keep every grant.
    require_emulator!();

    let db = test_db().await;
    let id = unique_id("student");
    db.upsert_profile(&test_student(&id)).await.unwrap();

    let mut handles = vec![];
    for _ in 0..NUM_CONCURRENT_GRANTS {
        // Separate service instances so the per-instance lock does not
        // serialize the writers; only the transaction protects them.
        let ledger = LedgerService::new(db.clone());
        let id = id.clone();
        handles.push(tokio::spawn(async move {
            // Retry on write conflicts, as a caller is instructed to
            loop {
                match ledger.grant(&id, GRANT_AMOUNT).await {
                    Ok(profile) => return Ok(profile),
                    Err(banco_raices::error::AppError::InconsistentWrite) => continue,
                    Err(e) => return Err(e),
                }
            }
        }));
    }

    for handle in handles {
        handle.await.expect("Task join failed").expect("Grant failed");
    }

    let stored = db.get_profile(&id).await.unwrap().unwrap();
    assert_eq!(
        stored.balance,
        NUM_CONCURRENT_GRANTS * GRANT_AMOUNT,
        "Balance mismatch: a concurrent grant was lost"
    );
}

#[tokio::test]
async fn test_concurrent_redeems_never_overdraw() {
    require_emulator!();

    let db = test_db().await;
    let id = unique_id("student");
    db.upsert_profile(&test_student(&id)).await.unwrap();

    let setup = LedgerService::new(db.clone());
    setup.grant(&id, 30).await.unwrap();

    // 10 redemptions of 10 against a balance of 30: exactly 3 may succeed.
    let mut handles = vec![];
    for _ in 0..10 {
        let ledger = LedgerService::new(db.clone());
        let id = id.clone();
        handles.push(tokio::spawn(async move {
            loop {
                match ledger.redeem(&id, "Libro", 10).await {
                    Ok(_) => return true,
                    Err(banco_raices::error::AppError::InconsistentWrite) => continue,
                    Err(_) => return false,
                }
            }
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        if handle.await.expect("Task join failed") {
            succeeded += 1;
        }
    }

    assert_eq!(succeeded, 3);

    let stored = db.get_profile(&id).await.unwrap().unwrap();
    assert_eq!(stored.balance, 0);
    assert_eq!(stored.redemption_history.len(), 3);
}
