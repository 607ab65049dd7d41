// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bounded-retry behavior for the profile creation write.

use std::time::Duration;

use banco_raices::config::RetryPolicy;
use banco_raices::error::AppError;
use banco_raices::models::{Profile, Role};

mod common;

fn test_profile() -> Profile {
    Profile::new(
        "uid-retry".to_string(),
        "Ana".to_string(),
        "1A".to_string(),
        Role::Student,
        None,
        "2024-01-01T00:00:00Z",
    )
}

#[tokio::test]
async fn test_profile_creation_retries_then_fails() {
    // The offline database fails every write; the bounded retry must give
    // up after max_attempts instead of looping forever.
    let db = common::test_db_offline();
    let policy = RetryPolicy {
        max_attempts: 3,
        backoff: Duration::from_millis(10),
    };

    let err = db
        .create_profile_with_retry(&test_profile(), policy)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Database(_)));
}

#[tokio::test]
async fn test_profile_creation_succeeds_first_try_on_emulator() {
    require_emulator!();

    let db = common::test_db().await;
    let policy = RetryPolicy::default();

    db.create_profile_with_retry(&test_profile(), policy)
        .await
        .expect("Profile creation should succeed");

    let stored = db.get_profile("uid-retry").await.unwrap().unwrap();
    assert_eq!(stored.name, "Ana");
    assert_eq!(stored.balance, 0);
    assert!(stored.available_prizes.is_empty());
    assert!(stored.redemption_history.is_empty());
    assert!(!stored.email_verified);
}
