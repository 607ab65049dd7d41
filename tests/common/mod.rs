// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use banco_raices::config::Config;
use banco_raices::db::FirestoreDb;
use banco_raices::routes::create_router;
use banco_raices::services::{
    AccessGate, IdentityService, LeaderboardService, LedgerService, StorageService,
};
use banco_raices::AppState;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Create a test app with offline mock dependencies.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with_config(Config::test_default())
}

/// Create a test app with a specific frontend URL (cookie attribute tests).
#[allow(dead_code)]
pub fn create_test_app_with_frontend_url(frontend_url: &str) -> (axum::Router, Arc<AppState>) {
    let mut config = Config::test_default();
    config.frontend_url = frontend_url.to_string();
    create_test_app_with_config(config)
}

#[allow(dead_code)]
fn create_test_app_with_config(config: Config) -> (axum::Router, Arc<AppState>) {
    let db = test_db_offline();
    let identity = IdentityService::new_mock();
    let storage = StorageService::new_mock();

    let access_gate = AccessGate::new(identity.clone(), db.clone());
    let ledger = LedgerService::new(db.clone());
    let leaderboard = LeaderboardService::new(db.clone());

    let state = Arc::new(AppState {
        config,
        db,
        identity,
        storage,
        access_gate,
        ledger,
        leaderboard,
    });

    (create_router(state.clone()), state)
}
