// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Banco de Raíces API Server
//!
//! Tracks classroom reward points: teachers grant and revoke raíces,
//! students redeem them for prizes and follow the leaderboard.

use banco_raices::{
    config::Config,
    db::FirestoreDb,
    services::{AccessGate, IdentityService, LeaderboardService, LedgerService, StorageService},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Banco de Raíces API");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");

    // Identity provider and blob store clients
    let identity = IdentityService::new(&config.identity_api_url, &config.identity_api_key);
    let storage = StorageService::new(&config.storage_api_url, &config.storage_bucket);
    tracing::info!(bucket = %config.storage_bucket, "Provider clients initialized");

    // Domain services
    let access_gate = AccessGate::new(identity.clone(), db.clone());
    let ledger = LedgerService::new(db.clone());
    let leaderboard = LeaderboardService::new(db.clone());

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        identity,
        storage,
        access_gate,
        ledger,
        leaderboard,
    });

    // Build router
    let app = banco_raices::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("banco_raices=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
