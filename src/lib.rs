// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Banco de Raíces: classroom reward tracking
//!
//! This crate provides the backend API for the points ledger ("raíces"),
//! role-gated access, and the student leaderboard.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::{AccessGate, IdentityService, LeaderboardService, LedgerService, StorageService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub identity: IdentityService,
    pub storage: StorageService,
    pub access_gate: AccessGate,
    pub ledger: LedgerService,
    pub leaderboard: LeaderboardService,
}
