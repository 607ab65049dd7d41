// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod access;
pub mod identity;
pub mod leaderboard;
pub mod ledger;
pub mod storage;

pub use access::{AccessDenied, AccessGate};
pub use identity::{AuthSession, IdentityService};
pub use leaderboard::LeaderboardService;
pub use ledger::LedgerService;
pub use storage::StorageService;
