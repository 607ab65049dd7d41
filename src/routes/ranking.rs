// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Public ranking route (no authentication).

use axum::{extract::State, routing::get, Json, Router};
use std::sync::Arc;

use crate::error::Result;
use crate::models::RankingEntry;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/ranking", get(public_ranking))
}

/// Full student ranking, highest balance first.
///
/// Served without a session so it can be projected in a classroom. Uses the
/// in-memory sort path, which needs no composite index.
async fn public_ranking(State(state): State<Arc<AppState>>) -> Result<Json<Vec<RankingEntry>>> {
    let entries = state.leaderboard.all_students_ranked().await?;
    Ok(Json(entries))
}
