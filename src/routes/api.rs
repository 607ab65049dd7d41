// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.
//!
//! Every role-scoped view goes through the access gate; a denial that
//! terminates the session also expires the session cookie in the response.

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Profile, Role};
use crate::routes::auth::clear_session;
use crate::services::AccessDenied;
use crate::AppState;

const DEFAULT_RANKING_LIMIT: u32 = 10;
const MAX_RANKING_LIMIT: u32 = 100;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/ranking", get(get_ranking))
        .route("/api/students", get(list_students))
        .route("/api/students/{id}/grant", post(grant_raices))
        .route("/api/students/{id}/revoke", post(revoke_raices))
        .route("/api/students/{id}/prizes", post(add_prize))
        .route("/api/students/{id}/redeem", post(redeem_prize))
        .route("/api/password", post(change_password))
}

/// Turn an access denial into a response, expiring the session cookie when
/// the denial terminates the session.
fn deny(jar: CookieJar, config: &Config, denied: AccessDenied) -> Response {
    let terminate = denied.terminates_session();
    let error = AppError::from(denied);
    if terminate {
        (clear_session(jar, config), error).into_response()
    } else {
        error.into_response()
    }
}

// ─── Own Profile ─────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PrizeItem {
    pub kind: String,
    pub cost: u32,
    pub added_at: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RedemptionItem {
    pub label: String,
    pub cost: u32,
    pub redeemed_at: String,
}

/// Current user response.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MeResponse {
    pub id: String,
    pub name: String,
    pub course: String,
    pub role: String,
    pub balance: u32,
    pub email_verified: bool,
    pub photo_url: Option<String>,
    pub prizes: Vec<PrizeItem>,
    pub redemptions: Vec<RedemptionItem>,
}

impl From<Profile> for MeResponse {
    fn from(profile: Profile) -> Self {
        Self {
            id: profile.id,
            name: profile.name,
            course: profile.course,
            role: profile.role.to_string(),
            balance: profile.balance,
            email_verified: profile.email_verified,
            photo_url: profile.photo_url,
            prizes: profile
                .available_prizes
                .into_iter()
                .map(|p| PrizeItem {
                    kind: p.kind,
                    cost: p.cost,
                    added_at: p.added_at,
                })
                .collect(),
            redemptions: profile
                .redemption_history
                .into_iter()
                .map(|r| RedemptionItem {
                    label: r.label,
                    cost: r.cost,
                    redeemed_at: r.redeemed_at,
                })
                .collect(),
        }
    }
}

/// Get the current user's profile.
async fn get_me(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Extension(user): Extension<AuthUser>,
) -> Result<Response> {
    let profile = match state.access_gate.authorize_any(Some(&user.uid)).await {
        Ok(profile) => profile,
        Err(denied) => return Ok(deny(jar, &state.config, denied)),
    };

    Ok(Json(MeResponse::from(profile)).into_response())
}

// ─── Leaderboard ─────────────────────────────────────────────

#[derive(Deserialize)]
struct RankingQuery {
    /// Number of entries to return (top 10 by default)
    limit: Option<u32>,
}

/// Top students by balance (student dashboard view).
async fn get_ranking(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<RankingQuery>,
) -> Result<Response> {
    if let Err(denied) = state
        .access_gate
        .authorize(Some(&user.uid), Role::Student)
        .await
    {
        return Ok(deny(jar, &state.config, denied));
    }

    let limit = params
        .limit
        .unwrap_or(DEFAULT_RANKING_LIMIT)
        .min(MAX_RANKING_LIMIT);

    let entries = state.leaderboard.top_students(limit).await?;
    Ok(Json(entries).into_response())
}

// ─── Teacher Roster ──────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct StudentSummary {
    pub id: String,
    pub name: String,
    pub course: String,
    pub balance: u32,
}

/// All students sorted by course then name (teacher dashboard roster).
async fn list_students(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Extension(user): Extension<AuthUser>,
) -> Result<Response> {
    if let Err(denied) = state
        .access_gate
        .authorize(Some(&user.uid), Role::Teacher)
        .await
    {
        return Ok(deny(jar, &state.config, denied));
    }

    let mut students = state.db.list_students().await?;
    // Students without a course sort last within the roster.
    students.sort_by(|a, b| {
        (a.course.is_empty(), &a.course, &a.name).cmp(&(b.course.is_empty(), &b.course, &b.name))
    });

    let roster: Vec<StudentSummary> = students
        .into_iter()
        .map(|p| StudentSummary {
            id: p.id,
            name: p.name,
            course: p.course,
            balance: p.balance,
        })
        .collect();

    Ok(Json(roster).into_response())
}

// ─── Ledger Operations ───────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct AmountRequest {
    #[validate(range(min = 1, message = "Amount must be greater than zero"))]
    pub amount: u32,
}

#[derive(Deserialize, Validate)]
pub struct PrizeRequest {
    #[validate(length(min = 1, message = "Prize kind must not be empty"))]
    pub kind: String,
    #[validate(range(min = 1, message = "Prize cost must be greater than zero"))]
    pub cost: u32,
}

/// Updated balance after a ledger operation.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LedgerResponse {
    pub id: String,
    pub balance: u32,
}

impl From<Profile> for LedgerResponse {
    fn from(profile: Profile) -> Self {
        Self {
            id: profile.id,
            balance: profile.balance,
        }
    }
}

/// Grant raíces to a student.
async fn grant_raices(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Extension(user): Extension<AuthUser>,
    Path(student_id): Path<String>,
    Json(payload): Json<AmountRequest>,
) -> Result<Response> {
    if let Err(denied) = state
        .access_gate
        .authorize(Some(&user.uid), Role::Teacher)
        .await
    {
        return Ok(deny(jar, &state.config, denied));
    }
    payload
        .validate()
        .map_err(|e| AppError::InvalidArgument(e.to_string()))?;

    let profile = state.ledger.grant(&student_id, payload.amount).await?;
    Ok(Json(LedgerResponse::from(profile)).into_response())
}

/// Remove raíces from a student (recorded in the redemption history).
async fn revoke_raices(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Extension(user): Extension<AuthUser>,
    Path(student_id): Path<String>,
    Json(payload): Json<AmountRequest>,
) -> Result<Response> {
    if let Err(denied) = state
        .access_gate
        .authorize(Some(&user.uid), Role::Teacher)
        .await
    {
        return Ok(deny(jar, &state.config, denied));
    }
    payload
        .validate()
        .map_err(|e| AppError::InvalidArgument(e.to_string()))?;

    let profile = state.ledger.revoke(&student_id, payload.amount).await?;
    Ok(Json(LedgerResponse::from(profile)).into_response())
}

/// Add a prize to a student's catalog.
async fn add_prize(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Extension(user): Extension<AuthUser>,
    Path(student_id): Path<String>,
    Json(payload): Json<PrizeRequest>,
) -> Result<Response> {
    if let Err(denied) = state
        .access_gate
        .authorize(Some(&user.uid), Role::Teacher)
        .await
    {
        return Ok(deny(jar, &state.config, denied));
    }
    payload
        .validate()
        .map_err(|e| AppError::InvalidArgument(e.to_string()))?;

    let profile = state
        .ledger
        .add_prize(&student_id, &payload.kind, payload.cost)
        .await?;
    Ok(Json(LedgerResponse::from(profile)).into_response())
}

/// Redeem a prize against a student's balance.
async fn redeem_prize(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Extension(user): Extension<AuthUser>,
    Path(student_id): Path<String>,
    Json(payload): Json<PrizeRequest>,
) -> Result<Response> {
    if let Err(denied) = state
        .access_gate
        .authorize(Some(&user.uid), Role::Teacher)
        .await
    {
        return Ok(deny(jar, &state.config, denied));
    }
    payload
        .validate()
        .map_err(|e| AppError::InvalidArgument(e.to_string()))?;

    let profile = state
        .ledger
        .redeem(&student_id, &payload.kind, payload.cost)
        .await?;
    Ok(Json(LedgerResponse::from(profile)).into_response())
}

// ─── Password Change ─────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1))]
    pub current_password: String,
    #[validate(length(min = 6, message = "The new password must be at least 6 characters"))]
    pub new_password: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ChangePasswordResponse {
    pub success: bool,
    pub message: String,
}

/// Change the account password.
///
/// Requires re-authentication with the current password; a wrong current
/// password surfaces as an auth error, not a generic failure.
async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<ChangePasswordResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::InvalidArgument(e.to_string()))?;

    let principal = state.identity.lookup(&user.uid).await?;

    let fresh = state
        .identity
        .reauthenticate(&principal.email, &payload.current_password)
        .await?;

    state
        .identity
        .change_password(&fresh.id_token, &payload.new_password)
        .await?;

    tracing::info!(uid = %user.uid, "Password changed");

    Ok(Json(ChangePasswordResponse {
        success: true,
        message: "Password updated successfully".to_string(),
    }))
}
