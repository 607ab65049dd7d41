// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Registration and session routes.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, SESSION_COOKIE, SESSION_TTL_SECS};
use crate::models::{Profile, Role};
use crate::services::AccessDenied;
use crate::time_utils::now_rfc3339;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/verification/resend", post(resend_verification))
}

// ─── Session Cookies ─────────────────────────────────────────

fn cookie_base(config: &Config) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, "");
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_secure(config.frontend_url.starts_with("https://"));
    cookie
}

/// Session cookie carrying a fresh JWT.
pub(crate) fn session_cookie(config: &Config, token: String) -> Cookie<'static> {
    let mut cookie = cookie_base(config);
    cookie.set_value(token);
    cookie.set_max_age(time::Duration::seconds(SESSION_TTL_SECS as i64));
    cookie
}

/// Expired session cookie with matching attributes, used for sign-out and
/// for the access gate's forced session termination.
pub(crate) fn clear_session(jar: CookieJar, config: &Config) -> CookieJar {
    let mut cookie = cookie_base(config);
    cookie.set_max_age(time::Duration::ZERO);
    jar.add(cookie)
}

// ─── Registration ────────────────────────────────────────────

/// Profile photo payload, uploaded before the account is created.
#[derive(Debug, Deserialize)]
pub struct PhotoUpload {
    pub filename: String,
    pub content_type: String,
    /// Raw image bytes, base64-encoded
    pub data_base64: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub role: Role,
    #[serde(default)]
    pub course: String,
    pub photo: Option<PhotoUpload>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RegisterResponse {
    pub role: String,
    /// Teachers must verify their email before any teacher view unlocks.
    pub verification_sent: bool,
    pub photo_url: Option<String>,
}

/// Register a new account and create its profile.
///
/// Teacher accounts are created in an unverified-usable state: the identity
/// account exists and can authenticate, but the access gate blocks every
/// teacher view until the verification email is acted on. This avoids
/// blocking registration on the provider's asynchronous email delivery.
async fn register(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<RegisterRequest>,
) -> Result<Response> {
    payload
        .validate()
        .map_err(|e| AppError::InvalidArgument(e.to_string()))?;

    if payload.role == Role::Student && payload.course.trim().is_empty() {
        return Err(AppError::InvalidArgument(
            "Course is required for students".to_string(),
        ));
    }

    // Upload the photo first; registration continues without one if the
    // upload fails for any reason.
    let photo_url = match &payload.photo {
        Some(photo) => upload_photo(&state, photo).await,
        None => None,
    };

    let session = state
        .identity
        .register(&payload.email, &payload.password)
        .await?;
    let uid = session.principal.id.clone();

    tracing::info!(uid = %uid, role = %payload.role, "Identity account created");

    // Teachers get a verification email; a delivery failure is reported in
    // logs but does not fail the registration (the email can be resent).
    let mut verification_sent = false;
    if payload.role == Role::Teacher {
        match state.identity.send_verification_email(&session.id_token).await {
            Ok(()) => verification_sent = true,
            Err(e) => {
                tracing::warn!(uid = %uid, error = %e, "Failed to send verification email");
            }
        }
    }

    let profile = Profile::new(
        uid.clone(),
        payload.name.clone(),
        payload.course.clone(),
        payload.role,
        photo_url.clone(),
        &now_rfc3339(),
    );

    state
        .db
        .create_profile_with_retry(&profile, state.config.profile_write_retry)
        .await?;

    tracing::info!(uid = %uid, "Profile created");

    let body = RegisterResponse {
        role: payload.role.to_string(),
        verification_sent,
        photo_url,
    };

    // Students are signed in immediately; teachers have to verify first and
    // sign in afterwards, so no session is issued for them.
    if payload.role == Role::Student {
        let token = create_jwt(&uid, &state.config.jwt_signing_key)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;
        let jar = jar.add(session_cookie(&state.config, token));
        Ok((StatusCode::CREATED, jar, Json(body)).into_response())
    } else {
        Ok((StatusCode::CREATED, Json(body)).into_response())
    }
}

/// Decode and upload a registration photo, returning its URL.
///
/// Any failure (malformed payload, validation, provider error) leaves the
/// registration running without a photo, matching the blob store boundary:
/// the photo is optional.
async fn upload_photo(state: &Arc<AppState>, photo: &PhotoUpload) -> Option<String> {
    let bytes = match STANDARD.decode(&photo.data_base64) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "Photo payload is not valid base64, skipping upload");
            return None;
        }
    };

    let key = format!(
        "photos/{}_{}",
        chrono::Utc::now().timestamp_millis(),
        photo.filename
    );

    match state.storage.put(&key, bytes, &photo.content_type).await {
        Ok(url) => Some(url),
        Err(e) => {
            tracing::warn!(error = %e, "Photo upload failed, continuing without photo");
            None
        }
    }
}

// ─── Login / Logout ──────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LoginResponse {
    pub role: String,
    pub name: String,
}

/// Authenticate and open a session.
///
/// The access gate's login rules apply before any session is issued: a
/// principal without a profile is rejected, and an unverified teacher is
/// refused a session entirely.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<Response> {
    payload
        .validate()
        .map_err(|e| AppError::InvalidArgument(e.to_string()))?;

    let session = state
        .identity
        .authenticate(&payload.email, &payload.password)
        .await?;

    let profile = state
        .access_gate
        .evaluate_principal(&session.principal)
        .await
        .map_err(|denied| match denied {
            AccessDenied::TeacherUnverified => AppError::Forbidden(
                "Please verify your email address before signing in".to_string(),
            ),
            other => AppError::from(other),
        })?;

    let token = create_jwt(&profile.id, &state.config.jwt_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    tracing::info!(uid = %profile.id, role = %profile.role, "Session opened");

    let jar = jar.add(session_cookie(&state.config, token));
    let body = LoginResponse {
        role: profile.role.to_string(),
        name: profile.name,
    };

    Ok((jar, Json(body)).into_response())
}

/// Close the session by expiring the cookie.
async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    let jar = clear_session(jar, &state.config);
    (StatusCode::NO_CONTENT, jar).into_response()
}

// ─── Verification Email ──────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct ResendVerificationRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ResendVerificationResponse {
    pub sent: bool,
}

/// Resend the verification email.
///
/// Unverified teachers cannot hold a session, so this authenticates with
/// credentials instead of a session token.
async fn resend_verification(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ResendVerificationRequest>,
) -> Result<Json<ResendVerificationResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::InvalidArgument(e.to_string()))?;

    let session = state
        .identity
        .authenticate(&payload.email, &payload.password)
        .await?;

    if session.principal.email_verified {
        return Err(AppError::InvalidArgument(
            "This email address is already verified".to_string(),
        ));
    }

    state
        .identity
        .send_verification_email(&session.id_token)
        .await?;

    Ok(Json(ResendVerificationResponse { sent: true }))
}
