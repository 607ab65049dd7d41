// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Identity provider failures, translated from provider error codes at the
/// call site. Raw provider errors never reach the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthErrorKind {
    #[error("No account exists with this email address")]
    UserNotFound,

    #[error("Incorrect email or password")]
    WrongCredential,

    #[error("Invalid email address")]
    InvalidEmailFormat,

    #[error("Too many failed attempts, please try again later")]
    RateLimited,

    #[error("This email address is already registered")]
    EmailAlreadyRegistered,

    #[error("The password is too weak")]
    WeakCredential,

    #[error("Email/password sign-in is not enabled")]
    OperationNotPermitted,
}

/// Blob store failures for profile photo uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StorageErrorKind {
    #[error("Not authorized to upload the photo")]
    Unauthorized,

    #[error("The photo upload was canceled")]
    Canceled,

    #[error("Unknown error while uploading the photo")]
    Unknown,
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("Identity provider error: {0}")]
    Auth(AuthErrorKind),

    #[error("Storage error: {0}")]
    Storage(StorageErrorKind),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Insufficient balance: {requested} raíces requested, {available} available")]
    InsufficientBalance { available: u32, requested: u32 },

    #[error("Invalid request: {0}")]
    InvalidArgument(String),

    #[error("The query requires a database index")]
    IndexRequired { link: Option<String> },

    #[error("The record was modified concurrently, please retry")]
    InconsistentWrite,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    /// Remediation link for `index_required` errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    link: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut link = None;

        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", None),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", Some(msg.clone())),
            AppError::Auth(kind) => {
                let status = match kind {
                    AuthErrorKind::UserNotFound | AuthErrorKind::WrongCredential => {
                        StatusCode::UNAUTHORIZED
                    }
                    AuthErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
                    AuthErrorKind::EmailAlreadyRegistered => StatusCode::CONFLICT,
                    _ => StatusCode::BAD_REQUEST,
                };
                (status, "auth_error", Some(kind.to_string()))
            }
            AppError::Storage(kind) => (
                StatusCode::BAD_GATEWAY,
                "storage_error",
                Some(kind.to_string()),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::InsufficientBalance { .. } => (
                StatusCode::CONFLICT,
                "insufficient_balance",
                Some(self.to_string()),
            ),
            AppError::InvalidArgument(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_argument", Some(msg.clone()))
            }
            AppError::IndexRequired { link: index_link } => {
                link = index_link.clone();
                (
                    StatusCode::FAILED_DEPENDENCY,
                    "index_required",
                    Some(self.to_string()),
                )
            }
            AppError::InconsistentWrite => (
                StatusCode::CONFLICT,
                "inconsistent_write",
                Some(self.to_string()),
            ),
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
            link,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
