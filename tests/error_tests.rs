// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Error response mapping tests.
//!
//! Every failure kind maps to a distinct error code and human-readable
//! detail; `index_required` additionally carries the remediation link.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use banco_raices::error::{AppError, AuthErrorKind, StorageErrorKind};
use serde_json::Value;

async fn response_parts(err: AppError) -> (StatusCode, Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    (status, body)
}

#[tokio::test]
async fn test_insufficient_balance_response() {
    let (status, body) = response_parts(AppError::InsufficientBalance {
        available: 5,
        requested: 10,
    })
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "insufficient_balance");
    let details = body["details"].as_str().unwrap();
    assert!(details.contains("10"));
    assert!(details.contains("5"));
}

#[tokio::test]
async fn test_index_required_carries_link() {
    let link = "https://console.firebase.google.com/project/p/firestore/indexes";
    let (status, body) = response_parts(AppError::IndexRequired {
        link: Some(link.to_string()),
    })
    .await;

    assert_eq!(status, StatusCode::FAILED_DEPENDENCY);
    assert_eq!(body["error"], "index_required");
    assert_eq!(body["link"], link);
}

#[tokio::test]
async fn test_index_required_without_link_omits_field() {
    let (_, body) = response_parts(AppError::IndexRequired { link: None }).await;
    assert!(body.get("link").is_none());
}

#[tokio::test]
async fn test_inconsistent_write_is_retryable_conflict() {
    let (status, body) = response_parts(AppError::InconsistentWrite).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "inconsistent_write");
    assert!(body["details"].as_str().unwrap().contains("retry"));
}

#[tokio::test]
async fn test_auth_error_statuses() {
    let (status, body) = response_parts(AppError::Auth(AuthErrorKind::WrongCredential)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "auth_error");

    let (status, _) = response_parts(AppError::Auth(AuthErrorKind::RateLimited)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    let (status, _) =
        response_parts(AppError::Auth(AuthErrorKind::EmailAlreadyRegistered)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = response_parts(AppError::Auth(AuthErrorKind::WeakCredential)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_auth_error_messages_are_distinct() {
    let kinds = [
        AuthErrorKind::UserNotFound,
        AuthErrorKind::WrongCredential,
        AuthErrorKind::InvalidEmailFormat,
        AuthErrorKind::RateLimited,
        AuthErrorKind::EmailAlreadyRegistered,
        AuthErrorKind::WeakCredential,
        AuthErrorKind::OperationNotPermitted,
    ];

    let mut messages: Vec<String> = kinds.iter().map(|k| k.to_string()).collect();
    messages.sort();
    messages.dedup();
    assert_eq!(messages.len(), kinds.len(), "messages must be distinct");
}

#[tokio::test]
async fn test_storage_error_response() {
    let (status, body) =
        response_parts(AppError::Storage(StorageErrorKind::Unauthorized)).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "storage_error");
}

#[tokio::test]
async fn test_database_error_hides_details() {
    let (status, body) =
        response_parts(AppError::Database("connection string leaked".to_string())).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "database_error");
    assert!(body.get("details").is_none());
}
