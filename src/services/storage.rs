// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Blob store client for profile photos (Firebase Storage REST API).

use serde::Deserialize;

use crate::error::{AppError, StorageErrorKind};

/// Photos above this size are rejected before any provider call.
pub const MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;

/// Blob store client.
#[derive(Clone)]
pub struct StorageService {
    http: reqwest::Client,
    base_url: String,
    bucket: String,
    offline: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    #[serde(default)]
    download_tokens: String,
}

impl StorageService {
    /// Create a new blob store client.
    pub fn new(base_url: &str, bucket: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
            offline: false,
        }
    }

    /// Create a mock blob store client for testing (offline mode).
    pub fn new_mock() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: String::new(),
            bucket: String::new(),
            offline: true,
        }
    }

    /// Upload a photo and return its download URL.
    ///
    /// Size and content type are validated before the provider is called:
    /// anything over [`MAX_PHOTO_BYTES`] or without an `image/` content type
    /// is rejected with `InvalidArgument` and never uploaded.
    pub async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, AppError> {
        if bytes.len() > MAX_PHOTO_BYTES {
            return Err(AppError::InvalidArgument(
                "The photo must not exceed 5MB".to_string(),
            ));
        }
        if !content_type.starts_with("image/") {
            return Err(AppError::InvalidArgument(
                "The file must be an image".to_string(),
            ));
        }
        if self.offline {
            return Err(AppError::Storage(StorageErrorKind::Unknown));
        }

        let encoded_key = urlencoding::encode(key);
        let url = format!(
            "{}/b/{}/o?uploadType=media&name={}",
            self.base_url, self.bucket, encoded_key
        );

        let response = self
            .http
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, content_type.to_string())
            .body(bytes)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_request() {
                    AppError::Storage(StorageErrorKind::Canceled)
                } else {
                    AppError::Storage(StorageErrorKind::Unknown)
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(AppError::Storage(StorageErrorKind::Unauthorized));
        }
        if !status.is_success() {
            tracing::warn!(status = %status, key, "Photo upload failed");
            return Err(AppError::Storage(StorageErrorKind::Unknown));
        }

        let upload: UploadResponse = response
            .json()
            .await
            .map_err(|_| AppError::Storage(StorageErrorKind::Unknown))?;

        let download_url = format!(
            "{}/b/{}/o/{}?alt=media&token={}",
            self.base_url, self.bucket, encoded_key, upload.download_tokens
        );

        tracing::info!(key, "Photo uploaded");

        Ok(download_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_rejects_oversized_photo() {
        let storage = StorageService::new_mock();
        let bytes = vec![0u8; MAX_PHOTO_BYTES + 1];

        let err = storage.put("photos/x.jpg", bytes, "image/jpeg").await;

        assert!(matches!(err, Err(AppError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_put_rejects_non_image_content_type() {
        let storage = StorageService::new_mock();

        let err = storage
            .put("photos/x.pdf", vec![1, 2, 3], "application/pdf")
            .await;

        assert!(matches!(err, Err(AppError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_put_offline_is_storage_error() {
        let storage = StorageService::new_mock();

        let err = storage.put("photos/x.jpg", vec![1, 2, 3], "image/jpeg").await;

        assert!(matches!(
            err,
            Err(AppError::Storage(StorageErrorKind::Unknown))
        ));
    }
}
