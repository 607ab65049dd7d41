// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for profiles:
//! - point reads and creation (with the bounded registration retry)
//! - transactional read-modify-write for ledger mutations
//! - student queries for the leaderboard

use crate::config::RetryPolicy;
use crate::db::collections;
use crate::error::AppError;
use crate::models::{Profile, Role};
use futures_util::StreamExt;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        // Use ExternalJwtFunctionSource to provide a dummy token without needing async-trait
        // or a custom TokenSource implementation struct.
        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── Profile Operations ──────────────────────────────────────

    /// Get a profile by identity subject ID.
    pub async fn get_profile(&self, id: &str) -> Result<Option<Profile>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::PROFILES)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or replace a profile (full write).
    pub async fn upsert_profile(&self, profile: &Profile) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::PROFILES)
            .document_id(&profile.id)
            .object(profile)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Create a profile at registration with bounded retry.
    ///
    /// A transient write failure here would strand an identity account with
    /// no profile, so the write is retried `policy.max_attempts` times with a
    /// fixed backoff before surfacing a fatal error. This is the only
    /// operation with automatic retry.
    pub async fn create_profile_with_retry(
        &self,
        profile: &Profile,
        policy: RetryPolicy,
    ) -> Result<(), AppError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.upsert_profile(profile).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < policy.max_attempts => {
                    tracing::warn!(
                        profile_id = %profile.id,
                        attempt,
                        error = %e,
                        "Profile creation attempt failed, retrying"
                    );
                    tokio::time::sleep(policy.backoff).await;
                }
                Err(e) => {
                    tracing::error!(
                        profile_id = %profile.id,
                        attempts = attempt,
                        error = %e,
                        "Profile creation failed after all retries"
                    );
                    return Err(e);
                }
            }
        }
    }

    // ─── Atomic Ledger Mutations ─────────────────────────────────

    /// Atomically apply a mutation to one profile.
    ///
    /// Runs inside a Firestore transaction: the profile is read, mutated in
    /// memory, and written back conditionally. If another request modifies
    /// the profile concurrently, the commit fails and the conflict surfaces
    /// as [`AppError::InconsistentWrite`] for the caller to retry; a naive
    /// read-modify-write would silently lose one of the updates.
    ///
    /// The mutation closure may reject the profile (for example an
    /// insufficient balance); in that case the transaction is rolled back
    /// and no write is observed.
    pub async fn mutate_profile_atomic<F>(
        &self,
        profile_id: &str,
        mutate: F,
    ) -> Result<Profile, AppError>
    where
        F: FnOnce(&mut Profile) -> Result<(), AppError>,
    {
        // Begin a transaction
        let mut transaction = self
            .get_client()?
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        // 1. Read the current profile within the transaction scope.
        //    This registers the document for conflict detection.
        let current: Option<Profile> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::PROFILES)
            .obj()
            .one(profile_id)
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to read profile in transaction: {}", e))
            })?;

        let mut profile = match current {
            Some(profile) => profile,
            None => {
                let _ = transaction.rollback().await;
                return Err(AppError::NotFound(format!(
                    "Student {} not found",
                    profile_id
                )));
            }
        };

        // 2. Apply the mutation in memory; invariant violations abort the
        //    transaction with nothing applied.
        if let Err(e) = mutate(&mut profile) {
            let _ = transaction.rollback().await;
            return Err(e);
        }

        // 3. Add the profile write to the transaction
        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::PROFILES)
            .document_id(&profile.id)
            .object(&profile)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add profile to transaction: {}", e))
            })?;

        // 4. Commit atomically
        transaction.commit().await.map_err(|e| {
            let msg = e.to_string();
            if msg.to_lowercase().contains("aborted") {
                AppError::InconsistentWrite
            } else {
                AppError::Database(format!("Transaction commit failed: {}", msg))
            }
        })?;

        Ok(profile)
    }

    // ─── Student Queries ─────────────────────────────────────────

    /// Top student profiles ordered by balance descending.
    ///
    /// Uses a composite filter+sort query; Firestore refuses those without a
    /// supporting index, so that failure is surfaced as `IndexRequired`
    /// (with the console remediation link when present) rather than a
    /// generic database error.
    pub async fn query_top_students(&self, limit: u32) -> Result<Vec<Profile>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::PROFILES)
            .filter(|q| q.for_all([q.field("role").eq(Role::Student.to_string())]))
            .order_by([(
                "balance",
                firestore::FirestoreQueryDirection::Descending,
            )])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(map_query_error)
    }

    /// Stream all student profiles (single-field filter, no index needed).
    pub async fn list_students(&self) -> Result<Vec<Profile>, AppError> {
        let stream = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::PROFILES)
            .filter(|q| q.for_all([q.field("role").eq(Role::Student.to_string())]))
            .obj::<Profile>()
            .stream_query()
            .await
            .map_err(map_query_error)?;

        Ok(stream.collect().await)
    }
}

/// Translate a Firestore query error, recognizing the missing-index case.
fn map_query_error(e: firestore::errors::FirestoreError) -> AppError {
    let msg = e.to_string();
    if msg.contains("requires an index") {
        AppError::IndexRequired {
            link: extract_index_link(&msg),
        }
    } else {
        AppError::Database(msg)
    }
}

/// Extract the index-creation console link from a provider error message.
fn extract_index_link(message: &str) -> Option<String> {
    let start = message.find("https://console.firebase.google.com")?;
    let rest = &message[start..];
    let end = rest
        .find(char::is_whitespace)
        .unwrap_or(rest.len());
    Some(rest[..end].to_string())
}
