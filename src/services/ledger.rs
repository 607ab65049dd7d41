// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ledger service: all balance and catalog mutations for student profiles.
//!
//! Every operation is a transactional read-modify-write on one profile
//! document. A per-student lock serializes mutations within this instance;
//! the Firestore transaction protects against concurrent writers elsewhere,
//! surfacing conflicts as `InconsistentWrite` instead of losing updates.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::db::FirestoreDb;
use crate::error::{AppError, Result};
use crate::models::{Profile, Role};
use crate::time_utils::now_rfc3339;

/// Ledger service scoped to student profiles.
#[derive(Clone)]
pub struct LedgerService {
    db: FirestoreDb,
    student_locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl LedgerService {
    pub fn new(db: FirestoreDb) -> Self {
        Self {
            db,
            student_locks: Arc::new(DashMap::new()),
        }
    }

    /// Credit raíces to a student. Pure grant: no history entry.
    pub async fn grant(&self, student_id: &str, amount: u32) -> Result<Profile> {
        let profile = self
            .mutate_student(student_id, |profile| profile.grant(amount))
            .await?;

        tracing::info!(student_id, amount, balance = profile.balance, "Raíces granted");
        Ok(profile)
    }

    /// Remove raíces from a student, recording the debit in the history.
    pub async fn revoke(&self, student_id: &str, amount: u32) -> Result<Profile> {
        let now = now_rfc3339();
        let profile = self
            .mutate_student(student_id, |profile| profile.revoke(amount, &now))
            .await?;

        tracing::info!(student_id, amount, balance = profile.balance, "Raíces revoked");
        Ok(profile)
    }

    /// Append a prize to a student's catalog. No balance effect.
    pub async fn add_prize(&self, student_id: &str, kind: &str, cost: u32) -> Result<Profile> {
        let now = now_rfc3339();
        let profile = self
            .mutate_student(student_id, |profile| profile.add_prize(kind, cost, &now))
            .await?;

        tracing::info!(student_id, kind, cost, "Prize added");
        Ok(profile)
    }

    /// Redeem a prize: debit the balance and record the redemption.
    pub async fn redeem(&self, student_id: &str, kind: &str, cost: u32) -> Result<Profile> {
        let now = now_rfc3339();
        let profile = self
            .mutate_student(student_id, |profile| profile.redeem(kind, cost, &now))
            .await?;

        tracing::info!(student_id, kind, cost, balance = profile.balance, "Prize redeemed");
        Ok(profile)
    }

    /// Apply one mutation to one student profile under the per-student lock.
    ///
    /// A profile that resolves to a non-student is treated as not found:
    /// teacher balances are not a thing, and the operations are scoped to
    /// students only.
    async fn mutate_student<F>(&self, student_id: &str, mutate: F) -> Result<Profile>
    where
        F: FnOnce(&mut Profile) -> Result<()>,
    {
        let lock = self
            .student_locks
            .entry(student_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        self.db
            .mutate_profile_atomic(student_id, |profile| {
                if profile.role != Role::Student {
                    return Err(AppError::NotFound(format!(
                        "Student {} not found",
                        profile.id
                    )));
                }
                mutate(profile)
            })
            .await
    }
}
