// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Leaderboard query: ranked, size-bounded view of student balances.

use crate::db::FirestoreDb;
use crate::error::{AppError, Result};
use crate::models::{Profile, RankingEntry, Role};

/// Rank student profiles by balance descending, bounded to `limit` entries.
///
/// Ties on equal balances break by ascending profile ID so the ordering is
/// deterministic across reads.
pub fn rank_students(profiles: Vec<Profile>, limit: usize) -> Vec<RankingEntry> {
    let mut students: Vec<Profile> = profiles
        .into_iter()
        .filter(|p| p.role == Role::Student)
        .collect();

    students.sort_by(|a, b| b.balance.cmp(&a.balance).then_with(|| a.id.cmp(&b.id)));
    students.truncate(limit);

    students
        .into_iter()
        .map(|p| RankingEntry {
            id: p.id,
            name: p.name,
            course: p.course,
            balance: p.balance,
        })
        .collect()
}

/// Leaderboard query service.
#[derive(Clone)]
pub struct LeaderboardService {
    db: FirestoreDb,
}

impl LeaderboardService {
    pub fn new(db: FirestoreDb) -> Self {
        Self { db }
    }

    /// Top `n` students by balance.
    ///
    /// Uses the composite filter+sort query; if the backing store lacks the
    /// supporting index this fails with `IndexRequired` carrying the
    /// remediation link.
    pub async fn top_students(&self, n: u32) -> Result<Vec<RankingEntry>> {
        if n == 0 {
            return Err(AppError::InvalidArgument(
                "Ranking size must be greater than zero".to_string(),
            ));
        }

        let profiles = self.db.query_top_students(n).await?;
        Ok(rank_students(profiles, n as usize))
    }

    /// All students ranked, for the public ranking view.
    ///
    /// Fetches with a single-field filter and sorts in memory, so it works
    /// without a composite index.
    pub async fn all_students_ranked(&self) -> Result<Vec<RankingEntry>> {
        let profiles = self.db.list_students().await?;
        let limit = profiles.len();
        Ok(rank_students(profiles, limit))
    }
}
