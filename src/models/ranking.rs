//! Leaderboard projection of student balances.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Read-only ranking row derived from a student profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RankingEntry {
    /// Profile document ID
    pub id: String,
    /// Display name
    pub name: String,
    /// Course label
    pub course: String,
    /// Point balance
    pub balance: u32,
}
