// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod principal;
pub mod profile;
pub mod ranking;

pub use principal::Principal;
pub use profile::{PrizeEntry, Profile, RedemptionEntry, Role};
pub use ranking::RankingEntry;
