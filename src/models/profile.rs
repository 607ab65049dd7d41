//! Profile model for storage and API, plus the ledger mutation rules.
//!
//! Balance arithmetic lives here as pure methods so the invariants are
//! enforced in one place and testable without a database: the balance never
//! goes negative, and every debit appends exactly one redemption entry.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// History label used when a teacher removes points outside a prize
/// redemption.
pub const POINT_REMOVAL_LABEL: &str = "point removal";

/// Role assigned at registration, fixed for the lifetime of the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Student => write!(f, "student"),
            Role::Teacher => write!(f, "teacher"),
        }
    }
}

/// Prize available to a student, appended by a teacher.
///
/// The catalog is append-only; entries are not unique-keyed, so the same
/// `(kind, cost)` pair may appear more than once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrizeEntry {
    /// Prize description ("Libro", "Material Escolar", ...)
    pub kind: String,
    /// Cost in raíces
    pub cost: u32,
    /// When the prize was added (ISO 8601)
    pub added_at: String,
}

/// One debit against the balance, whether a prize redemption or an
/// administrative point removal. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedemptionEntry {
    /// Prize kind, or [`POINT_REMOVAL_LABEL`] for administrative removals
    pub label: String,
    /// Raíces debited
    pub cost: u32,
    /// When the debit was applied (ISO 8601)
    pub redeemed_at: String,
}

/// User profile stored in Firestore, one per identity principal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Identity provider subject ID (also used as document ID)
    pub id: String,
    /// Display name
    pub name: String,
    /// Course label ("1A", "2B", ...); empty for non-students
    pub course: String,
    /// Role fixed at registration
    pub role: Role,
    /// Point balance ("raíces")
    #[serde(default)]
    pub balance: u32,
    /// Prize catalog for this student
    #[serde(default)]
    pub available_prizes: Vec<PrizeEntry>,
    /// Append-only ledger of debits
    #[serde(default)]
    pub redemption_history: Vec<RedemptionEntry>,
    /// Profile photo URL
    pub photo_url: Option<String>,
    /// Mirror of the identity provider's verification flag
    #[serde(default)]
    pub email_verified: bool,
    /// When the profile was created (ISO 8601)
    pub created_at: String,
}

impl Profile {
    /// Create a fresh profile at registration time.
    pub fn new(
        id: String,
        name: String,
        course: String,
        role: Role,
        photo_url: Option<String>,
        now: &str,
    ) -> Self {
        Self {
            id,
            name,
            // Course only applies to students
            course: if role == Role::Student { course } else { String::new() },
            role,
            balance: 0,
            available_prizes: Vec::new(),
            redemption_history: Vec::new(),
            photo_url,
            email_verified: false,
            created_at: now.to_string(),
        }
    }

    /// Credit raíces. Pure grant: no history entry.
    pub fn grant(&mut self, amount: u32) -> Result<(), AppError> {
        if amount == 0 {
            return Err(AppError::InvalidArgument(
                "Amount must be greater than zero".to_string(),
            ));
        }
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or_else(|| AppError::InvalidArgument("Balance overflow".to_string()))?;
        Ok(())
    }

    /// Debit raíces as an administrative point removal.
    ///
    /// The balance change and the history append happen together or not at
    /// all: if the balance is insufficient the profile is left untouched.
    pub fn revoke(&mut self, amount: u32, now: &str) -> Result<(), AppError> {
        self.debit(POINT_REMOVAL_LABEL, amount, now)
    }

    /// Append a prize to the catalog. No balance effect.
    pub fn add_prize(&mut self, kind: &str, cost: u32, now: &str) -> Result<(), AppError> {
        if kind.trim().is_empty() {
            return Err(AppError::InvalidArgument(
                "Prize kind must not be empty".to_string(),
            ));
        }
        if cost == 0 {
            return Err(AppError::InvalidArgument(
                "Prize cost must be greater than zero".to_string(),
            ));
        }
        self.available_prizes.push(PrizeEntry {
            kind: kind.to_string(),
            cost,
            added_at: now.to_string(),
        });
        Ok(())
    }

    /// Debit raíces for a prize redemption.
    pub fn redeem(&mut self, kind: &str, cost: u32, now: &str) -> Result<(), AppError> {
        if kind.trim().is_empty() {
            return Err(AppError::InvalidArgument(
                "Prize kind must not be empty".to_string(),
            ));
        }
        self.debit(kind, cost, now)
    }

    /// Shared debit path: subtract from the balance and append exactly one
    /// redemption entry for the same cost.
    fn debit(&mut self, label: &str, cost: u32, now: &str) -> Result<(), AppError> {
        if cost == 0 {
            return Err(AppError::InvalidArgument(
                "Amount must be greater than zero".to_string(),
            ));
        }
        let remaining =
            self.balance
                .checked_sub(cost)
                .ok_or(AppError::InsufficientBalance {
                    available: self.balance,
                    requested: cost,
                })?;

        self.balance = remaining;
        self.redemption_history.push(RedemptionEntry {
            label: label.to_string(),
            cost,
            redeemed_at: now.to_string(),
        });
        Ok(())
    }
}
