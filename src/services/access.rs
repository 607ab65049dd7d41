// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access gate: the single place role and verification decisions are made.
//!
//! Every role-scoped view asks the gate instead of re-implementing checks.
//! The pure rule evaluation ([`decide`]) is separate from the effectful part
//! (principal lookup, profile load, verification-drift sync) so the rules
//! are testable without any provider.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::{Principal, Profile, Role};
use crate::services::identity::IdentityService;

/// Why access was denied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessDenied {
    #[error("Authentication required")]
    NotAuthenticated,

    /// The profile behind the session could not be loaded. The session is
    /// terminated; a stale session with no backing profile must not linger.
    #[error("No user data found for this account")]
    ProfileUnavailable,

    /// A teacher whose email is not verified is fully blocked from every
    /// teacher view and signed out, even with a valid active session.
    #[error("Please verify your email address before continuing")]
    TeacherUnverified,

    #[error("This view is not available for the {actual} role")]
    RoleMismatch { actual: Role },
}

impl AccessDenied {
    /// Whether the active session must be terminated as part of the denial.
    pub fn terminates_session(&self) -> bool {
        matches!(
            self,
            AccessDenied::ProfileUnavailable | AccessDenied::TeacherUnverified
        )
    }
}

impl From<AccessDenied> for AppError {
    fn from(denied: AccessDenied) -> Self {
        match denied {
            AccessDenied::NotAuthenticated | AccessDenied::ProfileUnavailable => {
                AppError::Unauthorized
            }
            AccessDenied::TeacherUnverified | AccessDenied::RoleMismatch { .. } => {
                AppError::Forbidden(denied.to_string())
            }
        }
    }
}

/// Pure rule evaluation, no I/O.
///
/// `target` is the role required by the requested view; `None` means any
/// role (own-profile views). The verification rule uses the principal's
/// flag, not the profile's: the principal is the source of truth.
pub fn decide(
    principal: Option<&Principal>,
    profile: &Profile,
    target: Option<Role>,
) -> Result<(), AccessDenied> {
    let principal = principal.ok_or(AccessDenied::NotAuthenticated)?;

    if profile.role == Role::Teacher && !principal.email_verified {
        return Err(AccessDenied::TeacherUnverified);
    }

    if let Some(required) = target {
        if profile.role != required {
            return Err(AccessDenied::RoleMismatch {
                actual: profile.role,
            });
        }
    }

    Ok(())
}

/// Access gate service.
#[derive(Clone)]
pub struct AccessGate {
    identity: IdentityService,
    db: FirestoreDb,
}

impl AccessGate {
    pub fn new(identity: IdentityService, db: FirestoreDb) -> Self {
        Self { identity, db }
    }

    /// Authorize a session for a role-scoped view.
    ///
    /// Looks up the principal for a fresh `email_verified` flag, loads the
    /// profile, reconciles verification drift, then evaluates the rules.
    pub async fn authorize(
        &self,
        uid: Option<&str>,
        target: Role,
    ) -> Result<Profile, AccessDenied> {
        self.authorize_inner(uid, Some(target)).await
    }

    /// Authorize a session for a view available to any role.
    pub async fn authorize_any(&self, uid: Option<&str>) -> Result<Profile, AccessDenied> {
        self.authorize_inner(uid, None).await
    }

    /// Evaluate an already-authenticated principal (the login path, where
    /// no target role is bound yet).
    pub async fn evaluate_principal(
        &self,
        principal: &Principal,
    ) -> Result<Profile, AccessDenied> {
        let profile = self.load_and_sync(principal).await?;
        decide(Some(principal), &profile, None)?;
        Ok(profile)
    }

    async fn authorize_inner(
        &self,
        uid: Option<&str>,
        target: Option<Role>,
    ) -> Result<Profile, AccessDenied> {
        let uid = uid.ok_or(AccessDenied::NotAuthenticated)?;

        let principal = self.identity.lookup(uid).await.map_err(|e| {
            tracing::warn!(uid, error = %e, "Principal lookup failed, denying access");
            AccessDenied::ProfileUnavailable
        })?;

        let profile = self.load_and_sync(&principal).await?;
        decide(Some(&principal), &profile, target)?;
        Ok(profile)
    }

    /// Load the profile and reconcile verification-state drift.
    ///
    /// Whenever the principal's `email_verified` disagrees with the stored
    /// profile, the principal's value is written through before any rule is
    /// evaluated. One-directional: principal to profile, never the reverse.
    async fn load_and_sync(&self, principal: &Principal) -> Result<Profile, AccessDenied> {
        let mut profile = match self.db.get_profile(&principal.id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                tracing::warn!(uid = %principal.id, "No profile for principal, denying access");
                return Err(AccessDenied::ProfileUnavailable);
            }
            Err(e) => {
                tracing::warn!(uid = %principal.id, error = %e, "Profile load failed, denying access");
                return Err(AccessDenied::ProfileUnavailable);
            }
        };

        if profile.email_verified != principal.email_verified {
            tracing::info!(
                uid = %principal.id,
                email_verified = principal.email_verified,
                "Syncing verification state into profile"
            );
            profile.email_verified = principal.email_verified;
            if let Err(e) = self.db.upsert_profile(&profile).await {
                tracing::warn!(uid = %principal.id, error = %e, "Verification sync write failed");
                return Err(AccessDenied::ProfileUnavailable);
            }
        }

        Ok(profile)
    }
}
