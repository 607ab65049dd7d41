// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity provider client (Google Identity Toolkit REST API).
//!
//! Handles:
//! - Email/password authentication and registration
//! - Verification email delivery
//! - Re-authentication and password change
//! - Account lookup for the fresh `email_verified` flag
//!
//! Provider error codes are translated into [`AuthErrorKind`] here; raw
//! provider errors never propagate past this module.

use serde::Deserialize;

use crate::error::{AppError, AuthErrorKind};
use crate::models::Principal;

/// Identity provider client.
#[derive(Clone)]
pub struct IdentityService {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    offline: bool,
}

/// An authenticated (or freshly registered) identity session.
///
/// The `id_token` is the provider's short-lived credential, needed for
/// sensitive follow-up calls (verification email, password change). It is
/// never stored.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub principal: Principal,
    pub id_token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    email: String,
    id_token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    email_verified: bool,
}

#[derive(Deserialize)]
struct ProviderErrorBody {
    error: ProviderError,
}

#[derive(Deserialize)]
struct ProviderError {
    message: String,
}

impl IdentityService {
    /// Create a new identity client.
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            offline: false,
        }
    }

    /// Create a mock identity client for testing (offline mode).
    ///
    /// All provider operations will return an error if called.
    pub fn new_mock() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: String::new(),
            api_key: String::new(),
            offline: true,
        }
    }

    fn check_online(&self) -> Result<(), AppError> {
        if self.offline {
            return Err(AppError::Database(
                "Identity provider not connected (offline mode)".to_string(),
            ));
        }
        Ok(())
    }

    /// Authenticate with email and password.
    ///
    /// Follows the sign-in with an account lookup so the returned principal
    /// carries the provider's current `email_verified` flag.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<AuthSession, AppError> {
        self.check_online()?;

        let signin: SignInResponse = self
            .post_json(
                "accounts:signInWithPassword",
                &serde_json::json!({
                    "email": email,
                    "password": password,
                    "returnSecureToken": true,
                }),
            )
            .await?;

        let principal = self.lookup_by_token(&signin.id_token).await?;

        tracing::debug!(uid = %principal.id, "Authenticated principal");

        Ok(AuthSession {
            principal,
            id_token: signin.id_token,
        })
    }

    /// Register a new email/password account.
    ///
    /// The account starts unverified; the principal can authenticate
    /// immediately (two-phase activation, gated later by role).
    pub async fn register(&self, email: &str, password: &str) -> Result<AuthSession, AppError> {
        self.check_online()?;

        let signup: SignInResponse = self
            .post_json(
                "accounts:signUp",
                &serde_json::json!({
                    "email": email,
                    "password": password,
                    "returnSecureToken": true,
                }),
            )
            .await?;

        Ok(AuthSession {
            principal: Principal {
                id: signup.local_id,
                email: signup.email,
                email_verified: false,
            },
            id_token: signup.id_token,
        })
    }

    /// Send a verification email for the session's account.
    pub async fn send_verification_email(&self, id_token: &str) -> Result<(), AppError> {
        self.check_online()?;

        let _: serde_json::Value = self
            .post_json(
                "accounts:sendOobCode",
                &serde_json::json!({
                    "requestType": "VERIFY_EMAIL",
                    "idToken": id_token,
                }),
            )
            .await?;
        Ok(())
    }

    /// Re-authenticate with the current password.
    ///
    /// Required before sensitive operations; a wrong current password
    /// surfaces as `WrongCredential`.
    pub async fn reauthenticate(
        &self,
        email: &str,
        current_password: &str,
    ) -> Result<AuthSession, AppError> {
        self.authenticate(email, current_password).await
    }

    /// Change the account password using a fresh session token.
    pub async fn change_password(
        &self,
        id_token: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        self.check_online()?;

        let _: serde_json::Value = self
            .post_json(
                "accounts:update",
                &serde_json::json!({
                    "idToken": id_token,
                    "password": new_password,
                    "returnSecureToken": true,
                }),
            )
            .await?;
        Ok(())
    }

    /// Look up a principal by subject ID.
    ///
    /// Used by the access gate to observe the provider's current
    /// verification flag on every evaluation.
    pub async fn lookup(&self, uid: &str) -> Result<Principal, AppError> {
        self.check_online()?;

        let response: LookupResponse = self
            .post_json(
                "accounts:lookup",
                &serde_json::json!({ "localId": [uid] }),
            )
            .await?;

        response
            .users
            .into_iter()
            .next()
            .map(principal_from_lookup)
            .ok_or_else(|| AppError::NotFound(format!("Account {} not found", uid)))
    }

    /// Look up the principal behind a provider session token.
    async fn lookup_by_token(&self, id_token: &str) -> Result<Principal, AppError> {
        let response: LookupResponse = self
            .post_json(
                "accounts:lookup",
                &serde_json::json!({ "idToken": id_token }),
            )
            .await?;

        response
            .users
            .into_iter()
            .next()
            .map(principal_from_lookup)
            .ok_or_else(|| AppError::NotFound("Account not found".to_string()))
    }

    /// Generic POST with provider error translation.
    async fn post_json<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        body: &serde_json::Value,
    ) -> Result<T, AppError> {
        let url = format!("{}/{}?key={}", self.base_url, endpoint, self.api_key);

        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Database(format!("Identity provider unreachable: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let code = response
                .json::<ProviderErrorBody>()
                .await
                .map(|b| b.error.message)
                .unwrap_or_else(|_| status.to_string());
            return Err(translate_provider_error(&code));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Database(format!("Invalid identity provider response: {}", e)))
    }
}

fn principal_from_lookup(user: LookupUser) -> Principal {
    Principal {
        id: user.local_id,
        email: user.email,
        email_verified: user.email_verified,
    }
}

/// Translate a provider error code into the application taxonomy.
///
/// Provider messages may carry a suffix ("TOO_MANY_ATTEMPTS_TRY_LATER :
/// retry later"), so only the leading token is matched.
fn translate_provider_error(code: &str) -> AppError {
    let code = code.split_whitespace().next().unwrap_or(code);
    let kind = match code {
        "EMAIL_NOT_FOUND" => AuthErrorKind::UserNotFound,
        "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => AuthErrorKind::WrongCredential,
        "INVALID_EMAIL" | "MISSING_EMAIL" => AuthErrorKind::InvalidEmailFormat,
        "TOO_MANY_ATTEMPTS_TRY_LATER" => AuthErrorKind::RateLimited,
        "EMAIL_EXISTS" => AuthErrorKind::EmailAlreadyRegistered,
        "WEAK_PASSWORD" => AuthErrorKind::WeakCredential,
        "OPERATION_NOT_ALLOWED" => AuthErrorKind::OperationNotPermitted,
        other => {
            tracing::warn!(code = %other, "Unrecognized identity provider error code");
            return AppError::Internal(anyhow::anyhow!("Identity provider error: {}", other));
        }
    };
    AppError::Auth(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(err: AppError) -> Option<AuthErrorKind> {
        match err {
            AppError::Auth(kind) => Some(kind),
            _ => None,
        }
    }

    #[test]
    fn test_translate_known_codes() {
        assert_eq!(
            kind_of(translate_provider_error("EMAIL_NOT_FOUND")),
            Some(AuthErrorKind::UserNotFound)
        );
        assert_eq!(
            kind_of(translate_provider_error("INVALID_PASSWORD")),
            Some(AuthErrorKind::WrongCredential)
        );
        assert_eq!(
            kind_of(translate_provider_error("INVALID_LOGIN_CREDENTIALS")),
            Some(AuthErrorKind::WrongCredential)
        );
        assert_eq!(
            kind_of(translate_provider_error("INVALID_EMAIL")),
            Some(AuthErrorKind::InvalidEmailFormat)
        );
        assert_eq!(
            kind_of(translate_provider_error("EMAIL_EXISTS")),
            Some(AuthErrorKind::EmailAlreadyRegistered)
        );
        assert_eq!(
            kind_of(translate_provider_error("WEAK_PASSWORD")),
            Some(AuthErrorKind::WeakCredential)
        );
        assert_eq!(
            kind_of(translate_provider_error("OPERATION_NOT_ALLOWED")),
            Some(AuthErrorKind::OperationNotPermitted)
        );
    }

    #[test]
    fn test_translate_code_with_suffix() {
        // Rate-limit codes arrive as "TOO_MANY_ATTEMPTS_TRY_LATER : ..."
        assert_eq!(
            kind_of(translate_provider_error(
                "TOO_MANY_ATTEMPTS_TRY_LATER : Access to this account has been disabled"
            )),
            Some(AuthErrorKind::RateLimited)
        );
    }

    #[test]
    fn test_translate_unknown_code_is_internal() {
        let err = translate_provider_error("SOMETHING_NEW");
        assert!(matches!(err, AppError::Internal(_)));
    }
}
