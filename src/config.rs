//! Application configuration loaded from environment variables.
//!
//! Secrets (identity API key, JWT signing key) are read once at startup and
//! held in memory for the lifetime of the process.

use std::env;
use std::time::Duration;

/// Bounded retry policy for profile creation writes.
///
/// Profile creation is the one place automatic retry is allowed: a transient
/// store failure during registration would otherwise strand an identity
/// account with no profile.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of write attempts before surfacing the failure.
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(1),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL for CORS and cookie attributes
    pub frontend_url: String,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Identity provider REST endpoint (override for the emulator)
    pub identity_api_url: String,
    /// Blob store REST endpoint (override for the emulator)
    pub storage_api_url: String,
    /// Blob store bucket for profile photos
    pub storage_bucket: String,
    /// Retry policy for the profile creation write
    pub profile_write_retry: RetryPolicy,

    // --- Secrets ---
    /// Identity provider API key
    pub identity_api_key: String,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            identity_api_url: env::var("IDENTITY_API_URL")
                .unwrap_or_else(|_| "https://identitytoolkit.googleapis.com/v1".to_string()),
            storage_api_url: env::var("STORAGE_API_URL")
                .unwrap_or_else(|_| "https://firebasestorage.googleapis.com/v0".to_string()),
            storage_bucket: env::var("STORAGE_BUCKET")
                .unwrap_or_else(|_| "local-dev.appspot.com".to_string()),
            profile_write_retry: RetryPolicy {
                max_attempts: env::var("PROFILE_WRITE_ATTEMPTS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(3),
                backoff: Duration::from_millis(
                    env::var("PROFILE_WRITE_BACKOFF_MS")
                        .ok()
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(1000),
                ),
            },
            identity_api_key: env::var("IDENTITY_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("IDENTITY_API_KEY"))?,
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
        })
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            identity_api_url: "http://localhost:9099/identitytoolkit.googleapis.com/v1".to_string(),
            storage_api_url: "http://localhost:9199/v0".to_string(),
            storage_bucket: "test-project.appspot.com".to_string(),
            profile_write_retry: RetryPolicy {
                max_attempts: 3,
                backoff: Duration::from_millis(10),
            },
            identity_api_key: "test_api_key".to_string(),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var("IDENTITY_API_KEY", "test_key");
        env::set_var("JWT_SIGNING_KEY", "test_jwt_key_32_bytes_minimum!!");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.identity_api_key, "test_key");
        assert_eq!(config.port, 8080);
        assert_eq!(config.profile_write_retry.max_attempts, 3);
    }

    #[test]
    fn test_retry_policy_default() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.backoff, Duration::from_secs(1));
    }
}
