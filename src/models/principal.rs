//! Identity provider subject as seen by this system.

/// Identity-provider-issued subject.
///
/// Created on registration, updated on verification status change, never
/// deleted by this system. The `email_verified` flag is the source of truth
/// that profiles mirror (one-directional sync, principal to profile).
#[derive(Debug, Clone)]
pub struct Principal {
    /// Opaque, stable subject ID
    pub id: String,
    /// Email address
    pub email: String,
    /// Whether the provider has verified the email
    pub email_verified: bool,
}
