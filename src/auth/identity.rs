// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Federated identity verification.
//!
//! A verifier turns a third-party identity assertion into a verified
//! [`ExternalIdentity`]. Federation is optional: the application state holds
//! `Option<Arc<dyn IdentityVerifier>>`, built once at startup, and `None`
//! means the feature is not configured.

use async_trait::async_trait;

/// A verified third-party identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity {
    /// Provider subject identifier (stable per provider account)
    pub subject: String,
    /// Verified email address
    pub email: String,
    /// Display name (falls back to the email local part)
    pub display_name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// Signature, audience, issuer or claim checks failed
    #[error("invalid identity assertion: {0}")]
    InvalidAssertion(String),

    /// Provider keys could not be fetched
    #[error("failed to fetch provider keys: {0}")]
    KeyFetch(String),
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Verify an assertion (e.g. an OAuth ID token).
    async fn verify(&self, assertion: &str) -> Result<ExternalIdentity, IdentityError>;

    /// Whether the verifier can currently reach its key material.
    async fn is_ready(&self) -> bool {
        true
    }
}

/// Fallback display name: email local part, or "User".
pub fn display_name_for(name: Option<&str>, email: &str) -> String {
    name.map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .or_else(|| {
            email
                .split('@')
                .next()
                .filter(|local| !local.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "User".to_string())
}

/// Test verifier accepting assertions of the form `valid:<subject>:<email>`.
#[cfg(test)]
pub(crate) struct StubVerifier;

#[cfg(test)]
#[async_trait]
impl IdentityVerifier for StubVerifier {
    async fn verify(&self, assertion: &str) -> Result<ExternalIdentity, IdentityError> {
        let mut parts = assertion.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some("valid"), Some(subject), Some(email)) => Ok(ExternalIdentity {
                subject: subject.to_string(),
                email: email.to_lowercase(),
                display_name: display_name_for(None, email),
            }),
            _ => Err(IdentityError::InvalidAssertion("stub rejected".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_prefers_provider_name() {
        assert_eq!(display_name_for(Some("Alice A."), "alice@x.com"), "Alice A.");
    }

    #[test]
    fn display_name_falls_back_to_local_part() {
        assert_eq!(display_name_for(None, "alice@x.com"), "alice");
        assert_eq!(display_name_for(Some("  "), "bob@x.com"), "bob");
    }

    #[test]
    fn display_name_last_resort() {
        assert_eq!(display_name_for(None, "@x.com"), "User");
        assert_eq!(display_name_for(None, ""), "User");
    }
}
