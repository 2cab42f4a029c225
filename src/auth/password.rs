// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Password hashing (Argon2id with a random salt per hash).
//!
//! [`PasswordHash`] can only be produced by hashing a raw password or by
//! loading an already-hashed value back from storage, so a raw password can
//! never end up persisted by accident.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use serde::{Deserialize, Serialize};

/// Error raised when hashing fails (not when verification fails).
#[derive(Debug, thiserror::Error)]
#[error("password hashing failed: {0}")]
pub struct HashError(String);

/// A PHC-formatted Argon2 hash string.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Hash a raw password. CPU-bound; call from a blocking context.
    pub fn from_raw(raw: &str) -> Result<Self, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(raw.as_bytes(), &salt)
            .map_err(|e| HashError(e.to_string()))?;
        Ok(Self(hash.to_string()))
    }

    /// Hash on the blocking pool so request workers stay responsive.
    pub async fn from_raw_blocking(raw: String) -> Result<Self, HashError> {
        tokio::task::spawn_blocking(move || Self::from_raw(&raw))
            .await
            .map_err(|e| HashError(e.to_string()))?
    }

    /// Check a raw password against this hash. Never errors; an unparseable
    /// stored hash simply fails to match.
    pub fn verify(&self, raw: &str) -> bool {
        let Ok(parsed) = argon2::PasswordHash::new(&self.0) else {
            return false;
        };
        Argon2::default()
            .verify_password(raw.as_bytes(), &parsed)
            .is_ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasswordHash(<redacted>)")
    }
}

/// Verify an optional stored hash. Federation-only accounts have no hash
/// and always fail.
pub fn verify_optional(hash: Option<&PasswordHash>, raw: &str) -> bool {
    hash.is_some_and(|h| h.verify(raw))
}

/// Blocking-pool variant of [`verify_optional`].
pub async fn verify_optional_blocking(hash: Option<PasswordHash>, raw: String) -> bool {
    let Some(hash) = hash else {
        return false;
    };
    tokio::task::spawn_blocking(move || hash.verify(&raw))
        .await
        .unwrap_or(false)
}
