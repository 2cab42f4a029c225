// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Single-use, time-boxed password reset tokens.
//!
//! The raw token is 32 bytes from the system CSPRNG, URL-safe base64
//! encoded, and is handed to the caller exactly once. Only its SHA-256
//! digest is persisted, so a copy of the database is not enough to reset a
//! password.

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{Duration, Utc};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};

use super::password::PasswordHash;
use crate::storage::{StorageError, StoredUser, UserRepository};

/// Default reset window.
pub const DEFAULT_RESET_TTL_MINUTES: i64 = 15;

const TOKEN_BYTES: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum ResetError {
    #[error("reset token is invalid or has expired")]
    InvalidOrExpired,

    #[error("random number generator failure")]
    Rng,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Issues and consumes reset tokens.
#[derive(Debug, Clone)]
pub struct PasswordResetManager {
    ttl: Duration,
    rng: SystemRandom,
}

impl Default for PasswordResetManager {
    fn default() -> Self {
        Self::new(Duration::minutes(DEFAULT_RESET_TTL_MINUTES))
    }
}

impl PasswordResetManager {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            rng: SystemRandom::new(),
        }
    }

    /// One-way digest of a raw token, as stored.
    pub fn digest(raw: &str) -> String {
        Base64UrlUnpadded::encode_string(&Sha256::digest(raw.as_bytes()))
    }

    /// Generate a fresh raw token.
    fn generate(&self) -> Result<String, ResetError> {
        let mut bytes = [0u8; TOKEN_BYTES];
        self.rng.fill(&mut bytes).map_err(|_| ResetError::Rng)?;
        Ok(Base64UrlUnpadded::encode_string(&bytes))
    }

    /// Issue a token for `user_id`, replacing any outstanding one. Returns
    /// the raw token; it is not retrievable afterwards.
    pub fn issue(&self, users: &UserRepository<'_>, user_id: &str) -> Result<String, ResetError> {
        let raw = self.generate()?;
        let expires_at = Utc::now() + self.ttl;
        users.set_reset_token(user_id, &Self::digest(&raw), expires_at)?;
        tracing::info!(user_id, %expires_at, "Password reset token issued");
        Ok(raw)
    }

    /// Redeem a raw token: set the new password and clear the token in one
    /// write. A second redemption of the same token fails.
    pub fn consume(
        &self,
        users: &UserRepository<'_>,
        raw: &str,
        new_password: PasswordHash,
    ) -> Result<StoredUser, ResetError> {
        let user = users
            .consume_reset_token(&Self::digest(raw), Utc::now(), new_password)?
            .ok_or(ResetError::InvalidOrExpired)?;
        tracing::info!(user_id = %user.id, "Password reset completed");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::storage::database::temp_store;
    use crate::storage::NewUser;

    fn seed(users: &UserRepository<'_>) -> StoredUser {
        users
            .create(NewUser {
                name: "Alice".to_string(),
                email: "alice@x.com".to_string(),
                password_hash: Some(PasswordHash::from_raw("Passw0rd!").unwrap()),
                external_id: None,
                role: Role::Employee,
            })
            .unwrap()
    }

    #[test]
    fn generated_tokens_are_unique_and_url_safe() {
        let manager = PasswordResetManager::default();
        let a = manager.generate().unwrap();
        let b = manager.generate().unwrap();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn digest_is_deterministic_and_not_raw() {
        let d1 = PasswordResetManager::digest("token");
        let d2 = PasswordResetManager::digest("token");
        assert_eq!(d1, d2);
        assert_ne!(d1, "token");
        assert_ne!(d1, PasswordResetManager::digest("other"));
    }

    #[test]
    fn only_digest_is_stored() {
        let (store, _dir) = temp_store();
        let users = UserRepository::new(&store);
        let user = seed(&users);
        let manager = PasswordResetManager::default();

        let raw = manager.issue(&users, &user.id).unwrap();
        let stored = users.get(&user.id).unwrap();
        assert_eq!(
            stored.reset_token_digest.as_deref(),
            Some(PasswordResetManager::digest(&raw).as_str())
        );
        assert!(!serde_json::to_string(&stored).unwrap().contains(&raw));
        assert!(stored.reset_token_expires_at.unwrap() > Utc::now());
    }

    #[test]
    fn token_is_single_use() {
        let (store, _dir) = temp_store();
        let users = UserRepository::new(&store);
        let user = seed(&users);
        let manager = PasswordResetManager::default();

        let raw = manager.issue(&users, &user.id).unwrap();
        let updated = manager
            .consume(&users, &raw, PasswordHash::from_raw("N3wPass!").unwrap())
            .unwrap();
        assert!(updated.verify_password("N3wPass!"));
        assert!(!updated.verify_password("Passw0rd!"));

        let again = manager.consume(&users, &raw, PasswordHash::from_raw("x").unwrap());
        assert!(matches!(again, Err(ResetError::InvalidOrExpired)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let (store, _dir) = temp_store();
        let users = UserRepository::new(&store);
        let user = seed(&users);
        let manager = PasswordResetManager::new(Duration::seconds(-1));

        let raw = manager.issue(&users, &user.id).unwrap();
        let result = manager.consume(&users, &raw, PasswordHash::from_raw("N3wPass!").unwrap());
        assert!(matches!(result, Err(ResetError::InvalidOrExpired)));
        assert!(users.get(&user.id).unwrap().verify_password("Passw0rd!"));
    }

    #[test]
    fn unknown_token_is_rejected() {
        let (store, _dir) = temp_store();
        let users = UserRepository::new(&store);
        seed(&users);
        let manager = PasswordResetManager::default();

        let result = manager.consume(&users, "made-up", PasswordHash::from_raw("x").unwrap());
        assert!(matches!(result, Err(ResetError::InvalidOrExpired)));
    }
}
