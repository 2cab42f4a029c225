// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User repository (credential store).
//!
//! Users are stored as JSON documents keyed by id, with unique secondary
//! indexes on lowercase email and on the federated subject id. Every write
//! goes through [`save_user`], which keeps the indexes consistent with the
//! document inside the same write transaction.

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable, WriteTransaction};
use serde::{Deserialize, Serialize};

use super::super::database::{
    DocumentStore, StorageError, StorageResult, USERS, USER_EMAILS, USER_EXTERNAL_IDS,
    USER_RESET_TOKENS,
};
use crate::auth::password::{verify_optional, PasswordHash};
use crate::auth::Role;

/// User document as persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredUser {
    /// Unique user identifier (UUID)
    pub id: String,
    /// Display name
    pub name: String,
    /// Email, stored lowercase
    pub email: String,
    /// Argon2 hash; absent for federation-only accounts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<PasswordHash>,
    /// Google subject id, once linked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub designation: Option<String>,
    /// SHA-256 digest of the outstanding reset token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_token_digest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_token_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredUser {
    /// Compare a raw password. Always false for federation-only accounts.
    pub fn verify_password(&self, raw: &str) -> bool {
        verify_optional(self.password_hash.as_ref(), raw)
    }

    /// Replace the password hash. Callers hash first; only the hash is kept.
    pub fn set_password(&mut self, hash: PasswordHash) {
        self.password_hash = Some(hash);
        self.updated_at = Utc::now();
    }

    fn clear_reset_token(&mut self) {
        self.reset_token_digest = None;
        self.reset_token_expires_at = None;
    }
}

/// Input for [`UserRepository::create`].
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: Option<PasswordHash>,
    pub external_id: Option<String>,
    pub role: Role,
}

/// Canonical form used for the unique email index.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Repository for user operations.
pub struct UserRepository<'a> {
    store: &'a DocumentStore,
}

impl<'a> UserRepository<'a> {
    pub fn new(store: &'a DocumentStore) -> Self {
        Self { store }
    }

    /// Create a user. Fails with `EmailTaken` if the email is registered.
    pub fn create(&self, new_user: NewUser) -> StorageResult<StoredUser> {
        let now = Utc::now();
        let user = StoredUser {
            id: uuid::Uuid::new_v4().to_string(),
            name: new_user.name.trim().to_string(),
            email: normalize_email(&new_user.email),
            password_hash: new_user.password_hash,
            external_id: new_user.external_id,
            role: new_user.role,
            phone: None,
            address: None,
            department: None,
            designation: None,
            reset_token_digest: None,
            reset_token_expires_at: None,
            created_at: now,
            updated_at: now,
        };

        let write_txn = self.store.db().begin_write()?;
        save_user(&write_txn, None, &user)?;
        write_txn.commit()?;

        tracing::debug!(user_id = %user.id, role = %user.role, "User created");
        Ok(user)
    }

    /// Get a user by ID.
    pub fn get(&self, user_id: &str) -> StorageResult<StoredUser> {
        self.find(user_id)?
            .ok_or_else(|| StorageError::NotFound(format!("User {user_id}")))
    }

    /// Look up a user by ID.
    pub fn find(&self, user_id: &str) -> StorageResult<Option<StoredUser>> {
        let read_txn = self.store.db().begin_read()?;
        let table = read_txn.open_table(USERS)?;
        match table.get(user_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Look up a user by email (case-insensitive).
    pub fn find_by_email(&self, email: &str) -> StorageResult<Option<StoredUser>> {
        let key = normalize_email(email);
        let user_id = {
            let read_txn = self.store.db().begin_read()?;
            let index = read_txn.open_table(USER_EMAILS)?;
            let id = index.get(key.as_str())?.map(|v| v.value().to_string());
            id
        };
        match user_id {
            Some(id) => self.find(&id),
            None => Ok(None),
        }
    }

    /// Look up a user by federated subject id.
    pub fn find_by_external_id(&self, external_id: &str) -> StorageResult<Option<StoredUser>> {
        let user_id = {
            let read_txn = self.store.db().begin_read()?;
            let index = read_txn.open_table(USER_EXTERNAL_IDS)?;
            let id = index.get(external_id)?.map(|v| v.value().to_string());
            id
        };
        match user_id {
            Some(id) => self.find(&id),
            None => Ok(None),
        }
    }

    /// Reconcile a federated sign-in: subject match first, then email.
    pub fn find_by_email_or_external_id(
        &self,
        email: &str,
        external_id: &str,
    ) -> StorageResult<Option<StoredUser>> {
        if let Some(user) = self.find_by_external_id(external_id)? {
            return Ok(Some(user));
        }
        self.find_by_email(email)
    }

    /// Apply `change` to the stored user and persist it, maintaining all
    /// indexes.
    ///
    /// The closure runs on the copy loaded inside the write transaction, so
    /// concurrent writers never overwrite each other's fields with stale data.
    pub fn update_with(
        &self,
        user_id: &str,
        change: impl FnOnce(&mut StoredUser),
    ) -> StorageResult<StoredUser> {
        let write_txn = self.store.db().begin_write()?;
        let previous = load_user(&write_txn, user_id)?
            .ok_or_else(|| StorageError::NotFound(format!("User {user_id}")))?;

        let mut updated = previous.clone();
        change(&mut updated);
        updated.id = previous.id.clone();
        updated.email = normalize_email(&updated.email);
        updated.updated_at = Utc::now();
        save_user(&write_txn, Some(&previous), &updated)?;
        write_txn.commit()?;
        Ok(updated)
    }

    /// Attach a federated subject id to an existing account.
    pub fn link_external_id(&self, user_id: &str, external_id: &str) -> StorageResult<StoredUser> {
        self.update_with(user_id, |user| {
            user.external_id = Some(external_id.to_string());
        })
    }

    /// Change a user's role.
    pub fn set_role(&self, user_id: &str, role: Role) -> StorageResult<StoredUser> {
        self.update_with(user_id, |user| user.role = role)
    }

    /// Delete a user and every index entry pointing at it.
    pub fn delete(&self, user_id: &str) -> StorageResult<()> {
        let write_txn = self.store.db().begin_write()?;
        let user = load_user(&write_txn, user_id)?
            .ok_or_else(|| StorageError::NotFound(format!("User {user_id}")))?;
        {
            let mut emails = write_txn.open_table(USER_EMAILS)?;
            emails.remove(user.email.as_str())?;
        }
        if let Some(external_id) = &user.external_id {
            let mut external_ids = write_txn.open_table(USER_EXTERNAL_IDS)?;
            external_ids.remove(external_id.as_str())?;
        }
        if let Some(digest) = &user.reset_token_digest {
            let mut resets = write_txn.open_table(USER_RESET_TOKENS)?;
            resets.remove(digest.as_str())?;
        }
        {
            let mut users = write_txn.open_table(USERS)?;
            users.remove(user_id)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// List all users, oldest first.
    pub fn list_all(&self) -> StorageResult<Vec<StoredUser>> {
        let read_txn = self.store.db().begin_read()?;
        let table = read_txn.open_table(USERS)?;

        let mut users = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            users.push(serde_json::from_slice::<StoredUser>(value.value())?);
        }
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(users)
    }

    // ========== Password Reset ==========

    /// Record a reset token digest and expiry, replacing any previous token.
    pub fn set_reset_token(
        &self,
        user_id: &str,
        digest: &str,
        expires_at: DateTime<Utc>,
    ) -> StorageResult<()> {
        self.update_with(user_id, |user| {
            user.reset_token_digest = Some(digest.to_string());
            user.reset_token_expires_at = Some(expires_at);
        })?;
        Ok(())
    }

    /// Find the user holding an unexpired reset token with this digest.
    pub fn find_by_reset_token(
        &self,
        digest: &str,
        now: DateTime<Utc>,
    ) -> StorageResult<Option<StoredUser>> {
        let user_id = {
            let read_txn = self.store.db().begin_read()?;
            let index = read_txn.open_table(USER_RESET_TOKENS)?;
            let id = index.get(digest)?.map(|v| v.value().to_string());
            id
        };
        let Some(user_id) = user_id else {
            return Ok(None);
        };
        Ok(self
            .find(&user_id)?
            .filter(|user| reset_token_matches(user, digest, now)))
    }

    /// Atomically swap in a new password and clear the reset token.
    ///
    /// Returns `None` (and changes nothing) when no user holds an unexpired
    /// token with this digest, so a token can be consumed at most once.
    pub fn consume_reset_token(
        &self,
        digest: &str,
        now: DateTime<Utc>,
        new_password: PasswordHash,
    ) -> StorageResult<Option<StoredUser>> {
        let write_txn = self.store.db().begin_write()?;

        let user_id = {
            let index = write_txn.open_table(USER_RESET_TOKENS)?;
            let id = index.get(digest)?.map(|v| v.value().to_string());
            id
        };
        let Some(user_id) = user_id else {
            return Ok(None);
        };
        let Some(previous) = load_user(&write_txn, &user_id)? else {
            return Ok(None);
        };
        if !reset_token_matches(&previous, digest, now) {
            return Ok(None);
        }

        let mut user = previous.clone();
        user.set_password(new_password);
        user.clear_reset_token();
        save_user(&write_txn, Some(&previous), &user)?;
        write_txn.commit()?;
        Ok(Some(user))
    }
}

fn reset_token_matches(user: &StoredUser, digest: &str, now: DateTime<Utc>) -> bool {
    user.reset_token_digest.as_deref() == Some(digest)
        && user.reset_token_expires_at.is_some_and(|expires| expires > now)
}

/// Read a user inside a write transaction.
fn load_user(write_txn: &WriteTransaction, user_id: &str) -> StorageResult<Option<StoredUser>> {
    let table = write_txn.open_table(USERS)?;
    let bytes = table.get(user_id)?.map(|v| v.value().to_vec());
    match bytes {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

/// Write a user document and reconcile its index entries against the
/// previous version. Fails (leaving the transaction uncommitted) if the email
/// or external id belongs to a different user.
fn save_user(
    write_txn: &WriteTransaction,
    previous: Option<&StoredUser>,
    user: &StoredUser,
) -> StorageResult<()> {
    {
        let mut emails = write_txn.open_table(USER_EMAILS)?;
        let owner = emails.get(user.email.as_str())?.map(|v| v.value().to_string());
        if owner.is_some_and(|owner| owner != user.id) {
            return Err(StorageError::EmailTaken(user.email.clone()));
        }
        if let Some(prev) = previous.filter(|p| p.email != user.email) {
            emails.remove(prev.email.as_str())?;
        }
        emails.insert(user.email.as_str(), user.id.as_str())?;
    }

    {
        let mut external_ids = write_txn.open_table(USER_EXTERNAL_IDS)?;
        if let Some(external_id) = &user.external_id {
            let owner = external_ids
                .get(external_id.as_str())?
                .map(|v| v.value().to_string());
            if owner.is_some_and(|owner| owner != user.id) {
                return Err(StorageError::ExternalIdTaken(external_id.clone()));
            }
        }
        if let Some(prev_id) = previous.and_then(|p| p.external_id.as_ref()) {
            if user.external_id.as_ref() != Some(prev_id) {
                external_ids.remove(prev_id.as_str())?;
            }
        }
        if let Some(external_id) = &user.external_id {
            external_ids.insert(external_id.as_str(), user.id.as_str())?;
        }
    }

    {
        let mut resets = write_txn.open_table(USER_RESET_TOKENS)?;
        if let Some(prev_digest) = previous.and_then(|p| p.reset_token_digest.as_ref()) {
            if user.reset_token_digest.as_ref() != Some(prev_digest) {
                resets.remove(prev_digest.as_str())?;
            }
        }
        if let Some(digest) = &user.reset_token_digest {
            resets.insert(digest.as_str(), user.id.as_str())?;
        }
    }

    let json = serde_json::to_vec(user)?;
    let mut users = write_txn.open_table(USERS)?;
    users.insert(user.id.as_str(), json.as_slice())?;
    Ok(())
}
