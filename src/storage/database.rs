// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded document database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `users`: user_id → serialized StoredUser
//! - `user_emails`: lowercase email → user_id (unique)
//! - `user_external_ids`: federated subject → user_id (unique, sparse)
//! - `user_reset_tokens`: reset token digest → user_id
//! - `leaves`: leave_id → serialized StoredLeave
//!
//! redb allows a single writer at a time, so every read-check-write done
//! inside one write transaction is atomic with respect to other writers.

use std::path::Path;

use redb::{Database, ReadableDatabase, TableDefinition};

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: user_id → serialized StoredUser (JSON bytes).
pub(crate) const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// Unique index: lowercase email → user_id.
pub(crate) const USER_EMAILS: TableDefinition<&str, &str> = TableDefinition::new("user_emails");

/// Unique index: federated subject id → user_id.
pub(crate) const USER_EXTERNAL_IDS: TableDefinition<&str, &str> =
    TableDefinition::new("user_external_ids");

/// Index: reset token digest → user_id.
pub(crate) const USER_RESET_TOKENS: TableDefinition<&str, &str> =
    TableDefinition::new("user_reset_tokens");

/// Primary table: leave_id → serialized StoredLeave (JSON bytes).
pub(crate) const LEAVES: TableDefinition<&str, &[u8]> = TableDefinition::new("leaves");

/// Database file name inside the data directory.
pub const DATABASE_FILE: &str = "chronohub.redb";

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("email already registered: {0}")]
    EmailTaken(String),

    #[error("external identity already linked: {0}")]
    ExternalIdTaken(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// DocumentStore
// =============================================================================

/// Handle to the embedded database. Cheap to share behind an `Arc`.
pub struct DocumentStore {
    db: Database,
}

impl DocumentStore {
    /// Open (or create) the database file in `data_dir`.
    pub fn open_in(data_dir: &Path) -> StorageResult<Self> {
        std::fs::create_dir_all(data_dir)?;
        Self::open(&data_dir.join(DATABASE_FILE))
    }

    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(USER_EMAILS)?;
            let _ = write_txn.open_table(USER_EXTERNAL_IDS)?;
            let _ = write_txn.open_table(USER_RESET_TOKENS)?;
            let _ = write_txn.open_table(LEAVES)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    pub(crate) fn db(&self) -> &Database {
        &self.db
    }

    /// Round-trip a read transaction to prove the database answers.
    pub fn health_check(&self) -> StorageResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(USERS)?;
        let _ = read_txn.open_table(LEAVES)?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn temp_store() -> (DocumentStore, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = DocumentStore::open_in(dir.path()).unwrap();
    (store, dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_file_and_tables() {
        let (store, dir) = temp_store();
        assert!(dir.path().join(DATABASE_FILE).exists());
        store.health_check().unwrap();
    }

    #[test]
    fn reopen_existing_database() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = DocumentStore::open_in(dir.path()).unwrap();
            store.health_check().unwrap();
        }
        let store = DocumentStore::open_in(dir.path()).unwrap();
        store.health_check().unwrap();
    }
}
