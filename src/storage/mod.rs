// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistent storage on an embedded redb database file under `DATA_DIR`.
//!
//! ## Layout
//!
//! ```text
//! $DATA_DIR/
//!   chronohub.redb    # users, leave requests and their indexes
//! ```
//!
//! ## Important Notes
//!
//! - Records are JSON documents keyed by UUID
//! - Uniqueness (email, federated subject) is enforced by index tables
//!   updated in the same write transaction as the record
//! - Status changes on leave requests are compare-and-set

pub mod database;
pub mod ownership;
pub mod repository;

pub use database::{DocumentStore, StorageError, StorageResult};
pub use ownership::{NotOwner, OwnedResource, OwnershipEnforcer};
pub use repository::{
    normalize_email, LeaveRepository, LeaveStatus, NewUser, StoredLeave, StoredUser,
    TransitionOutcome, UserRepository,
};
