// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to the document store.
//!
//! Each repository provides operations for one entity type and borrows the
//! shared [`DocumentStore`](super::DocumentStore).

pub mod leaves;
pub mod users;

pub use leaves::{LeaveRepository, LeaveStatus, StoredLeave, TransitionOutcome};
pub use users::{normalize_email, NewUser, StoredUser, UserRepository};
