// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Leave request repository.

use chrono::{DateTime, NaiveDate, Utc};
use redb::{ReadableDatabase, ReadableTable};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::database::{DocumentStore, StorageError, StorageResult, LEAVES};
use super::super::ownership::OwnedResource;

/// Leave request status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LeaveStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl LeaveStatus {
    /// Terminal statuses accept no further transitions.
    pub fn is_terminal(self) -> bool {
        !matches!(self, LeaveStatus::Pending)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LeaveStatus::Pending => "pending",
            LeaveStatus::Approved => "approved",
            LeaveStatus::Rejected => "rejected",
            LeaveStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for LeaveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Leave request as persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredLeave {
    pub id: String,
    /// Requesting employee's user id
    pub employee_id: String,
    pub leave_type: String,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub reason: String,
    pub status: LeaveStatus,
    /// Reviewer who approved or rejected the request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredLeave {
    pub fn new(
        employee_id: impl Into<String>,
        leave_type: impl Into<String>,
        from_date: NaiveDate,
        to_date: NaiveDate,
        reason: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            employee_id: employee_id.into(),
            leave_type: leave_type.into(),
            from_date,
            to_date,
            reason: reason.into(),
            status: LeaveStatus::Pending,
            approved_by: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl OwnedResource for StoredLeave {
    const KIND: &'static str = "leave request";

    fn owner_user_id(&self) -> &str {
        &self.employee_id
    }
}

/// Result of a compare-and-set status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The record was in the expected status and has been updated.
    Applied(StoredLeave),
    /// The record was in another status; nothing was written.
    StatusMismatch(StoredLeave),
}

/// Repository for leave request operations.
pub struct LeaveRepository<'a> {
    store: &'a DocumentStore,
}

impl<'a> LeaveRepository<'a> {
    pub fn new(store: &'a DocumentStore) -> Self {
        Self { store }
    }

    /// Persist a new leave request.
    pub fn create(&self, leave: &StoredLeave) -> StorageResult<()> {
        let json = serde_json::to_vec(leave)?;
        let write_txn = self.store.db().begin_write()?;
        {
            let mut table = write_txn.open_table(LEAVES)?;
            table.insert(leave.id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Get a leave request by ID.
    pub fn get(&self, leave_id: &str) -> StorageResult<StoredLeave> {
        let read_txn = self.store.db().begin_read()?;
        let table = read_txn.open_table(LEAVES)?;
        match table.get(leave_id)? {
            Some(value) => Ok(serde_json::from_slice(value.value())?),
            None => Err(StorageError::NotFound(format!("Leave {leave_id}"))),
        }
    }

    /// All leave requests, newest first.
    pub fn list_all(&self) -> StorageResult<Vec<StoredLeave>> {
        self.list_filtered(|_| true)
    }

    /// Leave requests submitted by one employee, newest first.
    pub fn list_by_employee(&self, employee_id: &str) -> StorageResult<Vec<StoredLeave>> {
        self.list_filtered(|leave| leave.employee_id == employee_id)
    }

    fn list_filtered(&self, keep: impl Fn(&StoredLeave) -> bool) -> StorageResult<Vec<StoredLeave>> {
        let read_txn = self.store.db().begin_read()?;
        let table = read_txn.open_table(LEAVES)?;

        let mut leaves = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let leave: StoredLeave = serde_json::from_slice(value.value())?;
            if keep(&leave) {
                leaves.push(leave);
            }
        }
        leaves.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(leaves)
    }

    /// Move a leave from `expected` to `next` if and only if it is still in
    /// `expected`. The read and the write share one write transaction, so two
    /// concurrent transitions of the same record cannot both apply.
    pub fn transition(
        &self,
        leave_id: &str,
        expected: LeaveStatus,
        next: LeaveStatus,
        approved_by: Option<&str>,
    ) -> StorageResult<TransitionOutcome> {
        let write_txn = self.store.db().begin_write()?;
        let outcome = {
            let mut table = write_txn.open_table(LEAVES)?;
            let bytes = table.get(leave_id)?.map(|v| v.value().to_vec());
            let mut leave: StoredLeave = match bytes {
                Some(bytes) => serde_json::from_slice(&bytes)?,
                None => return Err(StorageError::NotFound(format!("Leave {leave_id}"))),
            };

            if leave.status != expected {
                TransitionOutcome::StatusMismatch(leave)
            } else {
                leave.status = next;
                if let Some(approver) = approved_by {
                    leave.approved_by = Some(approver.to_string());
                }
                leave.updated_at = Utc::now();

                let json = serde_json::to_vec(&leave)?;
                table.insert(leave_id, json.as_slice())?;
                TransitionOutcome::Applied(leave)
            }
        };

        match outcome {
            TransitionOutcome::Applied(_) => write_txn.commit()?,
            TransitionOutcome::StatusMismatch(_) => write_txn.abort()?,
        }
        Ok(outcome)
    }

    /// Delete a leave request.
    pub fn delete(&self, leave_id: &str) -> StorageResult<()> {
        let write_txn = self.store.db().begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(LEAVES)?;
            let removed = table.remove(leave_id)?.is_some();
            removed
        };
        if !removed {
            return Err(StorageError::NotFound(format!("Leave {leave_id}")));
        }
        write_txn.commit()?;
        Ok(())
    }
}
