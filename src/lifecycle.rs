// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Leave Lifecycle
//!
//! State machine and access rules for leave requests.
//!
//! ```text
//!            approve (manager/admin)
//!          ┌──────────────────────────► approved
//!          │ reject (manager/admin)
//! pending ─┼──────────────────────────► rejected
//!          │ cancel (owning employee)
//!          └──────────────────────────► cancelled
//! ```
//!
//! Every transition starts from `pending` and is applied as a
//! compare-and-set against the store, so two reviewers racing on the same
//! request cannot both succeed. Deletion is an admin override outside the
//! state machine.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate};

use crate::auth::{AuthenticatedUser, Role};
use crate::models::{non_blank, ApplyLeaveRequest, LeaveResponse, OwnerSummary, UpdateLeaveStatusRequest};
use crate::storage::{
    DocumentStore, LeaveRepository, LeaveStatus, OwnershipEnforcer, StorageError, StoredLeave,
    TransitionOutcome, UserRepository,
};

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Leave not found")]
    NotFound,

    #[error("Leave request is already {from}; cannot move it to {to}")]
    InvalidTransition { from: LeaveStatus, to: LeaveStatus },

    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for LifecycleError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) => LifecycleError::NotFound,
            other => LifecycleError::Storage(other),
        }
    }
}

pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// A transition out of `pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveAction {
    Approve,
    Reject,
    Cancel,
}

impl LeaveAction {
    /// Parse a reviewer's requested status.
    pub fn from_decision(status: &str) -> Option<Self> {
        match status.trim().to_lowercase().as_str() {
            "approved" => Some(LeaveAction::Approve),
            "rejected" => Some(LeaveAction::Reject),
            _ => None,
        }
    }

    pub fn target(self) -> LeaveStatus {
        match self {
            LeaveAction::Approve => LeaveStatus::Approved,
            LeaveAction::Reject => LeaveStatus::Rejected,
            LeaveAction::Cancel => LeaveStatus::Cancelled,
        }
    }

    /// Whether `role` may trigger this action.
    pub fn permits(self, role: Role) -> bool {
        match self {
            LeaveAction::Approve | LeaveAction::Reject => role.can_review_leave(),
            LeaveAction::Cancel => role == Role::Employee,
        }
    }

    /// Whether the acting reviewer is recorded on the request.
    fn records_approver(self) -> bool {
        !matches!(self, LeaveAction::Cancel)
    }
}

/// Whether a transition `from -> to` exists in the state machine.
pub fn is_allowed_transition(from: LeaveStatus, to: LeaveStatus) -> bool {
    from == LeaveStatus::Pending && to.is_terminal()
}

/// Applies leave operations on behalf of an authenticated caller.
pub struct LeaveLifecycle<'a> {
    store: &'a DocumentStore,
}

impl<'a> LeaveLifecycle<'a> {
    pub fn new(store: &'a DocumentStore) -> Self {
        Self { store }
    }

    fn leaves(&self) -> LeaveRepository<'a> {
        LeaveRepository::new(self.store)
    }

    /// Submit a new pending request owned by the caller (employees only).
    pub fn apply(
        &self,
        caller: &AuthenticatedUser,
        req: ApplyLeaveRequest,
    ) -> LifecycleResult<LeaveResponse> {
        require_role(caller, &[Role::Employee], "Only employees can apply for leave")?;

        let (Some(leave_type), Some(from_raw), Some(to_raw), Some(reason)) = (
            non_blank(req.leave_type.as_deref()),
            non_blank(req.from_date.as_deref()),
            non_blank(req.to_date.as_deref()),
            non_blank(req.reason.as_deref()),
        ) else {
            return Err(LifecycleError::Validation(
                "Please provide leaveType, fromDate, toDate and reason".to_string(),
            ));
        };

        let from_date = parse_date(from_raw, "fromDate")?;
        let to_date = parse_date(to_raw, "toDate")?;
        if from_date > to_date {
            return Err(LifecycleError::Validation(
                "fromDate must not be after toDate".to_string(),
            ));
        }

        let leave = StoredLeave::new(&caller.user_id, leave_type, from_date, to_date, reason);
        self.leaves().create(&leave)?;

        tracing::info!(leave_id = %leave.id, user_id = %caller.user_id, "Leave applied");
        Ok(leave.into())
    }

    /// Employees see their own requests; reviewers see all of them with the
    /// owner's identity attached.
    pub fn list_visible(&self, caller: &AuthenticatedUser) -> LifecycleResult<Vec<LeaveResponse>> {
        if !caller.role.can_review_leave() {
            let leaves = self.leaves().list_by_employee(&caller.user_id)?;
            return Ok(leaves.into_iter().map(LeaveResponse::from).collect());
        }

        let users = UserRepository::new(self.store);
        let mut owners: HashMap<String, Option<OwnerSummary>> = HashMap::new();
        let mut responses = Vec::new();
        for leave in self.leaves().list_all()? {
            let owner = match owners.get(&leave.employee_id) {
                Some(owner) => owner.clone(),
                None => {
                    let owner = users.find(&leave.employee_id)?.as_ref().map(OwnerSummary::from);
                    owners.insert(leave.employee_id.clone(), owner.clone());
                    owner
                }
            };
            responses.push(LeaveResponse::with_owner(leave, owner));
        }
        Ok(responses)
    }

    /// Approve or reject a pending request (managers and admins).
    pub fn decide(
        &self,
        caller: &AuthenticatedUser,
        leave_id: &str,
        req: UpdateLeaveStatusRequest,
    ) -> LifecycleResult<LeaveResponse> {
        let action = req
            .status
            .as_deref()
            .and_then(LeaveAction::from_decision)
            .ok_or_else(|| {
                LifecycleError::Validation("status must be 'approved' or 'rejected'".to_string())
            })?;
        self.perform(caller, leave_id, action)
    }

    /// Cancel the caller's own pending request.
    pub fn cancel(&self, caller: &AuthenticatedUser, leave_id: &str) -> LifecycleResult<LeaveResponse> {
        self.perform(caller, leave_id, LeaveAction::Cancel)
    }

    fn perform(
        &self,
        caller: &AuthenticatedUser,
        leave_id: &str,
        action: LeaveAction,
    ) -> LifecycleResult<LeaveResponse> {
        if !action.permits(caller.role) {
            return Err(LifecycleError::Forbidden(
                "Not authorized to change this leave request".to_string(),
            ));
        }

        let leaves = self.leaves();
        let current = leaves.get(leave_id)?;
        if action == LeaveAction::Cancel {
            current
                .verify_ownership(caller)
                .map_err(|e| LifecycleError::Forbidden(e.to_string()))?;
        }

        let target = action.target();
        if !is_allowed_transition(current.status, target) {
            return Err(LifecycleError::InvalidTransition {
                from: current.status,
                to: target,
            });
        }

        let approver = action.records_approver().then_some(caller.user_id.as_str());
        match leaves.transition(leave_id, LeaveStatus::Pending, target, approver)? {
            TransitionOutcome::Applied(leave) => {
                tracing::info!(
                    leave_id,
                    user_id = %caller.user_id,
                    status = %leave.status,
                    "Leave status changed"
                );
                Ok(leave.into())
            }
            TransitionOutcome::StatusMismatch(leave) => {
                tracing::debug!(leave_id, status = %leave.status, "Lost transition race");
                Err(LifecycleError::InvalidTransition {
                    from: leave.status,
                    to: target,
                })
            }
        }
    }

    /// Remove a request outright, whatever its status (admins only).
    pub fn delete(&self, caller: &AuthenticatedUser, leave_id: &str) -> LifecycleResult<()> {
        if !caller.is_admin() {
            return Err(LifecycleError::Forbidden(
                "Only admins can delete leave requests".to_string(),
            ));
        }
        self.leaves().delete(leave_id)?;
        tracing::info!(leave_id, user_id = %caller.user_id, "Leave deleted");
        Ok(())
    }
}

fn require_role(caller: &AuthenticatedUser, allowed: &[Role], message: &str) -> LifecycleResult<()> {
    if caller.has_any_role(allowed) {
        Ok(())
    } else {
        Err(LifecycleError::Forbidden(message.to_string()))
    }
}

/// Accept `YYYY-MM-DD`, or an RFC 3339 timestamp (its date part is kept).
fn parse_date(raw: &str, field: &str) -> LifecycleResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
        .map_err(|_| LifecycleError::Validation(format!("{field} must be a date (YYYY-MM-DD)")))
}
