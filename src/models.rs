// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! This module defines the request and response data structures used by
//! the REST API. All types derive `Serialize`/`Deserialize` and `ToSchema`
//! for automatic JSON handling and OpenAPI documentation.
//!
//! Request fields are optional at the type level so that a missing field is
//! reported as a 400 validation error with a readable message instead of a
//! generic deserialization rejection.
//!
//! ## Model Categories
//!
//! - **Auth**: registration, login, federated sign-in, password reset
//! - **Leaves**: leave applications and review decisions
//! - **Users**: profiles and administration

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::Role;
use crate::storage::{LeaveStatus, StoredLeave, StoredUser};

// =============================================================================
// Auth Models
// =============================================================================

/// Request to register a new email/password account.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    /// `employee` or `manager`; anything else registers an employee.
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Request to sign in with a Google ID token.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GoogleAuthRequest {
    pub id_token: Option<String>,
    /// Requested role for a newly created account (`employee` or `manager`).
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ResetPasswordRequest {
    pub password: Option<String>,
}

/// Successful authentication: the account plus a session token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct AuthResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    /// Bearer token for the `Authorization` header.
    pub token: String,
}

impl AuthResponse {
    pub fn new(user: &StoredUser, token: String) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            token,
        }
    }
}

/// Password reset link. Delivery is the caller's concern.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResetLinkResponse {
    pub message: String,
    pub reset_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// =============================================================================
// Leave Models
// =============================================================================

/// Request to apply for leave.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplyLeaveRequest {
    /// Free text, e.g. "Sick Leave"
    pub leave_type: Option<String>,
    /// `YYYY-MM-DD`
    pub from_date: Option<String>,
    /// `YYYY-MM-DD`, not before `fromDate`
    pub to_date: Option<String>,
    pub reason: Option<String>,
}

/// Review decision on a pending leave request.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateLeaveStatusRequest {
    /// `approved` or `rejected`
    pub status: Option<String>,
}

/// Identity of the employee owning a leave request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct OwnerSummary {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl From<&StoredUser> for OwnerSummary {
    fn from(user: &StoredUser) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

/// A leave request as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LeaveResponse {
    pub id: String,
    pub employee_id: String,
    /// Populated on manager/admin listings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee: Option<OwnerSummary>,
    pub leave_type: String,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub reason: String,
    pub status: LeaveStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LeaveResponse {
    pub fn with_owner(leave: StoredLeave, employee: Option<OwnerSummary>) -> Self {
        Self {
            id: leave.id,
            employee_id: leave.employee_id,
            employee,
            leave_type: leave.leave_type,
            from_date: leave.from_date,
            to_date: leave.to_date,
            reason: leave.reason,
            status: leave.status,
            approved_by: leave.approved_by,
            created_at: leave.created_at,
            updated_at: leave.updated_at,
        }
    }
}

impl From<StoredLeave> for LeaveResponse {
    fn from(leave: StoredLeave) -> Self {
        Self::with_owner(leave, None)
    }
}

// =============================================================================
// User Models
// =============================================================================

/// User profile. Never carries password or reset-token material.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub designation: Option<String>,
    /// Whether the account is linked to Google sign-in.
    pub google_linked: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&StoredUser> for UserProfile {
    fn from(user: &StoredUser) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            phone: user.phone.clone(),
            address: user.address.clone(),
            department: user.department.clone(),
            designation: user.designation.clone(),
            google_linked: user.external_id.is_some(),
            created_at: user.created_at,
        }
    }
}

/// Self-service profile update. Absent or blank fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub department: Option<String>,
    pub designation: Option<String>,
}

/// Admin role change.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateRoleRequest {
    pub role: Option<String>,
}

/// Trimmed, non-empty view of an optional request field.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Shape check for a user-supplied email: `local@domain.tld`.
pub fn is_plausible_email(email: &str) -> bool {
    matches!(
        email.trim().split_once('@'),
        Some((local, domain)) if !local.is_empty() && domain.contains('.') && !domain.contains('@')
    )
}
