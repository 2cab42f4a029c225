// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User roles for authorization.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// User roles for authorization.
///
/// ## Role Hierarchy
///
/// - `Employee` - Applies for leave, sees and cancels own requests
/// - `Manager` - Approves or rejects any pending request
/// - `Admin` - Everything a manager can do, plus user and record administration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular staff member
    Employee,
    /// Line manager (leave approvals)
    Manager,
    /// Full administrative access
    Admin,
}

/// Roles a caller may pick for themselves at sign-up.
pub const SELF_SERVICE_ROLES: [Role; 2] = [Role::Employee, Role::Manager];

impl Role {
    /// Parse role from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Role> {
        match s.trim().to_lowercase().as_str() {
            "employee" => Some(Role::Employee),
            "manager" => Some(Role::Manager),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    /// Whether this role may be self-assigned on registration or first
    /// federated sign-in.
    pub fn is_self_service(&self) -> bool {
        SELF_SERVICE_ROLES.contains(self)
    }

    /// Resolve the role for a self-service account from untrusted input.
    ///
    /// Anything other than a self-service role (including `admin`, unknown
    /// strings and a missing value) falls back to the default role.
    pub fn for_self_signup(requested: Option<&str>) -> Role {
        requested
            .and_then(Role::parse)
            .filter(Role::is_self_service)
            .unwrap_or_default()
    }

    /// Managers and admins may decide on leave requests.
    pub fn can_review_leave(&self) -> bool {
        matches!(self, Role::Manager | Role::Admin)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Employee => "employee",
            Role::Manager => "manager",
            Role::Admin => "admin",
        }
    }
}

impl Default for Role {
    /// Default role is Employee (least privilege).
    fn default() -> Self {
        Role::Employee
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse("MANAGER"), Some(Role::Manager));
        assert_eq!(Role::parse(" Employee "), Some(Role::Employee));
        assert_eq!(Role::parse("auditor"), None);
    }

    #[test]
    fn self_signup_never_grants_admin() {
        assert_eq!(Role::for_self_signup(Some("admin")), Role::Employee);
        assert_eq!(Role::for_self_signup(Some("ADMIN")), Role::Employee);
    }

    #[test]
    fn self_signup_accepts_manager_and_employee() {
        assert_eq!(Role::for_self_signup(Some("manager")), Role::Manager);
        assert_eq!(Role::for_self_signup(Some("employee")), Role::Employee);
    }

    #[test]
    fn self_signup_defaults_to_employee() {
        assert_eq!(Role::for_self_signup(None), Role::Employee);
        assert_eq!(Role::for_self_signup(Some("ceo")), Role::Employee);
    }

    #[test]
    fn only_managers_and_admins_review() {
        assert!(!Role::Employee.can_review_leave());
        assert!(Role::Manager.can_review_leave());
        assert!(Role::Admin.can_review_leave());
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Manager).unwrap(), r#""manager""#);
        let role: Role = serde_json::from_str(r#""admin""#).unwrap();
        assert_eq!(role, Role::Admin);
    }
}
