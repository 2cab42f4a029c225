// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authenticated user representation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::roles::Role;
use crate::storage::StoredUser;

/// Authenticated user resolved from a session token.
///
/// The role is always the one currently stored for the user, not the one
/// embedded in the token, so role changes take effect on the next request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    /// Canonical user ID (token `sub` claim)
    pub user_id: String,
    pub name: String,
    pub email: String,
    /// User's role
    pub role: Role,
}

impl AuthenticatedUser {
    pub fn from_stored(user: &StoredUser) -> Self {
        Self {
            user_id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }

    /// Check whether the user holds one of the allowed roles.
    pub fn has_any_role(&self, allowed: &[Role]) -> bool {
        allowed.contains(&self.role)
    }

    /// Check if this user is an admin.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: "user_123".to_string(),
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            role,
        }
    }

    #[test]
    fn has_any_role_checks_membership() {
        let manager = user(Role::Manager);
        assert!(manager.has_any_role(&[Role::Manager, Role::Admin]));
        assert!(!manager.has_any_role(&[Role::Employee]));
        assert!(!manager.has_any_role(&[]));
    }

    #[test]
    fn only_admin_is_admin() {
        assert!(user(Role::Admin).is_admin());
        assert!(!user(Role::Manager).is_admin());
        assert!(!user(Role::Employee).is_admin());
    }
}
