// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ownership checks for owner-scoped records.
//!
//! Employees may only act on records they own (e.g. cancelling their own
//! leave request). Reviewers act on everyone's records through role checks
//! instead, so ownership is only consulted on owner-only operations.

use crate::auth::AuthenticatedUser;

/// Trait for resources that have an owner.
pub trait OwnedResource {
    /// Human-readable resource kind used in error messages.
    const KIND: &'static str = "resource";

    /// Get the owner's user ID.
    fn owner_user_id(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("user {user_id} does not own this {resource}")]
pub struct NotOwner {
    pub user_id: String,
    pub resource: &'static str,
}

/// Trait for enforcing ownership.
pub trait OwnershipEnforcer {
    /// Verify that the user owns this resource.
    fn verify_ownership(&self, user: &AuthenticatedUser) -> Result<(), NotOwner>;
}

impl<T: OwnedResource> OwnershipEnforcer for T {
    fn verify_ownership(&self, user: &AuthenticatedUser) -> Result<(), NotOwner> {
        if self.owner_user_id() == user.user_id {
            Ok(())
        } else {
            Err(NotOwner {
                user_id: user.user_id.clone(),
                resource: T::KIND,
            })
        }
    }
}
