// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated users.
//!
//! Use the `Auth` extractor in handlers to require authentication, or one of
//! the role-gated extractors to also require role membership:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user is AuthenticatedUser
//! }
//!
//! async fn review(ManagerOrAdmin(user): ManagerOrAdmin) -> impl IntoResponse {
//!     // only managers and admins get here
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};

use super::{AuthError, AuthenticatedUser, Role};
use crate::state::AppState;
use crate::storage::UserRepository;

/// Extract the bearer token from the Authorization header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .ok_or(AuthError::InvalidAuthHeader)?;

    if token.is_empty() {
        return Err(AuthError::MissingAuthHeader);
    }
    Ok(token)
}

/// Resolve the caller: verify the bearer token, then load the user it names.
///
/// The returned role is the stored one; a deleted user is rejected even if
/// their token has not expired yet.
pub async fn resolve_identity(
    headers: &HeaderMap,
    state: &AppState,
) -> Result<AuthenticatedUser, AuthError> {
    let token = bearer_token(headers)?;
    let claims = state.tokens.verify(token)?;

    let user = UserRepository::new(&state.store)
        .find(&claims.sub)
        .map_err(|e| AuthError::InternalError(e.to_string()))?
        .ok_or(AuthError::UnknownUser)?;

    Ok(AuthenticatedUser::from_stored(&user))
}

/// Fail with `InsufficientPermissions` unless the user holds an allowed role.
pub fn enforce_roles(user: &AuthenticatedUser, allowed: &[Role]) -> Result<(), AuthError> {
    if user.has_any_role(allowed) {
        Ok(())
    } else {
        tracing::debug!(
            user_id = %user.user_id,
            role = %user.role,
            "Role not permitted for this operation"
        );
        Err(AuthError::InsufficientPermissions)
    }
}

/// Extractor for authenticated users.
///
/// Uses the user placed in request extensions by
/// [`require_auth`](super::middleware::require_auth) when present, and
/// resolves the bearer token itself otherwise.
///
/// # Example
///
/// ```rust,ignore
/// async fn list_leaves(
///     Auth(user): Auth,
///     State(state): State<AppState>,
/// ) -> Result<Json<Vec<LeaveResponse>>, ApiError> {
///     // user.user_id contains the authenticated user's ID
///     // user.role contains their current role
/// }
/// ```
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // First check if middleware already set the user
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>().cloned() {
            return Ok(Auth(user));
        }

        let user = resolve_identity(&parts.headers, state).await?;
        Ok(Auth(user))
    }
}

async fn gate(
    parts: &mut Parts,
    state: &AppState,
    allowed: &[Role],
) -> Result<AuthenticatedUser, AuthError> {
    let Auth(user) = Auth::from_request_parts(parts, state).await?;
    enforce_roles(&user, allowed)?;
    Ok(user)
}

/// Extractor that requires the employee role.
pub struct EmployeeOnly(pub AuthenticatedUser);

impl FromRequestParts<AppState> for EmployeeOnly {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        gate(parts, state, &[Role::Employee]).await.map(EmployeeOnly)
    }
}

/// Extractor that requires the manager or admin role.
pub struct ManagerOrAdmin(pub AuthenticatedUser);

impl FromRequestParts<AppState> for ManagerOrAdmin {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        gate(parts, state, &[Role::Manager, Role::Admin])
            .await
            .map(ManagerOrAdmin)
    }
}

/// Extractor that requires admin role.
pub struct AdminOnly(pub AuthenticatedUser);

impl FromRequestParts<AppState> for AdminOnly {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        gate(parts, state, &[Role::Admin]).await.map(AdminOnly)
    }
}
