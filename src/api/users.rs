// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints: own profile and admin user management.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    auth::{AdminOnly, Auth, Role},
    error::{ApiError, ApiJson},
    models::{
        is_plausible_email, non_blank, MessageResponse, UpdateProfileRequest, UpdateRoleRequest,
        UserProfile,
    },
    state::AppState,
    storage::UserRepository,
};

/// Get the current authenticated user's profile.
#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "User profile", body = UserProfile),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn get_current_user(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<UserProfile>, ApiError> {
    let stored = UserRepository::new(&state.store).get(&user.user_id)?;
    Ok(Json(UserProfile::from(&stored)))
}

/// Update the caller's own profile. Absent or blank fields are kept.
#[utoipa::path(
    put,
    path = "/api/users/profile/update",
    request_body = UpdateProfileRequest,
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Updated profile", body = UserProfile),
        (status = 400, description = "Invalid or already registered email"),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn update_profile(
    Auth(user): Auth,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<UpdateProfileRequest>,
) -> Result<Json<UserProfile>, ApiError> {
    let email = non_blank(request.email.as_deref());
    if email.is_some_and(|email| !is_plausible_email(email)) {
        return Err(ApiError::bad_request("Please provide a valid email"));
    }

    let updated = UserRepository::new(&state.store).update_with(&user.user_id, |stored| {
        if let Some(name) = non_blank(request.name.as_deref()) {
            stored.name = name.to_string();
        }
        if let Some(email) = email {
            stored.email = email.to_string();
        }
        assign_non_blank(&mut stored.phone, request.phone.as_deref());
        assign_non_blank(&mut stored.address, request.address.as_deref());
        assign_non_blank(&mut stored.department, request.department.as_deref());
        assign_non_blank(&mut stored.designation, request.designation.as_deref());
    })?;
    tracing::info!(user_id = %updated.id, "Profile updated");
    Ok(Json(UserProfile::from(&updated)))
}

fn assign_non_blank(field: &mut Option<String>, value: Option<&str>) {
    if let Some(value) = non_blank(value) {
        *field = Some(value.to_string());
    }
}

/// List every user (admin only).
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "All users", body = [UserProfile]),
        (status = 403, description = "Caller is not an admin"),
    )
)]
pub async fn list_users(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserProfile>>, ApiError> {
    let users = UserRepository::new(&state.store).list_all()?;
    Ok(Json(users.iter().map(UserProfile::from).collect()))
}

/// Change a user's role (admin only).
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(
        ("id" = String, Path, description = "User identifier")
    ),
    request_body = UpdateRoleRequest,
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Updated user", body = UserProfile),
        (status = 400, description = "Unknown role"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "User not found"),
    )
)]
pub async fn update_user_role(
    AdminOnly(admin): AdminOnly,
    Path(user_id): Path<String>,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<UpdateRoleRequest>,
) -> Result<Json<UserProfile>, ApiError> {
    let role = request
        .role
        .as_deref()
        .and_then(Role::parse)
        .ok_or_else(|| ApiError::bad_request("role must be employee, manager or admin"))?;

    let updated = UserRepository::new(&state.store).set_role(&user_id, role)?;
    tracing::info!(
        admin_id = %admin.user_id,
        user_id = %updated.id,
        role = %updated.role,
        "User role changed"
    );
    Ok(Json(UserProfile::from(&updated)))
}

/// Delete a user (admin only). Their leave requests are kept.
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(
        ("id" = String, Path, description = "User identifier")
    ),
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "User not found"),
    )
)]
pub async fn delete_user(
    AdminOnly(admin): AdminOnly,
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, ApiError> {
    UserRepository::new(&state.store).delete(&user_id)?;
    tracing::info!(admin_id = %admin.user_id, user_id = %user_id, "User deleted");
    Ok(Json(MessageResponse::new("User deleted")))
}
