// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Leave request endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    auth::{AdminOnly, Auth, EmployeeOnly, ManagerOrAdmin},
    error::{ApiError, ApiJson},
    lifecycle::LeaveLifecycle,
    models::{ApplyLeaveRequest, LeaveResponse, UpdateLeaveStatusRequest},
    state::AppState,
};

#[utoipa::path(
    post,
    path = "/api/leaves",
    request_body = ApplyLeaveRequest,
    tag = "Leaves",
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Leave request created", body = LeaveResponse),
        (status = 400, description = "Missing or invalid fields"),
        (status = 403, description = "Caller is not an employee"),
    )
)]
pub async fn apply_leave(
    EmployeeOnly(user): EmployeeOnly,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ApplyLeaveRequest>,
) -> Result<(StatusCode, Json<LeaveResponse>), ApiError> {
    let leave = LeaveLifecycle::new(&state.store).apply(&user, request)?;
    Ok((StatusCode::CREATED, Json(leave)))
}

/// Employees get their own requests; managers and admins get every request
/// with the owning employee embedded.
#[utoipa::path(
    get,
    path = "/api/leaves",
    tag = "Leaves",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Visible leave requests, newest first", body = [LeaveResponse]),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn list_leaves(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<Vec<LeaveResponse>>, ApiError> {
    Ok(Json(LeaveLifecycle::new(&state.store).list_visible(&user)?))
}

#[utoipa::path(
    put,
    path = "/api/leaves/{id}",
    params(
        ("id" = String, Path, description = "Leave request identifier")
    ),
    request_body = UpdateLeaveStatusRequest,
    tag = "Leaves",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Decision recorded", body = LeaveResponse),
        (status = 400, description = "Status must be approved or rejected"),
        (status = 403, description = "Caller is not a manager or admin"),
        (status = 404, description = "Leave not found"),
        (status = 409, description = "Leave request is no longer pending"),
    )
)]
pub async fn decide_leave(
    ManagerOrAdmin(user): ManagerOrAdmin,
    Path(leave_id): Path<String>,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<UpdateLeaveStatusRequest>,
) -> Result<Json<LeaveResponse>, ApiError> {
    Ok(Json(
        LeaveLifecycle::new(&state.store).decide(&user, &leave_id, request)?,
    ))
}

#[utoipa::path(
    put,
    path = "/api/leaves/{id}/cancel",
    params(
        ("id" = String, Path, description = "Leave request identifier")
    ),
    tag = "Leaves",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Leave request cancelled", body = LeaveResponse),
        (status = 403, description = "Caller does not own this request"),
        (status = 404, description = "Leave not found"),
        (status = 409, description = "Leave request is no longer pending"),
    )
)]
pub async fn cancel_leave(
    EmployeeOnly(user): EmployeeOnly,
    Path(leave_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<LeaveResponse>, ApiError> {
    Ok(Json(LeaveLifecycle::new(&state.store).cancel(&user, &leave_id)?))
}

#[utoipa::path(
    delete,
    path = "/api/leaves/{id}",
    params(
        ("id" = String, Path, description = "Leave request identifier")
    ),
    tag = "Leaves",
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Leave request deleted"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Leave not found"),
    )
)]
pub async fn delete_leave(
    AdminOnly(user): AdminOnly,
    Path(leave_id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    LeaveLifecycle::new(&state.store).delete(&user, &leave_id)?;
    Ok(StatusCode::NO_CONTENT)
}
