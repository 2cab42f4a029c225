// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Public authentication endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    auth::AuthService,
    error::{ApiError, ApiJson},
    models::{
        AuthResponse, ForgotPasswordRequest, GoogleAuthRequest, LoginRequest, MessageResponse,
        RegisterRequest, ResetLinkResponse, ResetPasswordRequest,
    },
    state::AppState,
};

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    tag = "Auth",
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Missing fields or email already registered"),
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let response = AuthService::new(&state).register(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    tag = "Auth",
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 401, description = "Invalid email or password"),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    Ok(Json(AuthService::new(&state).login(request).await?))
}

/// Sign in with a Google ID token. Creates the account on first use.
#[utoipa::path(
    post,
    path = "/api/auth/google",
    request_body = GoogleAuthRequest,
    tag = "Auth",
    responses(
        (status = 200, description = "Signed in to an existing account", body = AuthResponse),
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Missing ID token"),
        (status = 401, description = "Invalid Google token"),
        (status = 503, description = "Google sign-in not configured"),
    )
)]
pub async fn google_sign_in(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<GoogleAuthRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let (response, created) = AuthService::new(&state).federated_sign_in(request).await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(response)))
}

#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    tag = "Auth",
    responses(
        (status = 200, description = "Reset link generated", body = ResetLinkResponse),
        (status = 404, description = "No user with this email"),
    )
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ForgotPasswordRequest>,
) -> Result<Json<ResetLinkResponse>, ApiError> {
    Ok(Json(AuthService::new(&state).forgot_password(request)?))
}

#[utoipa::path(
    put,
    path = "/api/auth/reset-password/{token}",
    params(
        ("token" = String, Path, description = "Reset token from the reset link")
    ),
    request_body = ResetPasswordRequest,
    tag = "Auth",
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Invalid or expired token, or missing password"),
    )
)]
pub async fn reset_password(
    Path(token): Path<String>,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    Ok(Json(
        AuthService::new(&state).reset_password(&token, request).await?,
    ))
}
