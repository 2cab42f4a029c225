// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::AuthServiceError;
use crate::lifecycle::LifecycleError;
use crate::storage::StorageError;

/// Message shown for every unexpected failure; the cause is only logged.
pub const SERVER_ERROR_MESSAGE: &str = "Server Error";

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

/// `Json` request body whose rejections render as [`ApiError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    /// Log the cause and answer with a fixed 500 message.
    pub fn internal(cause: impl std::fmt::Display) -> Self {
        tracing::error!(error = %cause, "Request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR_MESSAGE)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => ApiError::not_found(format!("{what} not found")),
            StorageError::EmailTaken(_) => ApiError::bad_request("User already exists"),
            other => ApiError::internal(other),
        }
    }
}

impl From<AuthServiceError> for ApiError {
    fn from(err: AuthServiceError) -> Self {
        match err {
            AuthServiceError::Validation(_)
            | AuthServiceError::DuplicateEmail
            | AuthServiceError::InvalidOrExpiredToken => ApiError::bad_request(err.to_string()),
            AuthServiceError::InvalidCredentials => ApiError::unauthorized(err.to_string()),
            AuthServiceError::InvalidAssertion(ref reason) => {
                tracing::debug!(reason = %reason, "Google assertion rejected");
                ApiError::unauthorized(err.to_string())
            }
            AuthServiceError::Unconfigured => ApiError::service_unavailable(err.to_string()),
            AuthServiceError::ProviderUnavailable(ref reason) => {
                tracing::warn!(reason = %reason, "Google key set unavailable");
                ApiError::service_unavailable(err.to_string())
            }
            AuthServiceError::UserNotFound => ApiError::not_found(err.to_string()),
            AuthServiceError::Storage(e) => e.into(),
            AuthServiceError::Internal(cause) => ApiError::internal(cause),
        }
    }
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::Validation(message) => ApiError::bad_request(message),
            LifecycleError::Forbidden(message) => ApiError::forbidden(message),
            LifecycleError::NotFound => ApiError::not_found(err.to_string()),
            LifecycleError::InvalidTransition { .. } => ApiError::conflict(err.to_string()),
            LifecycleError::Storage(e) => e.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            message: self.message,
        });
        (self.status, body).into_response()
    }
}
