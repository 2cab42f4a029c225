// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Health check response with individual component status.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Overall health status ("ok" or "degraded").
    pub status: String,
    /// Individual health checks and their results.
    pub checks: HealthChecks,
}

/// Individual health check results.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    /// Whether the service process is running.
    pub service: String,
    /// Embedded database answers a read transaction.
    pub database: String,
    /// Google key set status.
    /// Only present when Google sign-in is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
}

/// Simple health check response for liveness probes.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

fn check_database(state: &AppState) -> String {
    match state.store.health_check() {
        Ok(()) => "ok".to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            "unavailable".to_string()
        }
    }
}

async fn check_identity(state: &AppState) -> Option<String> {
    let verifier = state.identity.as_ref()?;
    if verifier.is_ready().await {
        Some("ok".to_string())
    } else {
        Some("unavailable".to_string())
    }
}

/// Health check endpoint handler.
///
/// Returns 200 if all checks pass, 503 if any check fails.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = ReadyResponse),
        (status = 503, description = "Service is unhealthy", body = ReadyResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let database = check_database(&state);
    let identity = check_identity(&state).await;

    let identity_ok = identity.as_deref().map(|s| s == "ok").unwrap_or(true);
    let all_ok = database == "ok" && identity_ok;

    let response = ReadyResponse {
        status: if all_ok { "ok" } else { "degraded" }.to_string(),
        checks: HealthChecks {
            service: "ok".to_string(),
            database,
            identity,
        },
    };

    let status = if all_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}

/// Liveness probe handler.
///
/// Always returns 200 if the process is running.
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness probe handler.
///
/// Returns 200 only if all dependencies are available.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Service is ready", body = ReadyResponse),
        (status = 503, description = "Service is not ready", body = ReadyResponse)
    )
)]
pub async fn readiness(state: State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    health(state).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{ExternalIdentity, IdentityError, IdentityVerifier};
    use crate::state::test_state;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct OfflineVerifier;

    #[async_trait]
    impl IdentityVerifier for OfflineVerifier {
        async fn verify(&self, _assertion: &str) -> Result<ExternalIdentity, IdentityError> {
            Err(IdentityError::KeyFetch("offline".to_string()))
        }

        async fn is_ready(&self) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn healthy_without_federation() {
        let (state, _dir) = test_state();
        let (status, Json(body)) = health(State(state)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "ok");
        assert_eq!(body.checks.database, "ok");
        assert!(body.checks.identity.is_none());
    }

    #[tokio::test]
    async fn degraded_when_identity_keys_unavailable() {
        let (state, _dir) = test_state();
        let state = state.with_identity_verifier(Arc::new(OfflineVerifier));
        let (status, Json(body)) = readiness(State(state)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.status, "degraded");
        assert_eq!(body.checks.identity.as_deref(), Some("unavailable"));
    }

    #[tokio::test]
    async fn liveness_always_ok() {
        assert_eq!(liveness().await.0.status, "ok");
    }
}
