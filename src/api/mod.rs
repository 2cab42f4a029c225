// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use crate::{
    auth::{middleware::require_auth, AuthenticatedUser, Role},
    models::{
        ApplyLeaveRequest, AuthResponse, ForgotPasswordRequest, GoogleAuthRequest, LeaveResponse,
        LoginRequest, MessageResponse, OwnerSummary, RegisterRequest, ResetLinkResponse,
        ResetPasswordRequest, UpdateLeaveStatusRequest, UpdateProfileRequest, UpdateRoleRequest,
        UserProfile,
    },
    state::AppState,
    storage::LeaveStatus,
};

pub mod auth;
pub mod health;
pub mod leaves;
pub mod users;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// UUID v4 request ids.
#[derive(Clone, Default)]
struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/google", post(auth::google_sign_in))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/reset-password/{token}", put(auth::reset_password));

    let protected_routes = Router::new()
        .route(
            "/leaves",
            get(leaves::list_leaves).post(leaves::apply_leave),
        )
        .route(
            "/leaves/{id}",
            put(leaves::decide_leave).delete(leaves::delete_leave),
        )
        .route("/leaves/{id}/cancel", put(leaves::cancel_leave))
        .route("/users", get(users::list_users))
        .route("/users/me", get(users::get_current_user))
        .route("/users/profile/update", put(users::update_profile))
        .route(
            "/users/{id}",
            put(users::update_user_role).delete(users::delete_user),
        )
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness));

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .nest("/api", public_routes.merge(protected_routes))
        .merge(health_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default();
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                    user_id = tracing::field::Empty,
                )
            }),
        )
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        // Wraps Propagate and the trace span so both see the assigned id
        .layer(SetRequestIdLayer::new(request_id, UuidRequestId))
        .layer(CorsLayer::permissive())
}

/// Registers the bearer session-token scheme referenced by protected paths.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register,
        auth::login,
        auth::google_sign_in,
        auth::forgot_password,
        auth::reset_password,
        leaves::apply_leave,
        leaves::list_leaves,
        leaves::decide_leave,
        leaves::cancel_leave,
        leaves::delete_leave,
        users::get_current_user,
        users::update_profile,
        users::list_users,
        users::update_user_role,
        users::delete_user,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            Role,
            LeaveStatus,
            AuthenticatedUser,
            RegisterRequest,
            LoginRequest,
            GoogleAuthRequest,
            ForgotPasswordRequest,
            ResetPasswordRequest,
            AuthResponse,
            ResetLinkResponse,
            MessageResponse,
            ApplyLeaveRequest,
            UpdateLeaveStatusRequest,
            OwnerSummary,
            LeaveResponse,
            UpdateProfileRequest,
            UpdateRoleRequest,
            UserProfile,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration, sign-in and password reset"),
        (name = "Leaves", description = "Leave request lifecycle"),
        (name = "Users", description = "Profiles and user administration"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::identity::StubVerifier;
    use crate::state::test_state;
    use axum::{body::to_bytes, http::StatusCode, response::Response};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        app.clone().oneshot(request).await.unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn register(app: &Router, email: &str, role: &str) -> Value {
        let response = send(
            app,
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "name": email.split('@').next().unwrap(),
                "email": email,
                "password": "Passw0rd!",
                "role": role,
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        json_body(response).await
    }

    fn token_of(auth: &Value) -> String {
        auth["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn register_login_and_list_empty_leaves() {
        let (state, _dir) = test_state();
        let app = router(state);

        let registered = register(&app, "alice@x.com", "employee").await;
        assert_eq!(registered["role"], "employee");
        assert_eq!(registered["email"], "alice@x.com");

        let response = send(
            &app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"email": "alice@x.com", "password": "Passw0rd!"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let login = json_body(response).await;
        assert_eq!(login["id"], registered["id"]);
        let token = token_of(&login);

        let response = send(&app, "GET", "/api/leaves", Some(&token), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!([]));
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let (state, _dir) = test_state();
        let app = router(state);
        register(&app, "alice@x.com", "employee").await;

        let response = send(
            &app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"email": "alice@x.com", "password": "nope"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(json_body(response).await["message"].is_string());
    }

    #[tokio::test]
    async fn manager_approves_employee_leave() {
        let (state, _dir) = test_state();
        let app = router(state);

        let employee = register(&app, "alice@x.com", "employee").await;
        let manager = register(&app, "bob@x.com", "manager").await;
        let employee_token = token_of(&employee);
        let manager_token = token_of(&manager);

        let response = send(
            &app,
            "POST",
            "/api/leaves",
            Some(&employee_token),
            Some(json!({
                "leaveType": "Sick Leave",
                "fromDate": "2024-01-10",
                "toDate": "2024-01-12",
                "reason": "flu",
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let leave = json_body(response).await;
        assert_eq!(leave["status"], "pending");
        let leave_id = leave["id"].as_str().unwrap().to_string();

        let response = send(
            &app,
            "PUT",
            &format!("/api/leaves/{leave_id}"),
            Some(&manager_token),
            Some(json!({"status": "approved"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&app, "GET", "/api/leaves", Some(&manager_token), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let listed = json_body(response).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
        assert_eq!(listed[0]["status"], "approved");
        assert_eq!(listed[0]["approvedBy"], manager["id"]);
        assert_eq!(listed[0]["employee"]["email"], "alice@x.com");

        // Decided requests can no longer be cancelled.
        let response = send(
            &app,
            "PUT",
            &format!("/api/leaves/{leave_id}/cancel"),
            Some(&employee_token),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn employee_cannot_decide_leave() {
        let (state, _dir) = test_state();
        let app = router(state);
        let employee = register(&app, "alice@x.com", "employee").await;

        let response = send(
            &app,
            "PUT",
            "/api/leaves/some-id",
            Some(&token_of(&employee)),
            Some(json!({"status": "approved"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn protected_routes_require_token() {
        let (state, _dir) = test_state();
        let app = router(state);
        let response = send(&app, "GET", "/api/leaves", None, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["message"], "Not authorized, no token");
    }

    #[tokio::test]
    async fn password_reset_token_is_single_use() {
        let (state, _dir) = test_state();
        let app = router(state);
        register(&app, "alice@x.com", "employee").await;

        let response = send(
            &app,
            "POST",
            "/api/auth/forgot-password",
            None,
            Some(json!({"email": "nobody@x.com"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = send(
            &app,
            "POST",
            "/api/auth/forgot-password",
            None,
            Some(json!({"email": "alice@x.com"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let reset_url = json_body(response).await["resetUrl"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(reset_url.contains("/reset-password/"));
        let token = reset_url.rsplit('/').next().unwrap().to_string();

        let uri = format!("/api/auth/reset-password/{token}");
        let body = json!({"password": "N3wPassw0rd!"});
        let response = send(&app, "PUT", &uri, None, Some(body.clone())).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&app, "PUT", &uri, None, Some(body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(
            &app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"email": "alice@x.com", "password": "N3wPassw0rd!"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn google_sign_in_creates_then_reuses_account() {
        let (state, _dir) = test_state();
        let app = router(state.with_identity_verifier(Arc::new(StubVerifier)));

        let body = json!({"idToken": "valid:sub-1:carol@x.com"});
        let response = send(&app, "POST", "/api/auth/google", None, Some(body.clone())).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let first = json_body(response).await;
        assert_eq!(first["role"], "employee");

        let response = send(&app, "POST", "/api/auth/google", None, Some(body)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["id"], first["id"]);

        let response = send(
            &app,
            "POST",
            "/api/auth/google",
            None,
            Some(json!({"idToken": "forged"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn google_sign_in_unconfigured() {
        let (state, _dir) = test_state();
        let app = router(state);
        let response = send(
            &app,
            "POST",
            "/api/auth/google",
            None,
            Some(json!({"idToken": "valid:sub-1:carol@x.com"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn admin_manages_users() {
        let (state, _dir) = test_state();
        let admin_id = crate::storage::UserRepository::new(&state.store)
            .create(crate::storage::NewUser {
                name: "Root".to_string(),
                email: "root@x.com".to_string(),
                password_hash: None,
                external_id: None,
                role: Role::Admin,
            })
            .unwrap()
            .id;
        let admin_token = state.tokens.issue(&admin_id, Role::Admin).unwrap();
        let app = router(state);

        let alice = register(&app, "alice@x.com", "employee").await;
        let alice_id = alice["id"].as_str().unwrap().to_string();

        // Self-service sign-up never grants admin.
        let eve = register(&app, "eve@x.com", "admin").await;
        assert_eq!(eve["role"], "employee");

        let response = send(&app, "GET", "/api/users", Some(&token_of(&alice)), None).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = send(&app, "GET", "/api/users", Some(&admin_token), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let users = json_body(response).await;
        assert_eq!(users.as_array().unwrap().len(), 3);
        assert!(users[0].get("passwordHash").is_none());

        let uri = format!("/api/users/{alice_id}");
        let response = send(&app, "PUT", &uri, Some(&admin_token), Some(json!({"role": "boss"}))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(
            &app,
            "PUT",
            &uri,
            Some(&admin_token),
            Some(json!({"role": "manager"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["role"], "manager");

        // The promotion applies to Alice's existing token.
        let response = send(
            &app,
            "PUT",
            "/api/leaves/unknown",
            Some(&token_of(&alice)),
            Some(json!({"status": "approved"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = send(
            &app,
            "PUT",
            "/api/users/missing",
            Some(&admin_token),
            Some(json!({"role": "manager"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = send(&app, "DELETE", &uri, Some(&admin_token), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["message"], "User deleted");

        let response = send(&app, "GET", "/api/users/me", Some(&token_of(&alice)), None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn profile_update_keeps_blank_fields() {
        let (state, _dir) = test_state();
        let app = router(state);
        let alice = register(&app, "alice@x.com", "employee").await;
        register(&app, "bob@x.com", "employee").await;
        let token = token_of(&alice);

        let response = send(
            &app,
            "PUT",
            "/api/users/profile/update",
            Some(&token),
            Some(json!({"name": "  ", "phone": "555-0100", "department": "QA"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let profile = json_body(response).await;
        assert_eq!(profile["name"], "alice");
        assert_eq!(profile["phone"], "555-0100");
        assert_eq!(profile["department"], "QA");

        let response = send(
            &app,
            "PUT",
            "/api/users/profile/update",
            Some(&token),
            Some(json!({"email": "BOB@x.com"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(&app, "GET", "/api/users/me", Some(&token), None).await;
        assert_eq!(json_body(response).await["email"], "alice@x.com");
    }

    #[tokio::test]
    async fn responses_carry_request_id() {
        let (state, _dir) = test_state();
        let app = router(state);
        let response = send(&app, "GET", "/health/live", None, None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    }

    #[tokio::test]
    async fn caller_request_id_is_echoed() {
        let (state, _dir) = test_state();
        let app = router(state);
        let request = Request::get("/health/live")
            .header(REQUEST_ID_HEADER, "req-42")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.headers()[REQUEST_ID_HEADER], "req-42");
    }

    async fn raw_post(app: &Router, uri: &str, content_type: Option<&str>, body: &str) -> Response {
        let mut builder = Request::post(uri);
        if let Some(content_type) = content_type {
            builder = builder.header("Content-Type", content_type);
        }
        let request = builder.body(Body::from(body.to_string())).unwrap();
        app.clone().oneshot(request).await.unwrap()
    }

    #[tokio::test]
    async fn malformed_bodies_get_json_errors() {
        let (state, _dir) = test_state();
        let app = router(state);

        let cases = [
            (Some("application/json"), "{not json"),
            (Some("application/json"), r#"{"email": 5}"#),
            (None, r#"{"email": "alice@x.com"}"#),
        ];
        for (content_type, body) in cases {
            let response = raw_post(&app, "/api/auth/register", content_type, body).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {body}");
            assert_eq!(
                response.headers()["content-type"],
                "application/json",
                "body {body}"
            );
            assert!(json_body(response).await["message"].is_string());
        }
    }

    #[tokio::test]
    async fn profile_update_rejects_invalid_email() {
        let (state, _dir) = test_state();
        let app = router(state);
        let alice = register(&app, "alice@x.com", "employee").await;

        let response = send(
            &app,
            "PUT",
            "/api/users/profile/update",
            Some(&token_of(&alice)),
            Some(json!({"email": "not-an-email"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["message"], "Please provide a valid email");
    }

    #[test]
    fn openapi_document_lists_routes_and_bearer_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/leaves/{id}/cancel"));
        assert!(doc.paths.paths.contains_key("/api/users/profile/update"));
        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("bearer"));
    }
}
