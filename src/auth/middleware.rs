// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication middleware for Axum.
//!
//! Applied with `route_layer` to the protected router subtree so every
//! protected request is authenticated before routing reaches a handler.
//! The resolved [`AuthenticatedUser`] is stored in request extensions, where
//! the [`Auth`](super::Auth) family of extractors picks it up.
//!
//! ```rust,ignore
//! let protected = Router::new()
//!     .route("/leaves", get(list_leaves))
//!     .route_layer(axum::middleware::from_fn_with_state(state.clone(), require_auth));
//! ```

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::extractor::resolve_identity;
use crate::state::AppState;

/// Authentication middleware function.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match resolve_identity(request.headers(), &state).await {
        Ok(user) => {
            tracing::Span::current().record("user_id", user.user_id.as_str());
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthenticatedUser, PasswordHash, Role};
    use crate::state::test_state;
    use crate::storage::{NewUser, UserRepository};
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        routing::get,
        Extension, Router,
    };
    use tower::ServiceExt;

    async fn whoami(Extension(user): Extension<AuthenticatedUser>) -> String {
        user.user_id
    }

    fn router(state: AppState) -> Router {
        Router::new()
            .route("/whoami", get(whoami))
            .route_layer(axum::middleware::from_fn_with_state(state.clone(), require_auth))
            .with_state(state)
    }

    #[tokio::test]
    async fn rejects_missing_token() {
        let (state, _dir) = test_state();
        let response = router(state)
            .oneshot(HttpRequest::get("/whoami").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn inserts_user_for_valid_token() {
        let (state, _dir) = test_state();
        let user = UserRepository::new(&state.store)
            .create(NewUser {
                name: "Alice".to_string(),
                email: "alice@x.com".to_string(),
                password_hash: Some(PasswordHash::from_raw("Passw0rd!").unwrap()),
                external_id: None,
                role: Role::Employee,
            })
            .unwrap();
        let token = state.tokens.issue(&user.id, user.role).unwrap();

        let response = router(state)
            .oneshot(
                HttpRequest::get("/whoami")
                    .header("Authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body, user.id.as_bytes());
    }
}
