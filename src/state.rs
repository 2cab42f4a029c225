// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use chrono::Duration;
use url::Url;

use crate::auth::{IdentityVerifier, PasswordResetManager, TokenIssuer};
use crate::storage::DocumentStore;

/// Shared, cheaply clonable handles for request handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<DocumentStore>,
    pub tokens: Arc<TokenIssuer>,
    /// Federated sign-in; `None` when no provider client id is configured.
    pub identity: Option<Arc<dyn IdentityVerifier>>,
    pub reset: PasswordResetManager,
    /// Base for password reset links handed back to the caller.
    pub frontend_url: Arc<Url>,
}

impl AppState {
    pub fn new(store: DocumentStore, tokens: TokenIssuer, frontend_url: Url) -> Self {
        Self {
            store: Arc::new(store),
            tokens: Arc::new(tokens),
            identity: None,
            reset: PasswordResetManager::default(),
            frontend_url: Arc::new(frontend_url),
        }
    }

    /// Enable federated sign-in.
    pub fn with_identity_verifier(mut self, verifier: Arc<dyn IdentityVerifier>) -> Self {
        self.identity = Some(verifier);
        self
    }

    pub fn with_reset_ttl(mut self, ttl: Duration) -> Self {
        self.reset = PasswordResetManager::new(ttl);
        self
    }
}

/// Fresh state on a temporary database with a fixed signing secret.
#[cfg(test)]
pub(crate) fn test_state() -> (AppState, tempfile::TempDir) {
    let (store, dir) = crate::storage::database::temp_store();
    let tokens = TokenIssuer::new(b"test-secret-test-secret-test-secret!", Duration::days(7));
    let frontend_url = Url::parse(crate::config::DEFAULT_FRONTEND_URL).unwrap();
    (AppState::new(store, tokens, frontend_url), dir)
}
