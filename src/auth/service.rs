// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication flows: registration, login, Google sign-in and password
//! reset.
//!
//! Role assignment for self-service accounts is decided here and nowhere
//! else: whatever the request body says, [`Role::for_self_signup`] is the
//! only way a new account gets its role, so `admin` can never be
//! self-assigned.

use chrono::Utc;

use super::identity::IdentityError;
use super::password::{verify_optional_blocking, HashError, PasswordHash};
use super::reset::{PasswordResetManager, ResetError};
use super::roles::Role;
use super::tokens::TokenError;
use crate::models::{
    is_plausible_email, non_blank, AuthResponse, ForgotPasswordRequest, GoogleAuthRequest,
    LoginRequest, MessageResponse, RegisterRequest, ResetLinkResponse, ResetPasswordRequest,
};
use crate::state::AppState;
use crate::storage::{NewUser, StorageError, StoredUser, UserRepository};

#[derive(Debug, thiserror::Error)]
pub enum AuthServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("User already exists")]
    DuplicateEmail,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Google sign-in is not configured")]
    Unconfigured,

    #[error("Invalid Google token")]
    InvalidAssertion(String),

    #[error("Google sign-in is temporarily unavailable")]
    ProviderUnavailable(String),

    #[error("User not found")]
    UserNotFound,

    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,

    #[error(transparent)]
    Storage(StorageError),

    #[error("{0}")]
    Internal(String),
}

impl From<StorageError> for AuthServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::EmailTaken(_) => AuthServiceError::DuplicateEmail,
            other => AuthServiceError::Storage(other),
        }
    }
}

impl From<HashError> for AuthServiceError {
    fn from(err: HashError) -> Self {
        AuthServiceError::Internal(err.to_string())
    }
}

impl From<TokenError> for AuthServiceError {
    fn from(err: TokenError) -> Self {
        AuthServiceError::Internal(err.to_string())
    }
}

impl From<ResetError> for AuthServiceError {
    fn from(err: ResetError) -> Self {
        match err {
            ResetError::InvalidOrExpired => AuthServiceError::InvalidOrExpiredToken,
            ResetError::Storage(e) => e.into(),
            ResetError::Rng => AuthServiceError::Internal("reset token generation failed".to_string()),
        }
    }
}

impl From<IdentityError> for AuthServiceError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::InvalidAssertion(reason) => AuthServiceError::InvalidAssertion(reason),
            IdentityError::KeyFetch(reason) => AuthServiceError::ProviderUnavailable(reason),
        }
    }
}

pub type AuthServiceResult<T> = Result<T, AuthServiceError>;

/// Orchestrates the authentication flows over the shared state.
pub struct AuthService<'a> {
    state: &'a AppState,
}

impl<'a> AuthService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    fn users(&self) -> UserRepository<'a> {
        UserRepository::new(&self.state.store)
    }

    fn respond(&self, user: &StoredUser) -> AuthServiceResult<AuthResponse> {
        let token = self.state.tokens.issue(&user.id, user.role)?;
        Ok(AuthResponse::new(user, token))
    }

    /// Create an email/password account and sign it in.
    pub async fn register(&self, req: RegisterRequest) -> AuthServiceResult<AuthResponse> {
        let (Some(name), Some(email), Some(password)) = (
            non_blank(req.name.as_deref()),
            non_blank(req.email.as_deref()),
            non_blank(req.password.as_deref()),
        ) else {
            return Err(AuthServiceError::Validation(
                "Please provide name, email and password".to_string(),
            ));
        };
        validate_email(email)?;

        let users = self.users();
        if users.find_by_email(email)?.is_some() {
            return Err(AuthServiceError::DuplicateEmail);
        }

        let role = Role::for_self_signup(req.role.as_deref());
        let password_hash = PasswordHash::from_raw_blocking(password.to_string()).await?;
        let user = users.create(NewUser {
            name: name.to_string(),
            email: email.to_string(),
            password_hash: Some(password_hash),
            external_id: None,
            role,
        })?;

        tracing::info!(user_id = %user.id, role = %user.role, "User registered");
        self.respond(&user)
    }

    /// Sign in with email and password.
    pub async fn login(&self, req: LoginRequest) -> AuthServiceResult<AuthResponse> {
        let (Some(email), Some(password)) = (
            non_blank(req.email.as_deref()),
            req.password.as_deref().filter(|p| !p.is_empty()),
        ) else {
            return Err(AuthServiceError::Validation(
                "Please provide email and password".to_string(),
            ));
        };

        let Some(user) = self.users().find_by_email(email)? else {
            return Err(AuthServiceError::InvalidCredentials);
        };
        if !verify_optional_blocking(user.password_hash.clone(), password.to_string()).await {
            tracing::debug!(user_id = %user.id, "Password mismatch");
            return Err(AuthServiceError::InvalidCredentials);
        }

        self.respond(&user)
    }

    /// Sign in with a Google ID token.
    ///
    /// Links the Google account to an existing user with the same email, or
    /// creates a new password-less user. Returns whether a user was created.
    pub async fn federated_sign_in(
        &self,
        req: GoogleAuthRequest,
    ) -> AuthServiceResult<(AuthResponse, bool)> {
        let verifier = self
            .state
            .identity
            .as_ref()
            .ok_or(AuthServiceError::Unconfigured)?;
        let id_token = non_blank(req.id_token.as_deref()).ok_or_else(|| {
            AuthServiceError::Validation("Google ID token is required".to_string())
        })?;

        let identity = verifier.verify(id_token).await?;
        let users = self.users();

        if let Some(user) = users.find_by_email_or_external_id(&identity.email, &identity.subject)? {
            let user = if user.external_id.is_none() {
                tracing::info!(user_id = %user.id, "Linking Google account to existing user");
                users.link_external_id(&user.id, &identity.subject)?
            } else {
                user
            };
            return Ok((self.respond(&user)?, false));
        }

        let role = Role::for_self_signup(req.role.as_deref());
        let user = users.create(NewUser {
            name: identity.display_name,
            email: identity.email,
            password_hash: None,
            external_id: Some(identity.subject),
            role,
        })?;

        tracing::info!(user_id = %user.id, role = %user.role, "User created via Google sign-in");
        Ok((self.respond(&user)?, true))
    }

    /// Issue a reset token and return the link that carries it.
    pub fn forgot_password(&self, req: ForgotPasswordRequest) -> AuthServiceResult<ResetLinkResponse> {
        let email = non_blank(req.email.as_deref())
            .ok_or_else(|| AuthServiceError::Validation("Please provide an email".to_string()))?;

        let users = self.users();
        let user = users
            .find_by_email(email)?
            .ok_or(AuthServiceError::UserNotFound)?;

        let raw = self.state.reset.issue(&users, &user.id)?;
        let mut reset_url = (*self.state.frontend_url).clone();
        reset_url
            .path_segments_mut()
            .map_err(|_| AuthServiceError::Internal("frontend URL cannot be a base".to_string()))?
            .pop_if_empty()
            .push("reset-password")
            .push(&raw);

        Ok(ResetLinkResponse {
            message: "Password reset link generated".to_string(),
            reset_url: reset_url.to_string(),
        })
    }

    /// Redeem a reset token and set a new password.
    pub async fn reset_password(
        &self,
        token: &str,
        req: ResetPasswordRequest,
    ) -> AuthServiceResult<MessageResponse> {
        let password = non_blank(req.password.as_deref())
            .ok_or_else(|| AuthServiceError::Validation("Please provide a password".to_string()))?;

        let users = self.users();
        let digest = PasswordResetManager::digest(token);
        if users.find_by_reset_token(&digest, Utc::now())?.is_none() {
            return Err(AuthServiceError::InvalidOrExpiredToken);
        }

        let password_hash = PasswordHash::from_raw_blocking(password.to_string()).await?;
        self.state.reset.consume(&users, token, password_hash)?;
        Ok(MessageResponse::new("Password reset successful"))
    }
}

fn validate_email(email: &str) -> AuthServiceResult<()> {
    if is_plausible_email(email) {
        Ok(())
    } else {
        Err(AuthServiceError::Validation(
            "Please provide a valid email".to_string(),
        ))
    }
}
