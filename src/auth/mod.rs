// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Session-token authentication and role authorization for the ChronoHub API.
//!
//! ## Auth Flow
//!
//! 1. A user registers, logs in with email/password, or signs in with a
//!    Google ID token (when `GOOGLE_CLIENT_ID` is configured)
//! 2. The server answers with an HS256 session token carrying `{sub, role}`
//! 3. The frontend sends `Authorization: Bearer <token>` on every protected
//!    request
//! 4. The gate verifies the token, loads the user it names and checks the
//!    user's *stored* role against the roles allowed for the route
//!
//! ## Security
//!
//! - Passwords are stored as Argon2id hashes only
//! - `admin` is never self-assigned; see [`Role::for_self_signup`]
//! - Reset tokens are single-use, time-boxed and stored as SHA-256 digests
//! - Clock skew tolerance is 60 seconds

pub mod claims;
pub mod error;
pub mod extractor;
pub mod google;
pub mod identity;
pub mod jwks;
pub mod middleware;
pub mod password;
pub mod reset;
pub mod roles;
pub mod service;
pub mod tokens;

pub use claims::AuthenticatedUser;
pub use error::AuthError;
pub use extractor::{AdminOnly, Auth, EmployeeOnly, ManagerOrAdmin};
pub use google::GoogleIdentityVerifier;
pub use identity::{ExternalIdentity, IdentityError, IdentityVerifier};
pub use jwks::JwksManager;
pub use password::PasswordHash;
pub use reset::PasswordResetManager;
pub use roles::Role;
pub use service::{AuthService, AuthServiceError};
pub use tokens::{SessionClaims, TokenError, TokenIssuer};
