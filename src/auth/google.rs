// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Google ID token verification.
//!
//! Verifies the token signature against Google's published JWKS, the
//! audience against our OAuth client id and the issuer against Google's two
//! issuer spellings.

use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, errors::ErrorKind, Validation};
use serde::Deserialize;

use super::identity::{display_name_for, ExternalIdentity, IdentityError, IdentityVerifier};
use super::jwks::JwksManager;

/// Google's signing keys.
pub const GOOGLE_JWKS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";

/// Accepted `iss` values for Google ID tokens.
pub const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Claims we read from a Google ID token.
#[derive(Debug, Deserialize)]
struct GoogleClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_verified: Option<bool>,
    #[serde(default)]
    name: Option<String>,
}

/// Verifies Google-issued ID tokens for one OAuth client.
pub struct GoogleIdentityVerifier {
    client_id: String,
    jwks: JwksManager,
}

impl GoogleIdentityVerifier {
    pub fn new(client_id: impl Into<String>) -> Result<Self, IdentityError> {
        Ok(Self {
            client_id: client_id.into(),
            jwks: JwksManager::new(GOOGLE_JWKS_URL)?,
        })
    }
}

#[async_trait]
impl IdentityVerifier for GoogleIdentityVerifier {
    async fn verify(&self, assertion: &str) -> Result<ExternalIdentity, IdentityError> {
        let header = decode_header(assertion)
            .map_err(|_| IdentityError::InvalidAssertion("malformed token".to_string()))?;
        let kid = header
            .kid
            .ok_or_else(|| IdentityError::InvalidAssertion("token has no key id".to_string()))?;

        let (decoding_key, algorithm) = self.jwks.get_decoding_key(&kid).await?;

        let mut validation = Validation::new(algorithm);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.set_audience(&[&self.client_id]);
        validation.set_issuer(&GOOGLE_ISSUERS);

        let claims = decode::<GoogleClaims>(assertion, &decoding_key, &validation)
            .map_err(|e| {
                let reason = match e.kind() {
                    ErrorKind::ExpiredSignature => "token has expired",
                    ErrorKind::InvalidSignature => "signature mismatch",
                    ErrorKind::InvalidAudience => "audience mismatch",
                    ErrorKind::InvalidIssuer => "issuer mismatch",
                    _ => "token rejected",
                };
                IdentityError::InvalidAssertion(reason.to_string())
            })?
            .claims;

        identity_from_claims(claims)
    }

    async fn is_ready(&self) -> bool {
        self.jwks.is_cached().await || self.jwks.refresh().await.is_ok()
    }
}

/// Extract the identity, requiring a verified email.
fn identity_from_claims(claims: GoogleClaims) -> Result<ExternalIdentity, IdentityError> {
    let email = claims
        .email
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .ok_or_else(|| IdentityError::InvalidAssertion("token has no email".to_string()))?;

    if claims.email_verified == Some(false) {
        return Err(IdentityError::InvalidAssertion(
            "email is not verified".to_string(),
        ));
    }

    Ok(ExternalIdentity {
        display_name: display_name_for(claims.name.as_deref(), &email),
        subject: claims.sub,
        email,
    })
}
