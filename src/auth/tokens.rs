// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session token issuance and verification (HS256 JWT).
//!
//! Tokens carry the user id (`sub`) and role; the signing secret never
//! leaves the server. Lifetime is an explicit configuration value.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::roles::Role;

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Minimum accepted secret length in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Default token lifetime.
pub const DEFAULT_TOKEN_TTL_DAYS: i64 = 7;

/// Claims embedded in a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User ID
    pub sub: String,
    /// Role at issue time
    pub role: Role,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    #[error("token is invalid")]
    Invalid,

    #[error("token signing failed: {0}")]
    Signing(String),
}

/// Mints and verifies session tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    /// Issue a token for the given user and role.
    pub fn issue(&self, user_id: &str, role: Role) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: user_id.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify signature and expiry and return the embedded claims.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.validate_aud = false;

        decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret-that-is-long-enough-for-hs256";

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(SECRET, Duration::days(DEFAULT_TOKEN_TTL_DAYS))
    }

    #[test]
    fn issue_then_verify_returns_identity() {
        let issuer = issuer();
        let token = issuer.issue("user_123", Role::Manager).unwrap();

        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.sub, "user_123");
        assert_eq!(claims.role, Role::Manager);
    }

    #[test]
    fn expiry_follows_configured_ttl() {
        let issuer = TokenIssuer::new(SECRET, Duration::days(30));
        let token = issuer.issue("user_123", Role::Employee).unwrap();

        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.exp - claims.iat, Duration::days(30).num_seconds());
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let issuer = TokenIssuer::new(SECRET, Duration::hours(-1));
        let token = issuer.issue("user_123", Role::Employee).unwrap();

        assert_eq!(issuer.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let token = issuer().issue("user_123", Role::Admin).unwrap();
        let other = TokenIssuer::new(b"another-secret-that-is-also-long-enough", Duration::days(1));

        assert_eq!(other.verify(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn malformed_token_is_invalid() {
        assert_eq!(issuer().verify("not.a.jwt"), Err(TokenError::Invalid));
        assert_eq!(issuer().verify(""), Err(TokenError::Invalid));
    }

    #[test]
    fn tampered_payload_is_invalid() {
        let issuer = issuer();
        let token = issuer.issue("user_123", Role::Employee).unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged = issuer.issue("user_123", Role::Admin).unwrap();
        let forged_payload = forged.split('.').nth(1).unwrap().to_string();
        parts[1] = &forged_payload;

        assert_eq!(issuer.verify(&parts.join(".")), Err(TokenError::Invalid));
    }
}
