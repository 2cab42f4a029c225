// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names, default values and the
//! [`ServerConfig`] loaded from them once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `5000` |
//! | `DATA_DIR` | Directory holding the database file | `./data` |
//! | `JWT_SECRET` | HMAC secret for session tokens (>= 32 bytes) | Required in release builds |
//! | `JWT_EXPIRATION_DAYS` | Session token lifetime in days (1-365) | `7` |
//! | `RESET_TOKEN_TTL_MINUTES` | Password reset window in minutes (1-1440) | `15` |
//! | `FRONTEND_URL` | Base URL for password reset links | `http://localhost:5173` |
//! | `GOOGLE_CLIENT_ID` | Enables Google sign-in when set | Unset |
//! | `TLS_CERT_PATH` | PEM certificate chain; HTTPS when set with the key | Unset |
//! | `TLS_KEY_PATH` | PEM private key | Unset |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use chrono::Duration;
use ring::rand::{SecureRandom, SystemRandom};
use url::Url;

use crate::auth::reset::DEFAULT_RESET_TTL_MINUTES;
use crate::auth::tokens::{DEFAULT_TOKEN_TTL_DAYS, MIN_SECRET_LEN};

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the data directory path.
///
/// The redb database file is created inside this directory.
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const JWT_EXPIRATION_DAYS_ENV: &str = "JWT_EXPIRATION_DAYS";
pub const RESET_TOKEN_TTL_MINUTES_ENV: &str = "RESET_TOKEN_TTL_MINUTES";
pub const FRONTEND_URL_ENV: &str = "FRONTEND_URL";
pub const GOOGLE_CLIENT_ID_ENV: &str = "GOOGLE_CLIENT_ID";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:5173";
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

pub const MAX_TOKEN_TTL_DAYS: i64 = 365;
pub const MAX_RESET_TTL_MINUTES: i64 = 24 * 60;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set")]
    MissingSecret,

    #[error("JWT_SECRET must be at least 32 bytes (got {0})")]
    SecretTooShort(usize),

    #[error("{var} has an invalid value: {value:?}")]
    InvalidValue { var: &'static str, value: String },

    #[error("TLS_CERT_PATH and TLS_KEY_PATH must be set together")]
    PartialTls,

    #[error("failed to generate a development secret")]
    Rng,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl LogFormat {
    /// Read `LOG_FORMAT` from the process environment.
    pub fn from_env() -> Self {
        Self::parse(std::env::var(LOG_FORMAT_ENV).ok().as_deref())
    }

    fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Certificate and key paths for HTTPS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Settings resolved at startup.
#[derive(Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub jwt_secret: Vec<u8>,
    pub token_ttl: Duration,
    pub reset_ttl: Duration,
    pub frontend_url: Url,
    pub google_client_id: Option<String>,
    pub tls: Option<TlsPaths>,
    pub log_format: LogFormat,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("data_dir", &self.data_dir)
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .field("reset_ttl", &self.reset_ttl)
            .field("frontend_url", &self.frontend_url.as_str())
            .field("google_client_id", &self.google_client_id)
            .field("tls", &self.tls)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl ServerConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let host = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_or(get(PORT_ENV), PORT_ENV, DEFAULT_PORT)?;
        let data_dir = PathBuf::from(get(DATA_DIR_ENV).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()));

        let jwt_secret = match get(JWT_SECRET_ENV) {
            Some(secret) if secret.len() < MIN_SECRET_LEN => {
                return Err(ConfigError::SecretTooShort(secret.len()));
            }
            Some(secret) => secret.into_bytes(),
            None => development_secret()?,
        };

        let token_days = parse_or(get(JWT_EXPIRATION_DAYS_ENV), JWT_EXPIRATION_DAYS_ENV, DEFAULT_TOKEN_TTL_DAYS)?;
        let token_ttl = bounded_duration(
            token_days,
            MAX_TOKEN_TTL_DAYS,
            JWT_EXPIRATION_DAYS_ENV,
            Duration::try_days,
        )?;
        let reset_minutes = parse_or(
            get(RESET_TOKEN_TTL_MINUTES_ENV),
            RESET_TOKEN_TTL_MINUTES_ENV,
            DEFAULT_RESET_TTL_MINUTES,
        )?;
        let reset_ttl = bounded_duration(
            reset_minutes,
            MAX_RESET_TTL_MINUTES,
            RESET_TOKEN_TTL_MINUTES_ENV,
            Duration::try_minutes,
        )?;

        let frontend_raw = get(FRONTEND_URL_ENV).unwrap_or_else(|| DEFAULT_FRONTEND_URL.to_string());
        let frontend_url = Url::parse(&frontend_raw).map_err(|_| ConfigError::InvalidValue {
            var: FRONTEND_URL_ENV,
            value: frontend_raw.clone(),
        })?;

        let tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            (None, None) => None,
            _ => return Err(ConfigError::PartialTls),
        };

        Ok(Self {
            host,
            port,
            data_dir,
            jwt_secret,
            token_ttl,
            reset_ttl,
            frontend_url,
            google_client_id: get(GOOGLE_CLIENT_ID_ENV),
            tls,
            log_format: LogFormat::parse(get(LOG_FORMAT_ENV).as_deref()),
        })
    }

    /// Socket address to bind. `HOST` may be an IPv4 or IPv6 literal.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.host.parse().map_err(|_| ConfigError::InvalidValue {
            var: HOST_ENV,
            value: self.host.clone(),
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

fn parse_or<T: std::str::FromStr>(
    value: Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var, value: raw }),
        None => Ok(default),
    }
}

/// A positive amount no larger than `max`, in the unit of `to_duration`.
fn bounded_duration(
    amount: i64,
    max: i64,
    var: &'static str,
    to_duration: fn(i64) -> Option<Duration>,
) -> Result<Duration, ConfigError> {
    (1..=max)
        .contains(&amount)
        .then(|| to_duration(amount))
        .flatten()
        .ok_or_else(|| ConfigError::InvalidValue {
            var,
            value: amount.to_string(),
        })
}

/// Random per-process secret for debug builds. Sessions do not survive a
/// restart. Release builds refuse to start without a configured secret.
fn development_secret() -> Result<Vec<u8>, ConfigError> {
    if !cfg!(debug_assertions) {
        return Err(ConfigError::MissingSecret);
    }
    tracing::warn!("{JWT_SECRET_ENV} not set; using a random development secret");
    let mut secret = vec![0u8; MIN_SECRET_LEN];
    SystemRandom::new()
        .fill(&mut secret)
        .map_err(|_| ConfigError::Rng)?;
    Ok(secret)
}
