// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATABASE_URL` | sqlx SQLite connection URL | `sqlite://vestwise.db` |
//! | `DATABASE_MAX_CONNECTIONS` | Connection pool size | `10` |
//! | `AUTH_PROVIDER_URL` | Identity provider base URL | Required |
//! | `JWKS_URL` | Explicit key-set endpoint | Derived from `AUTH_PROVIDER_URL` |
//! | `AUTH_AUDIENCE` | Expected JWT audience claim | `authenticated` |
//! | `JWKS_CACHE_TTL_SECS` | Key-set cache lifetime | `300` |
//! | `JWKS_FETCH_TIMEOUT_SECS` | Key-set request timeout | `10` |
//! | `JWT_LEEWAY_SECS` | Clock skew tolerance for `exp` | `60` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `3001` |
//! | `DEBUG` | Permissive CORS when `true` | `false` |
//! | `CORS_ALLOWED_ORIGINS` | Comma-separated origins used when not in debug | Vestwise sites |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use url::Url;

use crate::auth::jwks::{DEFAULT_CACHE_TTL, DEFAULT_FETCH_TIMEOUT};
use crate::auth::verifier::DEFAULT_LEEWAY_SECS;

// =============================================================================
// Variable Names
// =============================================================================

pub const DATABASE_URL_ENV: &str = "DATABASE_URL";
pub const DATABASE_MAX_CONNECTIONS_ENV: &str = "DATABASE_MAX_CONNECTIONS";

/// Base URL of the identity provider issuing access tokens.
///
/// The key-set endpoint is `{AUTH_PROVIDER_URL}/auth/v1/.well-known/jwks.json`
/// unless [`JWKS_URL_ENV`] is set.
pub const AUTH_PROVIDER_URL_ENV: &str = "AUTH_PROVIDER_URL";
pub const JWKS_URL_ENV: &str = "JWKS_URL";
pub const AUTH_AUDIENCE_ENV: &str = "AUTH_AUDIENCE";
pub const JWKS_CACHE_TTL_ENV: &str = "JWKS_CACHE_TTL_SECS";
pub const JWKS_FETCH_TIMEOUT_ENV: &str = "JWKS_FETCH_TIMEOUT_SECS";
pub const JWT_LEEWAY_ENV: &str = "JWT_LEEWAY_SECS";

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// When `true`, any origin may call the API.
pub const DEBUG_ENV: &str = "DEBUG";
pub const CORS_ALLOWED_ORIGINS_ENV: &str = "CORS_ALLOWED_ORIGINS";

/// `json` for structured logs, anything else for human-readable output.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

// =============================================================================
// Defaults
// =============================================================================

pub const DEFAULT_DATABASE_URL: &str = "sqlite://vestwise.db";
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_AUDIENCE: &str = "authenticated";
pub const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_CORS_ALLOWED_ORIGINS: &str = "https://vestwise.co.uk,https://www.vestwise.co.uk";
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// Path of the key-set document below the provider base URL.
const JWKS_PATH: &str = "auth/v1/.well-known/jwks.json";

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} is not valid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

// =============================================================================
// Config
// =============================================================================

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,

    /// Key-set endpoint, explicit or derived from the provider URL
    pub jwks_url: Url,
    pub audience: String,
    pub jwks_cache_ttl: Duration,
    pub jwks_fetch_timeout: Duration,
    pub leeway_secs: u64,

    pub bind_address: SocketAddr,

    /// Permissive CORS
    pub debug: bool,
    pub cors_allowed_origins: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, which returns a variable's value
    /// or `None` when unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let database_url = var(DATABASE_URL_ENV).unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
        let database_max_connections = parse_or(
            DATABASE_MAX_CONNECTIONS_ENV,
            var(DATABASE_MAX_CONNECTIONS_ENV),
            DEFAULT_DATABASE_MAX_CONNECTIONS,
        )?;
        if database_max_connections == 0 {
            return Err(ConfigError::Invalid {
                name: DATABASE_MAX_CONNECTIONS_ENV,
                reason: "must be at least 1".to_string(),
            });
        }

        let jwks_url = match var(JWKS_URL_ENV) {
            Some(explicit) => parse_url(JWKS_URL_ENV, &explicit)?,
            None => {
                let base = var(AUTH_PROVIDER_URL_ENV).ok_or(ConfigError::Missing(AUTH_PROVIDER_URL_ENV))?;
                derive_jwks_url(&parse_url(AUTH_PROVIDER_URL_ENV, &base)?)?
            }
        };

        let audience = var(AUTH_AUDIENCE_ENV).unwrap_or_else(|| DEFAULT_AUDIENCE.to_string());

        let jwks_cache_ttl = Duration::from_secs(parse_or(
            JWKS_CACHE_TTL_ENV,
            var(JWKS_CACHE_TTL_ENV),
            DEFAULT_CACHE_TTL.as_secs(),
        )?);
        let jwks_fetch_timeout = Duration::from_secs(parse_or(
            JWKS_FETCH_TIMEOUT_ENV,
            var(JWKS_FETCH_TIMEOUT_ENV),
            DEFAULT_FETCH_TIMEOUT.as_secs(),
        )?);
        let leeway_secs = parse_or(JWT_LEEWAY_ENV, var(JWT_LEEWAY_ENV), DEFAULT_LEEWAY_SECS)?;

        let host: IpAddr = parse_or(HOST_ENV, var(HOST_ENV), DEFAULT_HOST)?;
        let port = parse_or(PORT_ENV, var(PORT_ENV), DEFAULT_PORT)?;

        let debug = var(DEBUG_ENV)
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let cors_allowed_origins = var(CORS_ALLOWED_ORIGINS_ENV)
            .unwrap_or_else(|| DEFAULT_CORS_ALLOWED_ORIGINS.to_string())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Config {
            database_url,
            database_max_connections,
            jwks_url,
            audience,
            jwks_cache_ttl,
            jwks_fetch_timeout,
            leeway_secs,
            bind_address: SocketAddr::new(host, port),
            debug,
            cors_allowed_origins,
        })
    }
}

fn parse_or<T>(name: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_url(name: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|e| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "https" | "http" => Ok(url),
        other => Err(ConfigError::Invalid {
            name,
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}

/// `{base}/auth/v1/.well-known/jwks.json`, keeping any path prefix on `base`.
fn derive_jwks_url(base: &Url) -> Result<Url, ConfigError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(JWKS_PATH).map_err(|e| ConfigError::Invalid {
        name: AUTH_PROVIDER_URL_ENV,
        reason: e.to_string(),
    })
}
