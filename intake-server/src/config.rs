//! Configuration module for environment variable parsing.
//!
//! All settings come from environment variables and are loaded once at
//! process start. Signing secrets are carried as [`SecretString`] so they never
//! end up in `Debug` output or logs.

use std::env;
use std::fmt;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

/// Errors raised while loading configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),

    #[error("environment variable {0} must not be empty")]
    Empty(&'static str),
}

/// A secret value that is redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the underlying secret.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString([redacted])")
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Postgres connection URL
    pub database_url: SecretString,

    /// Maximum number of pooled database connections
    pub database_max_connections: u32,

    /// Apply pending schema migrations at startup
    pub run_migrations: bool,

    /// Secret used to sign and verify voice session tokens
    pub voice_token_secret: SecretString,

    /// Shared secret of the identity provider, used to verify owner sessions
    pub auth_jwt_secret: SecretString,

    /// Timeout for the outbound CRM webhook request in milliseconds
    pub webhook_timeout_ms: u64,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Config {
            port: parse_or(&lookup, "PORT", 8080),

            database_url: SecretString::new(required(&lookup, "DATABASE_URL")?),

            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 5),

            run_migrations: parse_or(&lookup, "RUN_MIGRATIONS", false),

            voice_token_secret: SecretString::new(required(&lookup, "VOICE_TOKEN_SECRET")?),

            auth_jwt_secret: SecretString::new(required(&lookup, "AUTH_JWT_SECRET")?),

            webhook_timeout_ms: parse_or(&lookup, "WEBHOOK_TIMEOUT_MS", 10_000),
        })
    }

    /// Outbound webhook timeout as a [`Duration`].
    pub fn webhook_timeout(&self) -> Duration {
        Duration::from_millis(self.webhook_timeout_ms)
    }
}

fn required<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(name).ok_or(ConfigError::Missing(name))?;
    if value.trim().is_empty() {
        return Err(ConfigError::Empty(name));
    }
    Ok(value)
}

/// Parse an optional variable, falling back to `default` when absent or invalid.
fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        None => default,
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(env_var = name, value = %raw, "invalid_config_value_using_default");
                default
            }
        },
    }
}
