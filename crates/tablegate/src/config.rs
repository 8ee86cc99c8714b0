use std::{env, time::Duration};

use tablegate_core::connection::{ConnectionDescriptor, ConnectionError};
use tablegate_core::request::{ScopeDefaults, DEFAULT_ENV_CODE, DEFAULT_TENANT_CODE};
use thiserror::Error;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("TABLE_STORE_CONNECTION is required")]
    MissingPrimaryConnection,
    #[error("Invalid {variable}: {source}")]
    InvalidConnection {
        variable: &'static str,
        #[source]
        source: ConnectionError,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Primary store account (required).
    pub primary: ConnectionDescriptor,
    /// Secondary store account (optional).
    pub secondary: Option<ConnectionDescriptor>,
    /// Tenant and environment codes used when a request does not supply them.
    pub defaults: ScopeDefaults,
    /// HTTP request timeout in seconds (default: 30)
    pub request_timeout_seconds: u64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `TABLE_STORE_CONNECTION` - Primary account descriptor (required, legacy alias `AZTABLE`)
    /// - `TABLE_STORE_CONNECTION_SECONDARY` - Secondary account descriptor (legacy alias `AZTABLEALT`)
    /// - `TENANT_CODE` - Default tenant code (default: "a")
    /// - `ENV_CODE` - Default environment code (default: "prd")
    /// - `REQUEST_TIMEOUT_SECONDS` - HTTP request timeout (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |primary: &str, alias: &str| {
            lookup(primary)
                .or_else(|| lookup(alias))
                .filter(|v| !v.trim().is_empty())
        };

        let primary = var("TABLE_STORE_CONNECTION", "AZTABLE")
            .ok_or(ConfigError::MissingPrimaryConnection)?;
        let primary = ConnectionDescriptor::parse(&primary).map_err(|source| {
            ConfigError::InvalidConnection {
                variable: "TABLE_STORE_CONNECTION",
                source,
            }
        })?;

        let secondary = var("TABLE_STORE_CONNECTION_SECONDARY", "AZTABLEALT")
            .map(|text| ConnectionDescriptor::parse(&text))
            .transpose()
            .map_err(|source| ConfigError::InvalidConnection {
                variable: "TABLE_STORE_CONNECTION_SECONDARY",
                source,
            })?;

        Ok(Self {
            primary,
            secondary,
            defaults: ScopeDefaults {
                tenant_code: lookup("TENANT_CODE")
                    .filter(|v| !v.is_empty())
                    .unwrap_or_else(|| DEFAULT_TENANT_CODE.to_string()),
                env_code: lookup("ENV_CODE")
                    .filter(|v| !v.is_empty())
                    .unwrap_or_else(|| DEFAULT_ENV_CODE.to_string()),
            },
            request_timeout_seconds: lookup("REQUEST_TIMEOUT_SECONDS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
        })
    }

    /// Get the request timeout as a Duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}
