//! Client configuration.
//!
//! Resolved once at startup and passed into the HTTP service and dashboard.
//! Nothing in this crate reads process environment variables; callers hand in
//! whatever map they loaded (see `from_env_map`).

use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;

use crate::notify::DEFAULT_NOTIFICATION_TTL_SECS;

/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api";

pub const ENV_BASE_URL: &str = "CLINIC_API_URL";
pub const ENV_TIMEOUT_SECS: &str = "CLINIC_API_TIMEOUT_SECS";
pub const ENV_NOTIFICATION_TTL_SECS: &str = "CLINIC_NOTIFICATION_TTL_SECS";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Remote service location and client-side timings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: String,
    request_timeout: Option<Duration>,
    notification_ttl: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: None,
            notification_ttl: Duration::from_secs(DEFAULT_NOTIFICATION_TTL_SECS as u64),
        }
    }
}

impl ClientConfig {
    /// Create a config for the given base URL, with default timings.
    pub fn new(base_url: &str) -> ConfigResult<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if trimmed.is_empty()
            || !(trimmed.starts_with("http://") || trimmed.starts_with("https://"))
        {
            return Err(ConfigError::InvalidBaseUrl(base_url.to_string()));
        }

        Ok(Self {
            base_url: trimmed.to_string(),
            ..Self::default()
        })
    }

    /// Override the transport timeout. Unset means the HTTP client default.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn with_notification_ttl(mut self, ttl: Duration) -> Self {
        self.notification_ttl = ttl;
        self
    }

    /// Build from a key/value map (typically the process environment after `.env` loading).
    pub fn from_env_map(vars: &HashMap<String, String>) -> ConfigResult<Self> {
        let base_url = vars
            .get(ENV_BASE_URL)
            .map(String::as_str)
            .unwrap_or(DEFAULT_BASE_URL);
        let mut config = Self::new(base_url)?;

        if let Some(secs) = parse_secs(vars, ENV_TIMEOUT_SECS)? {
            config = config.with_request_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = parse_secs(vars, ENV_NOTIFICATION_TTL_SECS)? {
            config = config.with_notification_ttl(Duration::from_secs(secs));
        }

        Ok(config)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a path relative to the base.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    pub fn notification_ttl(&self) -> Duration {
        self.notification_ttl
    }
}

fn parse_secs(vars: &HashMap<String, String>, key: &'static str) -> ConfigResult<Option<u64>> {
    match vars.get(key).map(|v| v.trim()) {
        None | Some("") => Ok(None),
        Some(raw) => match raw.parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(Some(secs)),
            _ => Err(ConfigError::InvalidValue {
                key,
                value: raw.to_string(),
            }),
        },
    }
}
