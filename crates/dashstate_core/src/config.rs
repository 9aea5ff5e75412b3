//! Auth synchronizer configuration.
//!
//! # Responsibility
//! - Hold timing, endpoint and routing settings with production defaults.
//! - Load overrides from `DASHSTATE_*` environment variables.
//!
//! # Invariants
//! - A validated config has a non-blank base URL, non-zero durations and
//!   absolute (`/`-prefixed) paths and routes.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

pub const ENV_BASE_URL: &str = "DASHSTATE_AUTH_BASE_URL";
pub const ENV_POLL_SECS: &str = "DASHSTATE_AUTH_POLL_SECS";
pub const ENV_RECHECK_SECS: &str = "DASHSTATE_AUTH_RECHECK_SECS";
pub const ENV_TIMEOUT_SECS: &str = "DASHSTATE_AUTH_TIMEOUT_SECS";
pub const ENV_LOGIN_ROUTE: &str = "DASHSTATE_LOGIN_ROUTE";
pub const ENV_ORDERING: &str = "DASHSTATE_AUTH_ORDERING";

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_VISIBILITY_RECHECK_AFTER: Duration = Duration::from_secs(5);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_STATUS_PATH: &str = "/api/auth/status";
pub const DEFAULT_LOGOUT_PATH: &str = "/api/auth/logout";
pub const DEFAULT_LOGIN_ROUTE: &str = "/login";

/// Policy for verification responses that complete out of order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseOrdering {
    /// Discard a response older than the last applied one.
    LatestIssuedWins,
    /// Apply every response; the last one to complete wins.
    LastCompletedWins,
}

impl ResponseOrdering {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LatestIssuedWins => "latest_issued",
            Self::LastCompletedWins => "last_completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "latest_issued" => Some(Self::LatestIssuedWins),
            "last_completed" => Some(Self::LastCompletedWins),
            _ => None,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    MissingBaseUrl,
    InvalidValue { key: &'static str, value: String },
    ZeroDuration(&'static str),
    RelativePath { key: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingBaseUrl => write!(f, "{ENV_BASE_URL} must be set"),
            Self::InvalidValue { key, value } => write!(f, "invalid value for {key}: `{value}`"),
            Self::ZeroDuration(key) => write!(f, "{key} must be greater than zero"),
            Self::RelativePath { key, value } => {
                write!(f, "{key} must start with `/`, got `{value}`")
            }
        }
    }
}

impl Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSyncConfig {
    /// Scheme + host (+ optional prefix) of the auth service.
    pub base_url: String,
    pub status_path: String,
    pub logout_path: String,
    /// UI route the synchronizer redirects to on invalidation.
    pub login_route: String,
    pub poll_interval: Duration,
    /// Minimum hidden-time before regaining visibility forces a check.
    pub visibility_recheck_after: Duration,
    pub request_timeout: Duration,
    pub ordering: ResponseOrdering,
}

impl AuthSyncConfig {
    /// Creates a config with defaults for everything but the base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            status_path: DEFAULT_STATUS_PATH.to_string(),
            logout_path: DEFAULT_LOGOUT_PATH.to_string(),
            login_route: DEFAULT_LOGIN_ROUTE.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            visibility_recheck_after: DEFAULT_VISIBILITY_RECHECK_AFTER,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            ordering: ResponseOrdering::LatestIssuedWins,
        }
    }

    /// Loads config from process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads config through an arbitrary key lookup.
    ///
    /// Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let base_url = read(ENV_BASE_URL).ok_or(ConfigError::MissingBaseUrl)?;
        let mut config = Self::new(base_url);
        if let Some(value) = read(ENV_POLL_SECS) {
            config.poll_interval = parse_secs(ENV_POLL_SECS, &value)?;
        }
        if let Some(value) = read(ENV_RECHECK_SECS) {
            config.visibility_recheck_after = parse_secs(ENV_RECHECK_SECS, &value)?;
        }
        if let Some(value) = read(ENV_TIMEOUT_SECS) {
            config.request_timeout = parse_secs(ENV_TIMEOUT_SECS, &value)?;
        }
        if let Some(value) = read(ENV_LOGIN_ROUTE) {
            config.login_route = value;
        }
        if let Some(value) = read(ENV_ORDERING) {
            config.ordering =
                ResponseOrdering::parse(&value).ok_or(ConfigError::InvalidValue {
                    key: ENV_ORDERING,
                    value,
                })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::MissingBaseUrl);
        }
        for (key, value) in [
            ("poll_interval", self.poll_interval),
            ("visibility_recheck_after", self.visibility_recheck_after),
            ("request_timeout", self.request_timeout),
        ] {
            if value.is_zero() {
                return Err(ConfigError::ZeroDuration(key));
            }
        }
        for (key, value) in [
            ("status_path", &self.status_path),
            ("logout_path", &self.logout_path),
            ("login_route", &self.login_route),
        ] {
            if !value.starts_with('/') {
                return Err(ConfigError::RelativePath {
                    key,
                    value: value.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn status_url(&self) -> String {
        join_url(&self.base_url, &self.status_path)
    }

    pub fn logout_url(&self) -> String {
        join_url(&self.base_url, &self.logout_path)
    }
}

fn parse_secs(key: &'static str, value: &str) -> Result<Duration, ConfigError> {
    value
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        })
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim().trim_end_matches('/'), path)
}
