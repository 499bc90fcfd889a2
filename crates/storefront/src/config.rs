//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `COREWELL_DATA_DIR` - Root for the local cache and document store (default: `.corewell`)
//! - `COREWELL_CATALOG` - Path to a JSON product list (default: built-in range)
//! - `COREWELL_LOGIN_POLICY` - `replace` or `merge` (default: `replace`)
//! - `COREWELL_OUTBOX_MAX_ATTEMPTS` - Remote cart write attempts before giving up (default: 5)
//! - `COREWELL_OUTBOX_BASE_BACKOFF_MS` - First retry delay (default: 200)
//! - `COREWELL_OUTBOX_MAX_BACKOFF_MS` - Retry delay cap (default: 30000)
//! - `LOG_FORMAT` - `pretty` or `json` (default: `pretty`)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate, 0.0 to 1.0 (default: 1.0)

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::cart::{LoginPolicy, OutboxConfig};

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("expected `pretty` or `json`, got `{other}`")),
        }
    }
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Root directory for on-disk state
    pub data_dir: PathBuf,
    /// Optional JSON catalog replacing the built-in product list
    pub catalog_path: Option<PathBuf>,
    /// What happens to an anonymous cart when a user signs in
    pub login_policy: LoginPolicy,
    /// Retry behaviour for remote cart writes
    pub outbox: OutboxConfig,
    /// Log output format
    pub log_format: LogFormat,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate
    pub sentry_sample_rate: f32,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".corewell"),
            catalog_path: None,
            login_policy: LoginPolicy::default(),
            outbox: OutboxConfig::default(),
            log_format: LogFormat::default(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let outbox_defaults = defaults.outbox;

        let data_dir = lookup("COREWELL_DATA_DIR").map_or(defaults.data_dir, PathBuf::from);
        let catalog_path = lookup("COREWELL_CATALOG").map(PathBuf::from);
        let login_policy =
            parse_or_default(&lookup, "COREWELL_LOGIN_POLICY", defaults.login_policy)?;

        let max_attempts = parse_or_default(
            &lookup,
            "COREWELL_OUTBOX_MAX_ATTEMPTS",
            outbox_defaults.max_attempts,
        )?;
        if max_attempts == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "COREWELL_OUTBOX_MAX_ATTEMPTS".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let base_backoff = parse_millis(
            &lookup,
            "COREWELL_OUTBOX_BASE_BACKOFF_MS",
            outbox_defaults.base_backoff,
        )?;
        let max_backoff = parse_millis(
            &lookup,
            "COREWELL_OUTBOX_MAX_BACKOFF_MS",
            outbox_defaults.max_backoff,
        )?;

        let log_format = parse_or_default(&lookup, "LOG_FORMAT", defaults.log_format)?;
        let sentry_sample_rate =
            parse_or_default(&lookup, "SENTRY_SAMPLE_RATE", defaults.sentry_sample_rate)?;

        Ok(Self {
            data_dir,
            catalog_path,
            login_policy,
            outbox: OutboxConfig {
                max_attempts,
                base_backoff,
                max_backoff: max_backoff.max(base_backoff),
            },
            log_format,
            sentry_dsn: lookup("SENTRY_DSN").filter(|dsn| !dsn.is_empty()),
            sentry_environment: lookup("SENTRY_ENVIRONMENT"),
            sentry_sample_rate,
        })
    }

    /// Directory holding the local cache files.
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join("cache")
    }

    /// Directory holding the document store collections.
    #[must_use]
    pub fn documents_dir(&self) -> PathBuf {
        self.data_dir.join("documents")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse a variable if set, falling back to `default` when absent.
fn parse_or_default<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Parse a millisecond duration variable.
fn parse_millis(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    let default_ms = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
    parse_or_default(lookup, key, default_ms).map(Duration::from_millis)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.data_dir, PathBuf::from(".corewell"));
        assert_eq!(config.login_policy, LoginPolicy::Replace);
        assert_eq!(config.outbox.max_attempts, 5);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("COREWELL_DATA_DIR", "/var/lib/corewell"),
            ("COREWELL_LOGIN_POLICY", "merge"),
            ("COREWELL_OUTBOX_MAX_ATTEMPTS", "2"),
            ("COREWELL_OUTBOX_BASE_BACKOFF_MS", "50"),
            ("LOG_FORMAT", "json"),
        ])
        .unwrap();
        assert_eq!(config.cache_dir(), PathBuf::from("/var/lib/corewell/cache"));
        assert_eq!(config.login_policy, LoginPolicy::Merge);
        assert_eq!(config.outbox.max_attempts, 2);
        assert_eq!(config.outbox.base_backoff, Duration::from_millis(50));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_policy_is_rejected() {
        let err = config_from(&[("COREWELL_LOGIN_POLICY", "union")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "COREWELL_LOGIN_POLICY"));
    }

    #[test]
    fn test_zero_attempts_is_rejected() {
        assert!(config_from(&[("COREWELL_OUTBOX_MAX_ATTEMPTS", "0")]).is_err());
    }

    #[test]
    fn test_max_backoff_never_below_base() {
        let config = config_from(&[
            ("COREWELL_OUTBOX_BASE_BACKOFF_MS", "500"),
            ("COREWELL_OUTBOX_MAX_BACKOFF_MS", "100"),
        ])
        .unwrap();
        assert_eq!(config.outbox.max_backoff, Duration::from_millis(500));
    }

    #[test]
    fn test_empty_sentry_dsn_is_none() {
        let config = config_from(&[("SENTRY_DSN", "")]).unwrap();
        assert!(config.sentry_dsn.is_none());
    }
}
