//! Loading retry policies from configuration.
//!
//! A [`RetryPolicyConfig`] is the plain, serializable shape of a policy:
//! numbers in milliseconds, every field optional. It can come from TOML text,
//! a TOML file, or `HOLDFAST_RETRY_*` environment variables, and layers are
//! combined with [`RetryPolicyConfig::merge`]. Converting it into a
//! [`RetryPolicy`] clamps every value.
//!
//! ```toml
//! max_retries = 6
//! initial_wait_ms = 100
//! backoff_factor = 1.5
//! ```
//!
//! `RetryPolicy` itself also implements `Deserialize` through this shape, so
//! it can be embedded in a larger configuration struct. A retry predicate is
//! code, not configuration, and is never serialized.
//!
//! # Examples
//!
//! ```rust
//! use holdfast_core::config::RetryPolicyConfig;
//! use std::time::Duration;
//!
//! let config = RetryPolicyConfig::from_toml_str("max_retries = 100\ninitial_wait_ms = 5")?;
//! let policy = config.into_policy();
//!
//! assert_eq!(policy.max_retries(), 12);
//! assert_eq!(policy.initial_wait(), Duration::from_millis(20));
//! assert_eq!(policy.backoff_factor(), 2.0);
//! # Ok::<(), holdfast_core::error::ConfigError>(())
//! ```

use crate::error::ConfigError;
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::env::VarError;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Environment variable overriding the attempt budget.
pub const ENV_MAX_RETRIES: &str = "HOLDFAST_RETRY_MAX_RETRIES";
/// Environment variable overriding the initial wait, in milliseconds.
pub const ENV_INITIAL_WAIT_MS: &str = "HOLDFAST_RETRY_INITIAL_WAIT_MS";
/// Environment variable overriding the backoff factor.
pub const ENV_BACKOFF_FACTOR: &str = "HOLDFAST_RETRY_BACKOFF_FACTOR";

/// Serializable, unvalidated retry policy parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryPolicyConfig {
    /// Total number of attempts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,

    /// Wait before the second attempt, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_wait_ms: Option<u64>,

    /// Multiplier applied to the wait after each failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backoff_factor: Option<f64>,
}

impl RetryPolicyConfig {
    /// Parse TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Read `HOLDFAST_RETRY_*` environment variables.
    ///
    /// Unset variables leave the field empty; a variable that is set but
    /// does not parse, or is not valid Unicode, is an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            max_retries: env_value(ENV_MAX_RETRIES)?,
            initial_wait_ms: env_value(ENV_INITIAL_WAIT_MS)?,
            backoff_factor: env_value(ENV_BACKOFF_FACTOR)?,
        })
    }

    /// Overlay `other` on top of `self`: fields set in `other` win.
    pub fn merge(self, other: Self) -> Self {
        Self {
            max_retries: other.max_retries.or(self.max_retries),
            initial_wait_ms: other.initial_wait_ms.or(self.initial_wait_ms),
            backoff_factor: other.backoff_factor.or(self.backoff_factor),
        }
    }

    /// Build the clamped policy. Unset fields take the policy defaults.
    pub fn into_policy(self) -> RetryPolicy {
        let mut builder = RetryPolicy::builder();
        if let Some(max_retries) = self.max_retries {
            builder = builder.max_retries(max_retries);
        }
        if let Some(initial_wait_ms) = self.initial_wait_ms {
            builder = builder.initial_wait(Duration::from_millis(initial_wait_ms));
        }
        if let Some(backoff_factor) = self.backoff_factor {
            builder = builder.backoff_factor(backoff_factor);
        }
        builder.build()
    }
}

impl From<RetryPolicyConfig> for RetryPolicy {
    fn from(config: RetryPolicyConfig) -> Self {
        config.into_policy()
    }
}

impl From<&RetryPolicy> for RetryPolicyConfig {
    fn from(policy: &RetryPolicy) -> Self {
        Self {
            max_retries: Some(policy.max_retries()),
            initial_wait_ms: Some(policy.initial_wait().as_millis() as u64),
            backoff_factor: Some(policy.backoff_factor()),
        }
    }
}

impl RetryPolicy {
    /// Load a policy from a TOML file, then apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = RetryPolicyConfig::from_file(path)?;
        let env = RetryPolicyConfig::from_env()?;
        Ok(file.merge(env).into_policy())
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(RetryPolicyConfig::from_env()?.into_policy())
    }
}

impl<'de> Deserialize<'de> for RetryPolicy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        RetryPolicyConfig::deserialize(deserializer).map(RetryPolicyConfig::into_policy)
    }
}

impl Serialize for RetryPolicy {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        RetryPolicyConfig::from(self).serialize(serializer)
    }
}

fn env_value<T: FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { key, value: raw }),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(raw)) => Err(ConfigError::InvalidEnv {
            key,
            value: raw.to_string_lossy().into_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_yields_defaults() {
        let policy = RetryPolicyConfig::from_toml_str("").unwrap().into_policy();

        assert_eq!(policy.max_retries(), RetryPolicy::DEFAULT_MAX_RETRIES);
        assert_eq!(policy.initial_wait(), RetryPolicy::DEFAULT_INITIAL_WAIT);
        assert_eq!(policy.backoff_factor(), RetryPolicy::DEFAULT_BACKOFF_FACTOR);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let config = RetryPolicyConfig::from_toml_str(
            "max_retries = 0\ninitial_wait_ms = 9000\nbackoff_factor = 10.0",
        )
        .unwrap();
        let policy = RetryPolicy::from(config);

        assert_eq!(policy.max_retries(), 1);
        assert_eq!(policy.initial_wait(), Duration::from_millis(400));
        assert_eq!(policy.backoff_factor(), 4.0);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = RetryPolicyConfig::from_toml_str("max_attempts = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_policy_embedded_in_larger_config() {
        #[derive(Deserialize)]
        struct ServiceConfig {
            name: String,
            retry: RetryPolicy,
        }

        let config: ServiceConfig = toml::from_str(
            r#"
            name = "ledger"

            [retry]
            max_retries = 100
            backoff_factor = 1.5
            "#,
        )
        .unwrap();

        assert_eq!(config.name, "ledger");
        assert_eq!(config.retry.max_retries(), 12);
        assert_eq!(config.retry.backoff_factor(), 1.5);
    }

    #[test]
    fn test_policy_serializes_effective_values() {
        let policy = RetryPolicy::builder().max_retries(50).build();
        let text = toml::to_string(&policy).unwrap();

        let reparsed: RetryPolicy = toml::from_str(&text).unwrap();
        assert_eq!(reparsed.max_retries(), 12);
        assert!(text.contains("initial_wait_ms = 50"));
    }

    #[test]
    fn test_merge_prefers_overlay() {
        let base = RetryPolicyConfig {
            max_retries: Some(3),
            initial_wait_ms: Some(100),
            backoff_factor: None,
        };
        let overlay = RetryPolicyConfig {
            max_retries: Some(6),
            initial_wait_ms: None,
            backoff_factor: Some(3.0),
        };

        assert_eq!(
            base.merge(overlay),
            RetryPolicyConfig {
                max_retries: Some(6),
                initial_wait_ms: Some(100),
                backoff_factor: Some(3.0),
            }
        );
    }

    #[test]
    fn test_from_env_reads_and_clamps() {
        temp_env::with_vars(
            [
                (ENV_MAX_RETRIES, Some("40")),
                (ENV_INITIAL_WAIT_MS, Some(" 120 ")),
                (ENV_BACKOFF_FACTOR, None),
            ],
            || {
                let policy = RetryPolicy::from_env().unwrap();
                assert_eq!(policy.max_retries(), 12);
                assert_eq!(policy.initial_wait(), Duration::from_millis(120));
                assert_eq!(policy.backoff_factor(), 2.0);
            },
        );
    }

    #[test]
    fn test_from_env_rejects_garbage() {
        temp_env::with_var(ENV_BACKOFF_FACTOR, Some("steep"), || {
            let err = RetryPolicyConfig::from_env().unwrap_err();
            assert!(matches!(
                err,
                ConfigError::InvalidEnv { key: ENV_BACKOFF_FACTOR, .. }
            ));
        });
    }

    #[cfg(unix)]
    #[test]
    fn test_from_env_rejects_non_unicode() {
        use std::ffi::OsString;
        use std::os::unix::ffi::OsStringExt;

        let raw = OsString::from_vec(vec![b'4', 0x80]);
        temp_env::with_var(ENV_MAX_RETRIES, Some(raw), || {
            let err = RetryPolicyConfig::from_env().unwrap_err();
            assert!(matches!(
                err,
                ConfigError::InvalidEnv { key: ENV_MAX_RETRIES, .. }
            ));
        });
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = RetryPolicyConfig::from_file("/nonexistent/holdfast/retry.toml").unwrap_err();

        match err {
            ConfigError::Io { path, .. } => {
                assert!(path.ends_with("retry.toml"));
            }
            other => panic!("Expected Io variant, got {other:?}"),
        }
    }
}
