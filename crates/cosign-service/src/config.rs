//! Service configuration.
//!
//! Built explicitly with [`CosignConfig::new`] or read from the environment
//! with [`CosignConfig::from_env`]. The registry salt is redacted from
//! `Debug` output.

use std::time::Duration;

use cosign_core::ErrorKind;
use cosign_registry::RegistrySalt;
use cosign_zkp::KycLevel;

/// Default DID method.
pub const DEFAULT_DID_METHOD: &str = "midnight";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::InvalidLogFormat(s.to_string())),
        }
    }
}

/// Configuration for [`crate::CosignService`].
#[derive(Clone)]
pub struct CosignConfig {
    /// DID method issued by the DID Manager.
    pub did_method: String,
    /// Registry-private pseudonym key.
    pub registry_salt: RegistrySalt,
    /// Bound on each storage call.
    pub storage_timeout: Duration,
    /// Bound on each proof oracle call.
    pub oracle_timeout: Duration,
    /// Level used by [`crate::CosignService::new_registration`].
    pub default_kyc_level: KycLevel,
    /// Log output format.
    pub log_format: LogFormat,
}

impl std::fmt::Debug for CosignConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CosignConfig")
            .field("did_method", &self.did_method)
            .field("registry_salt", &"[REDACTED]")
            .field("storage_timeout", &self.storage_timeout)
            .field("oracle_timeout", &self.oracle_timeout)
            .field("default_kyc_level", &self.default_kyc_level)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl CosignConfig {
    /// Configuration with default timeouts, level and log format.
    pub fn new(did_method: impl Into<String>, registry_salt: RegistrySalt) -> Result<Self, ConfigError> {
        let did_method = did_method.into();
        validate_method(&did_method)?;
        Ok(Self {
            did_method,
            registry_salt,
            storage_timeout: cosign_registry::DEFAULT_STORAGE_TIMEOUT,
            oracle_timeout: cosign_registry::DEFAULT_ORACLE_TIMEOUT,
            default_kyc_level: KycLevel::Standard,
            log_format: LogFormat::Pretty,
        })
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `COSIGN_DID_METHOD` (default: `midnight`)
    /// - `COSIGN_REGISTRY_SALT` (required, 64 hex characters)
    /// - `COSIGN_STORAGE_TIMEOUT_MS` (default: 5000)
    /// - `COSIGN_ORACLE_TIMEOUT_MS` (default: 30000)
    /// - `COSIGN_DEFAULT_KYC_LEVEL` (default: `standard`)
    /// - `COSIGN_LOG_FORMAT` (`pretty` or `json`, default: `pretty`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let salt_hex = lookup("COSIGN_REGISTRY_SALT").ok_or(ConfigError::MissingSalt)?;
        let salt = RegistrySalt::from_hex(&salt_hex)
            .map_err(|_| ConfigError::InvalidSalt("expected 64 hex characters".to_string()))?;
        let method = lookup("COSIGN_DID_METHOD").unwrap_or_else(|| DEFAULT_DID_METHOD.to_string());

        let mut config = Self::new(method, salt)?;
        if let Some(ms) = lookup("COSIGN_STORAGE_TIMEOUT_MS") {
            config.storage_timeout = parse_millis("COSIGN_STORAGE_TIMEOUT_MS", &ms)?;
        }
        if let Some(ms) = lookup("COSIGN_ORACLE_TIMEOUT_MS") {
            config.oracle_timeout = parse_millis("COSIGN_ORACLE_TIMEOUT_MS", &ms)?;
        }
        if let Some(level) = lookup("COSIGN_DEFAULT_KYC_LEVEL") {
            config.default_kyc_level = level.parse().map_err(ConfigError::InvalidKycLevel)?;
        }
        if let Some(format) = lookup("COSIGN_LOG_FORMAT") {
            config.log_format = format.parse()?;
        }
        Ok(config)
    }
}

fn validate_method(method: &str) -> Result<(), ConfigError> {
    let valid = !method.is_empty()
        && method
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidMethod(method.to_string()))
    }
}

fn parse_millis(var: &str, value: &str) -> Result<Duration, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(Duration::from_millis(ms)),
        _ => Err(ConfigError::InvalidDuration {
            var: var.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `COSIGN_REGISTRY_SALT` is not set.
    #[error("COSIGN_REGISTRY_SALT environment variable is required")]
    MissingSalt,
    /// The salt does not parse.
    #[error("invalid registry salt: {0}")]
    InvalidSalt(String),
    /// A timeout is not a positive integer of milliseconds.
    #[error("invalid duration for {var}: {value:?}")]
    InvalidDuration {
        /// Variable name.
        var: String,
        /// Rejected value.
        value: String,
    },
    /// DID method is not lowercase alphanumeric.
    #[error("invalid DID method {0:?}")]
    InvalidMethod(String),
    /// Unknown KYC level.
    #[error("{0}")]
    InvalidKycLevel(String),
    /// Unknown log format.
    #[error("invalid log format {0:?}, expected pretty or json")]
    InvalidLogFormat(String),
}

impl ConfigError {
    /// Taxonomy classification.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidFormat
    }
}
