//! Configuration loading and representation.
//!
//! Everything comes from `WARDEN_*` environment variables. Unset variables
//! fall back to defaults; set-but-malformed ones are an error.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use warden_core::UserId;
use warden_observability::LogFormat;

pub const ENV_DATA_DIR: &str = "WARDEN_DATA_DIR";
pub const ENV_PREFIX: &str = "WARDEN_PREFIX";
pub const ENV_OWNER_ID: &str = "WARDEN_OWNER_ID";
pub const ENV_PRIVILEGED_ROLE: &str = "WARDEN_PRIVILEGED_ROLE";
pub const ENV_MAX_TENANTS: &str = "WARDEN_MAX_TENANTS";
pub const ENV_LOOKUP_TIMEOUT_MS: &str = "WARDEN_LOOKUP_TIMEOUT_MS";
pub const ENV_BASELINE_MODULES: &str = "WARDEN_BASELINE_MODULES";
pub const ENV_LOG_FORMAT: &str = "WARDEN_LOG_FORMAT";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(key: &'static str, value: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Process configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WardenConfig {
    /// Root directory for per-tenant policy files.
    pub data_dir: PathBuf,
    /// Prefix that marks a message as a command.
    pub command_prefix: String,
    /// Bot owner; owns the root (direct message) context.
    pub owner_id: UserId,
    /// Name of the role bootstrapped in every workspace.
    pub privileged_role: String,
    /// Upper bound on cached tenant contexts (LRU eviction beyond it).
    pub max_tenants: usize,
    /// Bound on a single platform lookup.
    pub lookup_timeout: Duration,
    /// Modules loaded into every new tenant context.
    pub baseline_modules: Vec<String>,
    pub log_format: LogFormat,
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            command_prefix: "$".to_string(),
            owner_id: UserId::new(0),
            privileged_role: "Bot Admin".to_string(),
            max_tenants: 1024,
            lookup_timeout: Duration::from_millis(2_000),
            baseline_modules: vec!["admin".to_string(), "safety".to_string()],
            log_format: LogFormat::Json,
        }
    }
}

impl WardenConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` to read variables (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup(ENV_DATA_DIR) {
            config.data_dir = PathBuf::from(dir);
        }

        if let Some(prefix) = lookup(ENV_PREFIX) {
            if prefix.trim().is_empty() {
                return Err(ConfigError::invalid(ENV_PREFIX, &prefix, "must not be empty"));
            }
            config.command_prefix = prefix;
        }

        match lookup(ENV_OWNER_ID) {
            Some(raw) => {
                config.owner_id = raw
                    .parse()
                    .map_err(|e| ConfigError::invalid(ENV_OWNER_ID, &raw, format!("{e}")))?;
            }
            None => tracing::warn!("{ENV_OWNER_ID} not set; direct messages will have no owner"),
        }

        if let Some(name) = lookup(ENV_PRIVILEGED_ROLE) {
            if name.trim().is_empty() {
                return Err(ConfigError::invalid(ENV_PRIVILEGED_ROLE, &name, "must not be empty"));
            }
            config.privileged_role = name;
        }

        if let Some(raw) = lookup(ENV_MAX_TENANTS) {
            let max = raw
                .trim()
                .parse::<usize>()
                .map_err(|e| ConfigError::invalid(ENV_MAX_TENANTS, &raw, e.to_string()))?;
            if max == 0 {
                return Err(ConfigError::invalid(ENV_MAX_TENANTS, &raw, "must be at least 1"));
            }
            config.max_tenants = max;
        }

        if let Some(raw) = lookup(ENV_LOOKUP_TIMEOUT_MS) {
            let ms = raw
                .trim()
                .parse::<u64>()
                .map_err(|e| ConfigError::invalid(ENV_LOOKUP_TIMEOUT_MS, &raw, e.to_string()))?;
            config.lookup_timeout = Duration::from_millis(ms);
        }

        if let Some(raw) = lookup(ENV_BASELINE_MODULES) {
            config.baseline_modules = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Some(raw) = lookup(ENV_LOG_FORMAT) {
            config.log_format = raw
                .parse()
                .map_err(|e| ConfigError::invalid(ENV_LOG_FORMAT, &raw, format!("{e}")))?;
        }

        Ok(config)
    }
}
