//! Checker configuration.
//!
//! Controls how far permission checks walk up parent chains and which
//! optional rules are enforced. Configuration is loaded from environment
//! variables with defaults suitable for most applications.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

/// Configuration for the permission checker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckerConfig {
    /// How many parent levels a permission check walks before giving up.
    pub max_parent_depth: usize,

    /// Whether global role assignments take part in permission checks.
    pub check_global_roles: bool,

    /// Whether unique roles are limited to one holder per object.
    pub enforce_unique_roles: bool,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            max_parent_depth: 16,
            check_global_roles: true,
            enforce_unique_roles: true,
        }
    }
}

impl CheckerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `ROLEGATE_MAX_PARENT_DEPTH`: Parent levels to walk (default: 16)
    /// - `ROLEGATE_CHECK_GLOBAL_ROLES`: Consult global roles (default: true)
    /// - `ROLEGATE_ENFORCE_UNIQUE_ROLES`: Enforce unique roles (default: true)
    ///
    /// Unparseable values fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through a key lookup function.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();

        Self {
            max_parent_depth: lookup("ROLEGATE_MAX_PARENT_DEPTH")
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.max_parent_depth),
            check_global_roles: lookup("ROLEGATE_CHECK_GLOBAL_ROLES")
                .map(|s| s != "false" && s != "0")
                .unwrap_or(default.check_global_roles),
            enforce_unique_roles: lookup("ROLEGATE_ENFORCE_UNIQUE_ROLES")
                .map(|s| s != "false" && s != "0")
                .unwrap_or(default.enforce_unique_roles),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_parent_depth == 0 {
            return Err(ConfigError::InvalidValue {
                key: "ROLEGATE_MAX_PARENT_DEPTH".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
