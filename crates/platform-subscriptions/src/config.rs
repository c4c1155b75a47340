//! Engine configuration.
//!
//! Loaded from environment variables with defaults that match the hosted
//! deployment: an hourly expiry sweep and prices in euros.

use platform_org::{normalize_currency, DEFAULT_CURRENCY};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
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

/// Subscription engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    /// Seconds between two expiry sweeps.
    pub sweep_interval_secs: u64,

    /// Currency for plans created without an explicit one.
    pub default_currency: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 3600,
            default_currency: DEFAULT_CURRENCY.to_string(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `SUBSCRIPTION_SWEEP_INTERVAL_SECS`: Seconds between sweeps (default: 3600)
    /// - `SUBSCRIPTION_DEFAULT_CURRENCY`: Currency for new plans (default: EUR)
    ///
    /// Unparseable numbers fall back to the default; call
    /// [`validate`](Self::validate) before use.
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            sweep_interval_secs: std::env::var("SUBSCRIPTION_SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.sweep_interval_secs),
            default_currency: std::env::var("SUBSCRIPTION_DEFAULT_CURRENCY")
                .unwrap_or(default.default_currency),
        }
    }

    /// Interval between sweeps as a Duration.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Check the values and normalize the currency code.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if self.sweep_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "SUBSCRIPTION_SWEEP_INTERVAL_SECS".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        self.default_currency =
            normalize_currency(&self.default_currency).map_err(|e| ConfigError::InvalidValue {
                key: "SUBSCRIPTION_DEFAULT_CURRENCY".to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }
}
