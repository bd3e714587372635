//! Runtime configuration for the authenticator core.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::totp::core;
use crate::totp::types::*;

/// Keychain service earlier releases registered their items under.
pub const DEFAULT_KEYCHAIN_SERVICE: &str = "org.sanyaas.2fa";

/// Tunables for code generation, display and the refresh loop.
///
/// Every field has a default, so a partial JSON document is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthenticatorConfig {
    /// Service name used by [`KeychainStore`](crate::totp::keychain).
    pub keychain_service: String,
    /// Window length in seconds.
    pub period: u32,
    /// Code length.
    pub digits: u8,
    /// Shown in place of a code when generation fails.
    pub error_code: String,
    /// Placeholder shown in the edit dialog's secret field.
    pub secret_mask: String,
    /// Refresh loop cadence.
    pub tick_interval_ms: u64,
}

impl Default for AuthenticatorConfig {
    fn default() -> Self {
        Self {
            keychain_service: DEFAULT_KEYCHAIN_SERVICE.to_string(),
            period: core::DEFAULT_PERIOD,
            digits: core::DEFAULT_DIGITS,
            error_code: "ERR".to_string(),
            secret_mask: "*************".to_string(),
            tick_interval_ms: 1000,
        }
    }
}

impl AuthenticatorConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, TotpError> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            TotpError::new(TotpErrorKind::ConfigError, format!("JSON deserialise: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TotpError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            TotpError::new(TotpErrorKind::IoError, "Failed to read config")
                .with_detail(format!("{}: {}", path.display(), e))
        })?;
        let config = Self::from_json(&raw)?;
        log::info!("Loaded authenticator config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), TotpError> {
        if self.period == 0 {
            return Err(TotpError::new(
                TotpErrorKind::InvalidPeriod,
                "Period must be at least one second",
            ));
        }
        if !(6..=8).contains(&self.digits) {
            return Err(TotpError::new(
                TotpErrorKind::InvalidDigits,
                format!("Unsupported digit count: {}", self.digits),
            ));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.tick_interval_ms.max(1))
    }
}
