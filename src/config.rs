//! Connection settings for a SynthHD Pro.
//!
//! Settings come from a TOML file merged with `SYNTHHD_*` environment
//! variables, or are built in code:
//!
//! ```toml
//! serial_port = "/dev/ttyACM0"
//! serial_timeout = 10
//! ```

use std::{path::Path, time::Duration};

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::proto::{ProtoError, Result};
use crate::DEFAULT_BAUDRATE;

/// Serial timeout in seconds used when none is configured.
pub const DEFAULT_SERIAL_TIMEOUT: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthConfig {
    pub serial_port: String,
    /// Seconds to wait for a reply to a query.
    #[serde(default)]
    pub serial_timeout: Option<u64>,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Upper bound for waiting on the PLL to lock after enabling output.
    #[serde(default = "default_settle_timeout_ms")]
    pub settle_timeout_ms: u64,
    #[serde(default = "default_settle_poll_ms")]
    pub settle_poll_ms: u64,
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUDRATE
}

fn default_settle_timeout_ms() -> u64 {
    2000
}

fn default_settle_poll_ms() -> u64 {
    50
}

impl SynthConfig {
    pub fn new(serial_port: impl Into<String>) -> Self {
        Self {
            serial_port: serial_port.into(),
            serial_timeout: None,
            baud_rate: default_baud_rate(),
            settle_timeout_ms: default_settle_timeout_ms(),
            settle_poll_ms: default_settle_poll_ms(),
        }
    }

    /// Load from a TOML file, overridden by `SYNTHHD_*` environment variables.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_figment(
            Figment::new()
                .merge(Toml::file(path.as_ref()))
                .merge(Env::prefixed("SYNTHHD_")),
        )
    }

    pub(crate) fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract()?;
        if config.serial_port.trim().is_empty() {
            return Err(ProtoError::Config("serial_port must not be empty".into()));
        }
        if config.settle_poll_ms == 0 {
            return Err(ProtoError::Config("settle_poll_ms must be positive".into()));
        }
        Ok(config)
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.serial_timeout = Some(seconds);
        self
    }

    /// Reply timeout, falling back to [`DEFAULT_SERIAL_TIMEOUT`] with a warning.
    pub fn timeout(&self) -> Duration {
        match self.serial_timeout {
            Some(secs) => Duration::from_secs(secs),
            None => {
                warn!(
                    "No serial_timeout configured for {}, using {} s",
                    self.serial_port, DEFAULT_SERIAL_TIMEOUT
                );
                Duration::from_secs(DEFAULT_SERIAL_TIMEOUT)
            }
        }
    }

    pub fn settle_timeout(&self) -> Duration {
        Duration::from_millis(self.settle_timeout_ms)
    }

    pub fn settle_poll(&self) -> Duration {
        Duration::from_millis(self.settle_poll_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::providers::Serialized;

    #[test]
    fn test_defaults() {
        let config = SynthConfig::from_figment(Figment::from(Toml::string(
            r#"serial_port = "/dev/ttyACM0""#,
        )))
        .unwrap();
        assert_eq!(config, SynthConfig::new("/dev/ttyACM0"));
        assert_eq!(config.timeout(), Duration::from_secs(DEFAULT_SERIAL_TIMEOUT));
    }

    #[test]
    fn test_explicit_timeout() {
        let config = SynthConfig::from_figment(Figment::from(Toml::string(
            "serial_port = \"COM4\"\nserial_timeout = 3\nsettle_timeout_ms = 500",
        )))
        .unwrap();
        assert_eq!(config.timeout(), Duration::from_secs(3));
        assert_eq!(config.settle_timeout(), Duration::from_millis(500));
    }

    #[test]
    fn test_missing_port_is_config_error() {
        let result = SynthConfig::from_figment(Figment::from(Toml::string("serial_timeout = 3")));
        assert!(matches!(result, Err(ProtoError::Config(_))));
    }

    #[test]
    fn test_empty_port_rejected() {
        let result =
            SynthConfig::from_figment(Figment::from(Serialized::defaults(SynthConfig::new(" "))));
        assert!(matches!(result, Err(ProtoError::Config(_))));
    }
}
