//! Driver and session configuration, loadable from TOML.
//!
//! ```toml
//! [driver]
//! driver_path = 'C:\Program Files\IVI Foundation\VISA\VisaCom64\Primary Interop Assemblies'
//! binary_name = "Thorlabs.TLPM_64.Interop.dll"
//! class_name = "Thorlabs.TLPM_64.Interop.TLPM"
//!
//! [session]
//! dark_adjust_timeout_ms = 60000
//! dark_adjust_poll_interval_ms = 100
//!
//! [session.connect]
//! id_query = true
//! reset_device = false
//! ```

use crate::consts;
use crate::error::{Error, Result};
use crate::session::ConnectOptions;
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub driver: DriverConfig,
    pub session: SessionConfig,
}

/// Location and identity of the vendor driver binary.
///
/// Passed once to [`crate::PowerMeterDriver::load`]; the loaded driver is then
/// shared by every session created from the same registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DriverConfig {
    /// Directory containing the driver binary.
    pub driver_path: PathBuf,
    /// File name of the driver binary.
    pub binary_name: String,
    /// Fully qualified class exposing the driver API.
    pub class_name: String,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            driver_path: PathBuf::from(consts::DEFAULT_DRIVER_PATH),
            binary_name: consts::DEFAULT_DRIVER_BINARY.to_string(),
            class_name: consts::DEFAULT_DRIVER_CLASS.to_string(),
        }
    }
}

impl DriverConfig {
    /// Full path of the driver binary.
    pub fn binary_path(&self) -> PathBuf {
        self.driver_path.join(&self.binary_name)
    }
}

/// Per-session behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Upper limit on the dark-adjust poll loop.
    pub dark_adjust_timeout_ms: u64,
    /// Delay between "adjustment in progress" queries.
    pub dark_adjust_poll_interval_ms: u64,
    /// Options used by [`crate::Session::connect_default`].
    pub connect: ConnectOptions,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            dark_adjust_timeout_ms: consts::DEFAULT_DARK_ADJUST_TIMEOUT_MS,
            dark_adjust_poll_interval_ms: consts::DEFAULT_DARK_ADJUST_POLL_INTERVAL_MS,
            connect: ConnectOptions::default(),
        }
    }
}

impl SessionConfig {
    pub fn dark_adjust_timeout(&self) -> Duration {
        Duration::from_millis(self.dark_adjust_timeout_ms)
    }

    pub fn dark_adjust_poll_interval(&self) -> Duration {
        Duration::from_millis(self.dark_adjust_poll_interval_ms)
    }
}

impl Config {
    /// Parses and validates a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading configuration from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Checks values serde cannot.
    pub fn validate(&self) -> Result<()> {
        if self.driver.binary_name.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "driver.binary_name must not be empty".to_string(),
            ));
        }
        if self.driver.class_name.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "driver.class_name must not be empty".to_string(),
            ));
        }
        if self.session.dark_adjust_poll_interval_ms == 0 {
            return Err(Error::InvalidConfig(
                "session.dark_adjust_poll_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.session.dark_adjust_timeout_ms < self.session.dark_adjust_poll_interval_ms {
            return Err(Error::InvalidConfig(format!(
                "session.dark_adjust_timeout_ms ({}) is shorter than the poll interval ({})",
                self.session.dark_adjust_timeout_ms, self.session.dark_adjust_poll_interval_ms
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(
            config.session.dark_adjust_timeout(),
            Duration::from_secs(60)
        );
        assert!(config
            .driver
            .binary_path()
            .ends_with("Thorlabs.TLPM_64.Interop.dll"));
    }

    #[test]
    fn test_partial_override() {
        let config = Config::from_toml_str(
            r#"
            [driver]
            binary_name = "Thorlabs.TLPM_32.Interop.dll"

            [session]
            dark_adjust_timeout_ms = 5000

            [session.connect]
            reset_device = true
            "#,
        )
        .unwrap();
        assert_eq!(config.driver.binary_name, "Thorlabs.TLPM_32.Interop.dll");
        assert_eq!(config.driver.class_name, consts::DEFAULT_DRIVER_CLASS);
        assert_eq!(config.session.dark_adjust_timeout_ms, 5000);
        assert_eq!(
            config.session.dark_adjust_poll_interval_ms,
            consts::DEFAULT_DARK_ADJUST_POLL_INTERVAL_MS
        );
        assert!(config.session.connect.reset_device);
        assert!(config.session.connect.id_query);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result = Config::from_toml_str("[driver]\ndll = \"x\"\n");
        assert!(matches!(result, Err(Error::ConfigParse(_))));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let zero_poll = Config::from_toml_str("[session]\ndark_adjust_poll_interval_ms = 0\n");
        assert!(matches!(zero_poll, Err(Error::InvalidConfig(_))));

        let short_timeout = Config::from_toml_str(
            "[session]\ndark_adjust_timeout_ms = 10\ndark_adjust_poll_interval_ms = 50\n",
        );
        assert!(matches!(short_timeout, Err(Error::InvalidConfig(_))));

        let empty_binary = Config::from_toml_str("[driver]\nbinary_name = \"  \"\n");
        assert!(matches!(empty_binary, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/tlpm-guard.toml");
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
