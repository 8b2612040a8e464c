//! Configuration for the bridge daemon
//!
//! Loads configuration from a TOML file with the minimal parameters needed
//! to bridge one sensor onto the local network.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BridgeConfig {
    pub serial: SerialConfig,
    pub network: NetworkConfig,
    pub window: WindowConfig,
    pub logging: LoggingConfig,
}

/// Serial device configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SerialConfig {
    /// Sensor serial port
    pub device: String,
    /// Baud rate (the SDS011 talks 9600 8N1)
    pub baud: u32,
}

/// Network delivery configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
    /// Destination host, accepted for compatibility with older deployments.
    /// Delivery is broadcast-only; this value changes nothing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Destination UDP port for summary datagrams
    pub port: u16,
}

/// Aggregation window configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WindowConfig {
    /// Number of readings averaged into one summary
    pub samples: u16,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl BridgeConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: BridgeConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Default configuration for an SDS011 on a USB serial adapter
    ///
    /// Suitable for testing and development. Production deployments should
    /// use a proper TOML configuration file.
    pub fn sds011_defaults() -> Self {
        Self {
            serial: SerialConfig {
                device: "/dev/ttyUSB0".to_string(),
                baud: 9600,
            },
            network: NetworkConfig {
                host: None,
                port: 14441,
            },
            window: WindowConfig { samples: 60 },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }

    /// Validate parameter ranges
    ///
    /// The window must hold at least two samples: the sample variance
    /// divides by `samples - 1`.
    pub fn validate(&self) -> Result<()> {
        if self.window.samples < 2 {
            return Err(Error::InvalidParameter(format!(
                "window.samples must be at least 2, got {}",
                self.window.samples
            )));
        }
        Ok(())
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::sds011_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BridgeConfig::sds011_defaults();
        assert_eq!(config.serial.device, "/dev/ttyUSB0");
        assert_eq!(config.serial.baud, 9600);
        assert_eq!(config.network.host, None);
        assert_eq!(config.network.port, 14441);
        assert_eq!(config.window.samples, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = BridgeConfig::sds011_defaults();
        let toml_string = toml::to_string_pretty(&config).unwrap();

        assert!(toml_string.contains("[serial]"));
        assert!(toml_string.contains("[network]"));
        assert!(toml_string.contains("[window]"));
        assert!(toml_string.contains("[logging]"));
        assert!(toml_string.contains("device = \"/dev/ttyUSB0\""));

        let parsed: BridgeConfig = toml::from_str(&toml_string).unwrap();
        assert_eq!(parsed.network.port, config.network.port);
    }

    #[test]
    fn test_toml_deserialization() {
        let toml_content = r#"
[serial]
device = "/dev/ttyAMA0"
baud = 9600

[network]
host = "192.168.1.10"
port = 12345

[window]
samples = 30

[logging]
level = "debug"
"#;

        let config: BridgeConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.serial.device, "/dev/ttyAMA0");
        assert_eq!(config.network.host.as_deref(), Some("192.168.1.10"));
        assert_eq!(config.network.port, 12345);
        assert_eq!(config.window.samples, 30);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_validate_rejects_degenerate_window() {
        let mut config = BridgeConfig::sds011_defaults();
        config.window.samples = 1;
        assert!(config.validate().is_err());
        config.window.samples = 0;
        assert!(config.validate().is_err());
        config.window.samples = 2;
        assert!(config.validate().is_ok());
    }
}
