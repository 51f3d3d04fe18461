//! handctl configuration file.
//!
//! Every field has a default, so an empty file (or no file) is valid:
//!
//! ```yaml
//! i2c_device: /dev/i2c-1
//! serial:
//!   port: /dev/ttyUSB0
//!   baud_rate: 9600
//!   read_timeout_ms: 100
//! protocol:
//!   policy: strict
//!   accept_numeric_opcodes: false
//!   max_line_len: 256
//! halt_on_bus_error: true
//! calibration:
//!   step_delay_ms: 500
//! ```

use std::path::{Path, PathBuf};

use bionic_hand_controller::{CalibrationConfig, SessionConfig};
use bionic_hand_protocol::{DEFAULT_MAX_LINE_LEN, ParsePolicy, ParserConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CliError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HandConfig {
    /// I²C character device both expanders sit on.
    pub i2c_device: PathBuf,
    pub serial: SerialConfig,
    pub protocol: ProtocolConfig,
    /// Stop serving on the first bus failure.
    pub halt_on_bus_error: bool,
    pub calibration: CalibrationConfig,
}

impl Default for HandConfig {
    fn default() -> Self {
        Self {
            i2c_device: PathBuf::from("/dev/i2c-1"),
            serial: SerialConfig::default(),
            protocol: ProtocolConfig::default(),
            halt_on_bus_error: true,
            calibration: CalibrationConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
    /// Read timeout; bounds how long Ctrl-C takes to stop a quiet session.
    pub read_timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 9600,
            read_timeout_ms: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProtocolConfig {
    pub policy: ParsePolicy,
    pub accept_numeric_opcodes: bool,
    pub max_line_len: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            policy: ParsePolicy::Strict,
            accept_numeric_opcodes: false,
            max_line_len: DEFAULT_MAX_LINE_LEN,
        }
    }
}

impl HandConfig {
    /// Loads and validates `path`, or returns the defaults when `path` is
    /// `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, CliError> {
        let config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)?;
                let config: Self = serde_yaml::from_str(&text)?;
                debug!(path = %path.display(), "loaded configuration");
                config
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CliError> {
        if self.i2c_device.as_os_str().is_empty() {
            return Err(CliError::InvalidConfiguration(
                "i2c_device must not be empty".into(),
            ));
        }
        if self.serial.port.trim().is_empty() {
            return Err(CliError::InvalidConfiguration(
                "serial.port must not be empty".into(),
            ));
        }
        if self.serial.baud_rate == 0 {
            return Err(CliError::InvalidConfiguration(
                "serial.baud_rate must be greater than zero".into(),
            ));
        }
        if self.protocol.max_line_len == 0 {
            return Err(CliError::InvalidConfiguration(
                "protocol.max_line_len must be greater than zero".into(),
            ));
        }
        if self.calibration.sweep_step == 0 {
            return Err(CliError::InvalidConfiguration(
                "calibration.sweep_step must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn parser_config(&self) -> ParserConfig {
        ParserConfig {
            policy: self.protocol.policy,
            accept_numeric_opcodes: self.protocol.accept_numeric_opcodes,
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            max_line_len: self.protocol.max_line_len,
            halt_on_bus_error: self.halt_on_bus_error,
        }
    }
}
