//! Error types for handctl

use bionic_hand_controller::ControllerError;
use bionic_hand_protocol::{PresetError, ProtocolError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Hardware unavailable: {0}")]
    HardwareUnavailable(String),

    #[error("Bus failure: {0}")]
    BusFailure(#[source] ControllerError),

    #[error("Unknown preset: {0}")]
    UnknownPreset(String),

    #[error("Invalid preset: {0}")]
    InvalidPreset(#[from] PresetError),

    #[error("Command rejected: {0}")]
    MalformedCommand(#[source] ProtocolError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidConfiguration(_)
            | Self::YamlError(_)
            | Self::UnknownPreset(_)
            | Self::InvalidPreset(_)
            | Self::MalformedCommand(_) => 2,
            Self::HardwareUnavailable(_) => 3,
            Self::BusFailure(_) => 4,
            Self::IoError(_) => 1,
        }
    }
}

impl From<ControllerError> for CliError {
    fn from(err: ControllerError) -> Self {
        match err {
            ControllerError::Io(e) => Self::IoError(e),
            ControllerError::Map(e) => Self::InvalidConfiguration(e.to_string()),
            other => Self::BusFailure(other),
        }
    }
}
