//! Controller error types.

use bionic_hand_pca9685::DriverError;
use bionic_hand_protocol::MapError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error(transparent)]
    Map(#[from] MapError),

    #[error("Command stream I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ControllerError {
    /// True for failures reported by the hardware rather than by the input.
    pub fn is_hardware_fault(&self) -> bool {
        matches!(self, Self::Driver(_))
    }
}

pub type ControllerResult<T> = Result<T, ControllerError>;
