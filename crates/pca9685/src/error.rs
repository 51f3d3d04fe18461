//! Bus and driver error types.

use thiserror::Error;

use crate::driver::ChipState;
use crate::types::DeviceAddress;

/// Transport failure reported by a [`RegisterBus`](crate::RegisterBus).
///
/// Never retried by this crate; callers decide how to surface it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("No acknowledge from device {address}")]
    NoAcknowledge { address: DeviceAddress },

    #[error("Arbitration lost while addressing device {address}")]
    ArbitrationLoss { address: DeviceAddress },

    #[error("Bus timeout addressing device {address}")]
    Timeout { address: DeviceAddress },

    #[error("Bus transport error on device {address}: {message}")]
    Transport {
        address: DeviceAddress,
        message: String,
    },
}

impl BusError {
    pub fn transport(address: DeviceAddress, message: impl Into<String>) -> Self {
        Self::Transport {
            address,
            message: message.into(),
        }
    }

    /// Address of the chip the failed transaction targeted.
    pub fn address(&self) -> DeviceAddress {
        match self {
            Self::NoAcknowledge { address }
            | Self::ArbitrationLoss { address }
            | Self::Timeout { address }
            | Self::Transport { address, .. } => *address,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    #[error(transparent)]
    Bus(#[from] BusError),

    #[error("Chip {address} is not running (state: {state:?})")]
    NotRunning {
        address: DeviceAddress,
        state: ChipState,
    },

    #[error("Invalid driver configuration: {0}")]
    InvalidConfig(String),
}

impl DriverError {
    pub fn is_bus_failure(&self) -> bool {
        matches!(self, Self::Bus(_))
    }
}

pub type BusResult<T> = Result<T, BusError>;
pub type DriverResult<T> = Result<T, DriverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BusError::NoAcknowledge {
            address: DeviceAddress::PRIMARY,
        };
        assert_eq!(err.to_string(), "No acknowledge from device 0x40");

        let err = DriverError::NotRunning {
            address: DeviceAddress::SECONDARY,
            state: ChipState::Sleeping,
        };
        assert_eq!(
            err.to_string(),
            "Chip 0x41 is not running (state: Sleeping)"
        );
    }

    #[test]
    fn test_bus_error_address() {
        let err = BusError::transport(DeviceAddress::SECONDARY, "overrun");
        assert_eq!(err.address(), DeviceAddress::SECONDARY);

        let driver_err: DriverError = err.into();
        assert!(driver_err.is_bus_failure());
        assert_eq!(
            driver_err.to_string(),
            "Bus transport error on device 0x41: overrun"
        );
    }
}
