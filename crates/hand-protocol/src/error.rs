//! Protocol, mapping, and preset error types.

use bionic_hand_pca9685::{Channel, DeviceAddress};
use thiserror::Error;

use crate::command::Opcode;
use crate::joint::Joint;

/// Reasons a command line is discarded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("Empty command line")]
    Empty,

    #[error("Unknown opcode: {0:?}")]
    UnknownOpcode(String),

    #[error("{opcode} expects {expected} parameters, got {actual}")]
    WrongArity {
        opcode: Opcode,
        expected: usize,
        actual: usize,
    },

    #[error("Parameter {position} is not a decimal integer: {token:?}")]
    InvalidParameter { position: usize, token: String },

    #[error("Parameter {position} out of 12-bit range: {value}")]
    PulseOutOfRange { position: usize, value: i64 },

    #[error("Command line exceeds {limit} bytes")]
    LineTooLong { limit: usize },

    #[error("Command line is not valid UTF-8")]
    InvalidUtf8,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    #[error("Joint {0} has no servo channel")]
    UnknownJoint(Joint),

    #[error("Unknown joint name: {0:?}")]
    UnknownJointName(String),

    #[error("Joint {0} is mapped more than once")]
    DuplicateJoint(Joint),

    #[error("Joints {first} and {second} share {address} {channel}")]
    ChannelCollision {
        first: Joint,
        second: Joint,
        address: DeviceAddress,
        channel: Channel,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PresetError {
    #[error("Invalid preset assignment {0:?}, expected <joint>=<pulse>")]
    InvalidAssignment(String),

    #[error(transparent)]
    Joint(#[from] MapError),

    #[error("Pulse for {joint} out of 12-bit range: {value}")]
    PulseOutOfRange { joint: Joint, value: String },
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
pub type MapResult<T> = Result<T, MapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProtocolError::WrongArity {
            opcode: Opcode::FirstFingerPair,
            expected: 8,
            actual: 3,
        };
        assert_eq!(err.to_string(), "command1 expects 8 parameters, got 3");

        let err = ProtocolError::UnknownOpcode("command9".into());
        assert_eq!(err.to_string(), "Unknown opcode: \"command9\"");

        let err = MapError::UnknownJoint(Joint::new(
            crate::joint::Digit::Thumb,
            crate::joint::Segment::Medial,
        ));
        assert_eq!(err.to_string(), "Joint 01_med has no servo channel");
    }
}
