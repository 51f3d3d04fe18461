//! Hand controller for the bionic hand.
//!
//! [`HandController`] owns a [`PwmDriver`](bionic_hand_pca9685::PwmDriver)
//! and a [`ServoMap`](bionic_hand_protocol::ServoMap) and applies presets
//! and parsed command lines as channel writes. On top of it sit the serial
//! command [`session`] loop and the bounded [`calibration`] routines.
//!
//! # Error policy
//! - Malformed command lines are discarded with a warning and no writes.
//! - Joints a preset names but the map lacks are skipped with a warning.
//! - Driver and bus failures always propagate; they are never retried.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(static_mut_refs)]
#![deny(clippy::unwrap_used)]

pub mod calibration;
pub mod cancel;
pub mod controller;
pub mod error;
pub mod reader;
pub mod session;

pub use calibration::{CalibrationConfig, Calibrator, Iterations, RoutineReport};
pub use cancel::CancelToken;
pub use controller::{HandController, LineOutcome, PresetReport, ProbeResult};
pub use error::{ControllerError, ControllerResult};
pub use reader::{DEFAULT_POLL_INTERVAL, PolledReader};
pub use session::{Session, SessionConfig, SessionStats, run_session};
