//! Register-level driver for the PCA9685 16-channel PWM expanders that
//! drive the hand's servos.
//!
//! The driver is written against the small [`RegisterBus`] trait rather
//! than a concrete I²C stack, so the same code runs on hardware (through
//! [`I2cRegisterBus`] and any `embedded-hal` master) and in tests (through
//! [`mock::MockBus`]).
//!
//! # Key Features
//! - Restart → sleep → prescale → wake bring-up sequence per chip
//! - Zero-ON-count channel writes: pulse width is set by the OFF count only
//! - Deterministic prescale arithmetic for the 27 MHz / 50 Hz servo setup
//! - [`SharedBus`] for serialized access from several owners

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(static_mut_refs)]
#![deny(clippy::unwrap_used)]

pub mod bus;
pub mod delay;
pub mod driver;
pub mod error;
pub mod mock;
pub mod registers;
pub mod types;

pub use bus::{I2cRegisterBus, RegisterBus, SharedBus};
pub use delay::StdDelay;
pub use driver::{ChipState, DriverConfig, DriverConfigBuilder, MIN_RESTART_SETTLE_MS, PwmDriver};
pub use error::{BusError, BusResult, DriverError, DriverResult};
pub use registers::{OSCILLATOR_HZ, SERVO_FREQUENCY_HZ, SERVO_PRESCALE};
pub use types::{Channel, DeviceAddress, PulseValue};
