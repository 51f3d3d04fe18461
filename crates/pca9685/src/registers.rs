//! PCA9685 register map and the arithmetic around it.
//!
//! Each output owns a 4-byte block starting at `LED0_ON_L + 4 * channel`:
//! - Byte 0: ON count, low byte
//! - Byte 1: ON count, high nibble
//! - Byte 2: OFF count, low byte
//! - Byte 3: OFF count, high nibble
//!
//! The ON count is always written as zero, so every pulse starts at tick 0
//! of the period and its width is set by the OFF count alone.

use crate::types::{Channel, PulseValue};

pub const MODE1: u8 = 0x00;
pub const PRESCALE: u8 = 0xFE;
pub const LED0_ON_L: u8 = 0x06;

pub const REGISTERS_PER_CHANNEL: u8 = 4;

/// MODE1 control bits.
pub mod mode1 {
    pub const RESTART: u8 = 0x80;
    pub const AUTO_INCREMENT: u8 = 0x20;
    pub const SLEEP: u8 = 0x10;
}

/// Internal oscillator frequency of the boards in use.
pub const OSCILLATOR_HZ: u32 = 27_000_000;

/// Standard hobby-servo frame rate.
pub const SERVO_FREQUENCY_HZ: u32 = 50;

/// Prescale for [`OSCILLATOR_HZ`] and [`SERVO_FREQUENCY_HZ`].
pub const SERVO_PRESCALE: u8 = 131;

/// Ticks per PWM period.
pub const COUNTER_STEPS: u32 = 4096;

/// Prescale values the chip accepts.
pub const PRESCALE_MIN: u32 = 3;
pub const PRESCALE_MAX: u32 = 0xFF;

/// `round(oscillator / (4096 * frequency)) - 1`, in integer arithmetic.
///
/// Returns `None` for a zero frequency or when the divisor would be zero.
pub fn prescale(oscillator_hz: u32, frequency_hz: u32) -> Option<u32> {
    let period = u64::from(COUNTER_STEPS).checked_mul(u64::from(frequency_hz))?;
    if period == 0 {
        return None;
    }
    let rounded = (u64::from(oscillator_hz) + period / 2) / period;
    let value = rounded.checked_sub(1)?;
    u32::try_from(value).ok()
}

/// First register of a channel's 4-byte block.
pub const fn channel_base(channel: Channel) -> u8 {
    LED0_ON_L + channel.index() * REGISTERS_PER_CHANNEL
}

/// Bytes written to a channel block for `pulse`, in register order.
pub const fn pwm_block(pulse: PulseValue) -> [u8; 4] {
    [0x00, 0x00, pulse.low_byte(), pulse.high_byte()]
}

/// Inverse of [`channel_base`]: the channel whose block starts at `register`.
pub fn channel_at(register: u8) -> Option<Channel> {
    let offset = register.checked_sub(LED0_ON_L)?;
    if offset % REGISTERS_PER_CHANNEL != 0 {
        return None;
    }
    Channel::new(offset / REGISTERS_PER_CHANNEL)
}
