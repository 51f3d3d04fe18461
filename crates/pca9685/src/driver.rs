//! PCA9685 lifecycle and channel writes.
//!
//! ## State Machine
//!
//! ```text
//! ┌───────────────┐ restart + sleep ┌──────────┐ prescale, wake + AI ┌─────────┐
//! │ Uninitialized │────────────────►│ Sleeping │────────────────────►│ Running │
//! └───────────────┘                 └──────────┘                     └─────────┘
//! ```
//!
//! The prescale register only latches while the oscillator is asleep, so
//! [`PwmDriver::init`] always walks the full sequence in this order. A bus
//! failure leaves the chip in the last state it fully reached.

use std::collections::BTreeMap;

use embedded_hal::delay::DelayNs;
use tracing::{debug, info};

use crate::bus::RegisterBus;
use crate::error::{DriverError, DriverResult};
use crate::registers::{self, mode1};
use crate::types::{Channel, DeviceAddress, PulseValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChipState {
    #[default]
    Uninitialized,
    Sleeping,
    Running,
}

/// Shortest wait the oscillator needs after a restart.
pub const MIN_RESTART_SETTLE_MS: u32 = 10;

/// Timing parameters for chip bring-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverConfig {
    /// Oscillator feeding the PWM counter.
    ///
    /// Default: 27 MHz, as measured on the boards in use.
    pub oscillator_hz: u32,

    /// Target PWM frame rate.
    ///
    /// Default: 50 Hz.
    pub pwm_frequency_hz: u32,

    /// Wait after writing the restart bit.
    pub restart_settle_ms: u32,

    /// Wait after waking the oscillator.
    pub wake_settle_ms: u32,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            oscillator_hz: registers::OSCILLATOR_HZ,
            pwm_frequency_hz: registers::SERVO_FREQUENCY_HZ,
            restart_settle_ms: 10,
            wake_settle_ms: 5,
        }
    }
}

impl DriverConfig {
    #[must_use]
    pub fn builder() -> DriverConfigBuilder {
        DriverConfigBuilder::default()
    }

    /// Prescale byte for this configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the frequency yields a prescale outside the range
    /// the chip accepts.
    pub fn prescale(&self) -> DriverResult<u8> {
        let value = registers::prescale(self.oscillator_hz, self.pwm_frequency_hz)
            .filter(|p| (registers::PRESCALE_MIN..=registers::PRESCALE_MAX).contains(p))
            .ok_or_else(|| {
                DriverError::InvalidConfig(format!(
                    "{} Hz from a {} Hz oscillator needs a prescale outside {}..={}",
                    self.pwm_frequency_hz,
                    self.oscillator_hz,
                    registers::PRESCALE_MIN,
                    registers::PRESCALE_MAX
                ))
            })?;
        u8::try_from(value).map_err(|e| DriverError::InvalidConfig(e.to_string()))
    }

    /// # Errors
    ///
    /// Returns an error if any value is out of range.
    pub fn validate(&self) -> DriverResult<()> {
        self.prescale()?;
        if self.restart_settle_ms < MIN_RESTART_SETTLE_MS {
            return Err(DriverError::InvalidConfig(format!(
                "restart_settle_ms must be at least {MIN_RESTART_SETTLE_MS}"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct DriverConfigBuilder {
    config: DriverConfig,
}

impl DriverConfigBuilder {
    #[must_use]
    pub fn oscillator_hz(mut self, hz: u32) -> Self {
        self.config.oscillator_hz = hz;
        self
    }

    #[must_use]
    pub fn pwm_frequency_hz(mut self, hz: u32) -> Self {
        self.config.pwm_frequency_hz = hz;
        self
    }

    #[must_use]
    pub fn restart_settle_ms(mut self, ms: u32) -> Self {
        self.config.restart_settle_ms = ms;
        self
    }

    #[must_use]
    pub fn wake_settle_ms(mut self, ms: u32) -> Self {
        self.config.wake_settle_ms = ms;
        self
    }

    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> DriverResult<DriverConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Owns the register bus and tracks the lifecycle of every chip on it.
#[derive(Debug)]
pub struct PwmDriver<B, D> {
    bus: B,
    delay: D,
    config: DriverConfig,
    prescale: u8,
    chips: BTreeMap<DeviceAddress, ChipState>,
}

impl<B: RegisterBus, D: DelayNs> PwmDriver<B, D> {
    /// Driver with the default 27 MHz / 50 Hz timing.
    pub fn new(bus: B, delay: D) -> Self {
        Self {
            bus,
            delay,
            config: DriverConfig::default(),
            prescale: registers::SERVO_PRESCALE,
            chips: BTreeMap::new(),
        }
    }

    /// # Errors
    ///
    /// Returns an error if `config` is invalid.
    pub fn with_config(bus: B, delay: D, config: DriverConfig) -> DriverResult<Self> {
        config.validate()?;
        Ok(Self {
            bus,
            delay,
            config,
            prescale: config.prescale()?,
            chips: BTreeMap::new(),
        })
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn state(&self, address: DeviceAddress) -> ChipState {
        self.chips.get(&address).copied().unwrap_or_default()
    }

    /// Restarts the chip, programs the prescaler, and enables
    /// register auto-increment. Safe to call again from any state.
    ///
    /// # Errors
    ///
    /// Propagates the first bus failure; the chip keeps the last state it
    /// fully reached.
    pub fn init(&mut self, address: DeviceAddress) -> DriverResult<()> {
        debug!(%address, "restarting PWM expander");
        self.chips.insert(address, ChipState::Uninitialized);
        self.bus
            .write_register(address, registers::MODE1, mode1::RESTART)?;
        self.delay.delay_ms(self.config.restart_settle_ms);

        let mode = self.bus.read_register(address, registers::MODE1)?;
        let mode = (mode & !mode1::RESTART) | mode1::SLEEP;
        self.bus.write_register(address, registers::MODE1, mode)?;
        self.chips.insert(address, ChipState::Sleeping);

        debug!(%address, prescale = self.prescale, "programming prescaler");
        self.bus
            .write_register(address, registers::PRESCALE, self.prescale)?;

        let mode = self.bus.read_register(address, registers::MODE1)?;
        let mode = (mode & !mode1::SLEEP) | mode1::AUTO_INCREMENT;
        self.bus.write_register(address, registers::MODE1, mode)?;
        self.delay.delay_ms(self.config.wake_settle_ms);
        self.chips.insert(address, ChipState::Running);

        info!(
            %address,
            frequency_hz = self.config.pwm_frequency_hz,
            "PWM expander running"
        );
        Ok(())
    }

    /// Loads `pulse` as the OFF count of `channel`, with an ON count of zero.
    ///
    /// # Errors
    ///
    /// Fails with [`DriverError::NotRunning`] before [`init`](Self::init)
    /// completes for `address`, or with the bus error of the first failed
    /// register write.
    pub fn set_channel(
        &mut self,
        address: DeviceAddress,
        channel: Channel,
        pulse: PulseValue,
    ) -> DriverResult<()> {
        let state = self.state(address);
        if state != ChipState::Running {
            return Err(DriverError::NotRunning { address, state });
        }

        let base = registers::channel_base(channel);
        for (register, value) in (base..).zip(registers::pwm_block(pulse)) {
            self.bus.write_register(address, register, value)?;
        }
        debug!(%address, %channel, %pulse, "channel updated");
        Ok(())
    }

    /// Reads MODE1; used to check that a chip answers on the bus.
    ///
    /// # Errors
    ///
    /// Returns the bus error if the chip does not respond.
    pub fn read_mode1(&mut self, address: DeviceAddress) -> DriverResult<u8> {
        Ok(self.bus.read_register(address, registers::MODE1)?)
    }

    /// Blocks for `ms` milliseconds using the driver's delay provider.
    pub fn pause_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn delay(&self) -> &D {
        &self.delay
    }

    pub fn into_parts(self) -> (B, D) {
        (self.bus, self.delay)
    }
}
