//! In-memory bus and delay doubles for hardware-free testing.
//!
//! [`MockBus`] keeps a register file per device address (so the driver's
//! read-modify-write of MODE1 behaves like the chip) and an ordered log of
//! every transaction. Failures can be injected per device or after a number
//! of successful writes.

use std::collections::{BTreeMap, BTreeSet};

use embedded_hal::delay::DelayNs;

use crate::bus::RegisterBus;
use crate::error::{BusError, BusResult};
use crate::registers::{REGISTERS_PER_CHANNEL, channel_at};
use crate::types::{Channel, DeviceAddress, PulseValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusOp {
    Write {
        address: DeviceAddress,
        register: u8,
        value: u8,
    },
    Read {
        address: DeviceAddress,
        register: u8,
        value: u8,
    },
}

/// A complete 4-register channel update recovered from the write log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelWrite {
    pub address: DeviceAddress,
    pub channel: Channel,
    pub on: u16,
    pub off: u16,
}

#[derive(Debug, Default)]
pub struct MockBus {
    registers: BTreeMap<(DeviceAddress, u8), u8>,
    log: Vec<BusOp>,
    offline: BTreeSet<DeviceAddress>,
    writes_before_failure: Option<usize>,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every transaction to `address` fails with [`BusError::NoAcknowledge`].
    pub fn with_offline(mut self, address: DeviceAddress) -> Self {
        self.offline.insert(address);
        self
    }

    /// Lets `count` more writes succeed, then fails every write with a
    /// transport error.
    pub fn fail_after_writes(&mut self, count: usize) {
        self.writes_before_failure = Some(count);
    }

    pub fn set_offline(&mut self, address: DeviceAddress, offline: bool) {
        if offline {
            self.offline.insert(address);
        } else {
            self.offline.remove(&address);
        }
    }

    pub fn ops(&self) -> &[BusOp] {
        &self.log
    }

    pub fn writes(&self) -> Vec<(DeviceAddress, u8, u8)> {
        self.log
            .iter()
            .filter_map(|op| match *op {
                BusOp::Write {
                    address,
                    register,
                    value,
                } => Some((address, register, value)),
                BusOp::Read { .. } => None,
            })
            .collect()
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    /// Current content of a register; registers never written read as zero.
    pub fn register(&self, address: DeviceAddress, register: u8) -> u8 {
        self.registers
            .get(&(address, register))
            .copied()
            .unwrap_or_default()
    }

    pub fn set_register(&mut self, address: DeviceAddress, register: u8, value: u8) {
        self.registers.insert((address, register), value);
    }

    /// OFF count currently held by a channel's registers.
    pub fn channel_pulse(&self, address: DeviceAddress, channel: Channel) -> PulseValue {
        let base = crate::registers::channel_base(channel);
        let low = self.register(address, base.wrapping_add(2));
        let high = self.register(address, base.wrapping_add(3));
        PulseValue::masked(u32::from(u16::from_le_bytes([low, high])))
    }

    /// Decodes the write log into channel updates.
    ///
    /// A channel update is four consecutive writes to one chip covering a
    /// channel block in register order; anything else is ignored.
    pub fn channel_writes(&self) -> Vec<ChannelWrite> {
        let writes = self.writes();
        let mut decoded = Vec::new();
        let mut idx = 0;
        while let Some(&(address, register, _)) = writes.get(idx) {
            let block = writes.get(idx..idx + usize::from(REGISTERS_PER_CHANNEL));
            let channel = channel_at(register);
            match (channel, block) {
                (Some(channel), Some([on_l, on_h, off_l, off_h]))
                    if [on_l, on_h, off_l, off_h]
                        .iter()
                        .zip(0u8..)
                        .all(|(w, step)| w.0 == address && w.1 == register + step) =>
                {
                    decoded.push(ChannelWrite {
                        address,
                        channel,
                        on: u16::from_le_bytes([on_l.2, on_h.2]),
                        off: u16::from_le_bytes([off_l.2, off_h.2]),
                    });
                    idx += usize::from(REGISTERS_PER_CHANNEL);
                }
                _ => idx += 1,
            }
        }
        decoded
    }
}

impl RegisterBus for MockBus {
    fn write_register(
        &mut self,
        address: DeviceAddress,
        register: u8,
        value: u8,
    ) -> BusResult<()> {
        if self.offline.contains(&address) {
            return Err(BusError::NoAcknowledge { address });
        }
        if let Some(remaining) = self.writes_before_failure.as_mut() {
            if *remaining == 0 {
                return Err(BusError::transport(address, "injected write failure"));
            }
            *remaining -= 1;
        }
        self.registers.insert((address, register), value);
        self.log.push(BusOp::Write {
            address,
            register,
            value,
        });
        Ok(())
    }

    fn read_register(&mut self, address: DeviceAddress, register: u8) -> BusResult<u8> {
        if self.offline.contains(&address) {
            return Err(BusError::NoAcknowledge { address });
        }
        let value = self.register(address, register);
        self.log.push(BusOp::Read {
            address,
            register,
            value,
        });
        Ok(value)
    }
}

/// Delay that returns immediately and accumulates the requested time.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDelay {
    pub total_ns: u64,
}

impl NoopDelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_ms(&self) -> u64 {
        self.total_ns / 1_000_000
    }
}

impl DelayNs for NoopDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns = self.total_ns.saturating_add(u64::from(ns));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_return_last_write() -> BusResult<()> {
        let mut bus = MockBus::new();
        assert_eq!(bus.read_register(DeviceAddress::PRIMARY, 0x00)?, 0);
        bus.write_register(DeviceAddress::PRIMARY, 0x00, 0x80)?;
        assert_eq!(bus.read_register(DeviceAddress::PRIMARY, 0x00)?, 0x80);
        assert_eq!(bus.read_register(DeviceAddress::SECONDARY, 0x00)?, 0);
        assert_eq!(bus.ops().len(), 4);
        Ok(())
    }

    #[test]
    fn test_offline_device_nacks() {
        let mut bus = MockBus::new().with_offline(DeviceAddress::SECONDARY);
        assert_eq!(
            bus.write_register(DeviceAddress::SECONDARY, 0x00, 1),
            Err(BusError::NoAcknowledge {
                address: DeviceAddress::SECONDARY
            })
        );
        assert!(bus.write_register(DeviceAddress::PRIMARY, 0x00, 1).is_ok());
        assert_eq!(bus.writes().len(), 1);
    }

    #[test]
    fn test_fail_after_writes() {
        let mut bus = MockBus::new();
        bus.fail_after_writes(2);
        assert!(bus.write_register(DeviceAddress::PRIMARY, 0x06, 1).is_ok());
        assert!(bus.write_register(DeviceAddress::PRIMARY, 0x07, 1).is_ok());
        assert!(matches!(
            bus.write_register(DeviceAddress::PRIMARY, 0x08, 1),
            Err(BusError::Transport { .. })
        ));
    }

    #[test]
    fn test_channel_write_decoding() -> Result<(), Box<dyn std::error::Error>> {
        let channel = Channel::new(2).ok_or("channel 2")?;
        let mut bus = MockBus::new();
        // Stray MODE1 write must not be decoded.
        bus.write_register(DeviceAddress::PRIMARY, 0x00, 0x20)?;
        for (offset, value) in [0u8, 0, 0x2C, 0x01].into_iter().enumerate() {
            bus.write_register(DeviceAddress::SECONDARY, 0x0E + offset as u8, value)?;
        }
        assert_eq!(
            bus.channel_writes(),
            vec![ChannelWrite {
                address: DeviceAddress::SECONDARY,
                channel,
                on: 0,
                off: 300,
            }]
        );
        assert_eq!(
            bus.channel_pulse(DeviceAddress::SECONDARY, channel).ticks(),
            300
        );
        Ok(())
    }

    #[test]
    fn test_noop_delay_accumulates() {
        let mut delay = NoopDelay::new();
        delay.delay_ms(10);
        delay.delay_ms(5);
        assert_eq!(delay.total_ms(), 15);
    }
}
