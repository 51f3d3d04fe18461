//! Register bus abstraction and its adapters.

use std::sync::Arc;

use embedded_hal::i2c::{ErrorKind, I2c};
use parking_lot::Mutex;

use crate::error::{BusError, BusResult};
use crate::types::DeviceAddress;

/// Synchronous one-byte register access on a shared two-wire bus.
///
/// Implementations report transport failures as [`BusError`] and do not
/// retry. No locking is implied; see [`SharedBus`] when several owners need
/// the same bus.
pub trait RegisterBus {
    fn write_register(&mut self, address: DeviceAddress, register: u8, value: u8)
    -> BusResult<()>;

    fn read_register(&mut self, address: DeviceAddress, register: u8) -> BusResult<u8>;
}

impl<B: RegisterBus + ?Sized> RegisterBus for &mut B {
    fn write_register(
        &mut self,
        address: DeviceAddress,
        register: u8,
        value: u8,
    ) -> BusResult<()> {
        (**self).write_register(address, register, value)
    }

    fn read_register(&mut self, address: DeviceAddress, register: u8) -> BusResult<u8> {
        (**self).read_register(address, register)
    }
}

impl<B: RegisterBus + ?Sized> RegisterBus for Box<B> {
    fn write_register(
        &mut self,
        address: DeviceAddress,
        register: u8,
        value: u8,
    ) -> BusResult<()> {
        (**self).write_register(address, register, value)
    }

    fn read_register(&mut self, address: DeviceAddress, register: u8) -> BusResult<u8> {
        (**self).read_register(address, register)
    }
}

/// [`RegisterBus`] over any `embedded-hal` I²C master.
#[derive(Debug)]
pub struct I2cRegisterBus<I> {
    i2c: I,
}

impl<I: I2c> I2cRegisterBus<I> {
    pub fn new(i2c: I) -> Self {
        Self { i2c }
    }

    pub fn into_inner(self) -> I {
        self.i2c
    }
}

fn map_i2c_error<E: embedded_hal::i2c::Error>(address: DeviceAddress, err: &E) -> BusError {
    match err.kind() {
        ErrorKind::NoAcknowledge(_) => BusError::NoAcknowledge { address },
        ErrorKind::ArbitrationLoss => BusError::ArbitrationLoss { address },
        other => BusError::transport(address, format!("{other:?}")),
    }
}

impl<I: I2c> RegisterBus for I2cRegisterBus<I> {
    fn write_register(
        &mut self,
        address: DeviceAddress,
        register: u8,
        value: u8,
    ) -> BusResult<()> {
        self.i2c
            .write(address.get(), &[register, value])
            .map_err(|e| map_i2c_error(address, &e))
    }

    fn read_register(&mut self, address: DeviceAddress, register: u8) -> BusResult<u8> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(address.get(), &[register], &mut buf)
            .map_err(|e| map_i2c_error(address, &e))?;
        let [value] = buf;
        Ok(value)
    }
}

/// Cloneable handle that serializes access to one physical bus.
///
/// Each register transaction takes the lock, so transactions from different
/// handles never interleave at the byte level. Use [`SharedBus::with_lock`]
/// to keep a multi-register sequence together.
#[derive(Debug)]
pub struct SharedBus<B> {
    inner: Arc<Mutex<B>>,
}

impl<B> Clone for SharedBus<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: RegisterBus> SharedBus<B> {
    pub fn new(bus: B) -> Self {
        Self {
            inner: Arc::new(Mutex::new(bus)),
        }
    }

    /// Runs `f` with exclusive access to the underlying bus.
    pub fn with_lock<R>(&self, f: impl FnOnce(&mut B) -> R) -> R {
        let mut guard = self.inner.lock();
        f(&mut guard)
    }
}

impl<B: RegisterBus> RegisterBus for SharedBus<B> {
    fn write_register(
        &mut self,
        address: DeviceAddress,
        register: u8,
        value: u8,
    ) -> BusResult<()> {
        self.inner.lock().write_register(address, register, value)
    }

    fn read_register(&mut self, address: DeviceAddress, register: u8) -> BusResult<u8> {
        self.inner.lock().read_register(address, register)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{BusOp, MockBus};
    use embedded_hal::i2c::NoAcknowledgeSource;

    #[derive(Debug)]
    struct FakeI2cError(ErrorKind);

    impl embedded_hal::i2c::Error for FakeI2cError {
        fn kind(&self) -> ErrorKind {
            self.0
        }
    }

    /// Minimal I²C master that records frames and can fail with a fixed kind.
    #[derive(Default)]
    struct FakeI2c {
        frames: Vec<(u8, Vec<u8>)>,
        read_value: u8,
        fail_with: Option<ErrorKind>,
    }

    impl embedded_hal::i2c::ErrorType for FakeI2c {
        type Error = FakeI2cError;
    }

    impl I2c for FakeI2c {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [embedded_hal::i2c::Operation<'_>],
        ) -> Result<(), Self::Error> {
            if let Some(kind) = self.fail_with {
                return Err(FakeI2cError(kind));
            }
            for op in operations {
                match op {
                    embedded_hal::i2c::Operation::Write(bytes) => {
                        self.frames.push((address, bytes.to_vec()));
                    }
                    embedded_hal::i2c::Operation::Read(buf) => {
                        buf.fill(self.read_value);
                    }
                }
            }
            Ok(())
        }
    }

    #[test]
    fn test_i2c_write_frames_register_then_value() -> Result<(), BusError> {
        let mut bus = I2cRegisterBus::new(FakeI2c::default());
        bus.write_register(DeviceAddress::SECONDARY, 0xFE, 131)?;
        let i2c = bus.into_inner();
        assert_eq!(i2c.frames, vec![(0x41, vec![0xFE, 131])]);
        Ok(())
    }

    #[test]
    fn test_i2c_read_returns_byte() -> Result<(), BusError> {
        let mut bus = I2cRegisterBus::new(FakeI2c {
            read_value: 0x20,
            ..FakeI2c::default()
        });
        assert_eq!(bus.read_register(DeviceAddress::PRIMARY, 0x00)?, 0x20);
        Ok(())
    }

    #[test]
    fn test_i2c_error_mapping() {
        let mut bus = I2cRegisterBus::new(FakeI2c {
            fail_with: Some(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)),
            ..FakeI2c::default()
        });
        assert_eq!(
            bus.write_register(DeviceAddress::PRIMARY, 0x00, 0x80),
            Err(BusError::NoAcknowledge {
                address: DeviceAddress::PRIMARY
            })
        );

        let mut bus = I2cRegisterBus::new(FakeI2c {
            fail_with: Some(ErrorKind::ArbitrationLoss),
            ..FakeI2c::default()
        });
        assert_eq!(
            bus.read_register(DeviceAddress::SECONDARY, 0x00),
            Err(BusError::ArbitrationLoss {
                address: DeviceAddress::SECONDARY
            })
        );

        let mut bus = I2cRegisterBus::new(FakeI2c {
            fail_with: Some(ErrorKind::Overrun),
            ..FakeI2c::default()
        });
        assert!(matches!(
            bus.read_register(DeviceAddress::SECONDARY, 0x00),
            Err(BusError::Transport { .. })
        ));
    }

    #[test]
    fn test_shared_bus_handles_see_same_registers() -> Result<(), BusError> {
        let shared = SharedBus::new(MockBus::new());
        let mut a = shared.clone();
        let mut b = shared.clone();
        a.write_register(DeviceAddress::PRIMARY, 0x06, 1)?;
        b.write_register(DeviceAddress::SECONDARY, 0x06, 2)?;
        assert_eq!(b.read_register(DeviceAddress::PRIMARY, 0x06)?, 1);
        assert_eq!(shared.with_lock(|bus| bus.ops().len()), 3);
        Ok(())
    }

    #[test]
    fn test_shared_bus_keeps_locked_sequences_contiguous() {
        let shared = SharedBus::new(MockBus::new());
        let handles: Vec<_> = DeviceAddress::ALL
            .into_iter()
            .map(|address| {
                let bus = shared.clone();
                std::thread::spawn(move || {
                    for round in 0..50u8 {
                        let written = bus.with_lock(|inner| {
                            (0..4u8).try_for_each(|offset| {
                                inner.write_register(address, 0x06 + offset, round)
                            })
                        });
                        assert_eq!(written, Ok(()));
                    }
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().is_ok());
        }

        let ops = shared.with_lock(|bus| bus.ops().to_vec());
        assert_eq!(ops.len(), 400);
        for block in ops.chunks(4) {
            let addresses: Vec<_> = block
                .iter()
                .map(|op| match op {
                    BusOp::Write { address, .. } | BusOp::Read { address, .. } => *address,
                })
                .collect();
            assert!(addresses.windows(2).all(|w| w.first() == w.last()));
        }
    }
}
