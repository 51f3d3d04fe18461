//! Bus and serial port setup.

use std::path::Path;
use std::time::Duration;

use bionic_hand_pca9685::RegisterBus;
use tracing::info;

use crate::config::SerialConfig;
use crate::error::CliError;

pub type HardwareBus = Box<dyn RegisterBus + Send>;

/// Opens the I²C character device both expanders share.
#[cfg(target_os = "linux")]
pub fn open_i2c(path: &Path) -> Result<HardwareBus, CliError> {
    use bionic_hand_pca9685::I2cRegisterBus;
    use linux_embedded_hal::I2cdev;

    let dev = I2cdev::new(path).map_err(|e| {
        CliError::HardwareUnavailable(format!("cannot open {}: {e}", path.display()))
    })?;
    info!(device = %path.display(), "opened I2C bus");
    Ok(Box::new(I2cRegisterBus::new(dev)))
}

#[cfg(not(target_os = "linux"))]
pub fn open_i2c(path: &Path) -> Result<HardwareBus, CliError> {
    Err(CliError::HardwareUnavailable(format!(
        "I2C access to {} needs Linux; use --simulate",
        path.display()
    )))
}

/// Opens the command serial port with a read timeout, so a quiet line
/// still lets the session notice cancellation.
pub fn open_serial(
    config: &SerialConfig,
    port: Option<&str>,
    baud: Option<u32>,
) -> Result<Box<dyn serialport::SerialPort>, CliError> {
    let port = port.unwrap_or(&config.port);
    let baud = baud.unwrap_or(config.baud_rate);
    if baud == 0 {
        return Err(CliError::InvalidConfiguration(
            "baud rate must be greater than zero".into(),
        ));
    }
    let handle = serialport::new(port, baud)
        .timeout(Duration::from_millis(config.read_timeout_ms))
        .open()
        .map_err(|e| CliError::HardwareUnavailable(format!("cannot open {port}: {e}")))?;
    info!(port, baud, "opened serial port");
    Ok(handle)
}
