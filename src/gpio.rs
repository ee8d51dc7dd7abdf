//! Digital pin access for the switch matrix
//!
//! The scanner only sees the [`GpioDriver`] trait; production hardware goes
//! through [`SysfsGpio`], tests script their own implementation.

use log::{debug, warn};
use std::fs;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by a GPIO backend
#[derive(Debug, Error)]
pub enum GpioError {
    #[error("failed to export gpio {pin}: {source}")]
    Export { pin: u8, source: io::Error },
    #[error("gpio {pin} access failed: {source}")]
    Pin { pin: u8, source: io::Error },
    #[error("gpio {pin} reported unexpected level {value:?}")]
    BadLevel { pin: u8, value: String },
}

/// Logic level on a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

/// Input bias for a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pull {
    None,
    Up,
    Down,
}

/// Raw digital pin access. Pins are BCM GPIO numbers.
pub trait GpioDriver {
    /// Make the pin an output, driven low
    fn configure_output(&mut self, pin: u8) -> Result<(), GpioError>;

    /// Make the pin an input with the requested bias
    fn configure_input(&mut self, pin: u8, pull: Pull) -> Result<(), GpioError>;

    fn set_level(&mut self, pin: u8, level: Level) -> Result<(), GpioError>;

    fn read_level(&mut self, pin: u8) -> Result<Level, GpioError>;
}

const SYSFS_GPIO_ROOT: &str = "/sys/class/gpio";

/// GPIO backend over the kernel sysfs interface.
///
/// sysfs cannot program pull resistors; column bias has to come from
/// boot-time configuration instead (`gpio=<pins>=ip,pd` in config.txt
/// on a Raspberry Pi).
pub struct SysfsGpio {
    root: PathBuf,
    exported: Vec<u8>,
    bias_warned: bool,
}

impl SysfsGpio {
    pub fn new() -> Self {
        Self::with_root(SYSFS_GPIO_ROOT)
    }

    /// Backend rooted at an alternate sysfs path
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            exported: Vec::new(),
            bias_warned: false,
        }
    }

    fn pin_dir(&self, pin: u8) -> PathBuf {
        self.root.join(format!("gpio{pin}"))
    }

    fn export(&mut self, pin: u8) -> Result<(), GpioError> {
        // Pins exported by an earlier run (or the boot config) are reused
        // as-is and left exported on drop.
        if self.pin_dir(pin).exists() {
            return Ok(());
        }
        fs::write(self.root.join("export"), pin.to_string())
            .map_err(|source| GpioError::Export { pin, source })?;
        self.exported.push(pin);
        Ok(())
    }

    fn write_attr(&self, pin: u8, attr: &str, value: &str) -> Result<(), GpioError> {
        fs::write(self.pin_dir(pin).join(attr), value)
            .map_err(|source| GpioError::Pin { pin, source })
    }
}

impl GpioDriver for SysfsGpio {
    fn configure_output(&mut self, pin: u8) -> Result<(), GpioError> {
        self.export(pin)?;
        // "low" sets direction and drives the pin low in one write
        self.write_attr(pin, "direction", "low")?;
        debug!("gpio {pin} configured as output, driven low");
        Ok(())
    }

    fn configure_input(&mut self, pin: u8, pull: Pull) -> Result<(), GpioError> {
        self.export(pin)?;
        self.write_attr(pin, "direction", "in")?;
        if pull != Pull::None && !self.bias_warned {
            warn!(
                "sysfs gpio cannot program pull resistors; configure bias at boot \
                 (gpio=<pins>=ip,pd in config.txt)"
            );
            self.bias_warned = true;
        }
        debug!("gpio {pin} configured as input");
        Ok(())
    }

    fn set_level(&mut self, pin: u8, level: Level) -> Result<(), GpioError> {
        let value = match level {
            Level::High => "1",
            Level::Low => "0",
        };
        self.write_attr(pin, "value", value)
    }

    fn read_level(&mut self, pin: u8) -> Result<Level, GpioError> {
        let raw = fs::read_to_string(self.pin_dir(pin).join("value"))
            .map_err(|source| GpioError::Pin { pin, source })?;
        match raw.trim() {
            "0" => Ok(Level::Low),
            "1" => Ok(Level::High),
            other => Err(GpioError::BadLevel {
                pin,
                value: other.to_string(),
            }),
        }
    }
}

impl Default for SysfsGpio {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SysfsGpio {
    fn drop(&mut self) {
        for pin in &self.exported {
            let _ = fs::write(self.root.join("unexport"), pin.to_string());
        }
    }
}
