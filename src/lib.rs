//! Keymatrix - GPIO key-matrix driver for TRS-80 Model 100 family keyboards
//!
//! Scans a row/column switch matrix over GPIO, resolves the closed switches
//! against per-model key tables and substitution rules, and feeds the
//! resulting key events to a virtual Linux input device.

pub mod config;
pub mod driver;
pub mod gpio;
pub mod keyboard;
pub mod sink;
#[cfg(target_os = "linux")]
pub mod uinput;

pub use config::Config;
