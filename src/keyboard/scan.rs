//! Row-by-row sweep of the switch matrix

use super::keymap::MatrixPosition;
use crate::gpio::{GpioDriver, GpioError, Level, Pull};
use log::debug;
use std::collections::BTreeSet;

/// Drives the matrix wiring through a GPIO backend.
///
/// Row pins are outputs, normally low; column pins are inputs biased low.
/// One sweep asserts each row in turn and samples every column, so a high
/// column identifies a closed switch at (row, col). The asserted row is
/// driven low again before the next row to keep rows electrically
/// independent.
pub struct ScanMatrix<G: GpioDriver> {
    gpio: G,
    row_pins: Vec<u8>,
    col_pins: Vec<u8>,
}

impl<G: GpioDriver> ScanMatrix<G> {
    /// Configure all matrix pins and return the scanner
    pub fn new(mut gpio: G, row_pins: Vec<u8>, col_pins: Vec<u8>) -> Result<Self, GpioError> {
        for &pin in &row_pins {
            gpio.configure_output(pin)?;
        }
        for &pin in &col_pins {
            gpio.configure_input(pin, Pull::Down)?;
        }
        debug!(
            "matrix configured: {} row pins, {} column pins",
            row_pins.len(),
            col_pins.len()
        );
        Ok(Self {
            gpio,
            row_pins,
            col_pins,
        })
    }

    /// One full sweep; returns every switch currently closed.
    ///
    /// A GPIO fault aborts immediately since a partial sweep is not a
    /// usable snapshot.
    pub fn scan(&mut self) -> Result<BTreeSet<MatrixPosition>, GpioError> {
        let mut closed = BTreeSet::new();
        for (row, &row_pin) in self.row_pins.iter().enumerate() {
            self.gpio.set_level(row_pin, Level::High)?;
            for (col, &col_pin) in self.col_pins.iter().enumerate() {
                if self.gpio.read_level(col_pin)? == Level::High {
                    closed.insert(MatrixPosition((row * self.col_pins.len() + col) as u16));
                }
            }
            self.gpio.set_level(row_pin, Level::Low)?;
        }
        Ok(closed)
    }

    pub fn row_count(&self) -> usize {
        self.row_pins.len()
    }

    pub fn col_count(&self) -> usize {
        self.col_pins.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    /// Scripted wiring: `closed` holds (row_pin, col_pin) pairs that
    /// conduct. Reads check that exactly one row is asserted.
    #[derive(Default)]
    struct TraceGpio {
        ops: Vec<String>,
        active_row: Option<u8>,
        closed: Vec<(u8, u8)>,
        fail_read_pin: Option<u8>,
    }

    impl GpioDriver for TraceGpio {
        fn configure_output(&mut self, pin: u8) -> Result<(), GpioError> {
            self.ops.push(format!("out {pin}"));
            Ok(())
        }

        fn configure_input(&mut self, pin: u8, _pull: Pull) -> Result<(), GpioError> {
            self.ops.push(format!("in {pin}"));
            Ok(())
        }

        fn set_level(&mut self, pin: u8, level: Level) -> Result<(), GpioError> {
            self.ops.push(format!("set {pin} {level:?}"));
            match level {
                Level::High => {
                    assert!(self.active_row.is_none(), "two rows asserted at once");
                    self.active_row = Some(pin);
                }
                Level::Low => {
                    if self.active_row == Some(pin) {
                        self.active_row = None;
                    }
                }
            }
            Ok(())
        }

        fn read_level(&mut self, pin: u8) -> Result<Level, GpioError> {
            if self.fail_read_pin == Some(pin) {
                return Err(GpioError::Pin {
                    pin,
                    source: io::Error::new(io::ErrorKind::Other, "read failed"),
                });
            }
            let row = self.active_row.expect("column read with no row asserted");
            if self.closed.contains(&(row, pin)) {
                Ok(Level::High)
            } else {
                Ok(Level::Low)
            }
        }
    }

    fn scanner(gpio: TraceGpio) -> ScanMatrix<TraceGpio> {
        ScanMatrix::new(gpio, vec![40, 41], vec![50, 51, 52]).unwrap()
    }

    #[test]
    fn new_configures_rows_as_outputs_and_cols_as_inputs() {
        let matrix = scanner(TraceGpio::default());
        assert_eq!(
            matrix.gpio.ops,
            vec!["out 40", "out 41", "in 50", "in 51", "in 52"]
        );
    }

    #[test]
    fn sweep_deasserts_each_row_before_the_next() {
        let mut matrix = scanner(TraceGpio::default());
        matrix.gpio.ops.clear();
        assert!(matrix.scan().unwrap().is_empty());
        let sets: Vec<&String> = matrix
            .gpio
            .ops
            .iter()
            .filter(|op| op.starts_with("set"))
            .collect();
        assert_eq!(sets, vec!["set 40 High", "set 40 Low", "set 41 High", "set 41 Low"]);
    }

    #[test]
    fn detects_closed_switches_row_major() {
        let mut matrix = scanner(TraceGpio {
            closed: vec![(40, 51), (41, 50), (41, 52)],
            ..TraceGpio::default()
        });
        let positions: Vec<u16> = matrix.scan().unwrap().iter().map(|p| p.0).collect();
        assert_eq!(positions, vec![1, 3, 5]);
    }

    #[test]
    fn read_failure_aborts_the_sweep() {
        let mut matrix = scanner(TraceGpio {
            fail_read_pin: Some(51),
            ..TraceGpio::default()
        });
        match matrix.scan() {
            Err(GpioError::Pin { pin: 51, .. }) => {}
            other => panic!("Expected Pin error, got {:?}", other),
        }
    }
}
