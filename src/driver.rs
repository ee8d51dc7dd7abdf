//! The poll-diff-resolve-emit loop

use crate::gpio::{GpioDriver, GpioError};
use crate::keyboard::keymap::{KeyboardModel, MATRIX_COLS, MATRIX_KEYS, MATRIX_ROWS};
use crate::keyboard::{
    transitions, EngineState, PollRateController, Resolver, RuleSet, ScanMatrix, Transition,
};
use crate::sink::{OutputSink, SinkError};
use log::info;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error(
        "pin configuration mismatch: {rows} row pins x {cols} column pins, \
         the matrix needs {expected_rows} x {expected_cols}"
    )]
    PinCountMismatch {
        rows: usize,
        cols: usize,
        expected_rows: usize,
        expected_cols: usize,
    },
    #[error("substitution rule references position {position} outside the {keys}-switch matrix")]
    RuleOutOfRange { position: u16, keys: usize },
    #[error(transparent)]
    Gpio(#[from] GpioError),
    #[error(transparent)]
    Sink(#[from] SinkError),
}

fn validate_rules(rules: &RuleSet) -> Result<(), DriverError> {
    for case in rules.cases() {
        for position in [case.trigger, case.modifier] {
            if position.index() >= MATRIX_KEYS {
                return Err(DriverError::RuleOutOfRange {
                    position: position.0,
                    keys: MATRIX_KEYS,
                });
            }
        }
    }
    Ok(())
}

/// Owns the scanner, resolver, sink and all engine state, and runs the
/// poll loop until shutdown is requested
pub struct Driver<G: GpioDriver, S: OutputSink> {
    scanner: ScanMatrix<G>,
    sink: S,
    resolver: Resolver,
    state: EngineState,
    rate: PollRateController,
}

impl<G: GpioDriver, S: OutputSink> Driver<G, S> {
    /// Validate the configuration, configure the matrix pins and assemble
    /// the driver. Validation runs before any pin is touched.
    pub fn new(
        gpio: G,
        sink: S,
        model: KeyboardModel,
        row_pins: &[u8],
        col_pins: &[u8],
    ) -> Result<Self, DriverError> {
        if row_pins.len() != MATRIX_ROWS || col_pins.len() != MATRIX_COLS {
            return Err(DriverError::PinCountMismatch {
                rows: row_pins.len(),
                cols: col_pins.len(),
                expected_rows: MATRIX_ROWS,
                expected_cols: MATRIX_COLS,
            });
        }
        let rules = RuleSet::for_model(model);
        validate_rules(&rules)?;

        let scanner = ScanMatrix::new(gpio, row_pins.to_vec(), col_pins.to_vec())?;
        Ok(Self {
            scanner,
            sink,
            resolver: Resolver::new(model.layout(), rules),
            state: EngineState::new(),
            rate: PollRateController::new(),
        })
    }

    /// One poll cycle: scan, resolve every transition in ascending position
    /// order, flush if anything was emitted, update the poll rate. Returns
    /// whether any transition occurred.
    pub fn poll_once(&mut self) -> Result<bool, DriverError> {
        let scanned = self.scanner.scan()?;
        let changes = transitions(&scanned, self.state.pressed());
        let changed = !changes.is_empty();

        for (position, transition) in changes {
            match transition {
                Transition::Pressed => {
                    self.resolver
                        .on_press(&mut self.state, position, &mut self.sink)?
                }
                Transition::Released => {
                    self.resolver
                        .on_release(&mut self.state, position, &mut self.sink)?
                }
            }
        }

        if changed {
            self.sink.flush()?;
        }
        self.rate.observe(changed);
        Ok(changed)
    }

    /// Poll until the shutdown flag clears, then log a session summary.
    /// Sleeps before each poll so an idle keyboard costs almost no CPU.
    pub fn run(&mut self, running: &AtomicBool) -> Result<(), DriverError> {
        info!("matrix driver running");
        while running.load(Ordering::Relaxed) {
            thread::sleep(self.rate.interval());
            self.poll_once()?;
        }
        info!(
            "shutting down: {} transitions processed, peak {} keys held at once",
            self.state.total_transitions(),
            self.state.max_rollover()
        );
        Ok(())
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn poll_interval(&self) -> Duration {
        self.rate.interval()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpio::{Level, Pull};
    use crate::keyboard::keymap::{KeyCode, MatrixPosition, SHIFT_POSITION};
    use crate::keyboard::{SpecialCase, SubstitutionRule, MEDIUM_POLL};

    struct IdleGpio;

    impl GpioDriver for IdleGpio {
        fn configure_output(&mut self, _pin: u8) -> Result<(), GpioError> {
            Ok(())
        }

        fn configure_input(&mut self, _pin: u8, _pull: Pull) -> Result<(), GpioError> {
            Ok(())
        }

        fn set_level(&mut self, _pin: u8, _level: Level) -> Result<(), GpioError> {
            Ok(())
        }

        fn read_level(&mut self, _pin: u8) -> Result<Level, GpioError> {
            Ok(Level::Low)
        }
    }

    #[derive(Default)]
    struct CountingSink {
        events: usize,
        flushes: usize,
    }

    impl OutputSink for CountingSink {
        fn emit(&mut self, _key: KeyCode, _down: bool) -> Result<(), SinkError> {
            self.events += 1;
            Ok(())
        }

        fn flush(&mut self) -> Result<(), SinkError> {
            self.flushes += 1;
            Ok(())
        }
    }

    const ROW_PINS: [u8; 8] = [11, 5, 6, 12, 13, 19, 16, 26];
    const COL_PINS: [u8; 9] = [17, 18, 27, 22, 23, 24, 10, 9, 25];

    fn idle_driver() -> Driver<IdleGpio, CountingSink> {
        Driver::new(
            IdleGpio,
            CountingSink::default(),
            KeyboardModel::Tandy102NumLock,
            &ROW_PINS,
            &COL_PINS,
        )
        .unwrap()
    }

    #[test]
    fn rejects_wrong_pin_counts() {
        let result = Driver::new(
            IdleGpio,
            CountingSink::default(),
            KeyboardModel::Tandy102,
            &ROW_PINS[..7],
            &COL_PINS,
        );
        match result {
            Err(DriverError::PinCountMismatch { rows: 7, cols: 9, .. }) => {}
            Err(other) => panic!("Expected PinCountMismatch error, got {:?}", other),
            Ok(_) => panic!("Expected PinCountMismatch error, got a driver"),
        }
    }

    #[test]
    fn rejects_rules_outside_the_matrix() {
        let rules = RuleSet::from_cases(vec![SpecialCase {
            trigger: MatrixPosition(99),
            modifier: SHIFT_POSITION,
            rule: SubstitutionRule::SimpleRemap(KeyCode(1)),
        }]);
        match validate_rules(&rules) {
            Err(DriverError::RuleOutOfRange { position: 99, .. }) => {}
            other => panic!("Expected RuleOutOfRange error, got {:?}", other),
        }
    }

    #[test]
    fn idle_poll_emits_and_flushes_nothing() {
        let mut driver = idle_driver();
        assert!(!driver.poll_once().unwrap());
        assert_eq!(driver.sink().events, 0);
        assert_eq!(driver.sink().flushes, 0);
    }

    #[test]
    fn idle_polling_stretches_the_interval() {
        let mut driver = idle_driver();
        for _ in 0..600 {
            driver.poll_once().unwrap();
        }
        assert_eq!(driver.poll_interval(), MEDIUM_POLL);
    }

    #[test]
    fn run_returns_once_the_flag_clears() {
        let mut driver = idle_driver();
        let running = AtomicBool::new(false);
        driver.run(&running).unwrap();
        assert_eq!(driver.state().total_transitions(), 0);
    }
}
