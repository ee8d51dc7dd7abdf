//! Adaptive polling cadence

use log::info;
use std::time::Duration;

/// Poll interval while keys are active (60 Hz)
pub const FAST_POLL: Duration = Duration::from_micros(16_667);
/// Interval after a short idle stretch (10 Hz)
pub const MEDIUM_POLL: Duration = Duration::from_millis(100);
/// Interval after a long idle stretch (5 Hz)
pub const SLOW_POLL: Duration = Duration::from_millis(200);

const MEDIUM_AFTER_POLLS: u32 = 600;
const SLOW_AFTER_POLLS: u32 = 1200;

/// Stretches the sleep between polls while the keyboard sits idle.
///
/// Any transition snaps back to the fast interval, so the slow modes cost
/// at most one slow interval of extra latency on the first keypress after
/// an idle stretch.
#[derive(Debug)]
pub struct PollRateController {
    idle_polls: u32,
    interval: Duration,
}

impl PollRateController {
    pub fn new() -> Self {
        Self {
            idle_polls: 0,
            interval: FAST_POLL,
        }
    }

    /// Account for one completed poll cycle and return the interval to
    /// sleep before the next
    pub fn observe(&mut self, transitions_occurred: bool) -> Duration {
        if transitions_occurred {
            self.idle_polls = 0;
            self.interval = FAST_POLL;
        } else {
            self.idle_polls = self.idle_polls.saturating_add(1);
            if self.idle_polls == MEDIUM_AFTER_POLLS {
                info!("keyboard idle, polling at 10 Hz");
                self.interval = MEDIUM_POLL;
            } else if self.idle_polls == SLOW_AFTER_POLLS {
                info!("keyboard idle, polling at 5 Hz");
                self.interval = SLOW_POLL;
            }
        }
        self.interval
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn idle_polls(&self) -> u32 {
        self.idle_polls
    }
}

impl Default for PollRateController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_the_fast_interval() {
        let rate = PollRateController::new();
        assert_eq!(rate.interval(), FAST_POLL);
        assert_eq!(rate.idle_polls(), 0);
    }

    #[test]
    fn slows_at_the_idle_thresholds() {
        let mut rate = PollRateController::new();
        for _ in 0..599 {
            assert_eq!(rate.observe(false), FAST_POLL);
        }
        assert_eq!(rate.observe(false), MEDIUM_POLL);
        for _ in 0..599 {
            assert_eq!(rate.observe(false), MEDIUM_POLL);
        }
        assert_eq!(rate.observe(false), SLOW_POLL);
        // Stays slow indefinitely once past the last threshold
        for _ in 0..100 {
            assert_eq!(rate.observe(false), SLOW_POLL);
        }
    }

    #[test]
    fn any_transition_resets_to_fast() {
        let mut rate = PollRateController::new();
        for _ in 0..1300 {
            rate.observe(false);
        }
        assert_eq!(rate.interval(), SLOW_POLL);
        assert_eq!(rate.observe(true), FAST_POLL);
        assert_eq!(rate.idle_polls(), 0);
    }
}
