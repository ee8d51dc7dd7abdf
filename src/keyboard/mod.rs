//! Matrix scanning and key-event resolution

mod diff;
mod rate;
mod resolve;
mod scan;
mod state;

pub mod keymap;

pub use diff::{diff, transitions, Transition};
pub use keymap::{KeyCode, KeyboardModel, Layout, MatrixPosition};
pub use rate::{PollRateController, FAST_POLL, MEDIUM_POLL, SLOW_POLL};
pub use resolve::{Resolver, RuleSet, SpecialCase, SubstitutionRule};
pub use scan::ScanMatrix;
pub use state::EngineState;
