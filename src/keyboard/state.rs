//! Cross-cycle mutable state owned by the driver loop

use super::keymap::{KeyCode, MatrixPosition};
use std::collections::BTreeSet;

/// Everything the resolver reads and writes between poll cycles.
///
/// One instance lives for the whole session and is passed by mutable
/// borrow into every resolver call; nothing here is global or shared.
#[derive(Debug, Default)]
pub struct EngineState {
    /// Switches observed closed as of the last processed transition
    pressed: BTreeSet<MatrixPosition>,
    /// Embedded numeric pad toggle
    num_lock: bool,
    /// Substitute key currently emitted on behalf of a held SHIFT
    shift_owned: Option<KeyCode>,
    /// Substitute key currently emitted on behalf of a held CODE
    code_owned: Option<KeyCode>,
    total_transitions: u64,
    max_rollover: usize,
}

impl EngineState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a switch closing
    pub fn press(&mut self, position: MatrixPosition) {
        self.pressed.insert(position);
        self.total_transitions += 1;
        if self.pressed.len() > self.max_rollover {
            self.max_rollover = self.pressed.len();
        }
    }

    /// Record a switch opening
    pub fn release(&mut self, position: MatrixPosition) {
        self.pressed.remove(&position);
        self.total_transitions += 1;
    }

    pub fn is_pressed(&self, position: MatrixPosition) -> bool {
        self.pressed.contains(&position)
    }

    /// Currently closed switches in ascending position order
    pub fn pressed(&self) -> &BTreeSet<MatrixPosition> {
        &self.pressed
    }

    pub fn pressed_count(&self) -> usize {
        self.pressed.len()
    }

    pub fn num_lock(&self) -> bool {
        self.num_lock
    }

    /// Flip the numeric pad toggle, returning the new state
    pub fn toggle_num_lock(&mut self) -> bool {
        self.num_lock = !self.num_lock;
        self.num_lock
    }

    pub fn shift_owned(&self) -> Option<KeyCode> {
        self.shift_owned
    }

    pub fn set_shift_owned(&mut self, key: KeyCode) {
        self.shift_owned = Some(key);
    }

    pub fn take_shift_owned(&mut self) -> Option<KeyCode> {
        self.shift_owned.take()
    }

    pub fn code_owned(&self) -> Option<KeyCode> {
        self.code_owned
    }

    pub fn set_code_owned(&mut self, key: KeyCode) {
        self.code_owned = Some(key);
    }

    pub fn take_code_owned(&mut self) -> Option<KeyCode> {
        self.code_owned.take()
    }

    /// Presses plus releases processed this session
    pub fn total_transitions(&self) -> u64 {
        self.total_transitions
    }

    /// Most switches held closed at once this session
    pub fn max_rollover(&self) -> usize {
        self.max_rollover
    }
}
