//! Poll-to-poll switch transition detection

use super::keymap::MatrixPosition;
use std::collections::BTreeSet;

/// Direction of one switch transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Pressed,
    Released,
}

/// Split the change between two scans into newly closed and newly opened
/// positions, each in ascending order
pub fn diff(
    current: &BTreeSet<MatrixPosition>,
    previous: &BTreeSet<MatrixPosition>,
) -> (Vec<MatrixPosition>, Vec<MatrixPosition>) {
    let pressed = current.difference(previous).copied().collect();
    let released = previous.difference(current).copied().collect();
    (pressed, released)
}

/// All transitions between two scans as a single stream in ascending
/// position order, presses and releases interleaved.
///
/// This is the order the resolver must see: a modifier that changed at a
/// lower position in the same cycle takes effect before higher positions
/// are resolved.
pub fn transitions(
    current: &BTreeSet<MatrixPosition>,
    previous: &BTreeSet<MatrixPosition>,
) -> Vec<(MatrixPosition, Transition)> {
    let (pressed, released) = diff(current, previous);
    let mut merged: Vec<(MatrixPosition, Transition)> = pressed
        .into_iter()
        .map(|position| (position, Transition::Pressed))
        .chain(released.into_iter().map(|position| (position, Transition::Released)))
        .collect();
    merged.sort_by_key(|(position, _)| *position);
    merged
}
