//! Logical key event delivery to the host

use crate::keyboard::keymap::KeyCode;
use std::io;
use thiserror::Error;

/// Errors raised by an output sink
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to open {path}: {source}")]
    Open { path: String, source: io::Error },
    #[error("device setup failed ({op}): {source}")]
    Setup { op: &'static str, source: io::Error },
    #[error("event write failed: {0}")]
    Write(#[from] io::Error),
}

/// Receives resolved logical key events.
///
/// `emit` hands over one key transition; `flush` ends a poll cycle's batch
/// so the host applies it as one consistent update. A failed call leaves
/// host keyboard state unreliable, so callers treat any error as fatal.
pub trait OutputSink {
    fn emit(&mut self, key: KeyCode, down: bool) -> Result<(), SinkError>;

    fn flush(&mut self) -> Result<(), SinkError>;
}
