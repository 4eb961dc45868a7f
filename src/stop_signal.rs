//! Cooperative interruption of a running capture
//!
//! A `StopSignal` is shared between the code that wants to end a capture early
//! (a Ctrl-C handler, a supervising thread, a test) and the capture loop that
//! polls it. Raising the signal is not an error: the capture stops gracefully
//! and returns what it has written so far.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Thread-safe flag requesting that the current capture stops
///
/// Clones share the same underlying flag.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    raised: Arc<AtomicBool>,
}

impl StopSignal {
    /// Creates a new, lowered signal
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests that the capture observing this signal stops
    pub fn raise(&self) {
        self.raised.store(true, Ordering::Release);
    }

    /// Returns true once `raise` has been called on any clone
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }
}
