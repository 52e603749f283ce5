//! Stop request raised by the user button
//!
//! The button interrupt and the demo loop share a single flag. It only ever
//! goes from "not pressed" to "pressed"; the loop polls it between
//! iterations.

use core::sync::atomic::{AtomicBool, Ordering};

/// One-shot stop flag shared between interrupt context and the demo task
#[derive(Debug)]
pub struct StopSignal {
    pressed: AtomicBool,
}

impl StopSignal {
    pub const fn new() -> Self {
        Self {
            pressed: AtomicBool::new(false),
        }
    }

    /// Raise the flag
    ///
    /// Returns `true` only for the call that performed the transition.
    pub fn trigger(&self) -> bool {
        !self.pressed.swap(true, Ordering::AcqRel)
    }

    /// Whether a stop has been requested
    pub fn is_triggered(&self) -> bool {
        self.pressed.load(Ordering::Acquire)
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}
