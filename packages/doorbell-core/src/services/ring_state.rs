//! Process-wide "ring in progress" flag.
//!
//! Entering the Ringing state is a single check-and-set under one mutex and
//! hands out a [`RingGuard`]; dropping the guard returns to Idle on every
//! exit path, including early returns, errors and panics.

use std::sync::Arc;

use parking_lot::Mutex;

/// Idle/Ringing flag shared by the orchestrator and the HTTP fast path.
#[derive(Debug, Clone, Default)]
pub struct RingState {
    ringing: Arc<Mutex<bool>>,
}

impl RingState {
    /// Creates a new flag in the Idle state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves Idle→Ringing and returns the guard, or None if already Ringing.
    #[must_use]
    pub fn try_enter(&self) -> Option<RingGuard> {
        let mut ringing = self.ringing.lock();
        if *ringing {
            return None;
        }
        *ringing = true;
        Some(RingGuard {
            ringing: Arc::clone(&self.ringing),
        })
    }

    /// Returns whether a ring is in progress.
    #[must_use]
    pub fn is_ringing(&self) -> bool {
        *self.ringing.lock()
    }
}

/// Proof of being in the Ringing state; dropping it returns to Idle.
#[derive(Debug)]
pub struct RingGuard {
    ringing: Arc<Mutex<bool>>,
}

impl Drop for RingGuard {
    fn drop(&mut self) {
        *self.ringing.lock() = false;
    }
}
