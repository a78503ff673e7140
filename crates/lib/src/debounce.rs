//! Send debounce: a short window after an accepted send during which further sends are refused.
//!
//! The window is a deadline checked against the tokio clock rather than a scheduled callback,
//! so it clears itself without a task and there is nothing left running after `cancel()`.

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct Debounce {
    window: Duration,
    armed_until: Option<Instant>,
}

impl Debounce {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            armed_until: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// True while a previously armed window has not yet elapsed.
    pub fn is_active(&self) -> bool {
        self.armed_until
            .map(|deadline| Instant::now() < deadline)
            .unwrap_or(false)
    }

    /// Arm the window unless one is already active. Returns false when refused.
    pub fn try_arm(&mut self) -> bool {
        if self.is_active() {
            return false;
        }
        self.armed_until = Some(Instant::now() + self.window);
        true
    }

    /// Drop any active window.
    pub fn cancel(&mut self) {
        self.armed_until = None;
    }
}
