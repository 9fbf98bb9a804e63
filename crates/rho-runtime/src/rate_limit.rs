use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

pub const WINDOW_SECONDS: u64 = 60;

#[derive(Debug)]
struct ResourceWindow {
    count: u32,
    window_reset_unix: u64,
}

/// Fixed-window call counter keyed by resource name.
///
/// Each resource has an independent window and counter. The window is
/// fixed, not sliding: a burst of up to twice the budget can land across
/// a window boundary, matching the limiter this service has always run
/// with.
#[derive(Debug, Default)]
pub struct RateLimiter {
    windows: Mutex<HashMap<String, ResourceWindow>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the resource is over budget for the current window.
    /// Crossing the window boundary resets the counter before the check.
    pub fn is_limited(&self, resource: &str, budget: u32, now: u64) -> bool {
        let mut windows = self.lock();
        let window = windows
            .entry(resource.to_string())
            .or_insert_with(|| ResourceWindow {
                count: 0,
                window_reset_unix: now + WINDOW_SECONDS,
            });
        if now >= window.window_reset_unix {
            window.count = 0;
            window.window_reset_unix = now + WINDOW_SECONDS;
        }
        window.count >= budget
    }

    /// Counts one call against the resource. Pure counter, no gating:
    /// callers check `is_limited` first.
    pub fn record_call(&self, resource: &str, now: u64) {
        let mut windows = self.lock();
        let window = windows
            .entry(resource.to_string())
            .or_insert_with(|| ResourceWindow {
                count: 0,
                window_reset_unix: now + WINDOW_SECONDS,
            });
        window.count = window.count.saturating_add(1);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ResourceWindow>> {
        self.windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
