//! Progress emission throttling
//!
//! Scan progress callbacks fire once per processed file, which can be tens of
//! thousands of calls for a large library. Emission is rate-limited so
//! observers see at most one update per interval, plus the final one.

use std::time::{Duration, Instant};

/// Default minimum interval between progress emissions
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// Rate limiter for progress callbacks
#[derive(Debug)]
pub struct ProgressThrottle {
    interval: Duration,
    last_emit: Option<Instant>,
}

impl ProgressThrottle {
    /// Create a throttle with the given minimum emission interval
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_emit: None,
        }
    }

    /// Whether an update should be emitted now
    ///
    /// The first call always returns true; later calls return true only once
    /// the interval has elapsed since the last accepted emission.
    pub fn should_emit(&mut self) -> bool {
        let now = Instant::now();
        match self.last_emit {
            Some(last) if now.duration_since(last) < self.interval => false,
            _ => {
                self.last_emit = Some(now);
                true
            }
        }
    }

    /// Reset so the next `should_emit` call emits unconditionally
    ///
    /// Used for the final `(total, total)` update, which must never be dropped.
    pub fn reset(&mut self) {
        self.last_emit = None;
    }
}

impl Default for ProgressThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRESS_INTERVAL)
    }
}
