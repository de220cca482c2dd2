//! Rate limiting for high-frequency download progress.

use std::time::{Duration, Instant};

use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottlePolicy {
    /// Percentage points a value must move before it is forwarded.
    pub min_step: u32,
    /// Forward anyway once this much time passed since the last forward.
    pub interval: Duration,
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self {
            min_step: 5,
            interval: Duration::from_secs(3),
        }
    }
}

/// Throttle state of one progress stream. Start a fresh one for every
/// download; a stale timestamp would hide the early ticks of the next one.
#[derive(Debug, Clone, Copy)]
pub struct ProgressThrottle {
    policy: ThrottlePolicy,
    last_value: i32,
    last_time: Instant,
}

impl ProgressThrottle {
    pub fn new(policy: ThrottlePolicy) -> Self {
        Self::start_at(policy, Instant::now())
    }

    pub fn start_at(policy: ThrottlePolicy, now: Instant) -> Self {
        Self {
            policy,
            last_value: 0,
            last_time: now,
        }
    }

    pub fn reset(&mut self) {
        self.reset_at(Instant::now());
    }

    pub fn reset_at(&mut self, now: Instant) {
        *self = Self::start_at(self.policy, now);
    }

    pub fn check(&mut self, value: i32) -> bool {
        self.check_at(value, Instant::now())
    }

    /// Whether `value` should reach the caller. Only a forwarded value
    /// updates the state.
    pub fn check_at(&mut self, value: i32, now: Instant) -> bool {
        let forward = value.abs_diff(self.last_value) >= self.policy.min_step
            || value == 100
            || now.saturating_duration_since(self.last_time) >= self.policy.interval;
        if forward {
            self.last_value = value;
            self.last_time = now;
        } else {
            trace!(value, last = self.last_value, "progress tick throttled");
        }
        forward
    }
}

impl Default for ProgressThrottle {
    fn default() -> Self {
        Self::new(ThrottlePolicy::default())
    }
}
