//! Poll delay schedule (exponential backoff)

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Delay growth policy between polls
///
/// The delay for attempt `n` is `min_delay * multiplier^n`, capped at
/// `max_delay`. The schedule depends on nothing but these fields and the
/// attempt index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Backoff {
    /// First delay (milliseconds)
    #[serde(default = "default_min_delay")]
    pub min_delay_ms: u64,

    /// Delay ceiling (milliseconds)
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Growth factor per attempt
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_min_delay() -> u64 {
    1000
}
fn default_max_delay() -> u64 {
    30000
}
fn default_multiplier() -> f64 {
    2.0
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            min_delay_ms: default_min_delay(),
            max_delay_ms: default_max_delay(),
            multiplier: default_multiplier(),
        }
    }
}

impl Backoff {
    pub fn new(min_delay: Duration, max_delay: Duration, multiplier: f64) -> Self {
        Self {
            min_delay_ms: min_delay.as_millis() as u64,
            max_delay_ms: max_delay.as_millis() as u64,
            multiplier,
        }
    }

    /// Same delay on every attempt
    pub fn fixed(delay: Duration) -> Self {
        Self::new(delay, delay, 1.0)
    }

    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Delay in milliseconds to wait after attempt `attempt` (0-based)
    pub fn delay_for_attempt(&self, attempt: u32) -> u64 {
        let exponent = attempt.min(i32::MAX as u32) as i32;
        let delay = self.min_delay_ms as f64 * self.multiplier.powi(exponent);
        if !delay.is_finite() {
            return self.max_delay_ms;
        }
        (delay as u64).min(self.max_delay_ms)
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.delay_for_attempt(attempt))
    }

    /// Reason this schedule is unusable, if any
    pub fn validate(&self) -> Option<String> {
        if self.min_delay_ms == 0 {
            return Some("backoff min delay must be at least 1ms".to_string());
        }
        if !(self.multiplier.is_finite() && self.multiplier >= 1.0) {
            return Some(format!(
                "backoff multiplier must be >= 1.0, got {}",
                self.multiplier
            ));
        }
        if self.min_delay_ms > self.max_delay_ms {
            return Some(format!(
                "backoff min delay {}ms exceeds max delay {}ms",
                self.min_delay_ms, self.max_delay_ms
            ));
        }
        None
    }
}
