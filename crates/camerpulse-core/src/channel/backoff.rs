use std::time::Duration;

/// Default number of automatic reconnects before the channel gives up.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Default base delay for the first reconnect.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Exponential reconnect schedule: `base * 2^attempt`.
///
/// `attempt` is the number of reconnects already scheduled since the last
/// successful open, so the delays run 1s, 2s, 4s, 8s, 16s with defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub max_attempts: u32,
}

impl ReconnectPolicy {
    pub fn new(base_delay: Duration, max_attempts: u32) -> Self {
        Self {
            base_delay,
            max_attempts,
        }
    }

    /// Delay before the next reconnect, or `None` once the budget is spent.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        Some(self.base_delay.saturating_mul(factor))
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_DELAY, DEFAULT_MAX_RECONNECT_ATTEMPTS)
    }
}
