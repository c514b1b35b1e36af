use crate::types::{
    DETERMINISTIC_MAX_DELAY, DETERMINISTIC_STEP_DELAY, RECONNECT_BASE_DELAY, RECONNECT_MAX_DELAY,
    RECONNECT_MAX_JITTER,
};
use rand::Rng;
use std::time::Duration;

/// How reconnect delays are computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackoffMode {
    /// `min(1000 * 2^n, 10000)` ms plus up to 1s of random jitter
    #[default]
    Production,
    /// `min(200, 50 * (n + 1))` ms with no jitter, for reproducible tests
    Deterministic,
}

impl BackoffMode {
    /// Delay for attempt `n` (0-indexed) before jitter
    pub fn base_delay(self, attempt: u32) -> Duration {
        let ms = match self {
            Self::Production => {
                let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
                RECONNECT_BASE_DELAY
                    .saturating_mul(factor)
                    .min(RECONNECT_MAX_DELAY)
            }
            Self::Deterministic => DETERMINISTIC_STEP_DELAY
                .saturating_mul(u64::from(attempt) + 1)
                .min(DETERMINISTIC_MAX_DELAY),
        };
        Duration::from_millis(ms)
    }

    fn jitter(self) -> Duration {
        match self {
            Self::Production => Duration::from_millis(rand::rng().random_range(0..RECONNECT_MAX_JITTER)),
            Self::Deterministic => Duration::ZERO,
        }
    }
}

/// Reconnect timer with bounded exponential backoff.
///
/// Holds the consecutive-failure counter. The counter only goes back to zero
/// through [`reset`](Self::reset), which the client calls on a confirmed connect.
#[derive(Debug, Clone)]
pub struct ReconnectTimer {
    mode: BackoffMode,
    max_attempts: u32,
    attempts: u32,
}

impl ReconnectTimer {
    pub fn new(mode: BackoffMode, max_attempts: u32) -> Self {
        Self {
            mode,
            max_attempts,
            attempts: 0,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// Get the next delay and count the attempt, or `None` once the budget is spent
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }
        let delay = self.mode.base_delay(self.attempts) + self.mode.jitter();
        self.attempts += 1;
        Some(delay)
    }

    /// Reset the timer
    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}
