//! Bounded exponential backoff for transports that reconnect on their own.

use std::time::Duration;

pub const BASE_DELAY_MS: u64 = 1_000;
pub const MAX_DELAY_MS: u64 = 10_000;
pub const MAX_ATTEMPTS: u32 = 5;

/// Backoff knobs as they appear in configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct ReconnectSettings {
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_attempts: u32,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            base_delay_ms: BASE_DELAY_MS,
            max_delay_ms: MAX_DELAY_MS,
            max_attempts: MAX_ATTEMPTS,
        }
    }
}

/// `min(base * 2^n, max)` without overflowing for large `n`.
pub fn backoff_delay(base_ms: u64, max_ms: u64, n: u32) -> Duration {
    let factor = 1u64.checked_shl(n).unwrap_or(u64::MAX);
    Duration::from_millis(base_ms.saturating_mul(factor).min(max_ms))
}

/// Tracks consecutive failed attempts since the last successful connection.
#[derive(Clone, Debug)]
pub struct ReconnectPolicy {
    settings: ReconnectSettings,
    attempts: u32,
}

impl ReconnectPolicy {
    pub fn new(settings: ReconnectSettings) -> Self {
        Self {
            settings,
            attempts: 0,
        }
    }

    /// Delay before the next attempt, or `None` once the cap is reached.
    /// Each call counts as one scheduled attempt.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= self.settings.max_attempts {
            return None;
        }
        let delay = backoff_delay(
            self.settings.base_delay_ms,
            self.settings.max_delay_ms,
            self.attempts,
        );
        self.attempts += 1;
        Some(delay)
    }

    /// A connection succeeded.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.settings.max_attempts
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(ReconnectSettings::default())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/protocol/reconnect.rs"]
mod tests;
