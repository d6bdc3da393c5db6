//! Reconnection settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Exponential backoff used when the socket drops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Reconnect automatically after a disconnect.
    #[serde(default = "default_true")]
    pub auto_reconnect: bool,
    /// Maximum consecutive failed attempts (`None` = retry forever).
    #[serde(default)]
    pub max_retries: Option<u32>,
    /// Delay before the first attempt, in milliseconds.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Upper bound on the delay, in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Growth factor applied after each failed attempt.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_true() -> bool {
    true
}

fn default_initial_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    60_000
}

fn default_multiplier() -> f64 {
    2.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            auto_reconnect: true,
            max_retries: None,
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
        }
    }
}

impl RetryConfig {
    /// A config that never reconnects.
    pub fn no_reconnect() -> Self {
        Self {
            auto_reconnect: false,
            ..Self::default()
        }
    }

    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = Some(max);
        self
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// The delay that follows `current` after another failed attempt, never
    /// above [`max_delay`](Self::max_delay).
    pub fn next_delay(&self, current: Duration) -> Duration {
        let max = self.max_delay();
        Duration::try_from_secs_f64(current.as_secs_f64() * self.multiplier)
            .map_or(max, |next| next.min(max))
    }
}
