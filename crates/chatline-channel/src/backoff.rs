// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capped exponential reconnect backoff.

use std::time::Duration;

use chatline_config::model::ChannelConfig;

/// Delay schedule for reconnect attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    /// Delay before the first attempt.
    pub base: Duration,
    /// Upper bound for any single delay.
    pub max: Duration,
    /// Growth factor per attempt. `1.0` keeps the delay fixed.
    pub multiplier: f64,
    /// Attempts allowed before the channel gives up. `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from_config(&ChannelConfig::default())
    }
}

impl ReconnectPolicy {
    pub fn from_config(config: &ChannelConfig) -> Self {
        Self {
            base: config.reconnect_delay(),
            max: config.reconnect_max_delay(),
            multiplier: config.reconnect_multiplier,
            max_attempts: config.max_reconnect_attempts,
        }
    }

    /// A constant delay with no attempt cap.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            base: delay,
            max: delay,
            multiplier: 1.0,
            max_attempts: None,
        }
    }

    /// Delay before reconnect attempt `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let factor = self.multiplier.max(1.0).powi(exponent);
        let millis = self.base.as_millis() as f64 * factor;
        let capped = millis.min(self.max.as_millis() as f64);
        Duration::from_millis(capped.max(0.0) as u64)
    }

    /// Whether attempt `attempt` exceeds the cap.
    pub fn exhausted(&self, attempt: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempt > max)
    }
}
