//! Engine configuration
//!
//! Defaults match the branch banking apps: a 30 tick OTP cooldown driven by a
//! one second ticker, and an 8 second bound on every network call.

use crate::FormError;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::warn;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Ticks before an OTP may be resent
    #[serde(default = "default_otp_cooldown_ticks")]
    pub otp_cooldown_ticks: u32,

    /// Length of one cooldown tick in milliseconds
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Upper bound for OTP and submission calls in milliseconds
    #[serde(default = "default_network_timeout_ms")]
    pub network_timeout_ms: u64,

    /// Spawn a background ticker after each OTP send. Hosts that drive
    /// `tick()` themselves turn this off.
    #[serde(default = "default_auto_tick")]
    pub auto_tick: bool,
}

fn default_otp_cooldown_ticks() -> u32 {
    30
}

fn default_tick_interval_ms() -> u64 {
    1_000
}

fn default_network_timeout_ms() -> u64 {
    8_000
}

fn default_auto_tick() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            otp_cooldown_ticks: default_otp_cooldown_ticks(),
            tick_interval_ms: default_tick_interval_ms(),
            network_timeout_ms: default_network_timeout_ms(),
            auto_tick: default_auto_tick(),
        }
    }
}

impl EngineConfig {
    /// Defaults with the background ticker disabled
    pub fn manual_ticks() -> Self {
        Self {
            auto_tick: false,
            ..Self::default()
        }
    }

    #[inline]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    #[inline]
    pub fn network_timeout(&self) -> Duration {
        Duration::from_millis(self.network_timeout_ms)
    }

    /// Load configuration from `FORMFLOW_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    /// Unparsable values are logged and the default is kept.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(ticks) = lookup("FORMFLOW_OTP_COOLDOWN_TICKS") {
            if let Ok(ticks) = ticks.parse::<u32>() {
                config.otp_cooldown_ticks = ticks;
            } else {
                warn!("Invalid FORMFLOW_OTP_COOLDOWN_TICKS value: {}", ticks);
            }
        }

        if let Some(interval) = lookup("FORMFLOW_TICK_INTERVAL_MS") {
            if let Ok(interval) = interval.parse::<u64>() {
                config.tick_interval_ms = interval;
            } else {
                warn!("Invalid FORMFLOW_TICK_INTERVAL_MS value: {}", interval);
            }
        }

        if let Some(timeout) = lookup("FORMFLOW_NETWORK_TIMEOUT_MS") {
            if let Ok(timeout) = timeout.parse::<u64>() {
                config.network_timeout_ms = timeout;
            } else {
                warn!("Invalid FORMFLOW_NETWORK_TIMEOUT_MS value: {}", timeout);
            }
        }

        if let Some(auto_tick) = lookup("FORMFLOW_AUTO_TICK") {
            config.auto_tick = auto_tick.to_lowercase() == "true" || auto_tick == "1";
        }

        config
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<(), FormError> {
        if self.tick_interval_ms == 0 {
            return Err(FormError::Configuration(
                "tick_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.network_timeout_ms == 0 {
            return Err(FormError::Configuration(
                "network_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
