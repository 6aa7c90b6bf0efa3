//! Application-level configuration constants and the runtime preload config.

use crate::strategies::ConnectionClass;
use serde::{Deserialize, Serialize};
use std::fmt;

// Class-name cache
pub const MAX_CACHE_SIZE: usize = 1000;

// Preload behavior
pub const HOVER_DELAY_MS: u32 = 100;
pub const IDLE_FALLBACK_MS: u32 = 1;
pub const STATUS_POLL_MS: u32 = 1000;
pub const CHUNK_BASE_URL: &str = "/chunks/";

// Limits for user-supplied values
pub const MAX_HOVER_DELAY_MS: u32 = 5_000;
pub const MIN_STATUS_POLL_MS: u32 = 100;

/// Errors raised while loading or validating a [`PreloadConfig`].
#[derive(Debug)]
pub enum ConfigError {
    Parse(String),
    HoverDelayTooLong(u32),
    PollIntervalTooShort(u32),
    ZeroCacheCapacity,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Parse(msg) => write!(f, "Invalid preload config: {}", msg),
            ConfigError::HoverDelayTooLong(ms) => write!(
                f,
                "Hover delay of {} ms exceeds the maximum of {} ms",
                ms, MAX_HOVER_DELAY_MS
            ),
            ConfigError::PollIntervalTooShort(ms) => write!(
                f,
                "Status poll interval of {} ms is below the minimum of {} ms",
                ms, MIN_STATUS_POLL_MS
            ),
            ConfigError::ZeroCacheCapacity => write!(f, "Class cache capacity must be at least 1"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Tunables for the preloading strategies and the class-name cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PreloadConfig {
    pub hover_delay_ms: u32,
    /// Slowest connection on which network-aware preloading still runs.
    pub min_connection: ConnectionClass,
    /// Skip network-aware preloading when the user asked to save data.
    pub respect_save_data: bool,
    /// Refresh interval of the polled status badge.
    pub status_poll_ms: u32,
    pub class_cache_capacity: usize,
}

impl Default for PreloadConfig {
    fn default() -> Self {
        Self {
            hover_delay_ms: HOVER_DELAY_MS,
            min_connection: ConnectionClass::FourG,
            respect_save_data: true,
            status_poll_ms: STATUS_POLL_MS,
            class_cache_capacity: MAX_CACHE_SIZE,
        }
    }
}

impl PreloadConfig {
    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(input: &str) -> Result<Self, ConfigError> {
        let config: PreloadConfig =
            serde_json::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a config object handed over from JavaScript.
    pub fn from_js(value: wasm_bindgen::JsValue) -> Result<Self, ConfigError> {
        let config: PreloadConfig = serde_wasm_bindgen::from_value(value)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hover_delay_ms > MAX_HOVER_DELAY_MS {
            return Err(ConfigError::HoverDelayTooLong(self.hover_delay_ms));
        }
        if self.status_poll_ms < MIN_STATUS_POLL_MS {
            return Err(ConfigError::PollIntervalTooShort(self.status_poll_ms));
        }
        if self.class_cache_capacity == 0 {
            return Err(ConfigError::ZeroCacheCapacity);
        }
        Ok(())
    }

    pub fn hover_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(u64::from(self.hover_delay_ms))
    }
}
