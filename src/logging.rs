//! Logging setup.
//!
//! Verbosity follows the build: debug builds log from `Debug` up, release
//! builds only `Warn` and `Error`. In the browser every record is written to
//! the console as one JSON object; native builds go through `env_logger`,
//! where `RUST_LOG` can still override the level.

use log::{Level, LevelFilter, Log, Metadata, Record};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogConfig {
    pub level: LevelFilter,
}

impl LogConfig {
    pub fn from_environment() -> Self {
        let level = if cfg!(debug_assertions) {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        };
        Self { level }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::from_environment()
    }
}

#[derive(Serialize)]
struct Entry<'a> {
    level: &'a str,
    target: &'a str,
    message: String,
    timestamp: f64,
}

/// Render a record as a single-line JSON object.
pub fn format_entry(record: &Record<'_>, timestamp: f64) -> String {
    let message = record.args().to_string();
    let entry = Entry {
        level: record.level().as_str(),
        target: record.target(),
        message,
        timestamp,
    };
    serde_json::to_string(&entry).unwrap_or_else(|_| entry.message)
}

/// `log` backend writing structured entries to the browser console.
pub struct ConsoleLogger {
    level: LevelFilter,
}

impl ConsoleLogger {
    pub fn new(level: LevelFilter) -> Self {
        Self { level }
    }
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = wasm_bindgen::JsValue::from_str(&format_entry(record, js_sys::Date::now()));
        match record.level() {
            Level::Error => web_sys::console::error_1(&line),
            Level::Warn => web_sys::console::warn_1(&line),
            Level::Info => web_sys::console::info_1(&line),
            Level::Debug | Level::Trace => web_sys::console::debug_1(&line),
        }
    }

    fn flush(&self) {}
}

/// Install the logger. Later calls are ignored.
pub fn init(config: LogConfig) {
    #[cfg(target_arch = "wasm32")]
    {
        if log::set_boxed_logger(Box::new(ConsoleLogger::new(config.level))).is_ok() {
            log::set_max_level(config.level);
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = env_logger::Builder::new()
            .filter_level(config.level)
            .parse_default_env()
            .try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_gating_matches_build_profile() {
        let expected = if cfg!(debug_assertions) {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        };
        assert_eq!(LogConfig::from_environment().level, expected);
    }

    #[test]
    fn entries_are_json() {
        let line = format_entry(
            &Record::builder()
                .args(format_args!("failed to preload unit {}", "catalog"))
                .level(Level::Warn)
                .target("route_preload::preload")
                .build(),
            1_700_000_000_000.0,
        );
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["level"], "WARN");
        assert_eq!(value["target"], "route_preload::preload");
        assert_eq!(value["message"], "failed to preload unit catalog");
        assert_eq!(value["timestamp"], 1_700_000_000_000.0);
    }

    #[test]
    fn console_logger_filters_by_level() {
        let logger = ConsoleLogger::new(LevelFilter::Warn);
        let debug = Metadata::builder().level(Level::Debug).build();
        let error = Metadata::builder().level(Level::Error).build();
        assert!(!logger.enabled(&debug));
        assert!(logger.enabled(&error));
    }

    #[test]
    fn init_twice_is_harmless() {
        init(LogConfig::default());
        init(LogConfig::default());
    }
}
