//! Logging setup: a small config struct plus a one-shot initializer called
//! from `main`.

use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: Level,
    pub json: bool,
}

impl LoggingConfig {
    /// Parse the broker's `logger` config string (`debug`, `info`, …) into a
    /// [`LoggingConfig`], falling back to `INFO` on anything unrecognized.
    pub fn from_level_name(name: &str) -> Self {
        let level = name.parse().unwrap_or(Level::INFO);
        Self { level, json: false }
    }
}

/// Initialize the global `tracing` subscriber. Safe to call once per process;
/// a second call is a no-op (the underlying `set_global_default` error is
/// swallowed since tests may initialize more than once).
pub fn setup_logging(config: LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_string()));

    let builder = fmt().with_env_filter(filter).with_target(true);

    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    let _ = result;
}
