//! Logging setup, performed explicitly by the binary.
//!
//! The library only emits `tracing` events; nothing is configured when the
//! crate is loaded. `init` installs a `fmt` subscriber writing to stderr so
//! stdout stays reserved for device records.

use tracing_subscriber::EnvFilter;

/// Log level used when neither `--log-level` nor `RUST_LOG` picks one.
pub const DEFAULT_LOG_LEVEL: &str = "error";

/// Caller-supplied logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// `EnvFilter` directive, e.g. `warn` or `mvision_devices=debug`.
    pub level: String,
    /// Colour the output.
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: DEFAULT_LOG_LEVEL.to_string(),
            ansi: false,
        }
    }
}

impl LogConfig {
    /// Config with the given filter directive.
    pub fn new(level: &str) -> Self {
        LogConfig {
            level: level.to_string(),
            ..LogConfig::default()
        }
    }

    /// The effective filter: `RUST_LOG` wins when set and valid.
    pub fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level))
    }
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init(config: &LogConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(config.filter())
        .with_writer(std::io::stderr)
        .with_ansi(config.ansi)
        .with_target(false)
        .try_init()
}
