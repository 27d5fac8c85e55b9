//! Logging setup
//!
//! Logs go to stderr so the confirmation prompt on stdout stays readable.
//! `RUST_LOG` takes precedence over the configured level.

use std::io;

use function_checker_common::LoggingConfig;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Subscriber settings
#[derive(Debug, Clone)]
pub struct LogSettings {
    pub level: String,       // trace, debug, info, warn, error
    pub json_format: bool,   // one JSON object per line
    pub with_target: bool,   // include the module path of each event
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_target: false,
        }
    }
}

impl From<&LoggingConfig> for LogSettings {
    fn from(config: &LoggingConfig) -> Self {
        Self {
            level: config.level.clone(),
            json_format: config.json,
            with_target: config.level.eq_ignore_ascii_case("debug")
                || config.level.eq_ignore_ascii_case("trace"),
        }
    }
}

impl LogSettings {
    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level))
    }

    /// Install the global subscriber
    pub fn init(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let registry = tracing_subscriber::registry().with(self.filter());

        if self.json_format {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(self.with_target)
                        .with_writer(io::stderr),
                )
                .try_init()?;
        } else {
            registry
                .with(
                    fmt::layer()
                        .with_target(self.with_target)
                        .with_level(true)
                        .with_writer(io::stderr),
                )
                .try_init()?;
        }

        tracing::debug!("Logging initialized - level: {}", self.level);

        Ok(())
    }
}
