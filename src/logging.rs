//! Logging configuration and initialization.
//!
//! Logs always go to stderr; stdout is reserved for the plan document.

use clap::{Args, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt};

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging options of the command line.
#[derive(Debug, Clone, Args)]
pub struct LoggingArgs {
    /// Log level filter, overridden by RUST_LOG
    #[clap(long, default_value = "warn")]
    pub log_level: String,

    /// Log line format
    #[clap(long, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl Default for LoggingArgs {
    fn default() -> Self {
        Self {
            log_level: "warn".into(),
            log_format: LogFormat::default(),
        }
    }
}

impl LoggingArgs {
    /// Filter from `RUST_LOG`, falling back to the configured level.
    pub fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.log_level))
    }

    /// Initialize the tracing subscriber with this logging configuration.
    ///
    /// Does nothing if a global subscriber is already installed.
    pub fn init(&self) {
        let filter = self.filter();

        let result = match self.log_format {
            LogFormat::Json => fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init(),
            LogFormat::Pretty => fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init(),
        };
        if result.is_err() {
            tracing::debug!("tracing subscriber already installed");
        }
    }
}
