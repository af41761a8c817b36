//! Structured logging setup for stepinit
//!
//! Logs always go to stderr so that documents printed on stdout stay clean.
//! `RUST_LOG` takes precedence over the configured level when set.
//!
//! # Example
//!
//! ```no_run
//! use stepinit::util::logging::{self, LoggingConfig};
//! use tracing::Level;
//!
//! logging::init_logging(LoggingConfig::with_level(Level::DEBUG));
//! tracing::debug!(platform = "android", "Scanning");
//! ```

use crate::config::StepinitConfig;
use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum level for stepinit's own events
    pub level: Level,

    /// JSON lines instead of the human formatter
    pub use_json: bool,

    /// Include the module target (e.g. stepinit::scanners::xcode)
    pub include_target: bool,

    /// Include file and line number information
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_target: true,
            include_location: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// Level from the command line flags, then the environment configuration.
    ///
    /// `--log-level` wins over `-v`, which wins over `-q`.
    pub fn from_flags(
        config: &StepinitConfig,
        log_level: Option<&str>,
        verbose: bool,
        quiet: bool,
    ) -> Self {
        let level = if let Some(level) = log_level {
            parse_level(level)
        } else if verbose {
            Level::DEBUG
        } else if quiet {
            Level::ERROR
        } else {
            parse_level(&config.log_level)
        };

        Self {
            level,
            use_json: config.log_json,
            ..Default::default()
        }
    }
}

/// Parses a log level, case-insensitively; unknown names fall back to INFO
pub fn parse_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::INFO
        }
    }
}

/// Installs the global subscriber; later calls are ignored
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut filter = EnvFilter::from_default_env();
        if env::var("RUST_LOG").is_err() {
            filter = filter.add_directive(LevelFilter::from_level(config.level).into());
        }

        if config.use_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location)
                        .with_writer(std::io::stderr),
                )
                .init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
    });
}

/// Initializes logging from `STEPINIT_LOG_LEVEL` and `STEPINIT_LOG_JSON`
pub fn init_from_env() {
    init_logging(LoggingConfig::from_flags(
        &StepinitConfig::default(),
        None,
        false,
        false,
    ));
}
