//! Runtime configuration for stepinit
//!
//! Settings are loaded from environment variables with defaults; command line
//! flags override them in the CLI handlers.
//!
//! # Environment Variables
//!
//! - `STEPINIT_LOG_LEVEL`: Logging level - default: "info"
//! - `STEPINIT_LOG_JSON`: JSON log output (true|false) - default: "false"
//! - `STEPINIT_CI`: Resolve unattended (true|false) - default: "false", also enabled by `CI=true`
//! - `STEPINIT_MAX_DEPTH`: Directory depth the source listing descends - default: "10"
//! - `STEPINIT_OUTPUT_FORMAT`: Output document format (yaml|json) - default: "yaml"
//!
//! # Example
//!
//! ```no_run
//! use stepinit::StepinitConfig;
//!
//! let config = StepinitConfig::default();
//! config.validate().expect("Invalid configuration");
//! println!("{}", config);
//! ```

use crate::scanner::DEFAULT_MAX_DEPTH;
use std::env;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const DEFAULT_LOG_LEVEL: &str = "info";
const MAX_DEPTH_LIMIT: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },
}

/// Format of the documents stepinit writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Yaml => "yml",
            OutputFormat::Json => "json",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            "json" => Ok(OutputFormat::Json),
            other => Err(ConfigError::ParseError {
                field: "STEPINIT_OUTPUT_FORMAT".to_string(),
                error: format!("unknown format '{}', expected yaml or json", other),
            }),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Yaml => write!(f, "yaml"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepinitConfig {
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,

    pub log_json: bool,

    /// Resolve without prompting
    pub ci: bool,

    /// Directory depth the source listing descends
    pub max_depth: usize,

    pub output_format: OutputFormat,
}

fn env_flag(key: &str) -> Option<bool> {
    env::var(key).ok().and_then(|v| v.parse::<bool>().ok())
}

impl Default for StepinitConfig {
    /// Loads from `STEPINIT_*` environment variables, falling back to defaults
    fn default() -> Self {
        let log_level = env::var("STEPINIT_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        let log_json = env_flag("STEPINIT_LOG_JSON").unwrap_or(false);

        let ci = env_flag("STEPINIT_CI")
            .or_else(|| env_flag("CI"))
            .unwrap_or(false);

        let max_depth = env::var("STEPINIT_MAX_DEPTH")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAX_DEPTH);

        let output_format = env::var("STEPINIT_OUTPUT_FORMAT")
            .ok()
            .and_then(|v| v.parse::<OutputFormat>().ok())
            .unwrap_or_default();

        Self {
            log_level,
            log_json,
            ci,
            max_depth,
            output_format,
        }
    }
}

impl StepinitConfig {
    /// Checks the log level and the listing depth
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::ValidationFailed(
                "Max depth must be at least 1".to_string(),
            ));
        }
        if self.max_depth > MAX_DEPTH_LIMIT {
            return Err(ConfigError::ValidationFailed(format!(
                "Max depth cannot exceed {}",
                MAX_DEPTH_LIMIT
            )));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }
}

impl fmt::Display for StepinitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Stepinit Configuration:")?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        writeln!(f, "  Log JSON: {}", self.log_json)?;
        writeln!(f, "  CI Mode: {}", self.ci)?;
        writeln!(f, "  Max Depth: {}", self.max_depth)?;
        writeln!(f, "  Output Format: {}", self.output_format)?;
        Ok(())
    }
}
