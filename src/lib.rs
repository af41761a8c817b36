//! stepinit - CI pipeline bootstrapping for mobile projects
//!
//! Scans a source tree for Cordova, Expo, iOS, macOS and Android projects and
//! generates a ready-to-run pipeline definition for the one the user picks.
//!
//! # Core Concepts
//!
//! - **Detectors**: One per platform. Each inspects the file list, reports an
//!   option tree describing every valid parameter combination and the config
//!   bodies those combinations lead to.
//! - **Option trees**: [`options::OptionNode`] values, walked by a
//!   [`options::ValueChooser`] down to a single config identifier.
//! - **Pipeline definitions**: Workflows of steps built with
//!   [`output::ConfigBuilder`] and rendered with the chosen substitutions.
//!
//! # Example Usage
//!
//! ```no_run
//! use stepinit::options::AutoChooser;
//! use stepinit::{ConfigService, StepinitConfig};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let service = ConfigService::new(&StepinitConfig::default());
//! let generated = service.generate(Path::new("./my-app"), &mut AutoChooser::new())?;
//!
//! println!("platform: {}", generated.platform);
//! println!("{}", generated.definition.to_yaml()?);
//! # Ok(())
//! # }
//! ```
//!
//! # Project Structure
//!
//! - [`fs`]: File system abstraction and source listing
//! - [`options`]: Option trees and their resolution
//! - [`steps`]: Step catalogue
//! - [`output`]: Pipeline definition model, builder and rendering
//! - [`scanner`]: Detector trait, scan context and scan results
//! - [`scanners`]: Platform detectors
//! - [`service`]: End-to-end orchestration

pub mod cli;
pub mod config;
pub mod error;
pub mod fs;
pub mod options;
pub mod output;
pub mod scanner;
pub mod scanners;
pub mod service;
pub mod steps;
pub mod util;

pub use config::{ConfigError, OutputFormat, StepinitConfig};
pub use error::{
    DetectionError, GenerationError, InitError, OptionError, ResolveError, ScanError,
    TemplateError,
};
pub use options::{OptionNode, Resolution, Substitutions};
pub use output::PipelineDefinition;
pub use scanner::{Detector, ScanResult, ScannerPipeline};
pub use service::{ConfigService, GeneratedConfig};
pub use util::{init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name_is_stepinit() {
        assert_eq!(NAME, "stepinit");
    }
}
