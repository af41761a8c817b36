//! End-to-end config resolution
//!
//! `ConfigService` is a thin orchestration layer:
//! 1. Validates the search directory
//! 2. Runs every detector over it
//! 3. Lets the chooser pick a platform and walk its option tree
//! 4. Renders the selected config body
//!
//! # Example
//!
//! ```no_run
//! use stepinit::options::AutoChooser;
//! use stepinit::{ConfigService, StepinitConfig};
//! use std::path::Path;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = ConfigService::new(&StepinitConfig::default());
//! let generated = service.generate(Path::new("."), &mut AutoChooser::new())?;
//!
//! println!("{}", generated.definition.to_yaml()?);
//! # Ok(())
//! # }
//! ```

use crate::config::StepinitConfig;
use crate::error::InitError;
use crate::fs::{FileSystem, RealFileSystem};
use crate::options::{resolve, Resolution, ValueChooser};
use crate::output::{render_config, PipelineDefinition};
use crate::scanner::{PlatformScan, ScanContext, ScanResult, ScannerPipeline};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

const PLATFORM_TITLE: &str = "Select platform";

/// A rendered definition and how it was reached
#[derive(Debug, Clone)]
pub struct GeneratedConfig {
    pub platform: String,
    pub resolution: Resolution,
    pub definition: PipelineDefinition,
    pub scan: ScanResult,
}

pub struct ConfigService {
    fs: Box<dyn FileSystem>,
    max_depth: usize,
}

impl std::fmt::Debug for ConfigService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigService")
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

impl ConfigService {
    /// Service over the real file system
    pub fn new(config: &StepinitConfig) -> Self {
        Self::with_file_system(Box::new(RealFileSystem::new()), config.max_depth)
    }

    pub fn with_file_system(fs: Box<dyn FileSystem>, max_depth: usize) -> Self {
        Self { fs, max_depth }
    }

    /// Runs every detector over `search_dir`
    pub fn scan(&self, search_dir: &Path) -> Result<ScanResult, InitError> {
        if !self.fs.is_dir(search_dir) {
            return Err(InitError::PathNotFound(search_dir.to_path_buf()));
        }

        let start = Instant::now();
        info!(search_dir = %search_dir.display(), "Scanning source tree");

        let ctx = ScanContext::new(self.fs.as_ref(), search_dir).with_max_depth(self.max_depth);
        let result = ScannerPipeline::with_defaults().scan(&ctx)?;

        for error in result.errors() {
            warn!(detector = error.detector(), error = %error, "Detector failed");
        }
        info!(
            platforms = ?result.platform_names(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Scan finished"
        );
        Ok(result)
    }

    /// Default options and configs of every platform, for projects no
    /// detector recognises
    pub fn manual_config(&self) -> Result<ScanResult, InitError> {
        Ok(ScannerPipeline::with_defaults().default_result()?)
    }

    /// Picks the platform to resolve; asks only when several were detected
    pub fn select_platform<'r>(
        result: &'r ScanResult,
        chooser: &mut dyn ValueChooser,
    ) -> Result<&'r PlatformScan, InitError> {
        let names: Vec<String> = result
            .platform_names()
            .into_iter()
            .map(str::to_string)
            .collect();

        let chosen = match names.as_slice() {
            [] => return Err(InitError::UnknownPlatform(String::new())),
            [only] => only.clone(),
            candidates => chooser.choose_one(PLATFORM_TITLE, candidates)?,
        };
        debug!(platform = %chosen, "Platform selected");

        result
            .platform(&chosen)
            .ok_or(InitError::UnknownPlatform(chosen))
    }

    /// Walks the chosen platform's tree and renders the config it ends in
    pub fn resolve_config(
        &self,
        scan: ScanResult,
        chooser: &mut dyn ValueChooser,
    ) -> Result<GeneratedConfig, InitError> {
        let platform = Self::select_platform(&scan, chooser)?;
        for warning in &platform.warnings {
            warn!(platform = %platform.name, "{}", warning);
        }

        let in_platform = |source: InitError| InitError::Platform {
            platform: platform.name.clone(),
            source: Box::new(source),
        };

        let resolution = resolve(&platform.options, chooser).map_err(|e| in_platform(e.into()))?;
        info!(
            platform = %platform.name,
            config = %resolution.config_id,
            substitutions = resolution.substitutions.len(),
            "Option tree resolved"
        );

        let body = platform
            .config_body(&resolution.config_id)
            .map_err(|e| in_platform(e.into()))?;
        let definition =
            render_config(body, &resolution.substitutions).map_err(|e| in_platform(e.into()))?;
        let platform = platform.name.clone();

        Ok(GeneratedConfig {
            platform,
            resolution,
            definition,
            scan,
        })
    }

    /// Scan, resolve and render in one go
    pub fn generate(
        &self,
        search_dir: &Path,
        chooser: &mut dyn ValueChooser,
    ) -> Result<GeneratedConfig, InitError> {
        let scan = self.scan(search_dir)?;
        self.resolve_config(scan, chooser)
    }
}
