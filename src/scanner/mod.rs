//! Platform detection pipeline
//!
//! Detectors run in a fixed priority order. A detector that recognises its
//! platform may exclude detectors that come after it (a Cordova project also
//! contains Xcode and Gradle projects that must not be reported separately).

mod context;
mod result;

pub use context::{ScanContext, DEFAULT_MAX_DEPTH};
pub use result::{PlatformScan, ScanResult};

use crate::error::{DetectionError, ScanError};
use crate::options::OptionNode;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};

/// Config name to serialized config body
pub type ConfigMap = BTreeMap<String, String>;

/// Human-readable notes attached to a detected platform
pub type Warnings = Vec<String>;

/// One platform detector.
///
/// `detect_platform` is always called first; the detector may keep what it
/// found for the later calls in the same scan.
pub trait Detector {
    fn name(&self) -> &str;

    fn detect_platform(&mut self, ctx: &ScanContext) -> Result<bool, DetectionError>;

    /// Detectors to skip once this one detected its platform
    fn excluded_detector_names(&self) -> Vec<String> {
        Vec::new()
    }

    fn options(&mut self, ctx: &ScanContext) -> Result<(OptionNode, Warnings), DetectionError>;

    fn configs(&mut self, ctx: &ScanContext) -> Result<ConfigMap, DetectionError>;

    /// Detector-independent tree offered when nothing was detected
    fn default_options(&self) -> Result<OptionNode, DetectionError>;

    fn default_configs(&self) -> Result<ConfigMap, DetectionError>;
}

pub struct ScannerPipeline {
    detectors: Vec<Box<dyn Detector>>,
}

impl ScannerPipeline {
    /// Pipeline running `detectors` in the given order
    pub fn new(detectors: Vec<Box<dyn Detector>>) -> Self {
        Self { detectors }
    }

    pub fn detector_names(&self) -> Vec<&str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    /// Runs every detector against the context's search directory
    pub fn scan(&mut self, ctx: &ScanContext) -> Result<ScanResult, ScanError> {
        info!(search_dir = %ctx.search_dir().display(), "Scanning for platforms");

        let mut excluded: HashSet<String> = HashSet::new();
        let mut result = ScanResult::default();

        for detector in self.detectors.iter_mut() {
            let name = detector.name().to_string();
            if excluded.contains(&name) {
                debug!(detector = %name, "Skipping excluded detector");
                continue;
            }

            match detector.detect_platform(ctx) {
                Ok(true) => info!(detector = %name, "Platform detected"),
                Ok(false) => {
                    debug!(detector = %name, "Platform not detected");
                    continue;
                }
                Err(e) => {
                    warn!(detector = %name, error = %e, "Detection failed");
                    result.add_error(e);
                    continue;
                }
            }

            excluded.extend(detector.excluded_detector_names());

            match Self::collect(detector.as_mut(), ctx) {
                Ok(platform) => result.add_platform(platform),
                Err(e) => {
                    warn!(detector = %name, error = %e, "Failed to collect options");
                    result.add_error(e);
                }
            }
        }

        if result.is_empty() {
            return Err(ScanError::NoPlatformDetected {
                search_dir: ctx.search_dir().to_path_buf(),
                errors: result.errors().to_vec(),
            });
        }
        Ok(result)
    }

    fn collect(detector: &mut dyn Detector, ctx: &ScanContext) -> Result<PlatformScan, DetectionError> {
        let (options, warnings) = detector.options(ctx)?;
        let configs = detector.configs(ctx)?;
        debug!(
            detector = detector.name(),
            configs = configs.len(),
            warnings = warnings.len(),
            "Collected options"
        );
        Ok(PlatformScan {
            name: detector.name().to_string(),
            options,
            configs,
            warnings,
        })
    }

    /// Default trees and configs of every detector, in priority order
    pub fn default_result(&self) -> Result<ScanResult, DetectionError> {
        let mut result = ScanResult::default();
        for detector in &self.detectors {
            result.add_platform(PlatformScan {
                name: detector.name().to_string(),
                options: detector.default_options()?,
                configs: detector.default_configs()?,
                warnings: Vec::new(),
            });
        }
        Ok(result)
    }
}
