//! Platform detectors
//!
//! Each detector inspects the source tree for one platform and describes its
//! build options as an option tree plus the config bodies the tree leads to.

pub mod android;
pub mod cordova;
pub mod expo;
pub mod xcode;

pub use android::AndroidDetector;
pub use cordova::CordovaDetector;
pub use expo::ExpoDetector;
pub use xcode::{ConfigDescriptor, XcodeDetector, XcodePlatform};

use crate::error::DetectionError;
use crate::fs::{dependency_dir_filters, filter_paths, PathFilter};
use crate::scanner::{Detector, ScanContext, ScannerPipeline};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};

/// Every detector, in priority order
pub fn default_detectors() -> Vec<Box<dyn Detector>> {
    vec![
        Box::new(CordovaDetector::new()),
        Box::new(ExpoDetector::new()),
        Box::new(XcodeDetector::new(XcodePlatform::Ios)),
        Box::new(XcodeDetector::new(XcodePlatform::MacOs)),
        Box::new(AndroidDetector::new()),
    ]
}

impl ScannerPipeline {
    /// Pipeline over [`default_detectors`]
    pub fn with_defaults() -> Self {
        Self::new(default_detectors())
    }
}

pub(crate) fn invalid(detector: &str, err: impl Display) -> DetectionError {
    DetectionError::Invalid {
        detector: detector.to_string(),
        message: err.to_string(),
    }
}

pub(crate) fn parse_error(detector: &str, path: &Path, err: impl Display) -> DetectionError {
    DetectionError::Parse {
        detector: detector.to_string(),
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

/// Directory containing `path`; empty for paths at the search root
pub(crate) fn dir_of(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

pub(crate) fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Files named `base` outside dependency directories, root-most first
pub(crate) fn find_files(
    ctx: &ScanContext,
    detector: &str,
    base: &'static str,
) -> Result<Vec<PathBuf>, DetectionError> {
    let mut filters = dependency_dir_filters();
    filters.push(PathFilter::AllowBase(base));
    let found = filter_paths(ctx.file_list(detector)?, &filters);
    Ok(found.into_iter().filter(|p| ctx.is_file(p)).collect())
}

/// The parts of `package.json` detectors look at
#[derive(Debug, Default, Deserialize)]
pub(crate) struct PackageJson {
    #[serde(default)]
    pub dependencies: BTreeMap<String, serde_json::Value>,
    #[serde(default, rename = "devDependencies")]
    pub dev_dependencies: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub scripts: BTreeMap<String, serde_json::Value>,
}

impl PackageJson {
    pub fn read(ctx: &ScanContext, detector: &str, path: &Path) -> Result<Self, DetectionError> {
        let content = ctx.read_to_string(detector, path)?;
        serde_json::from_str(&content).map_err(|e| parse_error(detector, path, e))
    }

    /// Some regular or dev dependency name contains `needle`
    pub fn depends_on(&self, needle: &str) -> bool {
        self.dependencies
            .keys()
            .chain(self.dev_dependencies.keys())
            .any(|name| name.contains(needle))
    }

    pub fn has_dependency(&self, name: &str) -> bool {
        self.dependencies.contains_key(name) || self.dev_dependencies.contains_key(name)
    }

    pub fn has_script(&self, name: &str) -> bool {
        self.scripts.contains_key(name)
    }
}

/// Keeps the paths with the fewest components
pub(crate) fn root_most(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let Some(min) = paths.iter().map(|p| p.components().count()).min() else {
        return paths;
    };
    paths
        .into_iter()
        .filter(|p| p.components().count() == min)
        .collect()
}
