use super::{ConfigMap, Warnings};
use crate::error::{DetectionError, TemplateError};
use crate::options::OptionNode;
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// What one detector contributed to a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformScan {
    pub name: String,
    pub options: OptionNode,
    pub configs: ConfigMap,
    pub warnings: Warnings,
}

impl PlatformScan {
    pub fn config_body(&self, config_id: &str) -> Result<&str, TemplateError> {
        self.configs
            .get(config_id)
            .map(String::as_str)
            .ok_or_else(|| TemplateError::UnknownConfig {
                platform: self.name.clone(),
                config: config_id.to_string(),
            })
    }
}

/// Aggregate of a scan, in detector priority order.
///
/// Serializes as the scan result document:
///
/// ```yaml
/// options:
///   cordova: <option tree>
/// configs:
///   cordova:
///     cordova-config: <pipeline definition yaml>
/// warnings:
///   cordova: []
/// errors:
///   ios:
///   - "[ios] failed to parse ..."
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    platforms: Vec<PlatformScan>,
    errors: Vec<DetectionError>,
}

impl ScanResult {
    pub fn add_platform(&mut self, platform: PlatformScan) {
        self.platforms.push(platform);
    }

    pub fn add_error(&mut self, error: DetectionError) {
        self.errors.push(error);
    }

    pub fn platforms(&self) -> &[PlatformScan] {
        &self.platforms
    }

    pub fn platform(&self, name: &str) -> Option<&PlatformScan> {
        self.platforms.iter().find(|p| p.name == name)
    }

    pub fn platform_names(&self) -> Vec<&str> {
        self.platforms.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn errors(&self) -> &[DetectionError] {
        &self.errors
    }

    /// No platform was detected
    pub fn is_empty(&self) -> bool {
        self.platforms.is_empty()
    }

    fn errors_by_detector(&self) -> BTreeMap<&str, Vec<String>> {
        let mut grouped: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for error in &self.errors {
            grouped
                .entry(error.detector())
                .or_default()
                .push(error.to_string());
        }
        grouped
    }
}

#[derive(Clone, Copy)]
enum Field {
    Options,
    Configs,
    Warnings,
}

/// One field of every platform, keyed by platform name
struct PerPlatform<'a> {
    platforms: &'a [PlatformScan],
    field: Field,
}

impl Serialize for PerPlatform<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.platforms.len()))?;
        for platform in self.platforms {
            match self.field {
                Field::Options => map.serialize_entry(&platform.name, &platform.options)?,
                Field::Configs => map.serialize_entry(&platform.name, &platform.configs)?,
                Field::Warnings => map.serialize_entry(&platform.name, &platform.warnings)?,
            }
        }
        map.end()
    }
}

impl Serialize for ScanResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let per_platform = |field| PerPlatform {
            platforms: &self.platforms,
            field,
        };
        let fields = if self.errors.is_empty() { 3 } else { 4 };
        let mut state = serializer.serialize_struct("ScanResult", fields)?;
        state.serialize_field("options", &per_platform(Field::Options))?;
        state.serialize_field("configs", &per_platform(Field::Configs))?;
        state.serialize_field("warnings", &per_platform(Field::Warnings))?;
        if self.errors.is_empty() {
            state.skip_field("errors")?;
        } else {
            state.serialize_field("errors", &self.errors_by_detector())?;
        }
        state.end()
    }
}
