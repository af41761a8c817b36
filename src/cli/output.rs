//! Serialization of the documents stepinit writes
//!
//! Every command writes `<stem>.<ext>` files into its output directory, where the
//! extension follows the chosen format.

use crate::config::OutputFormat;
use crate::output::PipelineDefinition;
use crate::scanner::ScanResult;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const PIPELINE_STEM: &str = "pipeline";
pub const RESULT_STEM: &str = "result";

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn format_definition(&self, definition: &PipelineDefinition) -> Result<String> {
        let text = match self.format {
            OutputFormat::Yaml => definition.to_yaml()?,
            OutputFormat::Json => definition.to_json()?,
        };
        Ok(text)
    }

    pub fn format_scan_result(&self, result: &ScanResult) -> Result<String> {
        self.serialize(result)
            .context("Failed to serialize scan result")
    }

    fn serialize<T: Serialize>(&self, value: &T) -> Result<String> {
        let text = match self.format {
            OutputFormat::Yaml => serde_yaml::to_string(value)?,
            OutputFormat::Json => serde_json::to_string_pretty(value)?,
        };
        Ok(text)
    }

    /// `<output_dir>/<stem>.<ext>`
    pub fn output_path(&self, output_dir: &Path, stem: &str) -> PathBuf {
        output_dir.join(format!("{}.{}", stem, self.format.extension()))
    }

    /// Writes `content` as `<stem>.<ext>`, creating `output_dir` when needed
    pub fn write(&self, output_dir: &Path, stem: &str, content: &str) -> Result<PathBuf> {
        fs::create_dir_all(output_dir).with_context(|| {
            format!("Failed to create output directory {}", output_dir.display())
        })?;

        let path = self.output_path(output_dir, stem);
        fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        debug!(path = %path.display(), bytes = content.len(), "Document written");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::OptionNode;
    use crate::output::{ConfigBuilder, PRIMARY_WORKFLOW};
    use crate::scanner::PlatformScan;
    use crate::steps;
    use tempfile::TempDir;

    fn definition() -> PipelineDefinition {
        let mut builder = ConfigBuilder::new();
        builder.append_steps(PRIMARY_WORKFLOW, steps::default_prepare_steps());
        builder.generate("android", vec![]).unwrap()
    }

    fn scan_result() -> ScanResult {
        let mut options = OptionNode::new("Gradle task to run", "GRADLE_TASK");
        options.bind_config("assemble", "android-config").unwrap();
        let mut result = ScanResult::default();
        result.add_platform(PlatformScan {
            name: "android".to_string(),
            options,
            configs: [("android-config".to_string(), "format_version: 1.4.0\n".to_string())]
                .into_iter()
                .collect(),
            warnings: vec!["multiple gradlew files".to_string()],
        });
        result
    }

    #[test]
    fn test_yaml_definition() {
        let output = OutputFormatter::new(OutputFormat::Yaml)
            .format_definition(&definition())
            .unwrap();
        assert!(output.starts_with("format_version: 1.4.0"));
        assert!(output.contains("project_type: android"));
    }

    #[test]
    fn test_json_scan_result() {
        let output = OutputFormatter::new(OutputFormat::Json)
            .format_scan_result(&scan_result())
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(
            value["options"]["android"]["env_key"],
            serde_json::json!("GRADLE_TASK")
        );
        assert_eq!(
            value["warnings"]["android"],
            serde_json::json!(["multiple gradlew files"])
        );
    }

    #[test]
    fn test_write_creates_output_dir() {
        let temp_dir = TempDir::new().unwrap();
        let output_dir = temp_dir.path().join("nested/out");
        let formatter = OutputFormatter::new(OutputFormat::Json);

        let path = formatter.write(&output_dir, RESULT_STEM, "{}").unwrap();

        assert_eq!(path, output_dir.join("result.json"));
        assert_eq!(fs::read_to_string(path).unwrap(), "{}");
    }
}
