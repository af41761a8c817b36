//! Pipeline definition schema
//!
//! This module defines the document a resolved config turns into: format
//! version, step library, trigger map, workflows with their ordered step lists
//! and the app-level environment.

use crate::error::GenerationError;
use crate::steps::{EnvItem, StepListItem};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

fn deserialize_null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::deserialize(deserializer)?.unwrap_or_default())
}

/// Complete pipeline definition emitted for one resolved config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineDefinition {
    /// Definition format version (e.g., "1.4.0")
    pub format_version: String,
    /// Step library used to look up step ids
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub default_step_lib_source: String,
    /// Platform the definition was generated for; may hold placeholders
    #[serde(
        default,
        deserialize_with = "deserialize_null_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub project_type: String,
    /// App-level environment; values may hold placeholders
    #[serde(
        default,
        deserialize_with = "deserialize_null_default",
        skip_serializing_if = "AppSection::is_empty"
    )]
    pub app: AppSection,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub trigger_map: Vec<TriggerMapItem>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub workflows: BTreeMap<String, Workflow>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSection {
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub envs: Vec<EnvItem>,
}

impl AppSection {
    pub fn is_empty(&self) -> bool {
        self.envs.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.envs.iter().any(|env| env.key == key)
    }
}

/// Routes a git event to a workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerMapItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push_branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pull_request_source_branch: Option<String>,
    pub workflow: String,
}

impl TriggerMapItem {
    pub fn push(pattern: &str, workflow: &str) -> Self {
        Self {
            push_branch: Some(pattern.to_string()),
            pull_request_source_branch: None,
            workflow: workflow.to_string(),
        }
    }

    pub fn pull_request(pattern: &str, workflow: &str) -> Self {
        Self {
            push_branch: None,
            pull_request_source_branch: Some(pattern.to_string()),
            workflow: workflow.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub steps: Vec<StepListItem>,
}

impl fmt::Display for PipelineDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pipeline Definition")?;
        writeln!(f, "===================")?;
        if !self.project_type.is_empty() {
            writeln!(f, "Project type: {}", self.project_type)?;
        }
        writeln!(f, "Format:       {}", self.format_version)?;
        if !self.app.envs.is_empty() {
            writeln!(f)?;
            writeln!(f, "App envs:")?;
            for env in &self.app.envs {
                writeln!(f, "  {} = {}", env.key, env.value)?;
            }
        }
        for (id, workflow) in &self.workflows {
            writeln!(f)?;
            writeln!(f, "Workflow {}:", id)?;
            if let Some(ref description) = workflow.description {
                writeln!(f, "  {}", description)?;
            }
            for step in &workflow.steps {
                writeln!(f, "  - {}", step.composite_id())?;
            }
        }
        Ok(())
    }
}

impl PipelineDefinition {
    pub fn to_yaml(&self) -> Result<String, GenerationError> {
        serde_yaml::to_string(self).map_err(|e| GenerationError::Serialize(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, GenerationError> {
        serde_json::to_string_pretty(self).map_err(|e| GenerationError::Serialize(e.to_string()))
    }

    /// Workflow the trigger map routes every event to
    pub fn trigger_workflow(&self) -> Option<&str> {
        self.trigger_map.first().map(|item| item.workflow.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps;

    fn minimal_definition() -> PipelineDefinition {
        let mut workflows = BTreeMap::new();
        workflows.insert(
            "primary".to_string(),
            Workflow {
                description: None,
                steps: vec![steps::git_clone()],
            },
        );
        PipelineDefinition {
            format_version: "1.4.0".to_string(),
            default_step_lib_source: "https://github.com/bitrise-io/bitrise-steplib.git".to_string(),
            project_type: "android".to_string(),
            app: AppSection::default(),
            trigger_map: vec![
                TriggerMapItem::push("*", "primary"),
                TriggerMapItem::pull_request("*", "primary"),
            ],
            workflows,
        }
    }

    #[test]
    fn test_to_yaml() {
        let yaml = minimal_definition().to_yaml().unwrap();
        let expected = "\
format_version: 1.4.0
default_step_lib_source: https://github.com/bitrise-io/bitrise-steplib.git
project_type: android
trigger_map:
- push_branch: '*'
  workflow: primary
- pull_request_source_branch: '*'
  workflow: primary
workflows:
  primary:
    steps:
    - git-clone@3.4.1: {}
";
        assert_eq!(yaml, expected);
    }

    #[test]
    fn test_yaml_round_trip() {
        let mut definition = minimal_definition();
        definition.app.envs.push(EnvItem::new("CORDOVA_TARGET", "emulator"));

        let parsed: PipelineDefinition =
            serde_yaml::from_str(&definition.to_yaml().unwrap()).unwrap();
        assert_eq!(parsed, definition);
        assert_eq!(parsed.trigger_workflow(), Some("primary"));
    }

    #[test]
    fn test_display() {
        let output = minimal_definition().to_string();
        assert!(output.contains("Project type: android"));
        assert!(output.contains("Workflow primary:"));
        assert!(output.contains("- git-clone@3.4.1"));
    }
}
