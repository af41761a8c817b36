use super::schema::{AppSection, PipelineDefinition, TriggerMapItem, Workflow};
use crate::error::GenerationError;
use crate::steps::{EnvItem, StepListItem};
use std::collections::BTreeMap;

pub const PRIMARY_WORKFLOW: &str = "primary";
pub const DEPLOY_WORKFLOW: &str = "deploy";

pub const FORMAT_VERSION: &str = "1.4.0";
pub const DEFAULT_STEP_LIB_SOURCE: &str = "https://github.com/bitrise-io/bitrise-steplib.git";

#[derive(Debug, Clone, Default)]
struct WorkflowBuilder {
    description: Option<String>,
    steps: Vec<StepListItem>,
}

/// Collects workflows step by step and emits the pipeline definition
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    workflows: BTreeMap<String, WorkflowBuilder>,
    trigger_workflow: String,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    /// Builder whose trigger map points at the `primary` workflow
    pub fn new() -> Self {
        Self::with_trigger_workflow(PRIMARY_WORKFLOW)
    }

    pub fn with_trigger_workflow(workflow: &str) -> Self {
        Self {
            workflows: BTreeMap::new(),
            trigger_workflow: workflow.to_string(),
        }
    }

    pub fn trigger_workflow(&self) -> &str {
        &self.trigger_workflow
    }

    /// Appends `items` to `workflow`, creating the workflow if needed
    pub fn append_steps(
        &mut self,
        workflow: &str,
        items: impl IntoIterator<Item = StepListItem>,
    ) -> &mut Self {
        self.workflows
            .entry(workflow.to_string())
            .or_default()
            .steps
            .extend(items);
        self
    }

    pub fn append_step(&mut self, workflow: &str, item: StepListItem) -> &mut Self {
        self.append_steps(workflow, [item])
    }

    pub fn set_description(&mut self, workflow: &str, description: impl Into<String>) -> &mut Self {
        self.workflows
            .entry(workflow.to_string())
            .or_default()
            .description = Some(description.into());
        self
    }

    pub fn generate(
        &self,
        project_type: &str,
        app_envs: Vec<EnvItem>,
    ) -> Result<PipelineDefinition, GenerationError> {
        match self.workflows.get(&self.trigger_workflow) {
            Some(workflow) if !workflow.steps.is_empty() => {}
            _ => {
                return Err(GenerationError::TriggerWorkflowNotDefined {
                    workflow: self.trigger_workflow.clone(),
                })
            }
        }

        let workflows = self
            .workflows
            .iter()
            .map(|(id, builder)| {
                (
                    id.clone(),
                    Workflow {
                        description: builder.description.clone(),
                        steps: builder.steps.clone(),
                    },
                )
            })
            .collect();

        Ok(PipelineDefinition {
            format_version: FORMAT_VERSION.to_string(),
            default_step_lib_source: DEFAULT_STEP_LIB_SOURCE.to_string(),
            project_type: project_type.to_string(),
            app: AppSection { envs: app_envs },
            trigger_map: vec![
                TriggerMapItem::push("*", &self.trigger_workflow),
                TriggerMapItem::pull_request("*", &self.trigger_workflow),
            ],
            workflows,
        })
    }

    /// Generates and serializes to YAML, the form config bodies are stored in
    pub fn generate_yaml(
        &self,
        project_type: &str,
        app_envs: Vec<EnvItem>,
    ) -> Result<String, GenerationError> {
        self.generate(project_type, app_envs)?.to_yaml()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps;
    use yare::parameterized;

    #[test]
    fn test_generate_primary_and_deploy() {
        let mut builder = ConfigBuilder::new();
        builder
            .append_steps(PRIMARY_WORKFLOW, steps::default_prepare_steps())
            .append_steps(PRIMARY_WORKFLOW, steps::default_deploy_steps());
        builder
            .append_steps(DEPLOY_WORKFLOW, steps::default_prepare_steps())
            .append_step(DEPLOY_WORKFLOW, steps::step(steps::CORDOVA_ARCHIVE))
            .set_description(DEPLOY_WORKFLOW, "Builds and deploys the app");

        let definition = builder
            .generate("cordova", vec![EnvItem::new("CORDOVA_TARGET", "emulator")])
            .unwrap();

        assert_eq!(definition.format_version, FORMAT_VERSION);
        assert_eq!(definition.default_step_lib_source, DEFAULT_STEP_LIB_SOURCE);
        assert_eq!(definition.project_type, "cordova");
        assert_eq!(
            definition.trigger_map,
            vec![
                TriggerMapItem::push("*", PRIMARY_WORKFLOW),
                TriggerMapItem::pull_request("*", PRIMARY_WORKFLOW),
            ]
        );
        assert_eq!(definition.workflows[PRIMARY_WORKFLOW].steps.len(), 4);
        let deploy = &definition.workflows[DEPLOY_WORKFLOW];
        assert_eq!(deploy.steps.len(), 4);
        assert_eq!(deploy.steps[3].id, "cordova-archive");
        assert_eq!(
            deploy.description.as_deref(),
            Some("Builds and deploys the app")
        );
        assert_eq!(
            definition.app.envs,
            vec![EnvItem::new("CORDOVA_TARGET", "emulator")]
        );
    }

    #[parameterized(
        primary = { PRIMARY_WORKFLOW },
        deploy = { DEPLOY_WORKFLOW },
        custom = { "ci" },
    )]
    fn test_generate_fails_without_trigger_steps(trigger: &str) {
        let mut builder = ConfigBuilder::with_trigger_workflow(trigger);
        builder.set_description(trigger, "no steps yet");
        builder.append_steps(trigger, Vec::<StepListItem>::new());
        builder.append_step("other", steps::git_clone());

        let err = builder.generate("android", vec![]).unwrap_err();
        assert_eq!(
            err,
            GenerationError::TriggerWorkflowNotDefined {
                workflow: trigger.to_string()
            }
        );
    }

    #[test]
    fn test_generate_fails_for_missing_trigger_workflow() {
        let mut builder = ConfigBuilder::new();
        builder.append_step(DEPLOY_WORKFLOW, steps::git_clone());

        assert!(builder.generate("ios", vec![]).is_err());
    }

    #[test]
    fn test_custom_trigger_workflow() {
        let mut builder = ConfigBuilder::with_trigger_workflow("ci");
        builder.append_step("ci", steps::git_clone());

        let definition = builder.generate("android", vec![]).unwrap();
        assert_eq!(definition.trigger_workflow(), Some("ci"));
        assert!(definition.trigger_map.iter().all(|t| t.workflow == "ci"));
    }
}
