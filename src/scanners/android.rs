//! Gradle based Android projects

use super::{dir_of, find_files, invalid, path_string, root_most};
use crate::error::DetectionError;
use crate::options::{OptionNode, ANY_VALUE};
use crate::output::{ConfigBuilder, PRIMARY_WORKFLOW};
use crate::scanner::{ConfigMap, Detector, ScanContext, Warnings};
use crate::steps::{self, EnvItem};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const NAME: &str = "android";

const CONFIG_NAME: &str = "android-config";
const DEFAULT_CONFIG_NAME: &str = "default-android-config";

const GRADLE_FILE_TITLE: &str = "Path to the gradle file to use";
const GRADLE_FILE_ENV_KEY: &str = "GRADLE_BUILD_FILE_PATH";
const GRADLE_FILE_INPUT: &str = "gradle_file";

const GRADLEW_DIR_TITLE: &str = "Directory of gradle wrapper";
const GRADLEW_DIR_ENV_KEY: &str = "GRADLEW_DIR_PATH";
const PATH_INPUT: &str = "path";

const GRADLEW_PATH_TITLE: &str = "Gradlew file path";
const GRADLEW_PATH_ENV_KEY: &str = "GRADLEW_PATH";
pub(crate) const GRADLEW_PATH_INPUT: &str = "gradlew_path";

const GRADLE_TASK_TITLE: &str = "Gradle task to run";
const GRADLE_TASK_ENV_KEY: &str = "GRADLE_TASK";
const GRADLE_TASK_INPUT: &str = "gradle_task";

const GRADLE_TASKS: &[&str] = &["assemble", "assembleDebug", "assembleRelease"];

// Inputs of the android-build step, shared with the Expo detector
pub(crate) const PROJECT_LOCATION_TITLE: &str = "The root directory of an Android project";
pub(crate) const PROJECT_LOCATION_ENV_KEY: &str = "PROJECT_LOCATION";
pub(crate) const PROJECT_LOCATION_INPUT: &str = "project_location";
pub(crate) const MODULE_TITLE: &str = "Module";
pub(crate) const MODULE_ENV_KEY: &str = "MODULE";
pub(crate) const MODULE_INPUT: &str = "module";
pub(crate) const VARIANT_TITLE: &str = "Variant";
pub(crate) const VARIANT_ENV_KEY: &str = "VARIANT";
pub(crate) const VARIANT_INPUT: &str = "variant";

const NO_GRADLEW_MESSAGE: &str = "No Gradle Wrapper (gradlew) found. \
Using a Gradle Wrapper (gradlew) is required, as the wrapper is what makes sure \
that the right Gradle version is installed and used for the build. \
More info: https://docs.gradle.org/current/userguide/gradle_wrapper.html";

#[derive(Debug, Default)]
pub struct AndroidDetector {
    gradle_files: Vec<PathBuf>,
}

impl AndroidDetector {
    pub fn new() -> Self {
        Self::default()
    }

    fn config_body() -> Result<String, DetectionError> {
        let mut builder = ConfigBuilder::new();
        builder
            .append_steps(PRIMARY_WORKFLOW, steps::default_prepare_steps())
            .append_step(
                PRIMARY_WORKFLOW,
                steps::step(steps::CHANGE_WORKDIR)
                    .with_inputs([EnvItem::from_env(PATH_INPUT, GRADLEW_DIR_ENV_KEY)]),
            )
            .append_step(
                PRIMARY_WORKFLOW,
                steps::step(steps::INSTALL_MISSING_ANDROID_TOOLS),
            )
            .append_step(
                PRIMARY_WORKFLOW,
                steps::step(steps::GRADLE_RUNNER).with_inputs([
                    EnvItem::from_env(GRADLE_FILE_INPUT, GRADLE_FILE_ENV_KEY),
                    EnvItem::from_env(GRADLE_TASK_INPUT, GRADLE_TASK_ENV_KEY),
                    EnvItem::from_env(GRADLEW_PATH_INPUT, GRADLEW_PATH_ENV_KEY),
                ]),
            )
            .append_steps(PRIMARY_WORKFLOW, steps::default_deploy_steps());

        builder
            .generate_yaml(NAME, vec![])
            .map_err(|e| invalid(NAME, e))
    }

    fn gradle_task_node(config_name: &str) -> Result<OptionNode, DetectionError> {
        let mut node = OptionNode::new(GRADLE_TASK_TITLE, GRADLE_TASK_ENV_KEY);
        for task in GRADLE_TASKS {
            node.bind_config(*task, config_name)
                .map_err(|e| invalid(NAME, e))?;
        }
        Ok(node)
    }
}

/// `$BITRISE_SOURCE_DIR` joined with the project directory
fn source_dir_value(dir: &Path) -> String {
    if dir.as_os_str().is_empty() {
        "$BITRISE_SOURCE_DIR".to_string()
    } else {
        format!("$BITRISE_SOURCE_DIR/{}", dir.display())
    }
}

impl Detector for AndroidDetector {
    fn name(&self) -> &str {
        NAME
    }

    fn detect_platform(&mut self, ctx: &ScanContext) -> Result<bool, DetectionError> {
        let mut gradle_files = find_files(ctx, NAME, "build.gradle")?;
        gradle_files.extend(find_files(ctx, NAME, "build.gradle.kts")?);
        let mut gradle_files = root_most(gradle_files);
        gradle_files.sort();

        debug!(count = gradle_files.len(), "Root build.gradle files");
        if gradle_files.is_empty() {
            return Ok(false);
        }

        info!(files = ?gradle_files, "Android project detected");
        self.gradle_files = gradle_files;
        Ok(true)
    }

    fn options(&mut self, ctx: &ScanContext) -> Result<(OptionNode, Warnings), DetectionError> {
        let gradlew_files = find_files(ctx, NAME, "gradlew")?;
        match gradlew_files.as_slice() {
            [] => return Err(invalid(NAME, NO_GRADLEW_MESSAGE)),
            [_] => {}
            [first, ..] => warn!(
                files = ?gradlew_files,
                using = %first.display(),
                "Multiple gradlew files detected"
            ),
        }

        let mut root = OptionNode::new(GRADLE_FILE_TITLE, GRADLE_FILE_ENV_KEY);
        for gradle_file in &self.gradle_files {
            let dir = dir_of(gradle_file);

            let mut gradlew_path = OptionNode::new(GRADLEW_PATH_TITLE, GRADLEW_PATH_ENV_KEY);
            gradlew_path
                .attach(path_string(&dir.join("gradlew")), Self::gradle_task_node(CONFIG_NAME)?)
                .map_err(|e| invalid(NAME, e))?;

            let mut gradlew_dir = OptionNode::new(GRADLEW_DIR_TITLE, GRADLEW_DIR_ENV_KEY);
            gradlew_dir
                .attach(source_dir_value(&dir), gradlew_path)
                .map_err(|e| invalid(NAME, e))?;

            root.attach(path_string(gradle_file), gradlew_dir)
                .map_err(|e| invalid(NAME, e))?;
        }

        Ok((root, Warnings::new()))
    }

    fn configs(&mut self, _ctx: &ScanContext) -> Result<ConfigMap, DetectionError> {
        let mut configs = ConfigMap::new();
        configs.insert(CONFIG_NAME.to_string(), Self::config_body()?);
        Ok(configs)
    }

    fn default_options(&self) -> Result<OptionNode, DetectionError> {
        let mut task = OptionNode::new(GRADLE_TASK_TITLE, GRADLE_TASK_ENV_KEY);
        task.bind_config(ANY_VALUE, DEFAULT_CONFIG_NAME)
            .map_err(|e| invalid(NAME, e))?;

        let mut gradlew_path = OptionNode::new(GRADLEW_PATH_TITLE, GRADLEW_PATH_ENV_KEY);
        gradlew_path
            .attach(ANY_VALUE, task)
            .map_err(|e| invalid(NAME, e))?;

        let mut gradlew_dir = OptionNode::new(GRADLEW_DIR_TITLE, GRADLEW_DIR_ENV_KEY);
        gradlew_dir
            .attach(ANY_VALUE, gradlew_path)
            .map_err(|e| invalid(NAME, e))?;

        let mut root = OptionNode::new(GRADLE_FILE_TITLE, GRADLE_FILE_ENV_KEY);
        root.attach(ANY_VALUE, gradlew_dir)
            .map_err(|e| invalid(NAME, e))?;
        Ok(root)
    }

    fn default_configs(&self) -> Result<ConfigMap, DetectionError> {
        let mut configs = ConfigMap::new();
        configs.insert(DEFAULT_CONFIG_NAME.to_string(), Self::config_body()?);
        Ok(configs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;
    use crate::options::{resolve, AutoChooser};
    use crate::output::render_config;

    fn android_project() -> MockFileSystem {
        let fs = MockFileSystem::new();
        fs.add_file("build.gradle", "buildscript {}");
        fs.add_file("app/build.gradle", "apply plugin: 'com.android.application'");
        fs.add_file("gradlew", "#!/bin/sh");
        fs.add_file("settings.gradle", "include ':app'");
        fs
    }

    #[test]
    fn test_detects_root_gradle_file() {
        let fs = android_project();
        let ctx = ScanContext::new(&fs, Path::new("/mock"));
        let mut detector = AndroidDetector::new();

        assert!(detector.detect_platform(&ctx).unwrap());
        assert_eq!(detector.gradle_files, vec![PathBuf::from("build.gradle")]);
    }

    #[test]
    fn test_not_detected_without_gradle_files() {
        let fs = MockFileSystem::new();
        fs.add_file("package.json", "{}");
        let ctx = ScanContext::new(&fs, Path::new("/mock"));

        assert!(!AndroidDetector::new().detect_platform(&ctx).unwrap());
    }

    #[test]
    fn test_options_resolve_to_android_config() {
        let fs = android_project();
        let ctx = ScanContext::new(&fs, Path::new("/mock"));
        let mut detector = AndroidDetector::new();
        detector.detect_platform(&ctx).unwrap();

        let (tree, warnings) = detector.options(&ctx).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(tree.depth(), 4);

        let resolution = resolve(&tree, &mut AutoChooser::new()).unwrap();
        assert_eq!(resolution.config_id, CONFIG_NAME);
        assert_eq!(
            resolution.substitutions.get(GRADLEW_DIR_ENV_KEY),
            Some("$BITRISE_SOURCE_DIR")
        );
        assert_eq!(resolution.substitutions.get(GRADLEW_PATH_ENV_KEY), Some("gradlew"));
        assert_eq!(resolution.substitutions.get(GRADLE_TASK_ENV_KEY), Some("assemble"));
    }

    #[test]
    fn test_nested_project_paths() {
        let fs = MockFileSystem::new();
        fs.add_file("android/build.gradle.kts", "");
        fs.add_file("android/gradlew", "");
        let ctx = ScanContext::new(&fs, Path::new("/mock"));
        let mut detector = AndroidDetector::new();
        assert!(detector.detect_platform(&ctx).unwrap());

        let (tree, _) = detector.options(&ctx).unwrap();
        assert_eq!(tree.values(), &["android/build.gradle.kts".to_string()]);
        let dir_node = tree.child("android/build.gradle.kts").unwrap();
        assert_eq!(dir_node.values(), &["$BITRISE_SOURCE_DIR/android".to_string()]);
    }

    #[test]
    fn test_missing_gradlew_is_an_error() {
        let fs = MockFileSystem::new();
        fs.add_file("build.gradle", "");
        let ctx = ScanContext::new(&fs, Path::new("/mock"));
        let mut detector = AndroidDetector::new();
        detector.detect_platform(&ctx).unwrap();

        let err = detector.options(&ctx).unwrap_err();
        assert_eq!(err.detector(), NAME);
        assert!(err.to_string().contains("No Gradle Wrapper"));
    }

    #[test]
    fn test_config_runs_gradle() {
        let fs = android_project();
        let ctx = ScanContext::new(&fs, Path::new("/mock"));
        let configs = AndroidDetector::new().configs(&ctx).unwrap();

        let definition = render_config(&configs[CONFIG_NAME], &Default::default()).unwrap();
        let ids: Vec<&str> = definition.workflows[PRIMARY_WORKFLOW]
            .steps
            .iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(
            ids,
            vec![
                "activate-ssh-key",
                "git-clone",
                "script",
                "change-workdir",
                "install-missing-android-tools",
                "gradle-runner",
                "deploy-to-bitrise-io",
            ]
        );
    }

    #[test]
    fn test_default_options_use_sentinels() {
        let detector = AndroidDetector::new();
        let tree = detector.default_options().unwrap();

        assert!(tree.is_sentinel_only());
        assert_eq!(tree.config_ids(), vec![DEFAULT_CONFIG_NAME.to_string()]);
        let resolution = resolve(&tree, &mut AutoChooser::new()).unwrap();
        assert_eq!(resolution.config_id, DEFAULT_CONFIG_NAME);
        assert!(resolution.substitutions.is_empty());
        assert!(detector.default_configs().unwrap().contains_key(DEFAULT_CONFIG_NAME));
    }
}
