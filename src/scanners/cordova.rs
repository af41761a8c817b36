//! Apache Cordova projects
//!
//! A Cordova project embeds native Xcode and Gradle projects under
//! `platforms/`, so a detected Cordova project excludes the native detectors.

use super::{android, dir_of, find_files, invalid, path_string, xcode, PackageJson};
use crate::error::DetectionError;
use crate::options::{OptionNode, ANY_VALUE};
use crate::output::{ConfigBuilder, DEPLOY_WORKFLOW, PRIMARY_WORKFLOW};
use crate::scanner::{ConfigMap, Detector, ScanContext, Warnings};
use crate::steps::{self, EnvItem, StepListItem};
use std::path::PathBuf;
use tracing::{debug, info};

pub const NAME: &str = "cordova";

const CONFIG_NAME: &str = "cordova-config";
const DEFAULT_CONFIG_NAME: &str = "default-cordova-config";

const WORK_DIR_TITLE: &str = "Directory of Cordova Config.xml";
const WORK_DIR_ENV_KEY: &str = "CORDOVA_WORK_DIR";
const WORK_DIR_INPUT: &str = "workdir";

const PLATFORM_TITLE: &str = "Platform to use in cordova-cli commands";
const PLATFORM_ENV_KEY: &str = "CORDOVA_PLATFORM";
const PLATFORM_INPUT: &str = "platform";
const PLATFORMS: &[&str] = &["ios", "android", "ios,android"];

const TARGET_ENV_KEY: &str = "CORDOVA_TARGET";
const TARGET_INPUT: &str = "target";
const TARGET_EMULATOR: &str = "emulator";

const CORDOVA_NAMESPACE: &str = "cordova.apache.org";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TestRunner {
    KarmaJasmine,
    Jasmine,
}

impl TestRunner {
    fn step(self, inputs: Vec<EnvItem>) -> StepListItem {
        let id = match self {
            TestRunner::KarmaJasmine => steps::KARMA_JASMINE_RUNNER,
            TestRunner::Jasmine => steps::JASMINE_RUNNER,
        };
        steps::step(id).with_inputs(inputs)
    }
}

/// Where config.xml sits relative to the search root
#[derive(Debug, Clone, Copy)]
enum WorkDir<'a> {
    Root,
    Relative(&'a str),
    /// Taken from `$CORDOVA_WORK_DIR` at build time
    FromEnv,
}

#[derive(Debug, Default)]
pub struct CordovaDetector {
    config_xml: PathBuf,
    test_runner: Option<TestRunner>,
}

impl CordovaDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory of config.xml relative to the search root; empty at the root
    fn work_dir(&self) -> PathBuf {
        dir_of(&self.config_xml)
    }

    fn detect_test_runner(&self, ctx: &ScanContext) -> Result<Option<TestRunner>, DetectionError> {
        let project_dir = self.work_dir();
        let package_json = project_dir.join("package.json");
        if !ctx.is_file(&package_json) {
            debug!("No package.json beside config.xml");
            return Ok(None);
        }
        let package = PackageJson::read(ctx, NAME, &package_json)?;

        if package.depends_on("karma-jasmine") && ctx.exists(&project_dir.join("karma.conf.js")) {
            return Ok(Some(TestRunner::KarmaJasmine));
        }
        if package.depends_on("jasmine")
            && ctx.exists(&project_dir.join("spec/support/jasmine.json"))
        {
            return Ok(Some(TestRunner::Jasmine));
        }
        Ok(None)
    }

    fn platform_node(config_name: &str) -> Result<OptionNode, DetectionError> {
        let mut node = OptionNode::new(PLATFORM_TITLE, PLATFORM_ENV_KEY);
        for platform in PLATFORMS {
            node.bind_config(*platform, config_name)
                .map_err(|e| invalid(NAME, e))?;
        }
        Ok(node)
    }

    fn archive_steps(work_dir_inputs: &[EnvItem]) -> Vec<StepListItem> {
        let mut archive_inputs = vec![
            EnvItem::from_env(PLATFORM_INPUT, PLATFORM_ENV_KEY),
            EnvItem::from_env(TARGET_INPUT, TARGET_ENV_KEY),
        ];
        archive_inputs.extend_from_slice(work_dir_inputs);
        vec![
            steps::step(steps::GENERATE_CORDOVA_BUILD_CONFIG),
            steps::step(steps::CORDOVA_ARCHIVE).with_inputs(archive_inputs),
        ]
    }

    fn config_body(work_dir: WorkDir, test_runner: Option<TestRunner>) -> Result<String, DetectionError> {
        let work_dir_inputs = match work_dir {
            WorkDir::Root => vec![],
            WorkDir::Relative(_) | WorkDir::FromEnv => {
                vec![EnvItem::from_env(WORK_DIR_INPUT, WORK_DIR_ENV_KEY)]
            }
        };

        let mut builder = ConfigBuilder::new();
        match test_runner {
            Some(runner) => {
                builder
                    .append_steps(PRIMARY_WORKFLOW, steps::default_prepare_steps())
                    .append_step(PRIMARY_WORKFLOW, runner.step(work_dir_inputs.clone()))
                    .append_steps(PRIMARY_WORKFLOW, steps::default_deploy_steps());
                builder
                    .append_steps(DEPLOY_WORKFLOW, steps::default_prepare_steps())
                    .append_step(DEPLOY_WORKFLOW, runner.step(work_dir_inputs.clone()))
                    .append_steps(DEPLOY_WORKFLOW, Self::archive_steps(&work_dir_inputs))
                    .append_steps(DEPLOY_WORKFLOW, steps::default_deploy_steps());
            }
            None => {
                builder
                    .append_steps(PRIMARY_WORKFLOW, steps::default_prepare_steps())
                    .append_steps(PRIMARY_WORKFLOW, Self::archive_steps(&work_dir_inputs))
                    .append_steps(PRIMARY_WORKFLOW, steps::default_deploy_steps());
            }
        }

        let mut app_envs = vec![EnvItem::new(TARGET_ENV_KEY, TARGET_EMULATOR)];
        if let WorkDir::Relative(dir) = work_dir {
            app_envs.push(EnvItem::new(WORK_DIR_ENV_KEY, dir));
        }

        builder
            .generate_yaml(NAME, app_envs)
            .map_err(|e| invalid(NAME, e))
    }
}

/// `<widget xmlns:cdv="http://cordova.apache.org/ns/1.0">`
fn is_cordova_widget(content: &str) -> Result<bool, roxmltree::Error> {
    let doc = roxmltree::Document::parse(content)?;
    let cdv = doc.root_element().lookup_namespace_uri(Some("cdv"));
    Ok(cdv.is_some_and(|uri| uri.contains(CORDOVA_NAMESPACE)))
}

impl Detector for CordovaDetector {
    fn name(&self) -> &str {
        NAME
    }

    fn detect_platform(&mut self, ctx: &ScanContext) -> Result<bool, DetectionError> {
        let Some(config_xml) = find_files(ctx, NAME, "config.xml")?.into_iter().next() else {
            debug!("No config.xml found");
            return Ok(false);
        };
        debug!(path = %config_xml.display(), "Inspecting config.xml");

        let content = ctx.read_to_string(NAME, &config_xml)?;
        match is_cordova_widget(&content) {
            Ok(true) => {}
            Ok(false) => {
                debug!("config.xml has no cordova xmlns:cdv namespace");
                return Ok(false);
            }
            Err(e) => {
                debug!(error = %e, "config.xml is not a Cordova widget");
                return Ok(false);
            }
        }

        let project_dir = dir_of(&config_xml);
        for ionic_marker in ["ionic.project", "ionic.config.json"] {
            if ctx.exists(&project_dir.join(ionic_marker)) {
                debug!(marker = ionic_marker, "Ionic project, not handled as plain Cordova");
                return Ok(false);
            }
        }

        info!(config_xml = %config_xml.display(), "Cordova project detected");
        self.config_xml = config_xml;
        Ok(true)
    }

    fn excluded_detector_names(&self) -> Vec<String> {
        vec![
            xcode::XcodePlatform::Ios.name().to_string(),
            xcode::XcodePlatform::MacOs.name().to_string(),
            android::NAME.to_string(),
        ]
    }

    fn options(&mut self, ctx: &ScanContext) -> Result<(OptionNode, Warnings), DetectionError> {
        self.test_runner = self.detect_test_runner(ctx)?;
        debug!(test_runner = ?self.test_runner, "Cordova tests");

        let platform = Self::platform_node(CONFIG_NAME)?;
        let work_dir = self.work_dir();
        if work_dir.as_os_str().is_empty() {
            return Ok((platform, Warnings::new()));
        }

        let mut root = OptionNode::new(WORK_DIR_TITLE, WORK_DIR_ENV_KEY);
        root.attach(path_string(&work_dir), platform)
            .map_err(|e| invalid(NAME, e))?;
        Ok((root, Warnings::new()))
    }

    fn configs(&mut self, _ctx: &ScanContext) -> Result<ConfigMap, DetectionError> {
        let relative = path_string(&self.work_dir());
        let work_dir = if relative.is_empty() {
            WorkDir::Root
        } else {
            WorkDir::Relative(&relative)
        };

        let mut configs = ConfigMap::new();
        configs.insert(
            CONFIG_NAME.to_string(),
            Self::config_body(work_dir, self.test_runner)?,
        );
        Ok(configs)
    }

    fn default_options(&self) -> Result<OptionNode, DetectionError> {
        let mut root = OptionNode::new(WORK_DIR_TITLE, WORK_DIR_ENV_KEY);
        root.attach(ANY_VALUE, Self::platform_node(DEFAULT_CONFIG_NAME)?)
            .map_err(|e| invalid(NAME, e))?;
        Ok(root)
    }

    fn default_configs(&self) -> Result<ConfigMap, DetectionError> {
        let mut configs = ConfigMap::new();
        configs.insert(
            DEFAULT_CONFIG_NAME.to_string(),
            Self::config_body(WorkDir::FromEnv, None)?,
        );
        Ok(configs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResolveError;
    use crate::fs::MockFileSystem;
    use crate::options::{resolve, AutoChooser, Resolution, Substitutions, ValueChooser};
    use crate::output::render_config;
    use std::path::Path;

    const WIDGET: &str = r#"<?xml version='1.0' encoding='utf-8'?>
<widget id="io.example.app" version="1.0.0" xmlns="http://www.w3.org/ns/widgets" xmlns:cdv="http://cordova.apache.org/ns/1.0">
    <name>Example</name>
</widget>"#;

    struct Pick(&'static str);

    impl ValueChooser for Pick {
        fn choose_one(&mut self, _title: &str, _candidates: &[String]) -> Result<String, ResolveError> {
            Ok(self.0.to_string())
        }

        fn free_text(&mut self, title: &str) -> Result<String, ResolveError> {
            Err(ResolveError::InputRequired {
                title: title.to_string(),
            })
        }
    }

    fn scan(fs: &MockFileSystem) -> (CordovaDetector, OptionNode, ConfigMap) {
        let ctx = ScanContext::new(fs, Path::new("/mock"));
        let mut detector = CordovaDetector::new();
        assert!(detector.detect_platform(&ctx).unwrap());
        let (tree, _) = detector.options(&ctx).unwrap();
        let configs = detector.configs(&ctx).unwrap();
        (detector, tree, configs)
    }

    fn step_ids(body: &str, workflow: &str) -> Vec<String> {
        let definition = render_config(body, &Substitutions::new()).unwrap();
        definition.workflows[workflow]
            .steps
            .iter()
            .map(|s| s.id.clone())
            .collect()
    }

    #[test]
    fn test_platform_choice_binds_cordova_platform() {
        let fs = MockFileSystem::new();
        fs.add_file("config.xml", WIDGET);
        let (_, tree, _) = scan(&fs);

        let resolution = resolve(&tree, &mut Pick("android")).unwrap();
        assert_eq!(
            resolution,
            Resolution {
                config_id: CONFIG_NAME.to_string(),
                substitutions: Substitutions::from_iter([(PLATFORM_ENV_KEY, "android")]),
            }
        );
    }

    #[test]
    fn test_not_cordova_without_namespace() {
        let fs = MockFileSystem::new();
        fs.add_file("config.xml", "<widget id=\"x\"></widget>");
        let ctx = ScanContext::new(&fs, Path::new("/mock"));

        assert!(!CordovaDetector::new().detect_platform(&ctx).unwrap());
    }

    #[test]
    fn test_invalid_config_xml_is_not_detected() {
        let fs = MockFileSystem::new();
        fs.add_file("config.xml", "<widget");
        let ctx = ScanContext::new(&fs, Path::new("/mock"));

        assert!(!CordovaDetector::new().detect_platform(&ctx).unwrap());
    }

    #[test]
    fn test_ionic_project_is_not_plain_cordova() {
        let fs = MockFileSystem::new();
        fs.add_file("config.xml", WIDGET);
        fs.add_file("ionic.config.json", "{}");
        let ctx = ScanContext::new(&fs, Path::new("/mock"));

        assert!(!CordovaDetector::new().detect_platform(&ctx).unwrap());
    }

    #[test]
    fn test_excludes_native_detectors() {
        assert_eq!(
            CordovaDetector::new().excluded_detector_names(),
            vec!["ios", "macos", "android"]
        );
    }

    #[test]
    fn test_without_tests_primary_archives() {
        let fs = MockFileSystem::new();
        fs.add_file("config.xml", WIDGET);
        fs.add_file("package.json", r#"{"dependencies": {"cordova-ios": "4.5.4"}}"#);
        let (detector, tree, configs) = scan(&fs);

        assert_eq!(detector.test_runner, None);
        assert_eq!(tree.title(), PLATFORM_TITLE);
        assert_eq!(
            step_ids(&configs[CONFIG_NAME], PRIMARY_WORKFLOW),
            vec![
                "activate-ssh-key",
                "git-clone",
                "script",
                "generate-cordova-build-configuration",
                "cordova-archive",
                "deploy-to-bitrise-io",
            ]
        );
        let definition = render_config(&configs[CONFIG_NAME], &Substitutions::new()).unwrap();
        assert_eq!(
            definition.app.envs,
            vec![EnvItem::new(TARGET_ENV_KEY, TARGET_EMULATOR)]
        );
        assert!(!definition.workflows.contains_key(DEPLOY_WORKFLOW));
    }

    #[test]
    fn test_karma_tests_split_workflows() {
        let fs = MockFileSystem::new();
        fs.add_file("config.xml", WIDGET);
        fs.add_file(
            "package.json",
            r#"{"devDependencies": {"karma-jasmine": "^1.1.0"}}"#,
        );
        fs.add_file("karma.conf.js", "module.exports = function(config) {}");
        let (detector, _, configs) = scan(&fs);

        assert_eq!(detector.test_runner, Some(TestRunner::KarmaJasmine));
        assert_eq!(
            step_ids(&configs[CONFIG_NAME], PRIMARY_WORKFLOW),
            vec![
                "activate-ssh-key",
                "git-clone",
                "script",
                "karma-jasmine-runner",
                "deploy-to-bitrise-io",
            ]
        );
        assert_eq!(
            step_ids(&configs[CONFIG_NAME], DEPLOY_WORKFLOW),
            vec![
                "activate-ssh-key",
                "git-clone",
                "script",
                "karma-jasmine-runner",
                "generate-cordova-build-configuration",
                "cordova-archive",
                "deploy-to-bitrise-io",
            ]
        );
    }

    #[test]
    fn test_jasmine_requires_config_file() {
        let fs = MockFileSystem::new();
        fs.add_file("config.xml", WIDGET);
        fs.add_file("package.json", r#"{"devDependencies": {"jasmine": "^3.0.0"}}"#);
        let (detector, _, _) = scan(&fs);
        assert_eq!(detector.test_runner, None);

        fs.add_file("spec/support/jasmine.json", "{}");
        let (detector, _, _) = scan(&fs);
        assert_eq!(detector.test_runner, Some(TestRunner::Jasmine));
    }

    #[test]
    fn test_nested_project_adds_work_dir_axis() {
        let fs = MockFileSystem::new();
        fs.add_file("www/config.xml", WIDGET);
        fs.add_file("www/package.json", "{}");
        fs.add_file("www/res/config.xml", WIDGET);
        let (_, tree, configs) = scan(&fs);

        assert_eq!(tree.env_key(), WORK_DIR_ENV_KEY);
        assert_eq!(tree.values(), &["www".to_string()]);

        let resolution = resolve(&tree, &mut AutoChooser::new()).unwrap();
        assert_eq!(resolution.substitutions.get(WORK_DIR_ENV_KEY), Some("www"));
        assert_eq!(resolution.substitutions.get(PLATFORM_ENV_KEY), Some("ios"));

        let definition =
            render_config(&configs[&resolution.config_id], &resolution.substitutions).unwrap();
        assert!(definition.app.envs.contains(&EnvItem::new(WORK_DIR_ENV_KEY, "www")));
        let archive = definition.workflows[PRIMARY_WORKFLOW]
            .steps
            .iter()
            .find(|s| s.id == "cordova-archive")
            .unwrap();
        assert!(archive
            .body
            .inputs
            .contains(&EnvItem::from_env(WORK_DIR_INPUT, WORK_DIR_ENV_KEY)));
    }

    #[test]
    fn test_default_options() {
        let detector = CordovaDetector::new();
        let tree = detector.default_options().unwrap();

        assert!(tree.is_sentinel_only());
        assert_eq!(tree.config_ids(), vec![DEFAULT_CONFIG_NAME.to_string()]);
        let configs = detector.default_configs().unwrap();
        let definition = render_config(&configs[DEFAULT_CONFIG_NAME], &Substitutions::new()).unwrap();
        assert_eq!(
            definition.app.envs,
            vec![EnvItem::new(TARGET_ENV_KEY, TARGET_EMULATOR)]
        );
    }
}
