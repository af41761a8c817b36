//! Xcode projects and workspaces, shared by the iOS and macOS detectors
//!
//! A project belongs to a platform when its `project.pbxproj` declares the
//! platform's `SDKROOT`. Projects referenced by a workspace (or by the workspace
//! CocoaPods generates next to a Podfile) are offered through that workspace;
//! the others are offered standalone.

use super::{dir_of, find_files, invalid, parse_error, path_string};
use crate::error::DetectionError;
use crate::fs::{dependency_dir_filters, filter_paths, PathFilter};
use crate::options::{OptionNode, ANY_VALUE};
use crate::output::{ConfigBuilder, DEPLOY_WORKFLOW, PRIMARY_WORKFLOW};
use crate::scanner::{ConfigMap, Detector, ScanContext, Warnings};
use crate::steps::{self, EnvItem, StepListItem};
use regex::Regex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

pub(crate) const PROJECT_PATH_TITLE: &str = "Project (or Workspace) path";
pub(crate) const PROJECT_PATH_ENV_KEY: &str = "BITRISE_PROJECT_PATH";
pub(crate) const PROJECT_PATH_INPUT: &str = "project_path";

pub(crate) const SCHEME_TITLE: &str = "Scheme name";
pub(crate) const SCHEME_ENV_KEY: &str = "BITRISE_SCHEME";
pub(crate) const SCHEME_INPUT: &str = "scheme";

pub(crate) const EXPORT_METHOD_TITLE: &str = "ipa export method";
pub(crate) const EXPORT_METHOD_ENV_KEY: &str = "BITRISE_EXPORT_METHOD";
pub(crate) const EXPORT_METHOD_INPUT: &str = "export_method";
pub(crate) const EXPORT_METHODS: &[&str] = &["app-store", "ad-hoc", "enterprise", "development"];

pub(crate) const CONFIGURATION_INPUT: &str = "configuration";

const CARTHAGE_COMMAND_INPUT: &str = "carthage_command";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XcodePlatform {
    Ios,
    MacOs,
}

impl XcodePlatform {
    pub fn name(self) -> &'static str {
        match self {
            XcodePlatform::Ios => "ios",
            XcodePlatform::MacOs => "macos",
        }
    }

    fn sdk_root(self) -> &'static str {
        match self {
            XcodePlatform::Ios => "iphoneos",
            XcodePlatform::MacOs => "macosx",
        }
    }

    fn test_step(self) -> StepListItem {
        match self {
            XcodePlatform::Ios => steps::step(steps::XCODE_TEST),
            XcodePlatform::MacOs => steps::step(steps::XCODE_TEST_MAC),
        }
    }

    fn archive_step(self) -> StepListItem {
        match self {
            XcodePlatform::Ios => steps::step(steps::XCODE_ARCHIVE),
            XcodePlatform::MacOs => steps::step(steps::XCODE_ARCHIVE_MAC),
        }
    }

    fn default_config_name(self) -> String {
        format!("default-{}-config", self.name())
    }
}

/// The project facts a generated config depends on
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConfigDescriptor {
    pub has_podfile: bool,
    /// `bootstrap` or `update` when a Cartfile is present
    pub carthage_command: Option<String>,
    pub has_test: bool,
    pub missing_shared_schemes: bool,
}

impl ConfigDescriptor {
    /// Config identifier, e.g. `ios-pod-carthage-bootstrap-test-config`
    pub fn config_name(&self, platform: XcodePlatform) -> String {
        let mut name = format!("{}-", platform.name());
        if self.has_podfile {
            name.push_str("pod-");
        }
        if let Some(command) = &self.carthage_command {
            name.push_str("carthage-");
            name.push_str(command);
            name.push('-');
        }
        if self.has_test {
            name.push_str("test-");
        }
        if self.missing_shared_schemes {
            name.push_str("missing-shared-schemes-");
        }
        name.push_str("config");
        name
    }

    fn prepare_steps(&self) -> Vec<StepListItem> {
        let mut items = steps::default_prepare_steps();
        items.push(steps::certificate_and_profile_installer());
        if self.has_podfile {
            items.push(steps::step(steps::COCOAPODS_INSTALL));
        }
        if let Some(command) = &self.carthage_command {
            items.push(
                steps::step(steps::CARTHAGE)
                    .with_inputs([EnvItem::new(CARTHAGE_COMMAND_INPUT, command)]),
            );
        }
        if self.missing_shared_schemes {
            items.push(
                steps::step(steps::RECREATE_USER_SCHEMES)
                    .with_inputs([EnvItem::from_env(PROJECT_PATH_INPUT, PROJECT_PATH_ENV_KEY)]),
            );
        }
        items
    }

    fn generate(&self, platform: XcodePlatform) -> Result<String, DetectionError> {
        let project_inputs = || {
            [
                EnvItem::from_env(PROJECT_PATH_INPUT, PROJECT_PATH_ENV_KEY),
                EnvItem::from_env(SCHEME_INPUT, SCHEME_ENV_KEY),
            ]
        };

        let mut builder = ConfigBuilder::new();
        builder.append_steps(PRIMARY_WORKFLOW, self.prepare_steps());
        if self.has_test {
            builder.append_step(PRIMARY_WORKFLOW, platform.test_step().with_inputs(project_inputs()));
        }
        builder.append_steps(PRIMARY_WORKFLOW, steps::default_deploy_steps());

        builder.append_steps(DEPLOY_WORKFLOW, self.prepare_steps());
        if self.has_test {
            builder.append_step(DEPLOY_WORKFLOW, platform.test_step().with_inputs(project_inputs()));
        }
        builder
            .append_step(DEPLOY_WORKFLOW, platform.archive_step().with_inputs(project_inputs()))
            .append_steps(DEPLOY_WORKFLOW, steps::default_deploy_steps());

        builder
            .generate_yaml(platform.name(), vec![])
            .map_err(|e| invalid(platform.name(), e))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Scheme {
    name: String,
    has_test: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct XcodeProject {
    path: PathBuf,
    shared_schemes: Vec<Scheme>,
    /// Application targets; stand in for schemes when none are shared
    targets: Vec<Scheme>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Workspace {
    path: PathBuf,
    shared_schemes: Vec<Scheme>,
    projects: Vec<XcodeProject>,
    is_pod_workspace: bool,
}

/// A path offered under `BITRISE_PROJECT_PATH`
struct Container {
    path: PathBuf,
    shared_schemes: Vec<Scheme>,
    targets: Vec<Scheme>,
    has_podfile: bool,
}

fn native_target_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)isa = PBXNativeTarget;.*?\bname = "?([^";\n]+)"?;.*?productType = "([^"]+)";"#)
            .expect("valid regex")
    })
}

fn sdk_root_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"SDKROOT = "?([a-z]+)"?;"#).expect("valid regex"))
}

/// Application targets of a `project.pbxproj`, each flagged when the project
/// has a unit or UI test target
fn application_targets(pbxproj: &str) -> Vec<Scheme> {
    let mut applications = Vec::new();
    let mut has_test_target = false;
    for captures in native_target_regex().captures_iter(pbxproj) {
        let (Some(name), Some(product_type)) = (captures.get(1), captures.get(2)) else {
            continue;
        };
        let product_type = product_type.as_str();
        if product_type.contains("unit-test") || product_type.contains("ui-testing") {
            has_test_target = true;
        } else if product_type.starts_with("com.apple.product-type.application") {
            applications.push(name.as_str().trim().to_string());
        }
    }
    applications
        .into_iter()
        .map(|name| Scheme {
            name,
            has_test: has_test_target,
        })
        .collect()
}

fn declares_sdk(pbxproj: &str, sdk: &str) -> bool {
    sdk_root_regex()
        .captures_iter(pbxproj)
        .any(|c| c.get(1).is_some_and(|m| m.as_str() == sdk))
}

/// A scheme runs tests when its test action references a testable
fn scheme_has_test(content: &str) -> Result<bool, roxmltree::Error> {
    let doc = roxmltree::Document::parse(content)?;
    Ok(doc
        .descendants()
        .any(|n| n.has_tag_name("TestableReference")))
}

/// Project paths listed in `contents.xcworkspacedata`, relative to the workspace's directory
fn workspace_file_refs(content: &str) -> Result<Vec<PathBuf>, roxmltree::Error> {
    let doc = roxmltree::Document::parse(content)?;
    Ok(doc
        .descendants()
        .filter(|n| n.has_tag_name("FileRef"))
        .filter_map(|n| n.attribute("location"))
        .map(|location| match location.split_once(':') {
            Some((_, path)) => PathBuf::from(path),
            None => PathBuf::from(location),
        })
        .filter(|path| path.extension().is_some_and(|ext| ext == "xcodeproj"))
        .collect())
}

#[derive(Debug)]
pub struct XcodeDetector {
    platform: XcodePlatform,
    project_paths: Vec<PathBuf>,
    descriptors: BTreeSet<ConfigDescriptor>,
}

impl XcodeDetector {
    pub fn new(platform: XcodePlatform) -> Self {
        Self {
            platform,
            project_paths: Vec::new(),
            descriptors: BTreeSet::new(),
        }
    }

    fn name_str(&self) -> &'static str {
        self.platform.name()
    }

    fn container_filters(extension: &'static str) -> Vec<PathFilter> {
        let mut filters = dependency_dir_filters();
        filters.push(PathFilter::AllowExtension(extension));
        filters.push(PathFilter::ForbidEmbeddedWorkspace);
        filters
    }

    fn shared_schemes(&self, ctx: &ScanContext, container: &Path) -> Result<Vec<Scheme>, DetectionError> {
        let schemes_dir = container.join("xcshareddata").join("xcschemes");
        if !ctx.fs().is_dir(&ctx.absolute(&schemes_dir)) {
            return Ok(Vec::new());
        }
        let entries = ctx
            .fs()
            .read_dir(&ctx.absolute(&schemes_dir))
            .map_err(|e| DetectionError::Io {
                detector: self.name_str().to_string(),
                path: schemes_dir.clone(),
                message: format!("{:#}", e),
            })?;

        let mut schemes = Vec::new();
        for entry in entries {
            let path = schemes_dir.join(entry.file_name());
            if path.extension().and_then(|e| e.to_str()) != Some("xcscheme") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let content = ctx.read_to_string(self.name_str(), &path)?;
            let has_test =
                scheme_has_test(&content).map_err(|e| parse_error(self.name_str(), &path, e))?;
            schemes.push(Scheme {
                name: name.to_string(),
                has_test,
            });
        }
        Ok(schemes)
    }

    fn load_project(&self, ctx: &ScanContext, path: &Path) -> Result<XcodeProject, DetectionError> {
        let pbxproj = ctx.read_to_string(self.name_str(), &path.join("project.pbxproj"))?;
        Ok(XcodeProject {
            path: path.to_path_buf(),
            shared_schemes: self.shared_schemes(ctx, path)?,
            targets: application_targets(&pbxproj),
        })
    }

    /// Splits the detected projects into standalone projects and workspaces
    fn collect_containers(&self, ctx: &ScanContext) -> Result<Vec<Container>, DetectionError> {
        let mut standalone: Vec<XcodeProject> = Vec::new();
        for path in &self.project_paths {
            standalone.push(self.load_project(ctx, path)?);
        }

        let mut workspaces: Vec<Workspace> = Vec::new();
        let workspace_paths = filter_paths(
            ctx.file_list(self.name_str())?,
            &Self::container_filters("xcworkspace"),
        );
        for path in workspace_paths {
            let data_path = path.join("contents.xcworkspacedata");
            if !ctx.is_file(&data_path) {
                continue;
            }
            let content = ctx.read_to_string(self.name_str(), &data_path)?;
            let refs =
                workspace_file_refs(&content).map_err(|e| parse_error(self.name_str(), &data_path, e))?;
            let refs: Vec<PathBuf> = refs.iter().map(|r| dir_of(&path).join(r)).collect();

            let (members, rest): (Vec<_>, Vec<_>) =
                standalone.into_iter().partition(|p| refs.contains(&p.path));
            standalone = rest;
            if members.is_empty() {
                debug!(workspace = %path.display(), "Workspace has no project of this platform");
                continue;
            }
            workspaces.push(Workspace {
                shared_schemes: self.shared_schemes(ctx, &path)?,
                path,
                projects: members,
                is_pod_workspace: false,
            });
        }

        for podfile in find_files(ctx, self.name_str(), "Podfile")? {
            let pod_dir = dir_of(&podfile);
            debug!(podfile = %podfile.display(), "Inspecting Podfile");

            for workspace in workspaces.iter_mut() {
                if workspace.projects.iter().any(|p| dir_of(&p.path) == pod_dir) {
                    workspace.is_pod_workspace = true;
                }
            }

            let (pod_projects, rest): (Vec<_>, Vec<_>) = standalone
                .into_iter()
                .partition(|p| dir_of(&p.path) == pod_dir);
            standalone = rest;
            for project in pod_projects {
                let stem = project
                    .path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                workspaces.push(Workspace {
                    path: pod_dir.join(format!("{}.xcworkspace", stem)),
                    shared_schemes: Vec::new(),
                    projects: vec![project],
                    is_pod_workspace: true,
                });
            }
        }

        let mut containers: Vec<Container> = standalone
            .into_iter()
            .map(|project| Container {
                path: project.path,
                shared_schemes: project.shared_schemes,
                targets: project.targets,
                has_podfile: false,
            })
            .collect();
        containers.extend(workspaces.into_iter().map(|workspace| {
            let mut shared_schemes = workspace.shared_schemes;
            let mut targets = Vec::new();
            for project in workspace.projects {
                shared_schemes.extend(project.shared_schemes);
                targets.extend(project.targets);
            }
            Container {
                path: workspace.path,
                shared_schemes,
                targets,
                has_podfile: workspace.is_pod_workspace,
            }
        }));
        Ok(containers)
    }

    fn carthage_command(&self, ctx: &ScanContext, container: &Path, warnings: &mut Warnings) -> Option<String> {
        let dir = dir_of(container);
        let cartfile = dir.join("Cartfile");
        if !ctx.exists(&cartfile) {
            return None;
        }
        if ctx.exists(&dir.join("Cartfile.resolved")) {
            return Some("bootstrap".to_string());
        }
        warnings.push(format!(
            "Cartfile found at ({}), but no Cartfile.resolved exists in the same directory.\n\
             It is strongly recommended to commit this file to your repository.",
            cartfile.display()
        ));
        Some("update".to_string())
    }

    fn missing_schemes_warning(container: &Path, xcshareddata_ignored: bool) -> String {
        let mut message = format!("No shared schemes found for project: {}.", container.display());
        if xcshareddata_ignored {
            message.push_str(
                "\nYour .gitignore file contains 'xcshareddata', maybe shared schemes are gitignored?",
            );
        }
        message.push_str(
            "\nAutomatically generated schemes may differ from the ones in your project.\n\
             Make sure to share your schemes for the expected behaviour.",
        );
        message
    }
}

impl Detector for XcodeDetector {
    fn name(&self) -> &str {
        self.platform.name()
    }

    fn detect_platform(&mut self, ctx: &ScanContext) -> Result<bool, DetectionError> {
        let candidates = filter_paths(
            ctx.file_list(self.name_str())?,
            &Self::container_filters("xcodeproj"),
        );
        debug!(count = candidates.len(), "Xcode project files found");

        let mut projects = Vec::new();
        for path in candidates {
            let pbxproj = path.join("project.pbxproj");
            if !ctx.is_file(&pbxproj) {
                continue;
            }
            let content = ctx.read_to_string(self.name_str(), &pbxproj)?;
            if declares_sdk(&content, self.platform.sdk_root()) {
                projects.push(path);
            }
        }

        if projects.is_empty() {
            debug!(platform = self.name_str(), "No Xcode project for platform");
            return Ok(false);
        }

        info!(platform = self.name_str(), projects = ?projects, "Xcode projects detected");
        self.project_paths = projects;
        Ok(true)
    }

    fn options(&mut self, ctx: &ScanContext) -> Result<(OptionNode, Warnings), DetectionError> {
        let mut warnings = Warnings::new();
        let containers = self.collect_containers(ctx)?;

        let gitignore = Path::new(".gitignore");
        let xcshareddata_ignored = if ctx.is_file(gitignore) {
            match ctx.read_to_string(self.name_str(), gitignore) {
                Ok(content) => content.contains("xcshareddata"),
                Err(e) => {
                    warn!(error = %e, "Failed to read .gitignore");
                    warnings.push(format!(
                        "Could not check .gitignore for ignored shared schemes: {}",
                        e
                    ));
                    false
                }
            }
        } else {
            false
        };

        let mut root = OptionNode::new(PROJECT_PATH_TITLE, PROJECT_PATH_ENV_KEY);
        let mut descriptors = BTreeSet::new();

        for container in &containers {
            let carthage_command = self.carthage_command(ctx, &container.path, &mut warnings);
            let missing_shared_schemes = container.shared_schemes.is_empty();
            if missing_shared_schemes {
                warn!(
                    project = %container.path.display(),
                    targets = container.targets.len(),
                    "No shared schemes, user schemes will be generated"
                );
                warnings.push(Self::missing_schemes_warning(&container.path, xcshareddata_ignored));
            }

            let schemes = if missing_shared_schemes {
                &container.targets
            } else {
                &container.shared_schemes
            };
            if schemes.is_empty() {
                continue;
            }

            let mut scheme_node = OptionNode::new(SCHEME_TITLE, SCHEME_ENV_KEY);
            let mut seen = BTreeSet::new();
            for scheme in schemes {
                if !seen.insert(scheme.name.as_str()) {
                    warn!(
                        project = %container.path.display(),
                        scheme = %scheme.name,
                        "Duplicate scheme name, keeping the first"
                    );
                    warnings.push(format!(
                        "Scheme {} is defined more than once in {}. Only the first one is offered.",
                        scheme.name,
                        container.path.display()
                    ));
                    continue;
                }
                let descriptor = ConfigDescriptor {
                    has_podfile: container.has_podfile,
                    carthage_command: carthage_command.clone(),
                    has_test: scheme.has_test,
                    missing_shared_schemes,
                };
                scheme_node
                    .bind_config(&scheme.name, descriptor.config_name(self.platform))
                    .map_err(|e| invalid(self.name_str(), e))?;
                descriptors.insert(descriptor);
            }
            root.attach(path_string(&container.path), scheme_node)
                .map_err(|e| invalid(self.name_str(), e))?;
        }

        if descriptors.is_empty() {
            return Err(invalid(
                self.name_str(),
                format!("No valid {} config found", self.name_str()),
            ));
        }

        self.descriptors = descriptors;
        Ok((root, warnings))
    }

    fn configs(&mut self, _ctx: &ScanContext) -> Result<ConfigMap, DetectionError> {
        let mut configs = ConfigMap::new();
        for descriptor in &self.descriptors {
            configs.insert(
                descriptor.config_name(self.platform),
                descriptor.generate(self.platform)?,
            );
        }
        Ok(configs)
    }

    fn default_options(&self) -> Result<OptionNode, DetectionError> {
        let mut scheme = OptionNode::new(SCHEME_TITLE, SCHEME_ENV_KEY);
        scheme
            .bind_config(ANY_VALUE, self.platform.default_config_name())
            .map_err(|e| invalid(self.name_str(), e))?;

        let mut root = OptionNode::new(PROJECT_PATH_TITLE, PROJECT_PATH_ENV_KEY);
        root.attach(ANY_VALUE, scheme)
            .map_err(|e| invalid(self.name_str(), e))?;
        Ok(root)
    }

    fn default_configs(&self) -> Result<ConfigMap, DetectionError> {
        let descriptor = ConfigDescriptor {
            has_podfile: true,
            carthage_command: None,
            has_test: true,
            missing_shared_schemes: true,
        };
        let mut configs = ConfigMap::new();
        configs.insert(
            self.platform.default_config_name(),
            descriptor.generate(self.platform)?,
        );
        Ok(configs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{MockFileSystem, RealFileSystem};
    use crate::options::{resolve, AutoChooser, Substitutions};
    use crate::output::render_config;

    fn pbxproj(sdk: &str) -> String {
        format!(
            r#"// !$*UTF8*$!
{{
/* Begin PBXNativeTarget section */
		13B07F861A680F5B00A75B9A /* SampleApp */ = {{
			isa = PBXNativeTarget;
			buildConfigurationList = 13B07F931A680F5B00A75B9A;
			name = SampleApp;
			productName = SampleApp;
			productType = "com.apple.product-type.application";
		}};
		00E356ED1AD99517003FC87E /* SampleAppTests */ = {{
			isa = PBXNativeTarget;
			name = SampleAppTests;
			productName = SampleAppTests;
			productType = "com.apple.product-type.bundle.unit-test";
		}};
/* End PBXNativeTarget section */
		buildSettings = {{
			SDKROOT = {};
		}};
}}"#,
            sdk
        )
    }

    const SCHEME_WITH_TESTS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Scheme LastUpgradeVersion="0940" version="1.3">
   <TestAction buildConfiguration="Debug">
      <Testables>
         <TestableReference skipped="NO">
            <BuildableReference BlueprintName="SampleAppTests"/>
         </TestableReference>
      </Testables>
   </TestAction>
</Scheme>"#;

    const SCHEME_WITHOUT_TESTS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Scheme version="1.3">
   <TestAction buildConfiguration="Debug">
      <Testables>
      </Testables>
   </TestAction>
</Scheme>"#;

    fn detect(fs: &MockFileSystem, platform: XcodePlatform) -> (XcodeDetector, bool) {
        let ctx = ScanContext::new(fs, Path::new("/mock"));
        let mut detector = XcodeDetector::new(platform);
        let detected = detector.detect_platform(&ctx).unwrap();
        (detector, detected)
    }

    fn scan(fs: &MockFileSystem, platform: XcodePlatform) -> (OptionNode, Warnings, ConfigMap) {
        let ctx = ScanContext::new(fs, Path::new("/mock"));
        let mut detector = XcodeDetector::new(platform);
        assert!(detector.detect_platform(&ctx).unwrap());
        let (tree, warnings) = detector.options(&ctx).unwrap();
        let configs = detector.configs(&ctx).unwrap();
        (tree, warnings, configs)
    }

    #[test]
    fn test_config_name_encodes_every_field() {
        let descriptor = ConfigDescriptor {
            has_podfile: true,
            carthage_command: Some("bootstrap".to_string()),
            has_test: true,
            missing_shared_schemes: true,
        };
        assert_eq!(
            descriptor.config_name(XcodePlatform::Ios),
            "ios-pod-carthage-bootstrap-test-missing-shared-schemes-config"
        );
        assert_eq!(
            ConfigDescriptor::default().config_name(XcodePlatform::MacOs),
            "macos-config"
        );

        let update = ConfigDescriptor {
            carthage_command: Some("update".to_string()),
            ..descriptor.clone()
        };
        assert_ne!(
            update.config_name(XcodePlatform::Ios),
            descriptor.config_name(XcodePlatform::Ios)
        );
    }

    #[test]
    fn test_detects_by_sdk_root() {
        let fs = MockFileSystem::new();
        fs.add_file("SampleApp.xcodeproj/project.pbxproj", &pbxproj("iphoneos"));

        assert!(detect(&fs, XcodePlatform::Ios).1);
        assert!(!detect(&fs, XcodePlatform::MacOs).1);
    }

    #[test]
    fn test_ignores_dependency_projects() {
        let fs = MockFileSystem::new();
        fs.add_file("Pods/Pods.xcodeproj/project.pbxproj", &pbxproj("iphoneos"));
        fs.add_file(
            "Carthage/Checkouts/Lib/Lib.xcodeproj/project.pbxproj",
            &pbxproj("iphoneos"),
        );

        assert!(!detect(&fs, XcodePlatform::Ios).1);
    }

    #[test]
    fn test_shared_scheme_with_tests() {
        let fs = MockFileSystem::new();
        fs.add_file("SampleApp.xcodeproj/project.pbxproj", &pbxproj("iphoneos"));
        fs.add_file(
            "SampleApp.xcodeproj/xcshareddata/xcschemes/SampleApp.xcscheme",
            SCHEME_WITH_TESTS,
        );
        fs.add_file(
            "SampleApp.xcodeproj/xcshareddata/xcschemes/SampleApp-Release.xcscheme",
            SCHEME_WITHOUT_TESTS,
        );

        let (tree, warnings, configs) = scan(&fs, XcodePlatform::Ios);

        assert!(warnings.is_empty());
        assert_eq!(tree.values(), &["SampleApp.xcodeproj".to_string()]);
        let schemes = tree.child("SampleApp.xcodeproj").unwrap();
        assert_eq!(schemes.config("SampleApp"), Some("ios-test-config"));
        assert_eq!(schemes.config("SampleApp-Release"), Some("ios-config"));
        assert_eq!(
            configs.keys().collect::<Vec<_>>(),
            vec!["ios-config", "ios-test-config"]
        );

        let definition = render_config(&configs["ios-test-config"], &Substitutions::new()).unwrap();
        let primary: Vec<&str> = definition.workflows[PRIMARY_WORKFLOW]
            .steps
            .iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(
            primary,
            vec![
                "activate-ssh-key",
                "git-clone",
                "script",
                "certificate-and-profile-installer",
                "xcode-test",
                "deploy-to-bitrise-io",
            ]
        );
        let deploy = &definition.workflows[DEPLOY_WORKFLOW].steps;
        assert_eq!(deploy[deploy.len() - 2].id, "xcode-archive");
    }

    #[test]
    fn test_missing_shared_schemes_uses_targets() {
        let fs = MockFileSystem::new();
        fs.add_file("SampleApp.xcodeproj/project.pbxproj", &pbxproj("iphoneos"));
        fs.add_file(".gitignore", "xcuserdata/\nxcshareddata/\n");

        let (tree, warnings, configs) = scan(&fs, XcodePlatform::Ios);

        let schemes = tree.child("SampleApp.xcodeproj").unwrap();
        assert_eq!(schemes.values(), &["SampleApp".to_string()]);
        assert_eq!(
            schemes.config("SampleApp"),
            Some("ios-test-missing-shared-schemes-config")
        );
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("No shared schemes found"));
        assert!(warnings[0].contains("gitignore"));

        let definition = render_config(
            &configs["ios-test-missing-shared-schemes-config"],
            &Substitutions::new(),
        )
        .unwrap();
        assert!(definition.workflows[PRIMARY_WORKFLOW]
            .steps
            .iter()
            .any(|s| s.id == "recreate-user-schemes"));
    }

    #[test]
    fn test_podfile_groups_project_into_workspace() {
        let fs = MockFileSystem::new();
        fs.add_file("ios/SampleApp.xcodeproj/project.pbxproj", &pbxproj("iphoneos"));
        fs.add_file(
            "ios/SampleApp.xcodeproj/xcshareddata/xcschemes/SampleApp.xcscheme",
            SCHEME_WITH_TESTS,
        );
        fs.add_file("ios/Podfile", "platform :ios, '9.0'");
        fs.add_file("ios/Cartfile", "github \"Alamofire/Alamofire\"");

        let (tree, warnings, configs) = scan(&fs, XcodePlatform::Ios);

        assert_eq!(tree.values(), &["ios/SampleApp.xcworkspace".to_string()]);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("Cartfile.resolved"));

        let resolution = resolve(&tree, &mut AutoChooser::new()).unwrap();
        assert_eq!(resolution.config_id, "ios-pod-carthage-update-test-config");
        assert_eq!(
            resolution.substitutions.get(PROJECT_PATH_ENV_KEY),
            Some("ios/SampleApp.xcworkspace")
        );
        assert_eq!(resolution.substitutions.get(SCHEME_ENV_KEY), Some("SampleApp"));

        let definition = render_config(&configs[&resolution.config_id], &resolution.substitutions).unwrap();
        let carthage = definition.workflows[PRIMARY_WORKFLOW]
            .steps
            .iter()
            .find(|s| s.id == "carthage")
            .unwrap();
        assert_eq!(
            carthage.body.inputs,
            vec![EnvItem::new(CARTHAGE_COMMAND_INPUT, "update")]
        );
    }

    #[test]
    fn test_existing_workspace_references_project() {
        let fs = MockFileSystem::new();
        fs.add_file("SampleApp.xcodeproj/project.pbxproj", &pbxproj("macosx"));
        fs.add_file(
            "SampleApp.xcworkspace/contents.xcworkspacedata",
            r#"<?xml version="1.0" encoding="UTF-8"?>
<Workspace version="1.0">
   <FileRef location="group:SampleApp.xcodeproj"></FileRef>
</Workspace>"#,
        );
        fs.add_file(
            "SampleApp.xcworkspace/xcshareddata/xcschemes/SampleApp.xcscheme",
            SCHEME_WITHOUT_TESTS,
        );
        fs.add_file("Cartfile", "");
        fs.add_file("Cartfile.resolved", "");

        let (tree, warnings, _) = scan(&fs, XcodePlatform::MacOs);

        assert!(warnings.is_empty());
        assert_eq!(tree.values(), &["SampleApp.xcworkspace".to_string()]);
        let schemes = tree.child("SampleApp.xcworkspace").unwrap();
        assert_eq!(
            schemes.config("SampleApp"),
            Some("macos-carthage-bootstrap-config")
        );
    }

    #[test]
    fn test_duplicate_scheme_keeps_workspace_one() {
        let fs = MockFileSystem::new();
        fs.add_file("SampleApp.xcodeproj/project.pbxproj", &pbxproj("macosx"));
        fs.add_file(
            "SampleApp.xcodeproj/xcshareddata/xcschemes/SampleApp.xcscheme",
            SCHEME_WITH_TESTS,
        );
        fs.add_file(
            "SampleApp.xcworkspace/contents.xcworkspacedata",
            r#"<?xml version="1.0" encoding="UTF-8"?>
<Workspace version="1.0">
   <FileRef location="group:SampleApp.xcodeproj"></FileRef>
</Workspace>"#,
        );
        fs.add_file(
            "SampleApp.xcworkspace/xcshareddata/xcschemes/SampleApp.xcscheme",
            SCHEME_WITHOUT_TESTS,
        );

        let (tree, warnings, configs) = scan(&fs, XcodePlatform::MacOs);

        let schemes = tree.child("SampleApp.xcworkspace").unwrap();
        assert_eq!(schemes.values(), &["SampleApp".to_string()]);
        assert_eq!(schemes.config("SampleApp"), Some("macos-config"));
        assert_eq!(configs.keys().collect::<Vec<_>>(), vec!["macos-config"]);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("more than once"));
    }

    #[test]
    fn test_unreadable_gitignore_is_reported() {
        let temp = tempfile::TempDir::new().unwrap();
        let project = temp.path().join("SampleApp.xcodeproj");
        std::fs::create_dir_all(&project).unwrap();
        std::fs::write(project.join("project.pbxproj"), pbxproj("iphoneos")).unwrap();
        std::fs::write(temp.path().join(".gitignore"), b"\xff\xfe\xfd").unwrap();

        let fs = RealFileSystem::new();
        let ctx = ScanContext::new(&fs, temp.path());
        let mut detector = XcodeDetector::new(XcodePlatform::Ios);
        assert!(detector.detect_platform(&ctx).unwrap());
        let (_, warnings) = detector.options(&ctx).unwrap();

        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains(".gitignore"));
        assert!(warnings[1].contains("No shared schemes found"));
        assert!(!warnings[1].contains("maybe shared schemes are gitignored"));
    }

    #[test]
    fn test_project_without_application_targets_fails() {
        let fs = MockFileSystem::new();
        fs.add_file("Lib.xcodeproj/project.pbxproj", "SDKROOT = iphoneos;");
        let ctx = ScanContext::new(&fs, Path::new("/mock"));
        let mut detector = XcodeDetector::new(XcodePlatform::Ios);
        assert!(detector.detect_platform(&ctx).unwrap());

        let err = detector.options(&ctx).unwrap_err();
        assert!(err.to_string().contains("No valid ios config found"));
    }

    #[test]
    fn test_default_options_and_configs() {
        let detector = XcodeDetector::new(XcodePlatform::MacOs);
        let tree = detector.default_options().unwrap();

        let resolution = resolve(&tree, &mut AutoChooser::new()).unwrap();
        assert_eq!(resolution.config_id, "default-macos-config");
        assert!(resolution.substitutions.is_empty());

        let configs = detector.default_configs().unwrap();
        let definition = render_config(&configs["default-macos-config"], &Substitutions::new()).unwrap();
        let ids: Vec<&str> = definition.workflows[DEPLOY_WORKFLOW]
            .steps
            .iter()
            .map(|s| s.id.as_str())
            .collect();
        assert!(ids.contains(&"cocoapods-install"));
        assert!(ids.contains(&"xcode-test-mac"));
        assert!(ids.contains(&"xcode-archive-mac"));
    }

    #[test]
    fn test_application_targets() {
        let targets = application_targets(&pbxproj("iphoneos"));
        assert_eq!(
            targets,
            vec![Scheme {
                name: "SampleApp".to_string(),
                has_test: true,
            }]
        );
    }
}
