//! Expo based React Native projects
//!
//! Expo projects carry no native project yet: the workflows eject them with
//! `expo-detach` and then build the predicted Xcode workspace and Gradle project.

use super::android::{
    self, GRADLEW_PATH_INPUT, MODULE_ENV_KEY, MODULE_INPUT, MODULE_TITLE, PROJECT_LOCATION_ENV_KEY,
    PROJECT_LOCATION_INPUT, PROJECT_LOCATION_TITLE, VARIANT_ENV_KEY, VARIANT_INPUT, VARIANT_TITLE,
};
use super::xcode::{
    self, CONFIGURATION_INPUT, EXPORT_METHODS, EXPORT_METHOD_ENV_KEY, EXPORT_METHOD_INPUT,
    EXPORT_METHOD_TITLE, PROJECT_PATH_ENV_KEY, PROJECT_PATH_INPUT, PROJECT_PATH_TITLE,
    SCHEME_ENV_KEY, SCHEME_INPUT, SCHEME_TITLE,
};
use super::{dir_of, find_files, invalid, parse_error, path_string, root_most, PackageJson};
use crate::error::{DetectionError, OptionError};
use crate::options::{OptionNode, ANY_VALUE};
use crate::output::{ConfigBuilder, DEPLOY_WORKFLOW, PRIMARY_WORKFLOW};
use crate::scanner::{ConfigMap, Detector, ScanContext, Warnings};
use crate::steps::{self, EnvItem, StepListItem};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const NAME: &str = "react-native";

const CONFIG_NAME: &str = "react-native-expo-config";
const PUBLISH_CONFIG_NAME: &str = "react-native-expo-config-publish";
const DEFAULT_CONFIG_NAME: &str = "default-react-native-expo-config";
const DEFAULT_PUBLISH_CONFIG_NAME: &str = "default-react-native-expo-config-publish";

const PUBLISH_TITLE: &str = "Publish Expo project?";

const WORKDIR_TITLE: &str = "Project root directory";
const WORKDIR_ENV_KEY: &str = "WORKDIR";
const WORKDIR_INPUT: &str = "workdir";

const IOS_BUNDLE_ID_ENV_KEY: &str = "EXPO_BARE_IOS_BUNDLE_ID";
const ANDROID_PACKAGE_ENV_KEY: &str = "EXPO_BARE_ANDROID_PACKAGE";
const DEVELOPMENT_TEAM_ENV_KEY: &str = "BITRISE_IOS_DEVELOPMENT_TEAM";
const DEVELOPMENT_TEAM_TITLE: &str = "iOS Development team";

const USERNAME_ENV_KEY: &str = "EXPO_USERNAME";
const USERNAME_TITLE: &str = "Expo username";
const PASSWORD_ENV_KEY: &str = "EXPO_PASSWORD";
const PASSWORD_TITLE: &str = "Expo password";

const RELEASE_VARIANT: &str = "Release";
const ANDROID_MODULE: &str = "app";

const APP_JSON: &str = "app.json";
const IDENTIFIERS_SCRIPT_TITLE: &str = "Set bundleIdentifier, packageName for Expo Eject";
const DEPLOY_DESCRIPTION: &str = "Ejects the Expo project, then builds the Android and iOS apps \
for release and deploys them to bitrise.io.";

#[derive(Debug, Default, Deserialize)]
struct AppJson {
    #[serde(default)]
    expo: ExpoSection,
}

#[derive(Debug, Default, Deserialize)]
struct ExpoSection {
    #[serde(default)]
    name: String,
    platforms: Option<Vec<String>>,
    #[serde(default)]
    ios: IosSection,
    #[serde(default)]
    android: AndroidSection,
}

#[derive(Debug, Default, Deserialize)]
struct IosSection {
    #[serde(default, rename = "bundleIdentifier")]
    bundle_identifier: String,
}

#[derive(Debug, Default, Deserialize)]
struct AndroidSection {
    #[serde(default)]
    package: String,
}

/// What the scan learned about the project
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ExpoProject {
    /// Directory of `package.json`, empty at the search root
    dir: PathBuf,
    name: String,
    ios: bool,
    android: bool,
    has_bundle_identifier: bool,
    has_package_name: bool,
    has_test: bool,
    uses_yarn: bool,
}

impl ExpoProject {
    fn has_all_identifiers(&self) -> bool {
        (!self.ios || self.has_bundle_identifier) && (!self.android || self.has_package_name)
    }

    /// Name of the Xcode project `expo eject` generates
    fn predicted_project_name(&self) -> String {
        self.name
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .map(|c| c.to_ascii_lowercase())
            .collect()
    }
}

/// Inputs that differ between a scanned project and the defaults
struct BuildSettings {
    workdir: Option<String>,
    project_dir: String,
    uses_yarn: bool,
    identifiers_script: bool,
    force_team_id: bool,
    ios: bool,
    android: bool,
}

impl BuildSettings {
    fn package_manager(&self, command: &str) -> StepListItem {
        let mut inputs: Vec<EnvItem> = self
            .workdir
            .iter()
            .map(|dir| EnvItem::new(WORKDIR_INPUT, dir))
            .collect();
        inputs.push(EnvItem::new("command", command));

        let step = if self.uses_yarn { steps::YARN } else { steps::NPM };
        steps::step(step).with_inputs(inputs)
    }

    fn identifiers_script(&self) -> StepListItem {
        let app_json = path_string(&Path::new(&self.project_dir).join(APP_JSON));
        steps::script(
            IDENTIFIERS_SCRIPT_TITLE,
            vec![EnvItem::new("content", identifiers_script(&app_json))],
        )
    }

    fn detach(&self, publish: bool) -> StepListItem {
        let mut inputs = vec![EnvItem::new("project_path", &self.project_dir)];
        if publish {
            inputs.extend([
                EnvItem::from_env("user_name", USERNAME_ENV_KEY),
                EnvItem::from_env("password", PASSWORD_ENV_KEY),
                EnvItem::new("run_publish", "yes"),
            ]);
        }
        steps::step(steps::EXPO_DETACH).with_inputs(inputs)
    }

    /// App envs the steps read but no option sets; their values come from
    /// the user's secrets
    fn app_envs(&self, publish: bool) -> Vec<EnvItem> {
        let mut envs = Vec::new();
        if publish {
            envs.push(EnvItem::new(USERNAME_ENV_KEY, ""));
            envs.push(EnvItem::new(PASSWORD_ENV_KEY, ""));
        }
        if self.ios && self.force_team_id {
            envs.push(EnvItem::new(DEVELOPMENT_TEAM_ENV_KEY, ""));
        }
        envs
    }

    /// Eject then build every enabled platform
    fn build_steps(&self, publish: bool) -> Vec<StepListItem> {
        let mut items = Vec::new();
        if self.identifiers_script {
            items.push(self.identifiers_script());
        }
        items.push(self.detach(publish));

        if self.android {
            items.push(
                steps::step(steps::INSTALL_MISSING_ANDROID_TOOLS).with_inputs([EnvItem::new(
                    GRADLEW_PATH_INPUT,
                    format!("${}/gradlew", PROJECT_LOCATION_ENV_KEY),
                )]),
            );
            items.push(steps::step(steps::ANDROID_BUILD).with_inputs([
                EnvItem::from_env(PROJECT_LOCATION_INPUT, PROJECT_LOCATION_ENV_KEY),
                EnvItem::from_env(MODULE_INPUT, MODULE_ENV_KEY),
                EnvItem::from_env(VARIANT_INPUT, VARIANT_ENV_KEY),
            ]));
        }

        if self.ios {
            let mut archive_inputs = vec![
                EnvItem::from_env(PROJECT_PATH_INPUT, PROJECT_PATH_ENV_KEY),
                EnvItem::from_env(SCHEME_INPUT, SCHEME_ENV_KEY),
                EnvItem::new(CONFIGURATION_INPUT, RELEASE_VARIANT),
                EnvItem::from_env(EXPORT_METHOD_INPUT, EXPORT_METHOD_ENV_KEY),
            ];
            if self.force_team_id {
                archive_inputs.push(EnvItem::from_env("force_team_id", DEVELOPMENT_TEAM_ENV_KEY));
            }
            items.push(steps::certificate_and_profile_installer());
            items.push(steps::step(steps::XCODE_ARCHIVE).with_inputs(archive_inputs));
        }
        items
    }

    /// Without tests the deploy flow is the only workflow
    fn deploy_only_config(&self) -> Result<String, DetectionError> {
        let mut builder = ConfigBuilder::new();
        builder
            .append_steps(PRIMARY_WORKFLOW, steps::default_prepare_steps())
            .append_step(PRIMARY_WORKFLOW, self.package_manager("install"))
            .append_steps(PRIMARY_WORKFLOW, self.build_steps(false))
            .append_steps(PRIMARY_WORKFLOW, steps::default_deploy_steps())
            .set_description(PRIMARY_WORKFLOW, DEPLOY_DESCRIPTION);
        builder
            .generate_yaml(NAME, self.app_envs(false))
            .map_err(|e| invalid(NAME, e))
    }

    fn tested_config(&self, publish: bool) -> Result<String, DetectionError> {
        let mut builder = ConfigBuilder::new();
        builder
            .append_steps(PRIMARY_WORKFLOW, steps::default_prepare_steps())
            .append_step(PRIMARY_WORKFLOW, self.package_manager("install"))
            .append_step(PRIMARY_WORKFLOW, self.package_manager("test"))
            .append_steps(PRIMARY_WORKFLOW, steps::default_deploy_steps());
        builder
            .append_steps(DEPLOY_WORKFLOW, steps::default_prepare_steps())
            .append_step(DEPLOY_WORKFLOW, self.package_manager("install"))
            .append_steps(DEPLOY_WORKFLOW, self.build_steps(publish))
            .append_steps(DEPLOY_WORKFLOW, steps::default_deploy_steps())
            .set_description(DEPLOY_WORKFLOW, DEPLOY_DESCRIPTION);
        builder
            .generate_yaml(NAME, self.app_envs(publish))
            .map_err(|e| invalid(NAME, e))
    }
}

/// Fills in the identifiers missing from `app.json` from the environment
fn identifiers_script(app_json: &str) -> String {
    format!(
        r#"#!/usr/bin/env bash
set -ex

appJson="{app_json}"
tmp="/tmp/app.json"
jq '.expo.android |= if has("package") or env.{android} == "" or env.{android} == null then . else .package = env.{android} end |
.expo.ios |= if has("bundleIdentifier") or env.{ios} == "" or env.{ios} == null then . else .bundleIdentifier = env.{ios} end' <${{appJson}} >${{tmp}}
[[ $?==0 ]] && mv -f ${{tmp}} ${{appJson}}"#,
        app_json = app_json,
        android = ANDROID_PACKAGE_ENV_KEY,
        ios = IOS_BUNDLE_ID_ENV_KEY,
    )
}

/// `PROJECT_LOCATION -> MODULE -> VARIANT`, behind a `WORKDIR` axis when
/// `workdir` is given
fn android_axes(workdir: Option<&str>, project_location: &str) -> Result<OptionNode, OptionError> {
    let mut module = OptionNode::new(MODULE_TITLE, MODULE_ENV_KEY);
    module.attach(ANDROID_MODULE, OptionNode::new(VARIANT_TITLE, VARIANT_ENV_KEY))?;

    let mut location = OptionNode::new(PROJECT_LOCATION_TITLE, PROJECT_LOCATION_ENV_KEY);
    location.attach(project_location, module)?;

    let Some(workdir) = workdir else {
        return Ok(location);
    };
    let mut root = OptionNode::new(WORKDIR_TITLE, WORKDIR_ENV_KEY);
    root.attach(workdir, location)?;
    Ok(root)
}

/// A user supplied value for `env_key` ahead of `next`
fn user_input(title: &str, env_key: &str, next: OptionNode) -> Result<OptionNode, OptionError> {
    let mut node = OptionNode::new(title, env_key);
    node.attach(ANY_VALUE, next)?;
    Ok(node)
}

/// `BITRISE_PROJECT_PATH -> BITRISE_SCHEME -> BITRISE_EXPORT_METHOD`, each
/// export method continuing with `android` when given. With `team` the
/// development team sits between the scheme and the export method.
fn ios_axes(
    project_path: &str,
    scheme: &str,
    team: bool,
    android: Option<&OptionNode>,
) -> Result<OptionNode, OptionError> {
    let mut export_method = OptionNode::new(EXPORT_METHOD_TITLE, EXPORT_METHOD_ENV_KEY);
    if let Some(android) = android {
        for method in EXPORT_METHODS {
            export_method.attach(*method, android.clone())?;
        }
    }
    if team {
        export_method = user_input(DEVELOPMENT_TEAM_TITLE, DEVELOPMENT_TEAM_ENV_KEY, export_method)?;
    }

    let mut scheme_node = OptionNode::new(SCHEME_TITLE, SCHEME_ENV_KEY);
    scheme_node.attach(scheme, export_method)?;

    let mut project = OptionNode::new(PROJECT_PATH_TITLE, PROJECT_PATH_ENV_KEY);
    project.attach(project_path, scheme_node)?;
    Ok(project)
}

/// Ends every branch of `tree` in `config_id`: on the Release variant when the
/// Android axes come last, on each export method otherwise
fn bind_leaves(tree: &mut OptionNode, config_id: &str, android_last: bool) -> Result<(), OptionError> {
    for leaf in tree.collect_leaves() {
        if android_last {
            leaf.bind_config(RELEASE_VARIANT, config_id)?;
        } else {
            for method in EXPORT_METHODS {
                leaf.bind_config(*method, config_id)?;
            }
        }
    }
    Ok(())
}

/// The publish axis: `yes` only when a test workflow exists, `no` always.
/// Publishing asks for the Expo credentials first.
fn publish_root(
    platforms: &OptionNode,
    android_last: bool,
    publish: Option<&str>,
    no_publish: &str,
) -> Result<OptionNode, OptionError> {
    let mut root = OptionNode::unbound(PUBLISH_TITLE);
    if let Some(config_id) = publish {
        let mut tree = platforms.clone();
        bind_leaves(&mut tree, config_id, android_last)?;
        let password = user_input(PASSWORD_TITLE, PASSWORD_ENV_KEY, tree)?;
        root.attach("yes", user_input(USERNAME_TITLE, USERNAME_ENV_KEY, password)?)?;
    }
    let mut tree = platforms.clone();
    bind_leaves(&mut tree, no_publish, android_last)?;
    root.attach("no", tree)?;
    Ok(root)
}

#[derive(Debug, Default)]
pub struct ExpoDetector {
    project: Option<ExpoProject>,
}

impl ExpoDetector {
    pub fn new() -> Self {
        Self::default()
    }

    fn project(&self) -> Result<&ExpoProject, DetectionError> {
        self.project
            .as_ref()
            .ok_or_else(|| invalid(NAME, "no Expo project detected"))
    }

    fn read_project(ctx: &ScanContext, package_json: &Path, package: &PackageJson) -> Result<ExpoProject, DetectionError> {
        let dir = dir_of(package_json);
        let app_json_path = dir.join(APP_JSON);
        let content = ctx.read_to_string(NAME, &app_json_path)?;
        let app_json: AppJson =
            serde_json::from_str(&content).map_err(|e| parse_error(NAME, &app_json_path, e))?;
        let expo = app_json.expo;

        let targets = |platform: &str| {
            expo.platforms
                .as_ref()
                .map_or(true, |platforms| platforms.iter().any(|p| p == platform))
        };

        Ok(ExpoProject {
            ios: targets("ios"),
            android: targets("android"),
            has_bundle_identifier: !expo.ios.bundle_identifier.is_empty(),
            has_package_name: !expo.android.package.is_empty(),
            has_test: package.has_script("test"),
            uses_yarn: ctx.is_file(&dir.join("yarn.lock")),
            name: expo.name,
            dir,
        })
    }

    fn build_settings(project: &ExpoProject) -> BuildSettings {
        let relative = path_string(&project.dir);
        BuildSettings {
            project_dir: if relative.is_empty() {
                "./".to_string()
            } else {
                relative.clone()
            },
            workdir: (!relative.is_empty()).then_some(relative),
            uses_yarn: project.uses_yarn,
            identifiers_script: !project.has_all_identifiers(),
            force_team_id: true,
            ios: project.ios,
            android: project.android,
        }
    }

    fn platform_axes(project: &ExpoProject, warnings: &mut Warnings) -> Result<OptionNode, OptionError> {
        let relative = path_string(&project.dir);
        let android = if project.android {
            Some(if relative.is_empty() {
                android_axes(None, "./android")?
            } else {
                let location = path_string(&project.dir.join("android"));
                android_axes(Some(&relative), &location)?
            })
        } else {
            None
        };

        if !project.ios {
            return android.ok_or_else(|| OptionError::EmptyValues {
                title: PUBLISH_TITLE.to_string(),
            });
        }

        let project_name = project.predicted_project_name();
        let (project_path, scheme) = if project_name.is_empty() {
            warnings.push(
                "Could not predict the iOS project name: expo/name is missing from app.json. \
                 Set BITRISE_PROJECT_PATH and BITRISE_SCHEME after ejecting."
                    .to_string(),
            );
            (ANY_VALUE.to_string(), ANY_VALUE.to_string())
        } else {
            (format!("./ios/{}.xcworkspace", project_name), project_name)
        };
        ios_axes(&project_path, &scheme, true, android.as_ref())
    }
}

impl Detector for ExpoDetector {
    fn name(&self) -> &str {
        NAME
    }

    fn detect_platform(&mut self, ctx: &ScanContext) -> Result<bool, DetectionError> {
        for package_json in root_most(find_files(ctx, NAME, "package.json")?) {
            let package = PackageJson::read(ctx, NAME, &package_json)?;
            if !package.has_dependency("expo") {
                debug!(path = %package_json.display(), "package.json does not depend on expo");
                continue;
            }
            if !ctx.is_file(&dir_of(&package_json).join(APP_JSON)) {
                debug!(path = %package_json.display(), "Expo dependency without app.json");
                continue;
            }

            let project = Self::read_project(ctx, &package_json, &package)?;
            info!(
                package_json = %package_json.display(),
                name = %project.name,
                ios = project.ios,
                android = project.android,
                "Expo project detected"
            );
            self.project = Some(project);
            return Ok(true);
        }
        Ok(false)
    }

    fn excluded_detector_names(&self) -> Vec<String> {
        vec![
            xcode::XcodePlatform::Ios.name().to_string(),
            android::NAME.to_string(),
        ]
    }

    fn options(&mut self, _ctx: &ScanContext) -> Result<(OptionNode, Warnings), DetectionError> {
        let project = self.project()?;
        if !project.ios && !project.android {
            return Err(invalid(
                NAME,
                "app.json targets neither ios nor android in expo/platforms",
            ));
        }

        let mut warnings = Warnings::new();
        let app_json = path_string(&project.dir.join(APP_JSON));
        if project.ios && !project.has_bundle_identifier {
            warn!(app_json = %app_json, "expo/ios/bundleIdentifier missing");
            warnings.push(format!(
                "app.json ({}) has no expo/ios/bundleIdentifier. Add it to the file or set \
                 {} before ejecting.",
                app_json, IOS_BUNDLE_ID_ENV_KEY
            ));
        }
        if project.android && !project.has_package_name {
            warn!(app_json = %app_json, "expo/android/package missing");
            warnings.push(format!(
                "app.json ({}) has no expo/android/package. Add it to the file or set \
                 {} before ejecting.",
                app_json, ANDROID_PACKAGE_ENV_KEY
            ));
        }

        if project.has_test {
            warnings.push(format!(
                "Publishing runs `expo publish` with {} and {}. Add them as secrets before \
                 running the publish workflow.",
                USERNAME_ENV_KEY, PASSWORD_ENV_KEY
            ));
        }
        if project.ios {
            warnings.push(format!(
                "The iOS archive is signed with the team in {}. Set it before running the \
                 deploy workflow.",
                DEVELOPMENT_TEAM_ENV_KEY
            ));
        }

        let platforms =
            Self::platform_axes(project, &mut warnings).map_err(|e| invalid(NAME, e))?;
        let publish = project.has_test.then_some(PUBLISH_CONFIG_NAME);
        let root = publish_root(&platforms, project.android, publish, CONFIG_NAME)
            .map_err(|e| invalid(NAME, e))?;
        Ok((root, warnings))
    }

    fn configs(&mut self, _ctx: &ScanContext) -> Result<ConfigMap, DetectionError> {
        let project = self.project()?;
        let settings = Self::build_settings(project);
        debug!(workdir = ?settings.workdir, yarn = settings.uses_yarn, "Expo build settings");

        let mut configs = ConfigMap::new();
        if project.has_test {
            configs.insert(CONFIG_NAME.to_string(), settings.tested_config(false)?);
            configs.insert(PUBLISH_CONFIG_NAME.to_string(), settings.tested_config(true)?);
        } else {
            configs.insert(CONFIG_NAME.to_string(), settings.deploy_only_config()?);
        }
        Ok(configs)
    }

    fn default_options(&self) -> Result<OptionNode, DetectionError> {
        let android = android_axes(Some(ANY_VALUE), "./android").map_err(|e| invalid(NAME, e))?;
        let platforms =
            ios_axes(ANY_VALUE, ANY_VALUE, false, Some(&android)).map_err(|e| invalid(NAME, e))?;
        publish_root(
            &platforms,
            true,
            Some(DEFAULT_PUBLISH_CONFIG_NAME),
            DEFAULT_CONFIG_NAME,
        )
        .map_err(|e| invalid(NAME, e))
    }

    fn default_configs(&self) -> Result<ConfigMap, DetectionError> {
        let settings = BuildSettings {
            workdir: Some(format!("${}", WORKDIR_ENV_KEY)),
            project_dir: format!("${}", WORKDIR_ENV_KEY),
            uses_yarn: false,
            identifiers_script: true,
            force_team_id: false,
            ios: true,
            android: true,
        };

        let mut configs = ConfigMap::new();
        configs.insert(DEFAULT_CONFIG_NAME.to_string(), settings.tested_config(false)?);
        configs.insert(
            DEFAULT_PUBLISH_CONFIG_NAME.to_string(),
            settings.tested_config(true)?,
        );
        Ok(configs)
    }
}
