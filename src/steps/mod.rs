//! Step catalogue: the pinned step versions detectors put into workflows
//!
//! A step reference serializes as a single-key map from `"<id>@<version>"` to
//! the optional title, run condition and ordered inputs:
//!
//! ```yaml
//! - cordova-archive@1.0.0:
//!     inputs:
//!     - platform: $CORDOVA_PLATFORM
//! ```

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A single `key: value` binding, used for step inputs and app envs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvItem {
    pub key: String,
    pub value: String,
}

impl EnvItem {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Binds `key` to the value of the variable `env_key`
    pub fn from_env(key: impl Into<String>, env_key: &str) -> Self {
        Self::new(key, format!("${}", env_key))
    }
}

impl Serialize for EnvItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.key, &self.value)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for EnvItem {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EnvItemVisitor;

        impl<'de> Visitor<'de> for EnvItemVisitor {
            type Value = EnvItem;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a single-key map")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<EnvItem, A::Error> {
                let (key, value) = access
                    .next_entry::<String, ScalarString>()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                if access.next_key::<String>()?.is_some() {
                    return Err(de::Error::custom("env item must have exactly one key"));
                }
                Ok(EnvItem::new(key, value.0))
            }
        }

        deserializer.deserialize_map(EnvItemVisitor)
    }
}

/// Env values may be written as bare numbers or booleans
struct ScalarString(String);

impl<'de> Deserialize<'de> for ScalarString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Scalar {
            Str(String),
            Int(i64),
            Float(f64),
            Bool(bool),
        }

        Ok(ScalarString(match Scalar::deserialize(deserializer)? {
            Scalar::Str(s) => s,
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Bool(b) => b.to_string(),
        }))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_if: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<EnvItem>,
}

/// One entry of a workflow's step list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepListItem {
    pub id: String,
    pub version: String,
    pub body: StepBody,
}

impl StepListItem {
    pub fn new(id: &str, version: &str) -> Self {
        Self {
            id: id.to_string(),
            version: version.to_string(),
            body: StepBody::default(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.body.title = Some(title.into());
        self
    }

    pub fn with_run_if(mut self, run_if: impl Into<String>) -> Self {
        self.body.run_if = Some(run_if.into());
        self
    }

    pub fn with_inputs(mut self, inputs: impl IntoIterator<Item = EnvItem>) -> Self {
        self.body.inputs.extend(inputs);
        self
    }

    /// `<id>@<version>`
    pub fn composite_id(&self) -> String {
        format!("{}@{}", self.id, self.version)
    }
}

impl Serialize for StepListItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.composite_id(), &self.body)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for StepListItem {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct StepVisitor;

        impl<'de> Visitor<'de> for StepVisitor {
            type Value = StepListItem;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a single-key map from step id to step body")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<StepListItem, A::Error> {
                let (composite, body) = access
                    .next_entry::<String, Option<StepBody>>()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                if access.next_key::<String>()?.is_some() {
                    return Err(de::Error::custom("step list item must have exactly one key"));
                }
                let (id, version) = match composite.split_once('@') {
                    Some((id, version)) => (id.to_string(), version.to_string()),
                    None => (composite, String::new()),
                };
                Ok(StepListItem {
                    id,
                    version,
                    body: body.unwrap_or_default(),
                })
            }
        }

        deserializer.deserialize_map(StepVisitor)
    }
}

pub const ACTIVATE_SSH_KEY: (&str, &str) = ("activate-ssh-key", "3.1.1");
pub const GIT_CLONE: (&str, &str) = ("git-clone", "3.4.1");
pub const SCRIPT: (&str, &str) = ("script", "1.1.3");
pub const CERTIFICATE_AND_PROFILE_INSTALLER: (&str, &str) =
    ("certificate-and-profile-installer", "1.8.1");
pub const DEPLOY_TO_BITRISE_IO: (&str, &str) = ("deploy-to-bitrise-io", "1.2.5");

pub const CHANGE_WORKDIR: (&str, &str) = ("change-workdir", "1.0.1");
pub const INSTALL_MISSING_ANDROID_TOOLS: (&str, &str) = ("install-missing-android-tools", "2.0.2");
pub const GRADLE_RUNNER: (&str, &str) = ("gradle-runner", "1.5.2");
pub const ANDROID_BUILD: (&str, &str) = ("android-build", "0.9.3");

pub const COCOAPODS_INSTALL: (&str, &str) = ("cocoapods-install", "1.5.8");
pub const CARTHAGE: (&str, &str) = ("carthage", "3.0.5");
pub const RECREATE_USER_SCHEMES: (&str, &str) = ("recreate-user-schemes", "0.9.4");
pub const XCODE_ARCHIVE: (&str, &str) = ("xcode-archive", "2.0.4");
pub const XCODE_TEST: (&str, &str) = ("xcode-test", "1.18.1");
pub const XCODE_ARCHIVE_MAC: (&str, &str) = ("xcode-archive-mac", "1.3.2");
pub const XCODE_TEST_MAC: (&str, &str) = ("xcode-test-mac", "1.0.5");

pub const NPM: (&str, &str) = ("npm", "0.9.0");
pub const YARN: (&str, &str) = ("yarn", "0.0.7");
pub const EXPO_DETACH: (&str, &str) = ("expo-detach", "0.9.3");

pub const KARMA_JASMINE_RUNNER: (&str, &str) = ("karma-jasmine-runner", "0.9.0");
pub const JASMINE_RUNNER: (&str, &str) = ("jasmine-runner", "0.9.0");
pub const GENERATE_CORDOVA_BUILD_CONFIG: (&str, &str) =
    ("generate-cordova-build-configuration", "0.9.2");
pub const CORDOVA_ARCHIVE: (&str, &str) = ("cordova-archive", "1.0.0");

pub const SCRIPT_DEFAULT_TITLE: &str = "Do anything with Script step";

pub fn step((id, version): (&str, &str)) -> StepListItem {
    StepListItem::new(id, version)
}

pub fn activate_ssh_key() -> StepListItem {
    step(ACTIVATE_SSH_KEY).with_run_if(r#"{{getenv "SSH_RSA_PRIVATE_KEY" | ne ""}}"#)
}

pub fn git_clone() -> StepListItem {
    step(GIT_CLONE)
}

pub fn script(title: &str, inputs: Vec<EnvItem>) -> StepListItem {
    step(SCRIPT).with_title(title).with_inputs(inputs)
}

pub fn certificate_and_profile_installer() -> StepListItem {
    step(CERTIFICATE_AND_PROFILE_INSTALLER)
}

pub fn deploy_to_bitrise_io() -> StepListItem {
    step(DEPLOY_TO_BITRISE_IO)
}

/// Steps every workflow starts with
pub fn default_prepare_steps() -> Vec<StepListItem> {
    vec![
        activate_ssh_key(),
        git_clone(),
        script(SCRIPT_DEFAULT_TITLE, vec![]),
    ]
}

/// Steps every workflow ends with
pub fn default_deploy_steps() -> Vec<StepListItem> {
    vec![deploy_to_bitrise_io()]
}
