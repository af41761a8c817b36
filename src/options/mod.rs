//! Option trees: one decision axis per node, leading to a config identifier
//!
//! Detectors describe every valid parameter combination of a platform as an
//! [`OptionNode`] tree. Each value of a node either continues the decision in a
//! child node or ends it with a config identifier. [`resolve`] walks a tree with
//! a [`ValueChooser`] down to one config plus the values picked on the way.

mod chooser;
mod resolver;

pub use chooser::{AutoChooser, InteractiveChooser, ValueChooser};
pub use resolver::{resolve, Resolution, Substitutions};

use crate::error::OptionError;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Value meaning "nothing to enumerate here"
pub const ANY_VALUE: &str = "_";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OptionNode {
    title: String,
    env_key: String,
    values: Vec<String>,
    children: BTreeMap<String, OptionNode>,
    configs: BTreeMap<String, String>,
}

impl OptionNode {
    /// A decision axis whose chosen value is bound to `env_key`
    pub fn new(title: impl Into<String>, env_key: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            env_key: env_key.into(),
            ..Default::default()
        }
    }

    /// A decision axis that selects between branches without binding a variable
    pub fn unbound(title: impl Into<String>) -> Self {
        Self::new(title, "")
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn env_key(&self) -> &str {
        &self.env_key
    }

    /// Candidate values in insertion order
    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn children(&self) -> &BTreeMap<String, OptionNode> {
        &self.children
    }

    pub fn configs(&self) -> &BTreeMap<String, String> {
        &self.configs
    }

    pub fn child(&self, value: &str) -> Option<&OptionNode> {
        self.children.get(value)
    }

    pub fn child_mut(&mut self, value: &str) -> Option<&mut OptionNode> {
        self.children.get_mut(value)
    }

    pub fn config(&self, value: &str) -> Option<&str> {
        self.configs.get(value).map(String::as_str)
    }

    /// Only value is the sentinel and nothing is bound: the answer is typed in
    pub fn is_free_text(&self) -> bool {
        self.env_key.is_empty() && self.is_sentinel_only()
    }

    pub fn is_sentinel_only(&self) -> bool {
        self.values.len() == 1 && self.values[0] == ANY_VALUE
    }

    /// Continues the decision under `value` with `child`.
    ///
    /// Re-attaching an already attached value replaces the previous child.
    pub fn attach(&mut self, value: impl Into<String>, child: OptionNode) -> Result<(), OptionError> {
        let value = value.into();
        if self.configs.contains_key(&value) {
            return Err(OptionError::ValueBoundToConfig {
                title: self.title.clone(),
                value,
            });
        }
        if !self.children.contains_key(&value) {
            self.values.push(value.clone());
        }
        self.children.insert(value, child);
        Ok(())
    }

    /// Ends the decision under `value` with the config identifier `config_id`
    pub fn bind_config(
        &mut self,
        value: impl Into<String>,
        config_id: impl Into<String>,
    ) -> Result<(), OptionError> {
        let value = value.into();
        if self.children.contains_key(&value) {
            return Err(OptionError::ValueBoundToChild {
                title: self.title.clone(),
                value,
            });
        }
        if !self.configs.contains_key(&value) {
            self.values.push(value.clone());
        }
        self.configs.insert(value, config_id.into());
        Ok(())
    }

    /// Every node of the subtree, this one included, without children
    pub fn collect_leaves(&mut self) -> Vec<&mut OptionNode> {
        if self.children.is_empty() {
            return vec![self];
        }
        self.children
            .values_mut()
            .flat_map(|child| child.collect_leaves())
            .collect()
    }

    /// Number of nodes on the longest root-to-leaf path
    pub fn depth(&self) -> usize {
        1 + self.children.values().map(OptionNode::depth).max().unwrap_or(0)
    }

    /// Distinct config identifiers reachable from this node, sorted
    pub fn config_ids(&self) -> Vec<String> {
        let mut ids = Vec::new();
        self.visit_configs(&mut ids);
        ids.sort();
        ids.dedup();
        ids
    }

    fn visit_configs(&self, ids: &mut Vec<String>) {
        ids.extend(self.configs.values().cloned());
        for child in self.children.values() {
            child.visit_configs(ids);
        }
    }

    /// Checks the tree shape: every node has values and every value is bound
    pub fn validate(&self) -> Result<(), OptionError> {
        if self.values.is_empty() {
            return Err(OptionError::EmptyValues {
                title: self.title.clone(),
            });
        }
        for value in &self.values {
            if !self.children.contains_key(value) && !self.configs.contains_key(value) {
                return Err(OptionError::UnboundValue {
                    title: self.title.clone(),
                    value: value.clone(),
                });
            }
        }
        self.children.values().try_for_each(OptionNode::validate)
    }
}

// Serialized shape:
//
//   title: Platform to use in cordova-cli commands
//   env_key: CORDOVA_PLATFORM
//   value_map:
//     ios:
//       config: cordova-config
//     android:
//       title: ...

impl Serialize for OptionNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.env_key.is_empty() { 2 } else { 3 };
        let mut state = serializer.serialize_struct("OptionNode", len)?;
        state.serialize_field("title", &self.title)?;
        if !self.env_key.is_empty() {
            state.serialize_field("env_key", &self.env_key)?;
        }
        state.serialize_field("value_map", &ValueMap(self))?;
        state.end()
    }
}

struct ValueMap<'a>(&'a OptionNode);

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigRef {
    config: String,
}

impl Serialize for ValueMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let node = self.0;
        let mut map = serializer.serialize_map(Some(node.values.len()))?;
        for value in &node.values {
            if let Some(config) = node.configs.get(value) {
                map.serialize_entry(
                    value,
                    &ConfigRef {
                        config: config.clone(),
                    },
                )?;
            } else if let Some(child) = node.children.get(value) {
                map.serialize_entry(value, child)?;
            }
        }
        map.end()
    }
}

#[derive(Deserialize)]
struct RawNode {
    title: String,
    #[serde(default)]
    env_key: String,
    value_map: OrderedEntries,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawValue {
    Config(ConfigRef),
    Node(Box<RawNode>),
}

/// Map entries in document order
struct OrderedEntries(Vec<(String, RawValue)>);

impl<'de> Deserialize<'de> for OrderedEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = OrderedEntries;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of option values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::new();
                while let Some((key, value)) = access.next_entry::<String, RawValue>()? {
                    entries.push((key, value));
                }
                Ok(OrderedEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

impl TryFrom<RawNode> for OptionNode {
    type Error = OptionError;

    fn try_from(raw: RawNode) -> Result<Self, Self::Error> {
        let mut node = OptionNode::new(raw.title, raw.env_key);
        for (value, entry) in raw.value_map.0 {
            match entry {
                RawValue::Config(config_ref) => node.bind_config(value, config_ref.config)?,
                RawValue::Node(child) => node.attach(value, OptionNode::try_from(*child)?)?,
            }
        }
        node.validate()?;
        Ok(node)
    }
}

impl<'de> Deserialize<'de> for OptionNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawNode::deserialize(deserializer)?;
        OptionNode::try_from(raw).map_err(de::Error::custom)
    }
}
