use super::{OptionNode, ValueChooser, ANY_VALUE};
use crate::error::ResolveError;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tracing::debug;

/// Env key to chosen value, in the order the walk bound them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Substitutions(Vec<(String, String)>);

impl Substitutions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `key`, replacing an earlier value in place
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Substitutions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut substitutions = Substitutions::new();
        for (k, v) in iter {
            substitutions.insert(k, v);
        }
        substitutions
    }
}

impl Serialize for Substitutions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Outcome of walking one option tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub config_id: String,
    pub substitutions: Substitutions,
}

/// Walks `tree` from the root to a config identifier, asking `chooser`
/// wherever a node offers more than one value.
pub fn resolve(tree: &OptionNode, chooser: &mut dyn ValueChooser) -> Result<Resolution, ResolveError> {
    let mut substitutions = Substitutions::new();
    let mut node = tree;

    loop {
        if node.values().is_empty() {
            return Err(ResolveError::NoConfigSelected {
                title: node.title().to_string(),
                value: String::new(),
            });
        }

        if node.is_free_text() {
            let answer = chooser.free_text(node.title())?;
            if answer.is_empty() {
                return Err(ResolveError::NoConfigSelected {
                    title: node.title().to_string(),
                    value: answer,
                });
            }
            debug!(title = node.title(), config = %answer, "Config entered");
            return Ok(Resolution {
                config_id: answer,
                substitutions,
            });
        }

        let chosen = if node.is_sentinel_only() {
            ANY_VALUE.to_string()
        } else {
            let chosen = match node.values() {
                [only] => only.clone(),
                candidates => chooser.choose_one(node.title(), candidates)?,
            };
            if !node.env_key().is_empty() {
                substitutions.insert(node.env_key(), chosen.clone());
            }
            chosen
        };
        debug!(title = node.title(), value = %chosen, "Option selected");

        if let Some(config_id) = node.config(&chosen) {
            return Ok(Resolution {
                config_id: config_id.to_string(),
                substitutions,
            });
        }

        let only_child = match node.children().len() {
            1 => node.children().values().next(),
            _ => None,
        };
        node = match node.child(&chosen).or(only_child) {
            Some(child) => child,
            None => {
                return Err(ResolveError::NoConfigSelected {
                    title: node.title().to_string(),
                    value: chosen,
                })
            }
        };
    }
}
