//! Hierarchical key-value store holding a resolved configuration tree.
//!
//! Paths are dotted (`http.pool.num_workers`). Values are kept as
//! `serde_json::Value`, the same intermediate form YAML documents are parsed
//! into. Typed reads go through [`crate::decode`], which accepts numbers and
//! bools written as strings.

use crate::decode;
use crate::error::{ConfigError, ConfigResult};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Storage operations the resolution engine needs from a settings backend.
pub trait SettingsStore {
    /// Set `path` to `value`, creating intermediate maps as needed.
    fn set(&mut self, path: &str, value: Value);

    /// Get the value at `path`, if any.
    fn get(&self, path: &str) -> Option<&Value>;

    /// Check whether anything is stored at `path` (a leaf or a subtree).
    fn has(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// All leaf paths, sorted.
    fn all_keys(&self) -> Vec<String>;

    /// The top-level map, for passes that walk every value.
    ///
    /// Keys may themselves contain dots, so whole-tree passes walk the maps
    /// instead of round-tripping through dotted paths.
    fn root(&self) -> &Map<String, Value>;

    fn root_mut(&mut self) -> &mut Map<String, Value>;

    /// Deserialize the subtree at `path` into `T`.
    ///
    /// A missing path deserializes from an empty map, so targets with
    /// `#[serde(default)]` fields come back with their defaults.
    fn unmarshal_key<T: DeserializeOwned>(&self, path: &str) -> ConfigResult<T> {
        let value = self
            .get(path)
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));
        decode::from_value(value).map_err(|source| ConfigError::Unmarshal {
            key: path.to_string(),
            source,
        })
    }

    /// Deserialize the whole tree into `T`.
    fn unmarshal<T: DeserializeOwned>(&self) -> ConfigResult<T> {
        decode::from_value(Value::Object(self.root().clone())).map_err(|source| {
            ConfigError::Unmarshal {
                key: String::new(),
                source,
            }
        })
    }
}

/// In-memory configuration tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tree {
    root: Map<String, Value>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from an already parsed map.
    pub fn from_map(root: Map<String, Value>) -> Self {
        Self { root }
    }

    /// Remove and return the value at `path`.
    pub fn remove(&mut self, path: &str) -> Option<Value> {
        let (parents, last) = match path.rsplit_once('.') {
            Some((parents, last)) => (Some(parents), last),
            None => (None, path),
        };

        let map = match parents {
            Some(parents) => {
                let mut current = &mut self.root;
                for segment in parents.split('.') {
                    current = current.get_mut(segment)?.as_object_mut()?;
                }
                current
            }
            None => &mut self.root,
        };
        map.remove(last)
    }

    /// The whole tree as a single JSON object.
    pub fn to_value(&self) -> Value {
        Value::Object(self.root.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }
}

impl SettingsStore for Tree {
    fn set(&mut self, path: &str, value: Value) {
        let mut segments: Vec<&str> = path.split('.').collect();
        let Some(last) = segments.pop() else {
            return;
        };

        let mut current = &mut self.root;
        for segment in segments {
            let entry = current
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            // A scalar in the way of a deeper path is replaced by a map
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            let Value::Object(map) = entry else {
                return;
            };
            current = map;
        }
        current.insert(last.to_string(), value);
    }

    fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.root.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    fn all_keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        collect_leaf_keys(&self.root, "", &mut keys);
        keys.sort();
        keys
    }

    fn root(&self) -> &Map<String, Value> {
        &self.root
    }

    fn root_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.root
    }
}

/// Dotted path of `key` under `prefix`.
pub fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

/// Walk nested maps, recording every non-map value (and every empty map) as a leaf.
fn collect_leaf_keys(map: &Map<String, Value>, prefix: &str, keys: &mut Vec<String>) {
    for (key, value) in map {
        let path = join_path(prefix, key);
        match value {
            Value::Object(inner) if !inner.is_empty() => collect_leaf_keys(inner, &path, keys),
            _ => keys.push(path),
        }
    }
}
