//! Loading a single configuration document.
//!
//! Every file, root or included, goes through the same steps: parse the YAML
//! document, bind `PREFIX_KEY_PATH` process variables over matching leaf
//! keys, then expand `${VAR}` references in every value.

use super::env::EnvironmentMap;
use super::expand::expand_value;
use crate::error::{ConfigError, ConfigResult};
use crate::store::{SettingsStore, Tree, join_path};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where the root document comes from.
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// A YAML file on disk.
    File(PathBuf),
    /// An in-memory YAML document. Relative `include` and `env_file` paths
    /// resolve against `base_dir`.
    Inline { content: String, base_dir: PathBuf },
}

impl ConfigSource {
    /// Directory that relative paths inside the document are resolved against.
    pub fn base_dir(&self) -> PathBuf {
        match self {
            ConfigSource::File(path) => crate::paths::parent_dir(path),
            ConfigSource::Inline { base_dir, .. } => base_dir.clone(),
        }
    }

    /// Path used in error messages.
    pub fn origin(&self) -> &Path {
        match self {
            ConfigSource::File(path) => path,
            ConfigSource::Inline { .. } => Path::new("<inline>"),
        }
    }

    /// Read and parse the document.
    pub fn read(&self) -> ConfigResult<Tree> {
        match self {
            ConfigSource::File(path) => read_file(path),
            ConfigSource::Inline { content, .. } => parse_document(content, self.origin()),
        }
    }
}

/// Read and parse a YAML file.
pub fn read_file(path: &Path) -> ConfigResult<Tree> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ConfigNotFound {
        path: path.to_path_buf(),
        source,
    })?;
    parse_document(&content, path)
}

/// Parse a YAML document whose top level is a mapping.
///
/// An empty document is an empty tree.
pub fn parse_document(content: &str, origin: &Path) -> ConfigResult<Tree> {
    let value: Value =
        serde_yaml::from_str(content).map_err(|err| ConfigError::malformed(origin, err))?;

    match value {
        Value::Object(map) => Ok(Tree::from_map(map)),
        Value::Null => Ok(Tree::new()),
        other => Err(ConfigError::malformed(
            origin,
            format!("top level must be a mapping, found {}", value_kind(&other)),
        )),
    }
}

/// Name of the process variable that overrides `key`.
///
/// `("rr", "http.pool.num_workers")` becomes `RR_HTTP_POOL_NUM_WORKERS`.
pub fn env_key(prefix: &str, key: &str) -> String {
    format!("{}_{}", prefix, key.replace('.', "_")).to_uppercase()
}

/// Overwrite leaf keys that have a matching prefixed process variable.
pub fn bind_env<S: SettingsStore>(store: &mut S, prefix: &str, env: &EnvironmentMap) {
    bind_map(store.root_mut(), "", prefix, env);
}

fn bind_map(map: &mut Map<String, Value>, path: &str, prefix: &str, env: &EnvironmentMap) {
    for (key, value) in map.iter_mut() {
        let key_path = join_path(path, key);
        match value {
            Value::Object(inner) if !inner.is_empty() => bind_map(inner, &key_path, prefix, env),
            leaf => {
                let var = env_key(prefix, &key_path);
                if let Some(bound) = env.process_var(&var) {
                    debug!(key = %key_path, var = %var, "binding environment variable");
                    *leaf = Value::String(bound.to_string());
                }
            }
        }
    }
}

/// Expand `${VAR}` references in every value of `store`.
pub fn expand_store<S: SettingsStore>(store: &mut S, env: &EnvironmentMap) -> ConfigResult<()> {
    let lookup = |name: &str| env.lookup(name);
    expand_map(store.root_mut(), "", &lookup)
}

fn expand_map<F>(map: &mut Map<String, Value>, path: &str, lookup: &F) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    for (key, value) in map.iter_mut() {
        let key_path = join_path(path, key);
        match value {
            Value::Object(inner) => expand_map(inner, &key_path, lookup)?,
            leaf => expand_value(leaf, lookup)
                .map_err(|source| ConfigError::InvalidExpansion { key: key_path, source })?,
        }
    }
    Ok(())
}

/// Short type name of a value, for error messages.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}

/// Loads secondary files with the root's prefix and environment.
#[derive(Debug, Clone, Copy)]
pub struct Loader<'a> {
    prefix: &'a str,
    env: &'a EnvironmentMap,
}

impl<'a> Loader<'a> {
    pub fn new(prefix: &'a str, env: &'a EnvironmentMap) -> Self {
        Self { prefix, env }
    }

    /// Read, bind and expand a file.
    pub fn load(&self, path: &Path) -> ConfigResult<Tree> {
        let mut tree = read_file(path)?;
        bind_env(&mut tree, self.prefix, self.env);
        expand_store(&mut tree, self.env)?;
        debug!(path = %path.display(), keys = tree.all_keys().len(), "loaded configuration file");
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use serde_json::json;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(process: &[(&str, &str)]) -> EnvironmentMap {
        EnvironmentMap::new(
            process
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            HashMap::new(),
        )
    }

    #[test]
    fn test_env_key() {
        assert_eq!(env_key("rr", "http.pool.num_workers"), "RR_HTTP_POOL_NUM_WORKERS");
        assert_eq!(env_key("APP", "version"), "APP_VERSION");
    }

    #[test]
    fn test_parse_document() {
        let tree = parse_document("version: '2.7'\nhttp:\n  address: ':8080'\n", Path::new("t")).unwrap();
        assert_eq!(tree.get("http.address"), Some(&json!(":8080")));

        assert!(parse_document("", Path::new("t")).unwrap().is_empty());

        let err = parse_document("- a\n- b\n", Path::new("t")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::MalformedConfig);

        let err = parse_document("a: [unclosed", Path::new("t")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::MalformedConfig);
    }

    #[test]
    fn test_read_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = read_file(&temp.path().join("missing.yaml")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConfigNotFound);
    }

    #[test]
    fn test_bind_env_overrides_leaves() {
        let mut tree = parse_document(
            "http:\n  address: ':8080'\n  pool:\n    num_workers: 4\n",
            Path::new("t"),
        )
        .unwrap();
        let env = env(&[("RR_HTTP_POOL_NUM_WORKERS", "8"), ("RR_UNKNOWN_KEY", "x")]);

        bind_env(&mut tree, "rr", &env);

        assert_eq!(tree.get("http.pool.num_workers"), Some(&json!("8")));
        assert_eq!(tree.get("http.address"), Some(&json!(":8080")));
        assert!(!tree.has("unknown"));
    }

    #[test]
    fn test_expand_store() {
        let mut tree = parse_document(
            "redis:\n  addrs: ['${REDIS_HOST_1}', '${REDIS_HOST_2}']\nlogs:\n  level: ${LOGS_LEVEL:-info}\n  port: 5\n",
            Path::new("t"),
        )
        .unwrap();
        let env = env(&[("REDIS_HOST_1", "localhost:2999"), ("REDIS_HOST_2", "localhost:2998")]);

        expand_store(&mut tree, &env).unwrap();

        assert_eq!(
            tree.get("redis.addrs"),
            Some(&json!(["localhost:2999", "localhost:2998"]))
        );
        assert_eq!(tree.get("logs.level"), Some(&json!("info")));
        assert_eq!(tree.get("logs.port"), Some(&json!(5)));
    }

    #[test]
    fn test_dotted_keys_are_expanded_and_bound() {
        let mut tree = parse_document(
            "headers:\n  'X.Host': '${HOST:-fallback}'\n  'X.Port': '80'\n",
            Path::new("t"),
        )
        .unwrap();
        let env = env(&[("RR_HEADERS_X_PORT", "8080")]);

        bind_env(&mut tree, "rr", &env);
        expand_store(&mut tree, &env).unwrap();

        assert_eq!(
            tree.to_value(),
            json!({"headers": {"X.Host": "fallback", "X.Port": "8080"}})
        );
    }

    #[test]
    fn test_expand_store_reports_key() {
        let mut tree = parse_document("a:\n  b: '${X:-1:-2}'\n", Path::new("t")).unwrap();
        match expand_store(&mut tree, &env(&[])).unwrap_err() {
            ConfigError::InvalidExpansion { key, .. } => assert_eq!(key, "a.b"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
