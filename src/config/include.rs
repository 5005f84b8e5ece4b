//! Merging secondary files listed under the root's `include` key.

use super::loader::{Loader, value_kind};
use super::{INCLUDE_KEY, VERSION_KEY};
use crate::error::{ConfigError, ConfigResult};
use crate::store::{SettingsStore, Tree};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{debug, warn};

/// Read the include list from `root`.
///
/// A single string is a one-element list; absent or null means no includes.
pub fn include_paths<S: SettingsStore>(root: &S, origin: &Path) -> ConfigResult<Vec<String>> {
    match root.get(INCLUDE_KEY) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(path)) if path.trim().is_empty() => Ok(Vec::new()),
        Some(Value::String(path)) => Ok(vec![path.clone()]),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(path) => Ok(path.clone()),
                other => Err(ConfigError::malformed(
                    origin,
                    format!("include entries must be strings, found {}", value_kind(other)),
                )),
            })
            .collect(),
        Some(other) => Err(ConfigError::malformed(
            origin,
            format!("include must be a list of paths, found {}", value_kind(other)),
        )),
    }
}

/// Load every included file and merge it into `root`.
///
/// Each file must declare exactly `root_version`. Later files overwrite
/// earlier values at the same path. `include` keys inside included files are
/// not followed.
pub fn resolve_includes<S: SettingsStore>(
    root: &mut S,
    root_version: &str,
    root_dir: &Path,
    origin: &Path,
    loader: &Loader<'_>,
) -> ConfigResult<()> {
    let paths = include_paths(root, origin)?;
    if paths.is_empty() {
        return Ok(());
    }

    for file in &paths {
        let path = crate::paths::resolve_relative(root_dir, file);
        let mut included = loader.load(&path)?;

        check_version(&included, root_version, &path)?;

        if included.remove(INCLUDE_KEY).is_some() {
            warn!(path = %path.display(), "nested include ignored, only the root file may include others");
        }

        merge_into(root, &included);
        debug!(path = %path.display(), "merged included configuration");
    }

    Ok(())
}

/// Write every leaf of `overlay` into `root`, overwriting what's there.
pub fn merge_into<S: SettingsStore>(root: &mut S, overlay: &Tree) {
    overlay_map(root.root_mut(), overlay.root());
}

/// Nested maps merge key by key; anything else replaces the target value.
fn overlay_map(target: &mut Map<String, Value>, source: &Map<String, Value>) {
    for (key, value) in source {
        if let (Some(Value::Object(existing)), Value::Object(inner)) = (target.get_mut(key), value) {
            overlay_map(existing, inner);
            continue;
        }
        target.insert(key.clone(), value.clone());
    }
}

fn check_version(included: &Tree, root_version: &str, path: &Path) -> ConfigResult<()> {
    let found = match included.get(VERSION_KEY) {
        None | Some(Value::Null) => {
            return Err(ConfigError::MissingVersion {
                path: path.to_path_buf(),
            });
        }
        Some(Value::String(version)) => version,
        Some(other) => return Err(ConfigError::invalid_version(value_kind(other))),
    };

    if found != root_version {
        return Err(ConfigError::IncludeVersionMismatch {
            path: path.to_path_buf(),
            expected: root_version.to_string(),
            found: found.clone(),
        });
    }
    Ok(())
}
