//! Environment lookup: process variables first, `.env` file entries second.

use crate::error::{ConfigError, ConfigResult};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Variable lookup table used by expansion and prefix binding.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentMap {
    /// Snapshot of the process environment.
    process: HashMap<String, String>,
    /// Entries read from a dotenv file.
    file: HashMap<String, String>,
}

impl EnvironmentMap {
    /// Snapshot the current process environment.
    ///
    /// Variables whose name or value isn't valid UTF-8 are skipped.
    pub fn from_process() -> Self {
        let process = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        Self {
            process,
            file: HashMap::new(),
        }
    }

    /// Build a map from explicit process and file tiers.
    pub fn new(process: HashMap<String, String>, file: HashMap<String, String>) -> Self {
        Self { process, file }
    }

    /// Look a variable up, process environment first.
    pub fn lookup(&self, name: &str) -> Option<String> {
        self.process
            .get(name)
            .or_else(|| self.file.get(name))
            .cloned()
    }

    /// Look a variable up in the process tier only.
    pub fn process_var(&self, name: &str) -> Option<&str> {
        self.process.get(name).map(String::as_str)
    }

    /// Replace the dotenv tier with the contents of `path`.
    pub fn load_dotenv(&mut self, path: &Path) -> ConfigResult<()> {
        let iter = dotenvy::from_path_iter(path).map_err(|err| dotenv_error(path, err))?;

        let mut file = HashMap::new();
        for item in iter {
            let (key, value) = item.map_err(|err| dotenv_error(path, err))?;
            file.insert(key, value);
        }
        debug!(path = %path.display(), entries = file.len(), "loaded env file");

        self.file = file;
        Ok(())
    }

    /// Entries from the dotenv tier.
    pub fn file_entries(&self) -> &HashMap<String, String> {
        &self.file
    }
}

fn dotenv_error(path: &Path, err: dotenvy::Error) -> ConfigError {
    match err {
        dotenvy::Error::Io(source) => ConfigError::ConfigNotFound {
            path: path.to_path_buf(),
            source,
        },
        other => ConfigError::malformed(path, other),
    }
}
