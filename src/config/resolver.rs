//! The resolution engine.
//!
//! Resolution runs once, synchronously, in this order:
//! 1. read the root document and bind `PREFIX_*` process variables
//! 2. read `env_file` (if set) into the fallback tier of the environment
//! 3. expand `${VAR}` references in every value
//! 4. apply `key=value` override flags (each value expanded as well)
//! 5. negotiate the declared `version` against the host version
//! 6. run the schema transition if the config is an older minor
//! 7. merge included files (when enabled)
//!
//! Any failure aborts the pass; there is no partially resolved [`Resolver`].

use super::env::EnvironmentMap;
use super::expand::expand;
use super::flags::parse_flag;
use super::include::resolve_includes;
use super::loader::{ConfigSource, Loader, bind_env, expand_store, value_kind};
use super::transition::TransitionRegistry;
use super::version::{
    Decision, MINIMUM_CONFIG_VERSION, MissingVersionPolicy, Version, host_version_or_default,
    negotiate, parse_config_version, parse_host_version,
};
use super::{ENV_FILE_KEY, VERSION_KEY};
use crate::error::{ConfigError, ConfigResult};
use crate::store::{SettingsStore, Tree};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Read access to a resolved configuration, plus programmatic overwrite.
pub trait Configurer {
    /// Raw value at a dotted path.
    fn get(&self, name: &str) -> Option<&Value>;

    /// Whether anything is set at a dotted path.
    fn has(&self, name: &str) -> bool;

    /// Deserialize the section at `name`.
    fn unmarshal_key<T: DeserializeOwned>(&self, name: &str) -> ConfigResult<T>;

    /// Deserialize the whole configuration.
    fn unmarshal<T: DeserializeOwned>(&self) -> ConfigResult<T>;

    /// Overwrite values after resolution (test harnesses, late injection).
    fn overwrite<I, K>(&mut self, values: I)
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>;

    /// Version of the host the configuration was resolved for.
    fn host_version(&self) -> &str;
}

/// Options for a resolution pass.
#[derive(Debug)]
pub struct ResolverBuilder {
    source: Option<ConfigSource>,
    prefix: String,
    flags: Vec<String>,
    host_version: String,
    includes: bool,
    missing_version: MissingVersionPolicy,
    env: Option<EnvironmentMap>,
    transitions: TransitionRegistry,
}

impl Default for ResolverBuilder {
    fn default() -> Self {
        Self {
            source: None,
            prefix: String::new(),
            flags: Vec::new(),
            host_version: String::new(),
            includes: true,
            missing_version: MissingVersionPolicy::default(),
            env: None,
            transitions: TransitionRegistry::default(),
        }
    }
}

impl ResolverBuilder {
    /// Root configuration file.
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(ConfigSource::File(path.into()));
        self
    }

    /// Root configuration given as a YAML string.
    pub fn inline(mut self, content: impl Into<String>, base_dir: impl Into<PathBuf>) -> Self {
        self.source = Some(ConfigSource::Inline {
            content: content.into(),
            base_dir: base_dir.into(),
        });
        self
    }

    /// Prefix for environment variables bound over file keys.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Add one `key=value` override.
    pub fn flag(mut self, flag: impl Into<String>) -> Self {
        self.flags.push(flag.into());
        self
    }

    /// Add `key=value` overrides, applied in order.
    pub fn flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.flags.extend(flags.into_iter().map(Into::into));
        self
    }

    /// Version of the running host. Blank or `local` means the default.
    pub fn host_version(mut self, version: impl Into<String>) -> Self {
        self.host_version = version.into();
        self
    }

    /// Enable or disable `include` processing (enabled by default).
    pub fn includes(mut self, enabled: bool) -> Self {
        self.includes = enabled;
        self
    }

    pub fn missing_version(mut self, policy: MissingVersionPolicy) -> Self {
        self.missing_version = policy;
        self
    }

    /// Use `env` instead of a snapshot of the process environment.
    pub fn env(mut self, env: EnvironmentMap) -> Self {
        self.env = Some(env);
        self
    }

    pub fn transitions(mut self, transitions: TransitionRegistry) -> Self {
        self.transitions = transitions;
        self
    }

    /// Run the resolution pass.
    pub fn resolve(self) -> ConfigResult<Resolver> {
        if self.prefix.is_empty() {
            return Err(ConfigError::InvalidOptions("prefix should be set".into()));
        }
        let Some(source) = self.source else {
            return Err(ConfigError::InvalidOptions("path should be set".into()));
        };
        let origin = source.origin().to_path_buf();
        let base_dir = source.base_dir();
        let mut env = self.env.unwrap_or_else(EnvironmentMap::from_process);

        let mut tree = source.read()?;
        bind_env(&mut tree, &self.prefix, &env);
        debug!(source = %origin.display(), keys = tree.all_keys().len(), "read root configuration");

        load_env_file(&tree, &base_dir, &origin, &mut env)?;
        expand_store(&mut tree, &env)?;

        for raw in &self.flags {
            let (key, value) = parse_flag(raw, &env)?;
            debug!(key = %key, "applying override flag");
            tree.set(&key, Value::String(value));
        }

        let (raw_version, defaulted) = declared_version(&tree, self.missing_version, &origin)?;
        let config_version = parse_config_version(&raw_version)?;
        let host = parse_host_version(&self.host_version)?;
        let decision = negotiate(&config_version, &host)?;

        let mut deprecation = None;
        if defaulted {
            deprecation = Some(format!(
                "configuration has no version, assuming {}; add e.g. `version: \"{}.{}\"`",
                MINIMUM_CONFIG_VERSION,
                host.major(),
                host.minor()
            ));
        }
        if let Decision::Transition {
            from_minor,
            to_minor,
        } = decision
        {
            self.transitions.apply(from_minor, to_minor, &mut tree)?;
            if deprecation.is_none() {
                deprecation = Some(format!(
                    "configuration version {} is older than host version {}, update the configuration to the {}.{} schema",
                    config_version,
                    host,
                    host.major(),
                    host.minor()
                ));
            }
        }
        if let Some(notice) = &deprecation {
            warn!("{}", notice);
        }

        if self.includes {
            let loader = Loader::new(&self.prefix, &env);
            resolve_includes(&mut tree, &raw_version, &base_dir, &origin, &loader)?;
        }

        info!(
            source = %origin.display(),
            version = %config_version,
            host = %host,
            "configuration resolved"
        );

        Ok(Resolver {
            tree,
            host_version: host_version_or_default(&self.host_version).to_string(),
            config_version,
            decision,
            deprecation,
            source,
        })
    }
}

/// A resolved configuration snapshot.
#[derive(Debug, Clone)]
pub struct Resolver {
    tree: Tree,
    host_version: String,
    config_version: Version,
    decision: Decision,
    deprecation: Option<String>,
    source: ConfigSource,
}

impl Resolver {
    pub fn builder() -> ResolverBuilder {
        ResolverBuilder::default()
    }

    /// Resolve `path` with `prefix` and otherwise default options.
    pub fn from_path(path: impl Into<PathBuf>, prefix: impl Into<String>) -> ConfigResult<Self> {
        Self::builder().path(path).prefix(prefix).resolve()
    }

    /// The resolved tree.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Schema version the configuration declared (or was assumed to have).
    pub fn config_version(&self) -> &Version {
        &self.config_version
    }

    /// What version negotiation decided.
    pub fn decision(&self) -> Decision {
        self.decision
    }

    /// Deprecation notice emitted during resolution, if any.
    pub fn deprecation(&self) -> Option<&str> {
        self.deprecation.as_deref()
    }

    pub fn source(&self) -> &ConfigSource {
        &self.source
    }

    /// All leaf keys of the resolved tree.
    pub fn keys(&self) -> Vec<String> {
        self.tree.all_keys()
    }
}

impl Configurer for Resolver {
    fn get(&self, name: &str) -> Option<&Value> {
        self.tree.get(name)
    }

    fn has(&self, name: &str) -> bool {
        self.tree.has(name)
    }

    fn unmarshal_key<T: DeserializeOwned>(&self, name: &str) -> ConfigResult<T> {
        self.tree.unmarshal_key(name)
    }

    fn unmarshal<T: DeserializeOwned>(&self) -> ConfigResult<T> {
        self.tree.unmarshal()
    }

    fn overwrite<I, K>(&mut self, values: I)
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        for (key, value) in values {
            self.tree.set(key.as_ref(), value);
        }
    }

    fn host_version(&self) -> &str {
        &self.host_version
    }
}

/// Read the `env_file` key and load the file it names into `env`.
fn load_env_file(
    tree: &Tree,
    base_dir: &Path,
    origin: &Path,
    env: &mut EnvironmentMap,
) -> ConfigResult<()> {
    let file = match tree.get(ENV_FILE_KEY) {
        None | Some(Value::Null) => return Ok(()),
        Some(Value::String(file)) => file,
        Some(other) => {
            return Err(ConfigError::malformed(
                origin,
                format!("{} must be a string, found {}", ENV_FILE_KEY, value_kind(other)),
            ));
        }
    };

    let file = expand(file, |name| env.lookup(name)).map_err(|source| {
        ConfigError::InvalidExpansion {
            key: ENV_FILE_KEY.to_string(),
            source,
        }
    })?;
    if file.trim().is_empty() {
        return Ok(());
    }

    env.load_dotenv(&crate::paths::resolve_relative(base_dir, &file))
}

/// The declared version string and whether it was assumed.
fn declared_version(
    tree: &Tree,
    policy: MissingVersionPolicy,
    origin: &Path,
) -> ConfigResult<(String, bool)> {
    match tree.get(VERSION_KEY) {
        None | Some(Value::Null) => match policy {
            MissingVersionPolicy::Reject => Err(ConfigError::MissingVersion {
                path: origin.to_path_buf(),
            }),
            MissingVersionPolicy::UseDefault => Ok((MINIMUM_CONFIG_VERSION.to_string(), true)),
        },
        Some(Value::String(version)) => Ok((version.clone(), false)),
        Some(other) => Err(ConfigError::invalid_version(format!(
            "actual type: {}",
            value_kind(other)
        ))),
    }
}
