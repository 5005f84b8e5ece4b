//! Configuration resolution.
//!
//! Builds one configuration tree from several sources, lowest priority first:
//! 1. **Root file** - YAML document given by path (or inline)
//! 2. **Environment** - `PREFIX_KEY_PATH` process variables over matching keys
//! 3. **Expansion** - `${VAR}` / `${VAR:-default}` in values, process
//!    environment first, then the `env_file` dotenv entries
//! 4. **Overrides** - `key=value` flags
//! 5. **Includes** - files listed under `include`, later ones winning
//!
//! The declared `version` is then checked against the host's version, and an
//! older minor schema is transitioned in place.
//!
//! ## Reserved keys
//! - `version` - schema version of the file, e.g. `"2.7"`
//! - `include` - list of files to merge, relative to the root file
//! - `env_file` - dotenv file, relative to the root file

pub mod env;
pub mod expand;
pub mod flags;
pub mod include;
pub mod loader;
pub mod resolver;
pub mod transition;
pub mod version;

pub use env::EnvironmentMap;
pub use expand::{ExpandError, expand};
pub use flags::{OverrideFlag, parse_flag};
pub use loader::ConfigSource;
pub use resolver::{Configurer, Resolver, ResolverBuilder};
pub use transition::TransitionRegistry;
pub use version::{Decision, MissingVersionPolicy, Version};

/// Key holding the schema version.
pub const VERSION_KEY: &str = "version";

/// Key holding the list of included files.
pub const INCLUDE_KEY: &str = "include";

/// Key naming a dotenv file.
pub const ENV_FILE_KEY: &str = "env_file";
