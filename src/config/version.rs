//! Schema version parsing and host/config compatibility negotiation.

use crate::error::{ConfigError, ConfigResult};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Oldest configuration schema accepted. Also assumed for files without a
/// version when [`MissingVersionPolicy::UseDefault`] is in effect.
pub const MINIMUM_CONFIG_VERSION: &str = "2.6";

/// Host version used when the host passes a blank or development version.
pub const DEFAULT_HOST_VERSION: &str = "2.7";

/// Host versions that mean "built from source, no release number".
pub const DEVELOPMENT_MARKERS: [&str; 2] = ["local", "development"];

/// A `major.minor.patch` version. Missing components default to 0.
#[derive(Debug, Clone)]
pub struct Version {
    inner: semver::Version,
    raw: String,
}

impl Version {
    pub fn major(&self) -> u64 {
        self.inner.major
    }

    pub fn minor(&self) -> u64 {
        self.inner.minor
    }

    pub fn patch(&self) -> u64 {
        self.inner.patch
    }

    /// The string this version was parsed from.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    fn triple(&self) -> (u64, u64, u64) {
        (self.major(), self.minor(), self.patch())
    }
}

impl FromStr for Version {
    type Err = semver::Error;

    /// Accepts `2`, `2.7`, `2.7.3`, an optional leading `v`, and a
    /// pre-release or build suffix (`2.7.0-rc.1`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let unprefixed = trimmed.strip_prefix('v').unwrap_or(trimmed);

        let split = unprefixed.find(['-', '+']).unwrap_or(unprefixed.len());
        let (core, suffix) = unprefixed.split_at(split);

        // Pad to three components; more than three is left for semver to reject
        let mut normalized = core.to_string();
        for _ in core.split('.').count()..3 {
            normalized.push_str(".0");
        }
        normalized.push_str(suffix);

        Ok(Self {
            inner: semver::Version::parse(&normalized)?,
            raw: trimmed.to_string(),
        })
    }
}

// Ordering is by numeric components only; suffixes don't take part.
impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.triple() == other.triple()
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.triple().cmp(&other.triple())
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major(), self.minor(), self.patch())
    }
}

/// What to do when the root file declares no version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingVersionPolicy {
    /// Fail with `MissingVersion` (default).
    #[default]
    Reject,
    /// Assume [`MINIMUM_CONFIG_VERSION`].
    UseDefault,
}

/// Outcome of a successful negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Config schema matches the host; nothing to do.
    Accept,
    /// Config schema is an older minor; migrate it before use.
    Transition { from_minor: u64, to_minor: u64 },
}

/// Normalize the version the host reports about itself.
pub fn host_version_or_default(host: &str) -> &str {
    let host = host.trim();
    if host.is_empty() || DEVELOPMENT_MARKERS.contains(&host) {
        DEFAULT_HOST_VERSION
    } else {
        host
    }
}

/// Parse the host's version, normalizing blanks and development markers.
pub fn parse_host_version(host: &str) -> ConfigResult<Version> {
    let host = host_version_or_default(host);
    host.parse().map_err(|_| ConfigError::InvalidHostVersion {
        version: host.to_string(),
    })
}

/// Parse a version string found in a configuration file.
pub fn parse_config_version(raw: &str) -> ConfigResult<Version> {
    raw.parse()
        .map_err(|err: semver::Error| ConfigError::invalid_version(format!("`{}` ({})", raw, err)))
}

/// Decide whether a configuration at `config` can run on `host`.
pub fn negotiate(config: &Version, host: &Version) -> ConfigResult<Decision> {
    let minimum: Version = MINIMUM_CONFIG_VERSION
        .parse()
        .map_err(|_| ConfigError::invalid_version(MINIMUM_CONFIG_VERSION))?;

    if *config < minimum {
        return Err(ConfigError::VersionTooOld {
            version: config.to_string(),
            minimum: minimum.to_string(),
        });
    }

    if config.major() != host.major() {
        return Err(ConfigError::MajorVersionMismatch {
            host: host.to_string(),
            config: config.to_string(),
        });
    }

    match config.minor().cmp(&host.minor()) {
        Ordering::Greater => Err(ConfigError::MinorVersionTooNew {
            host: host.to_string(),
            config: config.to_string(),
        }),
        Ordering::Less => Ok(Decision::Transition {
            from_minor: config.minor(),
            to_minor: host.minor(),
        }),
        // Patch-level differences never change the schema
        Ordering::Equal => Ok(Decision::Accept),
    }
}
