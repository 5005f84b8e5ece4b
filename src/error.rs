//! Structured error types for configuration resolution.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Source errors
    ConfigNotFound,
    MalformedConfig,
    InvalidOptions,

    // Version errors
    MissingVersion,
    InvalidVersionType,
    InvalidHostVersion,
    VersionTooOld,
    MajorVersionMismatch,
    MinorVersionTooNew,
    IncludeVersionMismatch,

    // Value errors
    InvalidOverrideFlag,
    InvalidExpansion,

    // Post-resolution errors
    Transition,
    Unmarshal,
}

/// Every way a resolution pass (or a typed read afterwards) can fail.
///
/// All variants are terminal: a resolver that returned one of these from
/// `resolve` never exists, so there is no partially resolved tree to misuse.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file {path} not found or unreadable: {source}")]
    ConfigNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed configuration {path}: {message}")]
    MalformedConfig { path: PathBuf, message: String },

    #[error("invalid resolver options: {0}")]
    InvalidOptions(String),

    #[error("configuration file {path} should contain a version e.g: version: 2.7")]
    MissingVersion { path: PathBuf },

    #[error("version should be a valid dotted string, actual: {found}")]
    InvalidVersionType { found: String },

    #[error("invalid host version `{version}`")]
    InvalidHostVersion { version: String },

    #[error("too old configuration version {version} used, should be at least {minimum}")]
    VersionTooOld { version: String, minimum: String },

    #[error("host and configuration major versions are different: host {host}, config {config}")]
    MajorVersionMismatch { host: String, config: String },

    #[error("configuration version {config} can't be greater than host version {host}")]
    MinorVersionTooNew { host: String, config: String },

    #[error(
        "version in included file {path} must be the same as in root: expected {expected}, found {found}"
    )]
    IncludeVersionMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },

    #[error("invalid flag `{flag}`: {reason}")]
    InvalidOverrideFlag { flag: String, reason: &'static str },

    #[error("invalid expansion in `{key}`: {source}")]
    InvalidExpansion {
        key: String,
        #[source]
        source: crate::config::ExpandError,
    },

    #[error("transition from minor {from} to minor {to} failed: {source}")]
    Transition {
        from: u64,
        to: u64,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to unmarshal `{key}`: {source}")]
    Unmarshal {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ConfigError {
    /// Stable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            ConfigError::ConfigNotFound { .. } => ErrorCode::ConfigNotFound,
            ConfigError::MalformedConfig { .. } => ErrorCode::MalformedConfig,
            ConfigError::InvalidOptions(_) => ErrorCode::InvalidOptions,
            ConfigError::MissingVersion { .. } => ErrorCode::MissingVersion,
            ConfigError::InvalidVersionType { .. } => ErrorCode::InvalidVersionType,
            ConfigError::InvalidHostVersion { .. } => ErrorCode::InvalidHostVersion,
            ConfigError::VersionTooOld { .. } => ErrorCode::VersionTooOld,
            ConfigError::MajorVersionMismatch { .. } => ErrorCode::MajorVersionMismatch,
            ConfigError::MinorVersionTooNew { .. } => ErrorCode::MinorVersionTooNew,
            ConfigError::IncludeVersionMismatch { .. } => ErrorCode::IncludeVersionMismatch,
            ConfigError::InvalidOverrideFlag { .. } => ErrorCode::InvalidOverrideFlag,
            ConfigError::InvalidExpansion { .. } => ErrorCode::InvalidExpansion,
            ConfigError::Transition { .. } => ErrorCode::Transition,
            ConfigError::Unmarshal { .. } => ErrorCode::Unmarshal,
        }
    }

    // Convenience constructors

    pub fn malformed(path: impl Into<PathBuf>, message: impl std::fmt::Display) -> Self {
        Self::MalformedConfig {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn invalid_flag(flag: &str, reason: &'static str) -> Self {
        Self::InvalidOverrideFlag {
            flag: flag.to_string(),
            reason,
        }
    }

    pub fn invalid_version(found: impl Into<String>) -> Self {
        Self::InvalidVersionType {
            found: found.into(),
        }
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
