//! Command-line `key=value` overrides.

use super::env::EnvironmentMap;
use super::expand::expand;
use crate::error::{ConfigError, ConfigResult};

const QUOTES: [char; 3] = ['"', '\'', '`'];

/// A parsed override: dotted key plus decoded (not yet expanded) value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideFlag {
    pub key: String,
    pub value: String,
}

impl OverrideFlag {
    /// Parse a raw `key=value` flag.
    pub fn parse(raw: &str) -> ConfigResult<Self> {
        if !raw.contains('=') {
            return Err(ConfigError::invalid_flag(raw, "usage: -o key=value"));
        }

        let trimmed = raw.trim_start_matches(|c: char| c == ' ' || QUOTES.contains(&c));
        let Some((key, value)) = trimmed.split_once('=') else {
            return Err(ConfigError::invalid_flag(raw, "usage: -o key=value"));
        };

        let key = key.trim();
        if key.is_empty() {
            return Err(ConfigError::invalid_flag(raw, "key should not be empty"));
        }

        let value = value.trim();
        if value.is_empty() {
            return Err(ConfigError::invalid_flag(raw, "value should not be empty"));
        }

        Ok(Self {
            key: key.to_string(),
            value: decode_value(value),
        })
    }

    /// Expand the value against `env`, yielding the pair to write into the tree.
    pub fn resolve(self, env: &EnvironmentMap) -> ConfigResult<(String, String)> {
        let value = expand(&self.value, |name| env.lookup(name)).map_err(|source| {
            ConfigError::InvalidExpansion {
                key: self.key.clone(),
                source,
            }
        })?;
        Ok((self.key, value))
    }
}

/// Parse and expand a raw flag in one go.
pub fn parse_flag(raw: &str, env: &EnvironmentMap) -> ConfigResult<(String, String)> {
    OverrideFlag::parse(raw)?.resolve(env)
}

/// Strip a wrapping quote pair and unescape `\<quote>`.
fn decode_value(value: &str) -> String {
    let Some(quote) = value.chars().next().filter(|c| QUOTES.contains(c)) else {
        return value.to_string();
    };

    let inner = &value[quote.len_utf8()..];
    let inner = if inner.ends_with(quote) && !inner.ends_with(&format!("\\{}", quote)) {
        &inner[..inner.len() - quote.len_utf8()]
    } else {
        inner
    };
    inner.replace(&format!("\\{}", quote), &quote.to_string())
}
