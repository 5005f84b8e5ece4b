//! Output formatting for resolved configuration values.

use anyhow::Result;
use clap::ValueEnum;
use serde_json::Value;

/// Output format for printed values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// YAML document (default)
    #[default]
    #[value(alias = "yml")]
    Yaml,
    /// Pretty-printed JSON
    Json,
}

impl OutputFormat {
    /// Render `value` in this format, without a trailing newline.
    pub fn render(self, value: &Value) -> Result<String> {
        let rendered = match self {
            OutputFormat::Yaml => serde_yaml::to_string(value)?,
            OutputFormat::Json => serde_json::to_string_pretty(value)?,
        };
        Ok(rendered.trim_end().to_string())
    }
}

/// Render a single value for `get`: bare strings print unquoted.
pub fn format_scalar(value: &Value, format: OutputFormat) -> Result<String> {
    match value {
        Value::String(s) if format == OutputFormat::Yaml => Ok(s.clone()),
        other => format.render(other),
    }
}
