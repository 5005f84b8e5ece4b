//! CLI command definitions for layered-config
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod show;

use crate::config::{MissingVersionPolicy, Resolver, ResolverBuilder};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use show::{GetArgs, ResolveArgs};
use std::path::PathBuf;

/// Default prefix for environment variables bound over config keys.
pub const DEFAULT_PREFIX: &str = "APP";

/// Resolve layered, versioned configuration files
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the root configuration file
    /// (default: $LAYERED_CONFIG_PATH, then ./config.yaml, then the user config dir)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Prefix of environment variables that override config keys (PREFIX_KEY_PATH)
    #[arg(short, long, default_value = DEFAULT_PREFIX, global = true)]
    pub prefix: String,

    /// Override a config key, e.g. -o http.address=127.0.0.1:8080 (repeatable)
    #[arg(short = 'o', long = "override", value_name = "KEY=VALUE", global = true)]
    pub overrides: Vec<String>,

    /// Host version to negotiate the config version against
    #[arg(long, default_value = "", global = true)]
    pub host_version: String,

    /// Ignore the `include` key of the root file
    #[arg(long, global = true)]
    pub no_includes: bool,

    /// Assume the oldest supported version when the file declares none
    #[arg(long, global = true)]
    pub allow_missing_version: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the resolved configuration (default if no subcommand given)
    Resolve(ResolveArgs),

    /// Print the value at a dotted key
    Get(GetArgs),

    /// List every leaf key of the resolved configuration
    Keys,

    /// Resolve and report the version decision without printing values
    Check,
}

impl Cli {
    /// Resolver options described by the global flags.
    pub fn builder(&self) -> Result<ResolverBuilder> {
        let path = match &self.config {
            Some(path) => path.clone(),
            None => crate::paths::discover_config_path()
                .context("no configuration file given and none found (use --config)")?,
        };

        let policy = if self.allow_missing_version {
            MissingVersionPolicy::UseDefault
        } else {
            MissingVersionPolicy::Reject
        };

        Ok(Resolver::builder()
            .path(path)
            .prefix(self.prefix.clone())
            .flags(self.overrides.iter().cloned())
            .host_version(self.host_version.clone())
            .includes(!self.no_includes)
            .missing_version(policy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::OutputFormat;

    #[test]
    fn test_parse_globals_and_subcommand() {
        let cli = Cli::parse_from([
            "layered-config",
            "-c",
            "configs/.rr.yaml",
            "-p",
            "rr",
            "-o",
            "logs.level=debug",
            "-o",
            "http.address=:8080",
            "--host-version",
            "2.8",
            "get",
            "logs.level",
        ]);

        assert_eq!(cli.config, Some(PathBuf::from("configs/.rr.yaml")));
        assert_eq!(cli.prefix, "rr");
        assert_eq!(cli.overrides, vec!["logs.level=debug", "http.address=:8080"]);
        assert_eq!(cli.host_version, "2.8");
        assert!(matches!(cli.command, Some(Command::Get(ref args)) if args.key == "logs.level"));
    }

    #[test]
    fn test_format_value_enum() {
        let cli = Cli::parse_from(["layered-config", "resolve", "--format", "json"]);
        assert!(matches!(
            cli.command,
            Some(Command::Resolve(ref args)) if args.format == OutputFormat::Json
        ));

        let cli = Cli::parse_from(["layered-config", "get", "logs.level", "-f", "yml"]);
        assert!(matches!(
            cli.command,
            Some(Command::Get(ref args)) if args.format == OutputFormat::Yaml
        ));

        assert!(Cli::try_parse_from(["layered-config", "resolve", "--format", "toml"]).is_err());
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["layered-config"]);
        assert_eq!(cli.prefix, DEFAULT_PREFIX);
        assert_eq!(cli.log, "2");
        assert!(cli.command.is_none());
        assert!(!cli.no_includes);
    }
}
