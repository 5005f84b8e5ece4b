//! Subcommands that print a resolved configuration.

use crate::config::{Configurer, Decision, Resolver};
use crate::format::{OutputFormat, format_scalar};
use anyhow::{Result, anyhow};
use clap::Args;
use std::io::Write;

/// Arguments for the resolve subcommand
#[derive(Args, Debug, Default)]
pub struct ResolveArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
    pub format: OutputFormat,
}

/// Arguments for the get subcommand
#[derive(Args, Debug)]
pub struct GetArgs {
    /// Dotted key, e.g. http.address
    pub key: String,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
    pub format: OutputFormat,
}

/// Print the whole resolved tree.
pub fn run_resolve(resolver: &Resolver, args: &ResolveArgs, out: &mut impl Write) -> Result<()> {
    writeln!(out, "{}", args.format.render(&resolver.tree().to_value())?)?;
    Ok(())
}

/// Print one value; a missing key is an error.
pub fn run_get(resolver: &Resolver, args: &GetArgs, out: &mut impl Write) -> Result<()> {
    let value = resolver
        .get(&args.key)
        .ok_or_else(|| anyhow!("key `{}` is not set", args.key))?;
    writeln!(out, "{}", format_scalar(value, args.format)?)?;
    Ok(())
}

/// Print every leaf key, one per line.
pub fn run_keys(resolver: &Resolver, out: &mut impl Write) -> Result<()> {
    for key in resolver.keys() {
        writeln!(out, "{}", key)?;
    }
    Ok(())
}

/// Print the version verdict.
pub fn run_check(resolver: &Resolver, out: &mut impl Write) -> Result<()> {
    let verdict = match resolver.decision() {
        Decision::Accept => "compatible".to_string(),
        Decision::Transition {
            from_minor,
            to_minor,
        } => format!("transitioned (minor {} -> {})", from_minor, to_minor),
    };
    writeln!(
        out,
        "config {} / host {}: {}",
        resolver.config_version(),
        resolver.host_version(),
        verdict
    )?;
    if let Some(notice) = resolver.deprecation() {
        writeln!(out, "deprecated: {}", notice)?;
    }
    Ok(())
}
