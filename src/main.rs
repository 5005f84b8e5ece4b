//! layered-config
//!
//! Resolves a root configuration file with its includes, environment,
//! dotenv file and override flags, checks its schema version against the
//! host version, and prints the result.

use anyhow::Result;
use clap::Parser;
use layered_config::cli::show::{ResolveArgs, run_check, run_get, run_keys, run_resolve};
use layered_config::cli::{Cli, Command};
use layered_config::logging::{LogTarget, init_logging, level_for};
use tracing::debug;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on --log option
    init_logging(&LogTarget::parse(&cli.log), level_for(cli.verbose))?;

    let resolver = cli.builder()?.resolve()?;
    debug!(keys = resolver.keys().len(), "resolution finished");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match &cli.command {
        None => run_resolve(&resolver, &ResolveArgs::default(), &mut out)?,
        Some(Command::Resolve(args)) => run_resolve(&resolver, args, &mut out)?,
        Some(Command::Get(args)) => run_get(&resolver, args, &mut out)?,
        Some(Command::Keys) => run_keys(&resolver, &mut out)?,
        Some(Command::Check) => run_check(&resolver, &mut out)?,
    }

    Ok(())
}
