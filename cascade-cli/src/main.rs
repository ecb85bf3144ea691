use clap::Parser;
use std::process;

mod cli;
mod commands;
mod context;
mod error;
mod exit_codes;
mod output;

use cli::{Cli, Commands};
use context::CliContext;
use error::{handle_cli_result, CliResult};

fn main() {
    let cli = Cli::parse();
    configure_logging(cli.verbose, cli.debug, cli.quiet);

    let exit_code = handle_cli_result(run(&cli));
    process::exit(exit_code);
}

fn run(cli: &Cli) -> CliResult<()> {
    let context = CliContext::new(cli)?;
    tracing::debug!(
        "Environment '{}', application {:?}",
        context.settings.environment,
        context.settings.application
    );

    match &cli.command {
        Commands::Resolve { path } => commands::resolve::execute_resolve_command(&context, path),
        Commands::Compile { path, no_cache } => {
            commands::compile::execute_compile_command(&context, path, *no_cache)
        }
        Commands::Lookup { chain } => commands::lookup::execute_lookup_command(&context, chain),
        Commands::Check => commands::check::execute_check_command(&context),
        Commands::Cache { subcommand } => {
            commands::cache::execute_cache_command(&context, subcommand)
        }
    }
}

fn configure_logging(verbose: bool, debug: bool, quiet: bool) {
    use tracing::Level;
    use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter};

    let log_level = if quiet {
        Level::ERROR
    } else if debug {
        Level::DEBUG
    } else if verbose {
        Level::TRACE
    } else {
        Level::INFO
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
