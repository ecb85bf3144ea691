//! `cascade cache`: inspect and clear compiled artifacts

use crate::cli::CacheCommands;
use crate::context::CliContext;
use crate::error::CliResult;
use crate::output::print_structured;
use cascade_config::CacheState;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Serialize)]
struct CacheStatus {
    logical_path: String,
    state: CacheState,
    file: PathBuf,
}

pub fn execute_cache_command(context: &CliContext, subcommand: &CacheCommands) -> CliResult<()> {
    match subcommand {
        CacheCommands::Status { path } => status(context, path),
        CacheCommands::Invalidate { path } => invalidate(context, path),
        CacheCommands::Clear => clear(context),
    }
}

fn status(context: &CliContext, raw_path: &str) -> CliResult<()> {
    let path = CliContext::logical_path(raw_path)?;
    let cascade = context.cascade()?;
    let key = cascade.key_for(&path);
    let status = CacheStatus {
        logical_path: path.to_string(),
        state: cascade.state(&path)?,
        file: cascade.cache().path_for(&key)?,
    };

    if !print_structured(&status, context.format)? {
        println!("{}: {} ({})", status.logical_path, status.state, status.file.display());
    }
    Ok(())
}

fn invalidate(context: &CliContext, raw_path: &str) -> CliResult<()> {
    let path = CliContext::logical_path(raw_path)?;
    let cascade = context.cascade()?;
    if cascade.invalidate(&path)? {
        println!("Removed the compiled artifact for '{path}'");
    } else {
        println!("Nothing compiled for '{path}'");
    }
    Ok(())
}

fn clear(context: &CliContext) -> CliResult<()> {
    let cascade = context.cascade()?;
    let removed = cascade.clear_cache()?;
    println!("Removed {removed} compiled artifact(s)");
    Ok(())
}
