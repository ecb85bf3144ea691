//! `cascade lookup`: first-match directories for templates, helpers and generators

use crate::cli::LookupCommands;
use crate::context::CliContext;
use crate::error::CliResult;
use crate::output::print_structured;
use cascade_directory::{LookupChain, SearchOrigin};
use comfy_table::{presets::UTF8_FULL, Table};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Serialize)]
struct LookupDirectory {
    origin: SearchOrigin,
    directory: PathBuf,
    exists: bool,
}

#[derive(Debug, Serialize)]
struct LookupMatch {
    file: PathBuf,
    origin: Option<SearchOrigin>,
}

pub fn execute_lookup_command(context: &CliContext, command: &LookupCommands) -> CliResult<()> {
    let cascade = context.cascade()?;
    let resolver = cascade.resolver();
    let chain = match command {
        LookupCommands::Template { module, .. } => resolver.template_dirs(module)?,
        LookupCommands::Helper { module, .. } => resolver.helper_dirs(module.as_deref())?,
        LookupCommands::GeneratorTemplate { class, theme, .. } => {
            resolver.generator_template_dirs(class, theme)?
        }
        LookupCommands::GeneratorSkeleton { class, theme, .. } => {
            resolver.generator_skeleton_dirs(class, theme)?
        }
    };

    match command.file() {
        Some(file) => find(context, &chain, file),
        None => list(context, &chain),
    }
}

fn find(context: &CliContext, chain: &LookupChain, file: &str) -> CliResult<()> {
    let found = LookupMatch {
        file: chain.find_first(file)?,
        origin: chain.entry_for(file).map(|entry| entry.origin.clone()),
    };

    if !print_structured(&found, context.format)? {
        println!("{}", found.file.display());
    }
    Ok(())
}

fn list(context: &CliContext, chain: &LookupChain) -> CliResult<()> {
    let directories: Vec<LookupDirectory> = chain
        .entries()
        .iter()
        .map(|entry| LookupDirectory {
            origin: entry.origin.clone(),
            directory: entry.directory.clone(),
            exists: entry.directory.is_dir(),
        })
        .collect();

    if print_structured(&directories, context.format)? {
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["#", "Layer", "Directory", "Exists"]);
    for (index, dir) in directories.iter().enumerate() {
        table.add_row(vec![
            (index + 1).to_string(),
            dir.origin.to_string(),
            dir.directory.display().to_string(),
            if dir.exists { "yes" } else { "-" }.to_string(),
        ]);
    }
    println!("{} directories, first match wins:", chain.kind());
    println!("{table}");
    Ok(())
}
