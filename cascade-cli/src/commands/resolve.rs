//! `cascade resolve`: the search directories behind a logical path

use crate::context::CliContext;
use crate::error::CliResult;
use crate::output::print_structured;
use cascade_directory::{SearchEntry, SearchOrigin};
use comfy_table::{presets::UTF8_FULL, Table};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Serialize)]
struct ResolvedLayer {
    origin: SearchOrigin,
    directory: PathBuf,
    file: PathBuf,
    exists: bool,
}

impl ResolvedLayer {
    fn new(entry: SearchEntry, file_name: &str) -> Self {
        let file = entry.candidate(file_name);
        Self {
            exists: file.is_file(),
            origin: entry.origin,
            directory: entry.directory,
            file,
        }
    }
}

pub fn execute_resolve_command(context: &CliContext, raw_path: &str) -> CliResult<()> {
    let path = CliContext::logical_path(raw_path)?;
    let cascade = context.cascade()?;
    let layers: Vec<ResolvedLayer> = cascade
        .resolve(&path)
        .into_iter()
        .map(|entry| ResolvedLayer::new(entry, path.file_name()))
        .collect();

    if print_structured(&layers, context.format)? {
        return Ok(());
    }

    if layers.is_empty() {
        println!("No directories supply '{}'", path);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["#", "Layer", "Directory", "File"]);
    for (index, layer) in layers.iter().enumerate() {
        table.add_row(vec![
            (index + 1).to_string(),
            layer.origin.to_string(),
            layer.directory.display().to_string(),
            if layer.exists { "present" } else { "-" }.to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}
