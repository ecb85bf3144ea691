//! `cascade compile`: the compiled artifact for a logical path

use crate::context::CliContext;
use crate::error::CliResult;
use crate::output::print_structured;
use anyhow::Context;
use cascade_config::CompiledArtifact;
use std::sync::Arc;

pub fn execute_compile_command(context: &CliContext, raw_path: &str, no_cache: bool) -> CliResult<()> {
    let path = CliContext::logical_path(raw_path)?;
    let cascade = context.cascade()?;

    let artifact: Arc<CompiledArtifact> = if no_cache {
        Arc::new(cascade.compile(&path)?)
    } else {
        cascade.load(&path)?
    };

    if print_structured(artifact.as_ref(), context.format)? {
        return Ok(());
    }

    let body = artifact
        .body_text()
        .with_context(|| format!("Failed to render the artifact for '{path}'"))?;
    println!("# {} ({})", artifact.header.logical_path, artifact.header.generator);
    println!(
        "# {} source file(s) watched, {} present",
        artifact.fingerprint.len(),
        artifact.fingerprint.existing().count()
    );
    print!("{body}");
    Ok(())
}
