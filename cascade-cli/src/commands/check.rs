//! `cascade check`: apply runtime overrides and run startup checks

use crate::context::CliContext;
use crate::error::CliResult;
use cascade_config::RUNTIME_PATH;

pub fn execute_check_command(context: &CliContext) -> CliResult<()> {
    let cascade = context.cascade()?;
    let applied = cascade.apply_runtime_overrides()?;
    println!(
        "{}: startup checks passed, {} runtime override(s) applied",
        RUNTIME_PATH, applied
    );
    Ok(())
}
