//! Structured output for `--format json` and `--format yaml`

use crate::cli::OutputFormat;
use anyhow::Result;
use serde::Serialize;

/// Print `value` as JSON or YAML. Returns `false` for table output, which
/// callers render themselves.
pub fn print_structured<T: Serialize + ?Sized>(value: &T, format: OutputFormat) -> Result<bool> {
    match format {
        OutputFormat::Table => Ok(false),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value)?);
            Ok(true)
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yaml_ng::to_string(value)?);
            Ok(true)
        }
    }
}
