//! Error handling for the cascade CLI
//!
//! Library errors keep their source chain; the exit code is chosen from the
//! error kind so scripts can tell a broken configuration from a failed
//! startup check.

use std::error::Error;
use std::fmt;

use cascade_config::ConfigError;
use cascade_directory::DirectoryError;

use crate::exit_codes::{EXIT_ERROR, EXIT_INITIALIZATION, EXIT_SUCCESS};

pub type CliResult<T> = Result<T, CliError>;

/// CLI error with the exit code it should produce.
#[derive(Debug)]
pub struct CliError {
    pub message: String,
    pub exit_code: i32,
    pub source: Option<Box<dyn Error + Send + Sync>>,
}

impl CliError {
    pub fn new(message: impl Into<String>, exit_code: i32) -> Self {
        Self {
            message: message.into(),
            exit_code,
            source: None,
        }
    }

    /// The message followed by every cause, skipping causes that repeat it.
    pub fn full_chain(&self) -> String {
        let mut result = self.message.clone();
        let mut previous = self.message.clone();

        let mut current_source = self.source();
        while let Some(err) = current_source {
            let text = err.to_string();
            if text != previous {
                result.push_str(&format!("\n  Caused by: {text}"));
            }
            previous = text;
            current_source = err.source();
        }

        result
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn Error + 'static))
    }
}

impl From<ConfigError> for CliError {
    fn from(error: ConfigError) -> Self {
        let exit_code = if error.is_fatal() {
            EXIT_INITIALIZATION
        } else {
            EXIT_ERROR
        };
        Self {
            message: error.to_string(),
            exit_code,
            source: Some(Box::new(error)),
        }
    }
}

impl From<DirectoryError> for CliError {
    fn from(error: DirectoryError) -> Self {
        ConfigError::from(error).into()
    }
}

impl From<anyhow::Error> for CliError {
    fn from(error: anyhow::Error) -> Self {
        Self {
            message: format!("{error:#}"),
            exit_code: EXIT_ERROR,
            source: None,
        }
    }
}

/// Convert a result to an exit code, logging the error chain.
pub fn handle_cli_result<T>(result: CliResult<T>) -> i32 {
    match result {
        Ok(_) => EXIT_SUCCESS,
        Err(e) => {
            tracing::error!("Error: {}", e.full_chain());
            e.exit_code
        }
    }
}
