//! CLI error types

use thiserror::Error;

use crate::config::ConfigError;
use crate::persist::PersistError;

/// Result type for CLI commands
pub type CliResult<T> = Result<T, CliError>;

/// Every CLI failure ends the process with a non-zero status
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Record(#[from] PersistError),

    #[error("cannot open '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("output failed: {0}")]
    Output(#[from] serde_json::Error),

    #[error("output failed: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            CliError::Config(_) => "PARAMIG_CLI_CONFIG_ERROR",
            CliError::Record(e) => e.code(),
            CliError::Open { .. } => "PARAMIG_CLI_OPEN_FAILED",
            CliError::Output(_) | CliError::Io(_) => "PARAMIG_CLI_IO_ERROR",
        }
    }
}
