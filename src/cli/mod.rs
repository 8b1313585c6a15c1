//! CLI module for paramig
//!
//! Provides command-line inspection of record files:
//! - dump: Decode and print every record
//! - verify: Checksum every record
//! - check-config: Validate a configuration file

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::{check_config, dump, run, run_command, verify};
pub use errors::{CliError, CliResult};
