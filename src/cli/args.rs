//! CLI argument definitions using clap
//!
//! Commands:
//! - paramig dump <records> [--config <path>]
//! - paramig verify <records> [--config <path>]
//! - paramig check-config --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// paramig - inspect versioned object records
#[derive(Parser, Debug)]
#[command(name = "paramig")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print every record in a file as one JSON object per line
    Dump {
        /// File of concatenated object records
        records: PathBuf,

        /// Configuration file; its log level applies to this run
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Check every record checksum and report the record count
    Verify {
        /// File of concatenated object records
        records: PathBuf,

        /// Configuration file; its log level applies to this run
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Load and validate a migration configuration file
    CheckConfig {
        /// Path to configuration file
        #[arg(long, default_value = "./paramig.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
