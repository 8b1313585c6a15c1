//! CLI command implementations
//!
//! Each command writes JSON lines to the given writer; `run_command` passes
//! stdout.

use serde_json::json;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::Path;

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use crate::config::MigrationConfig;
use crate::persist::ObjectRecord;

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cmd {
        Command::Dump { records, config } => {
            configure(config.as_deref())?;
            dump(&records, &mut out).map(|_| ())
        }
        Command::Verify { records, config } => {
            configure(config.as_deref())?;
            verify(&records, &mut out).map(|_| ())
        }
        Command::CheckConfig { config } => {
            check_config(&config, &mut out)?.apply_logging()?;
            Ok(())
        }
    }
}

/// Loads the configuration, or the defaults without a path, and applies its
/// log level to the process-wide logger.
pub fn configure(path: Option<&Path>) -> CliResult<MigrationConfig> {
    let config = match path {
        Some(path) => MigrationConfig::load(path)?,
        None => MigrationConfig::default(),
    };
    config.apply_logging()?;
    Ok(config)
}

fn read_file(path: &Path) -> CliResult<Vec<ObjectRecord>> {
    let file = File::open(path).map_err(|source| CliError::Open {
        path: path.display().to_string(),
        source,
    })?;
    Ok(ObjectRecord::read_records(BufReader::new(file))?)
}

/// Prints one JSON line per record. Returns the number of records.
pub fn dump<W: Write>(path: &Path, out: &mut W) -> CliResult<usize> {
    let records = read_file(path)?;
    for record in &records {
        let fields: Vec<_> = record
            .fields()
            .iter()
            .map(|(descriptor, value)| json!({ "descriptor": descriptor, "value": value }))
            .collect();
        let line = json!({
            "class": record.class(),
            "version": record.version(),
            "fields": fields,
        });
        serde_json::to_writer(&mut *out, &line)?;
        writeln!(out)?;
    }
    out.flush()?;
    Ok(records.len())
}

/// Checksums every record; any corruption is an error.
pub fn verify<W: Write>(path: &Path, out: &mut W) -> CliResult<usize> {
    let records = read_file(path)?;
    let line = json!({ "status": "ok", "records": records.len() });
    serde_json::to_writer(&mut *out, &line)?;
    writeln!(out)?;
    out.flush()?;
    Ok(records.len())
}

/// Loads and validates a configuration file, printing it with defaults
/// filled in.
pub fn check_config<W: Write>(path: &Path, out: &mut W) -> CliResult<MigrationConfig> {
    let config = MigrationConfig::load(path)?;
    serde_json::to_writer(&mut *out, &config)?;
    writeln!(out)?;
    out.flush()?;
    Ok(config)
}
