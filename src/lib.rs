//! paramig - versioned parameter migration for persisted objects
//!
//! Objects written under an older class layout are loaded into the current
//! layout field by field:
//!
//! - `descriptor`: versioned identity of one field
//! - `version_map`: per-version transition maps and their chain
//! - `migration`: the resolver that locates, converts or synthesizes values
//! - `registry`: class schemas and the process-wide registry
//! - `persist`: load/save boundary and the reference record codec
//! - `config`, `observability`: configuration and structured logging
//! - `cli`: record inspection tool

pub mod cli;
pub mod config;
pub mod descriptor;
pub mod migration;
pub mod observability;
pub mod persist;
pub mod registry;
pub mod version_map;
