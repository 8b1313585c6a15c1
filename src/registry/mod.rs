//! Class registry for paramig
//!
//! A [`ClassSchema`] ties a class's current field table to its version maps
//! and optional override. The [`ClassRegistry`] indexes schemas by class
//! name and is published once per process through [`init_global`].

mod class_registry;
mod schema;

pub use class_registry::{global, init_global, ClassRegistry};
pub use schema::{ClassSchema, ClassSchemaBuilder};
