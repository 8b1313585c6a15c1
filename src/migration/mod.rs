//! Migration subsystem for paramig
//!
//! Turns the stored fields of an object written at an older class version
//! into the fields its class declares at the current version.
//!
//! # Design Principles
//!
//! - Every expected field gets a value or the object is rejected
//! - Nothing is defaulted silently
//! - Stored fields without a current counterpart are dropped
//! - Conversions replay every version step in order
//! - Registration misuse is returned at the call site

mod convert;
mod errors;
mod overrides;
mod resolver;
mod state;
mod value;
mod working_set;

pub use convert::{convert_primitive, convert_value};
pub use errors::{MigrationError, MigrationResult, Severity};
pub use overrides::{FnOverride, MigrationOverride};
pub use resolver::{MigrationResolver, Resolution, ResolvedField, ResolvedObject};
pub use state::LoadState;
pub use value::{Cell, FieldValue, ObjectHandle, Primitive, SparseEntry};
pub use working_set::RawFieldSet;
