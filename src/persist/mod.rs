//! Persistence boundary for paramig
//!
//! - [`RawFieldSource`] and [`CurrentSchemaProvider`]: what the
//!   persistence framework and the class table supply
//! - [`MigrationAdapter`]: load through the resolver, save at the current
//!   version
//! - [`ObjectRecord`]: reference checksummed record codec
//!
//! Every record read validates its checksum before any field is decoded.

mod adapter;
mod checksum;
mod errors;
mod record;

pub use adapter::{save_fields, CurrentSchemaProvider, MigrationAdapter, RawFieldSource};
pub use checksum::compute_checksum;
pub use errors::{PersistError, PersistResult};
pub use record::ObjectRecord;
