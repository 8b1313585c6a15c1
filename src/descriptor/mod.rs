//! Field descriptors
//!
//! A descriptor names one persisted field and pins down its type at one
//! schema version. Descriptors are plain values: cheap to clone, totally
//! ordered, and never mutated after construction.

mod field;
mod kinds;

pub use field::FieldDescriptor;
pub use kinds::{ContainerKind, FieldType, PrimitiveKind, StructKind};
