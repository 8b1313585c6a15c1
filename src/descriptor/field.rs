//! FieldDescriptor - versioned identity of one serializable field

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use super::kinds::{ContainerKind, FieldType, PrimitiveKind, StructKind};
use crate::migration::{MigrationError, MigrationResult};

/// Identity of one field at one schema version.
///
/// Equality and ordering cover every attribute, version included. Field
/// declaration order gives the total order: name, container, struct,
/// primitive, version. Use [`FieldDescriptor::same_shape`] or
/// [`FieldDescriptor::shape_cmp`] when the version must not participate.
///
/// The sentinel ("nowhere") descriptor has an empty name. Since every other
/// descriptor is rejected at construction when its name is empty, the
/// sentinel never compares equal to a real field.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FieldDescriptor {
    name: String,
    #[serde(flatten)]
    field_type: FieldType,
    version: u32,
}

impl FieldDescriptor {
    /// Creates a descriptor. The name must not be empty.
    pub fn new(
        name: impl Into<String>,
        container: ContainerKind,
        structure: StructKind,
        primitive: PrimitiveKind,
        version: u32,
    ) -> MigrationResult<Self> {
        Self::typed(name, FieldType::new(container, structure, primitive), version)
    }

    /// Creates a descriptor from an already assembled [`FieldType`].
    pub fn typed(name: impl Into<String>, field_type: FieldType, version: u32) -> MigrationResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(MigrationError::InvalidDescriptor {
                reason: "field name must not be empty".into(),
            });
        }
        Ok(Self {
            name,
            field_type,
            version,
        })
    }

    /// The "no predecessor" marker.
    pub fn nowhere() -> Self {
        Self {
            name: String::new(),
            field_type: FieldType::scalar(PrimitiveKind::Bool),
            version: 0,
        }
    }

    /// Returns true for the sentinel descriptor
    #[inline]
    pub fn is_nowhere(&self) -> bool {
        self.name.is_empty()
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    #[inline]
    pub fn container(&self) -> ContainerKind {
        self.field_type.container
    }

    #[inline]
    pub fn structure(&self) -> StructKind {
        self.field_type.structure
    }

    #[inline]
    pub fn primitive(&self) -> PrimitiveKind {
        self.field_type.primitive
    }

    #[inline]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Same field shape, tagged with another version.
    pub fn with_version(&self, version: u32) -> Self {
        Self {
            name: self.name.clone(),
            field_type: self.field_type,
            version,
        }
    }

    /// Compares name and type, ignoring the version.
    pub fn same_shape(&self, other: &FieldDescriptor) -> bool {
        self.shape_cmp(other) == Ordering::Equal
    }

    /// Version-less ordering, consistent with the derived `Ord` on the
    /// attributes it compares.
    pub fn shape_cmp(&self, other: &FieldDescriptor) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.field_type.cmp(&other.field_type))
    }
}

impl fmt::Display for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_nowhere() {
            return write!(f, "<nowhere>");
        }
        write!(f, "\"{}\" [{}] v{}", self.name, self.field_type, self.version)
    }
}
