//! RawFieldSet - stored fields of one object, as read
//!
//! Built once per load from the persistence layer's raw pairs, sorted once,
//! then queried through [`RawFieldSet::locate`]. Dropped when the load ends.

use std::collections::HashSet;

use crate::descriptor::FieldDescriptor;

use super::errors::{MigrationError, MigrationResult};
use super::value::FieldValue;

/// Stored (descriptor, value) pairs of one object at its stored version.
#[derive(Debug, Clone)]
pub struct RawFieldSet {
    class: String,
    stored_version: u32,
    /// Sorted by descriptor
    entries: Vec<(FieldDescriptor, FieldValue)>,
}

impl RawFieldSet {
    /// Sorts `fields` and checks that no name repeats within one version.
    pub fn new(
        class: impl Into<String>,
        stored_version: u32,
        mut fields: Vec<(FieldDescriptor, FieldValue)>,
    ) -> MigrationResult<Self> {
        let class = class.into();

        let mut seen = HashSet::with_capacity(fields.len());
        for (descriptor, _) in &fields {
            if !seen.insert((descriptor.name(), descriptor.version())) {
                return Err(MigrationError::DuplicateStoredField {
                    class,
                    field: descriptor.clone(),
                });
            }
        }

        fields.sort_by(|(a, _), (b, _)| a.cmp(b));

        Ok(Self {
            class,
            stored_version,
            entries: fields,
        })
    }

    /// Class the stored fields are being resolved for
    #[inline]
    pub fn class_name(&self) -> &str {
        &self.class
    }

    #[inline]
    pub fn stored_version(&self) -> u32 {
        self.stored_version
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Position of the entry with exactly this descriptor, version included.
    pub fn locate(&self, descriptor: &FieldDescriptor) -> Option<usize> {
        self.entries
            .binary_search_by(|(d, _)| d.cmp(descriptor))
            .ok()
    }

    /// Entry at a position returned by [`RawFieldSet::locate`]
    pub fn entry(&self, index: usize) -> Option<(&FieldDescriptor, &FieldValue)> {
        self.entries.get(index).map(|(d, v)| (d, v))
    }

    /// Value stored under exactly this descriptor
    pub fn value(&self, descriptor: &FieldDescriptor) -> Option<&FieldValue> {
        self.locate(descriptor).map(|idx| &self.entries[idx].1)
    }

    /// First stored entry with this name, any type or version
    pub fn find_by_name(&self, name: &str) -> Option<(&FieldDescriptor, &FieldValue)> {
        self.entries
            .iter()
            .find(|(d, _)| d.name() == name)
            .map(|(d, v)| (d, v))
    }

    /// All entries in descriptor order
    pub fn iter(&self) -> impl Iterator<Item = (&FieldDescriptor, &FieldValue)> {
        self.entries.iter().map(|(d, v)| (d, v))
    }
}
