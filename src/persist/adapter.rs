//! Load/save boundary between the persistence layer and the resolver
//!
//! The persistence layer hands over what it read through [`RawFieldSource`]
//! and receives a [`ResolvedObject`] at the class's current version. On save
//! every field is written at the current version, after checking the values
//! against the class field table.

use crate::config::MigrationConfig;
use crate::descriptor::FieldDescriptor;
use crate::migration::{FieldValue, MigrationError, MigrationResult, RawFieldSet, ResolvedObject};
use crate::observability::{log_event_with_fields, Event};
use crate::registry::ClassRegistry;

use super::record::ObjectRecord;

/// Stored fields of one object, as the reader produced them.
pub trait RawFieldSource {
    /// Version tag the object was written with
    fn stored_version(&self) -> u32;

    /// Class tag the object was written with
    fn class_name(&self) -> &str;

    /// Every stored (descriptor, value) pair, descriptors at the stored
    /// version
    fn get_all_fields(&self) -> Vec<(FieldDescriptor, FieldValue)>;
}

/// Field table of a class, at any of its versions.
pub trait CurrentSchemaProvider {
    fn class_name(&self) -> &str;

    fn current_version(&self) -> u32;

    /// Fields the class declares at `version`, in declaration order
    fn get_expected_fields(&self, version: u32) -> MigrationResult<Vec<FieldDescriptor>>;
}

/// Entry point used by the persistence framework.
pub struct MigrationAdapter<'a> {
    registry: &'a ClassRegistry,
    config: &'a MigrationConfig,
}

impl<'a> MigrationAdapter<'a> {
    pub fn new(registry: &'a ClassRegistry, config: &'a MigrationConfig) -> Self {
        Self { registry, config }
    }

    /// Loads `source` into the class it was written as.
    pub fn load(&self, source: &dyn RawFieldSource) -> MigrationResult<ResolvedObject> {
        self.load_as(source, source.class_name())
    }

    /// Loads `source` into `class`, which may differ from the class tag the
    /// object was written with.
    pub fn load_as(&self, source: &dyn RawFieldSource, class: &str) -> MigrationResult<ResolvedObject> {
        let schema = self.registry.get(class)?;
        let raw = RawFieldSet::new(
            schema.name(),
            source.stored_version(),
            source.get_all_fields(),
        )?;
        let expected = schema.get_expected_fields(schema.current_version())?;
        schema.resolver(self.config).resolve(&raw, &expected)
    }

    /// Writes `values`, keyed by field name, as a record of `class` at its
    /// current version.
    pub fn save<I, S>(&self, class: &str, values: I) -> MigrationResult<ObjectRecord>
    where
        I: IntoIterator<Item = (S, FieldValue)>,
        S: AsRef<str>,
    {
        let schema = self.registry.get(class)?;
        save_fields(schema, values)
    }

    /// Writes a loaded object back at its current version.
    pub fn save_resolved(&self, object: &ResolvedObject) -> MigrationResult<ObjectRecord> {
        self.save(
            object.class(),
            object
                .fields()
                .iter()
                .map(|f| (f.descriptor.name(), f.value.clone())),
        )
    }
}

/// Checks `values` against the provider's current field table and builds
/// the record. Missing, unknown, repeated and mistyped fields are all
/// `SaveMismatch`.
pub fn save_fields<P, I, S>(provider: &P, values: I) -> MigrationResult<ObjectRecord>
where
    P: CurrentSchemaProvider + ?Sized,
    I: IntoIterator<Item = (S, FieldValue)>,
    S: AsRef<str>,
{
    let class = provider.class_name();
    let version = provider.current_version();
    let expected = provider.get_expected_fields(version)?;
    let mismatch = |reason: String| MigrationError::SaveMismatch {
        class: class.to_string(),
        reason,
    };

    let mut slots: Vec<Option<FieldValue>> = vec![None; expected.len()];
    for (name, value) in values {
        let name = name.as_ref();
        let idx = expected
            .iter()
            .position(|d| d.name() == name)
            .ok_or_else(|| mismatch(format!("unknown field '{}'", name)))?;
        let descriptor = &expected[idx];
        if !value.matches(&descriptor.field_type()) {
            return Err(mismatch(format!(
                "field '{}' is declared {}, got {}",
                name,
                descriptor.field_type(),
                value.describe()
            )));
        }
        if slots[idx].replace(value).is_some() {
            return Err(mismatch(format!("field '{}' given more than once", name)));
        }
    }

    let mut fields = Vec::with_capacity(expected.len());
    let mut missing = Vec::new();
    for (descriptor, slot) in expected.into_iter().zip(slots) {
        match slot {
            Some(value) => fields.push((descriptor, value)),
            None => missing.push(descriptor.name().to_string()),
        }
    }
    if !missing.is_empty() {
        return Err(mismatch(format!("missing fields: {}", missing.join(", "))));
    }

    let record = ObjectRecord::new(class, version, fields).map_err(|e| mismatch(e.to_string()))?;

    log_event_with_fields(
        Event::ObjectSaved,
        &[
            ("class", class),
            ("version", &version.to_string()),
            ("fields", &record.fields().len().to_string()),
        ],
    );
    Ok(record)
}
