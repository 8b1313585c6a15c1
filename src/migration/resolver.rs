//! MigrationResolver - materializes an object at its class's current version
//!
//! For each field the class expects, in order:
//!
//! 1. A stored entry with exactly the expected descriptor
//! 2. The class override's `try_migrate`, when it returns a value
//! 3. The field's lineage back to the stored version; when it ends at a
//!    stored entry, that value replayed forward through every step
//! 4. The class override's `migrate`, or `UnmappedRequiredField`
//!
//! The first error aborts the whole object. Stored entries no expected
//! field consumed are dropped without error. A field claimed by
//! `try_migrate` consumes its lineage origin.

use crate::config::MigrationConfig;
use crate::descriptor::FieldDescriptor;
use crate::observability::{log_event_with_fields, Event};
use crate::version_map::MapChain;

use super::convert::convert_value;
use super::errors::{MigrationError, MigrationResult};
use super::overrides::MigrationOverride;
use super::state::LoadState;
use super::value::FieldValue;
use super::working_set::RawFieldSet;

/// How a resolved field got its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Stored under the expected descriptor
    Direct,
    /// Stored under an older descriptor and carried forward
    Mapped { from: FieldDescriptor },
    /// Produced by the override's `try_migrate`
    Overridden,
    /// Produced by the override's `migrate` for a field with no stored
    /// predecessor
    Synthesized,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Direct => "direct",
            Resolution::Mapped { .. } => "mapped",
            Resolution::Overridden => "overridden",
            Resolution::Synthesized => "synthesized",
        }
    }
}

/// One field at the current version.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedField {
    pub descriptor: FieldDescriptor,
    pub value: FieldValue,
    pub resolution: Resolution,
}

/// A fully materialized object.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedObject {
    class: String,
    version: u32,
    fields: Vec<ResolvedField>,
    dropped: Vec<FieldDescriptor>,
}

impl ResolvedObject {
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Always the class's current version
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Fields in the class's declaration order
    pub fn fields(&self) -> &[ResolvedField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&ResolvedField> {
        self.fields.iter().find(|f| f.descriptor.name() == name)
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.field(name).map(|f| &f.value)
    }

    /// Stored entries that no expected field used.
    ///
    /// An entry counts as used when it matched a field directly, was the
    /// origin of a mapped field, or was the origin of a field claimed by
    /// `try_migrate`. Other entries an override reads on its own are
    /// still listed here.
    pub fn dropped(&self) -> &[FieldDescriptor] {
        &self.dropped
    }

    pub fn into_fields(self) -> Vec<(FieldDescriptor, FieldValue)> {
        self.fields
            .into_iter()
            .map(|f| (f.descriptor, f.value))
            .collect()
    }
}

/// Resolves stored fields against one class's field table.
pub struct MigrationResolver<'a> {
    class: &'a str,
    current_version: u32,
    chain: &'a MapChain,
    migration: Option<&'a dyn MigrationOverride>,
    config: &'a MigrationConfig,
}

impl<'a> MigrationResolver<'a> {
    pub fn new(
        class: &'a str,
        current_version: u32,
        chain: &'a MapChain,
        config: &'a MigrationConfig,
    ) -> Self {
        Self {
            class,
            current_version,
            chain,
            migration: None,
            config,
        }
    }

    /// Attaches the class's override
    pub fn with_override(mut self, migration: Option<&'a dyn MigrationOverride>) -> Self {
        self.migration = migration;
        self
    }

    /// Resolves every field in `expected` (descriptors at the current
    /// version) from `raw`.
    pub fn resolve(&self, raw: &RawFieldSet, expected: &[FieldDescriptor]) -> MigrationResult<ResolvedObject> {
        let stored = raw.stored_version().to_string();
        let current = self.current_version.to_string();
        let mut state = LoadState::RawLoaded;

        if raw.stored_version() > self.current_version {
            let err = MigrationError::StoredVersionTooNew {
                class: self.class.to_string(),
                stored: raw.stored_version(),
                current: self.current_version,
            };
            self.log_failure(state.fail(), &err);
            return Err(err);
        }

        log_event_with_fields(
            Event::ObjectLoadStart,
            &[
                ("class", self.class),
                ("stored_version", &stored),
                ("current_version", &current),
            ],
        );

        let mut consumed = vec![false; raw.len()];
        let mut fields = Vec::with_capacity(expected.len());

        for target in expected {
            state = state.next_field();
            match self.resolve_field(raw, target, &mut consumed) {
                Ok(field) => {
                    if self.config.trace_fields {
                        log_event_with_fields(
                            Event::FieldResolved,
                            &[
                                ("class", self.class),
                                ("field", &field.descriptor.to_string()),
                                ("resolution", field.resolution.as_str()),
                            ],
                        );
                    }
                    fields.push(field);
                }
                Err(err) => {
                    self.log_failure(state, &err);
                    return Err(err);
                }
            }
        }

        let dropped: Vec<FieldDescriptor> = raw
            .iter()
            .zip(&consumed)
            .filter(|(_, used)| !**used)
            .map(|((descriptor, _), _)| descriptor.clone())
            .collect();
        for descriptor in &dropped {
            log_event_with_fields(
                Event::FieldDropped,
                &[("class", self.class), ("field", &descriptor.to_string())],
            );
        }

        state = state.complete();
        log_event_with_fields(
            Event::ObjectLoadComplete,
            &[
                ("class", self.class),
                ("stored_version", &stored),
                ("fields", &fields.len().to_string()),
                ("dropped", &dropped.len().to_string()),
                ("state", &state.to_string()),
            ],
        );

        Ok(ResolvedObject {
            class: self.class.to_string(),
            version: self.current_version,
            fields,
            dropped,
        })
    }

    /// Resolves a single expected field, marking the stored entries it
    /// used in `consumed`. `consumed` has one slot per entry of `raw`.
    pub(crate) fn resolve_field(
        &self,
        raw: &RawFieldSet,
        target: &FieldDescriptor,
        consumed: &mut [bool],
    ) -> MigrationResult<ResolvedField> {
        if let Some(value) = take(raw, target, consumed) {
            self.check_stored(target, value)?;
            return Ok(ResolvedField {
                descriptor: target.clone(),
                value: value.clone(),
                resolution: Resolution::Direct,
            });
        }

        let lineage = self.chain.lineage(target, raw.stored_version())?;

        if let Some(migration) = self.migration {
            if let Some(value) = migration.try_migrate(raw, target)? {
                if !lineage.is_introduced() {
                    take(raw, lineage.origin(), consumed);
                }
                return self.produced(target, value, Resolution::Overridden);
            }
        }

        if !lineage.is_introduced() {
            let origin = lineage.origin();
            if let Some(stored) = take(raw, origin, consumed) {
                self.check_stored(origin, stored)?;
                let mut value = stored.clone();
                for (from, to) in lineage.forward_steps() {
                    value = convert_value(value, &from.field_type(), &to.field_type(), self.config.conversion)
                        .map_err(|reason| MigrationError::conversion(self.class, from, to, reason))?;
                }
                return Ok(ResolvedField {
                    descriptor: target.clone(),
                    value,
                    resolution: Resolution::Mapped { from: origin.clone() },
                });
            }
        }

        match self.migration {
            Some(migration) => {
                let value = migration.migrate(raw, target)?;
                self.produced(target, value, Resolution::Synthesized)
            }
            None => Err(MigrationError::UnmappedRequiredField {
                class: self.class.to_string(),
                field: target.clone(),
            }),
        }
    }

    fn produced(
        &self,
        target: &FieldDescriptor,
        value: FieldValue,
        resolution: Resolution,
    ) -> MigrationResult<ResolvedField> {
        if !value.matches(&target.field_type()) {
            return Err(MigrationError::OverrideTypeMismatch {
                class: self.class.to_string(),
                field: target.clone(),
                actual: value.describe(),
            });
        }
        Ok(ResolvedField {
            descriptor: target.clone(),
            value,
            resolution,
        })
    }

    /// Stored values must be instances of the descriptor they were read under
    fn check_stored(&self, descriptor: &FieldDescriptor, value: &FieldValue) -> MigrationResult<()> {
        if value.matches(&descriptor.field_type()) {
            return Ok(());
        }
        Err(MigrationError::conversion(
            self.class,
            descriptor,
            descriptor,
            format!("stored value is {}", value.describe()),
        ))
    }

    fn log_failure(&self, state: LoadState, err: &MigrationError) {
        let field = err.field().map(|f| f.to_string()).unwrap_or_default();
        let index = state
            .field_index()
            .map(|i| i.to_string())
            .unwrap_or_default();
        log_event_with_fields(
            Event::ObjectLoadFailed,
            &[
                ("class", self.class),
                ("code", err.code()),
                ("field", &field),
                ("field_index", &index),
                ("error", &err.to_string()),
            ],
        );
    }
}

fn take<'r>(raw: &'r RawFieldSet, descriptor: &FieldDescriptor, consumed: &mut [bool]) -> Option<&'r FieldValue> {
    let index = raw.locate(descriptor)?;
    if let Some(slot) = consumed.get_mut(index) {
        *slot = true;
    }
    raw.entry(index).map(|(_, value)| value)
}
