//! ClassRegistry - every class schema known to the process
//!
//! Built once, then published. The process-wide instance lives in a
//! `OnceLock`: initialization happens at most once and every reader after
//! that sees the fully built registry without locking.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::migration::{MigrationError, MigrationResult};
use crate::observability::{log_event_with_fields, Event};

use super::schema::ClassSchema;

/// Class schemas indexed by class name.
#[derive(Debug, Default)]
pub struct ClassRegistry {
    classes: HashMap<String, ClassSchema>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a class. A class name can be registered only once.
    pub fn register(&mut self, schema: ClassSchema) -> MigrationResult<()> {
        if self.classes.contains_key(schema.name()) {
            return Err(MigrationError::DuplicateClass(schema.name().to_string()));
        }

        log_event_with_fields(
            Event::ClassRegistered,
            &[
                ("class", schema.name()),
                ("current_version", &schema.current_version().to_string()),
                ("fields", &schema.fields().len().to_string()),
                ("maps", &schema.chain().len().to_string()),
            ],
        );
        self.classes.insert(schema.name().to_string(), schema);
        Ok(())
    }

    /// Schema of `name`, or `UnknownClass`
    pub fn get(&self, name: &str) -> MigrationResult<&ClassSchema> {
        self.classes
            .get(name)
            .ok_or_else(|| MigrationError::UnknownClass(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Registered class names, sorted
    pub fn class_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.classes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

static GLOBAL: OnceLock<ClassRegistry> = OnceLock::new();

/// Builds and publishes the process-wide registry.
///
/// `build` runs only if no registry has been published yet. A failed build
/// publishes nothing, so a later call may try again.
pub fn init_global<F>(build: F) -> MigrationResult<&'static ClassRegistry>
where
    F: FnOnce() -> MigrationResult<ClassRegistry>,
{
    if let Some(registry) = GLOBAL.get() {
        return Ok(registry);
    }

    let built = build()?;
    let classes = built.len().to_string();
    // Another thread may have won the race; its registry stands
    let registry = GLOBAL.get_or_init(|| built);
    log_event_with_fields(Event::RegistryInitialized, &[("classes", &classes)]);
    Ok(registry)
}

/// The process-wide registry, once published
pub fn global() -> Option<&'static ClassRegistry> {
    GLOBAL.get()
}
