//! ClassSchema - field table, version maps and override of one class

use std::collections::HashSet;
use std::fmt;

use crate::config::{AmbiguityPolicy, MigrationConfig};
use crate::descriptor::{FieldDescriptor, FieldType};
use crate::migration::{MigrationError, MigrationOverride, MigrationResolver, MigrationResult};
use crate::persist::CurrentSchemaProvider;
use crate::version_map::{MapChain, VersionMap};

/// Everything the resolver needs to know about one class.
///
/// Built once through [`ClassSchemaBuilder`] and read-only afterwards: the
/// version maps are finalized by the builder.
pub struct ClassSchema {
    name: String,
    current_version: u32,
    /// Declaration order
    fields: Vec<FieldDescriptor>,
    chain: MapChain,
    migration: Option<Box<dyn MigrationOverride>>,
}

impl ClassSchema {
    /// Starts a schema for `name` whose current version is `current_version`.
    pub fn builder(name: impl Into<String>, current_version: u32) -> ClassSchemaBuilder {
        ClassSchemaBuilder {
            name: name.into(),
            current_version,
            fields: Vec::new(),
            maps: Vec::new(),
            migration: None,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn current_version(&self) -> u32 {
        self.current_version
    }

    /// Fields at the current version, in declaration order
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|d| d.name() == name)
    }

    pub fn chain(&self) -> &MapChain {
        &self.chain
    }

    pub fn migration(&self) -> Option<&dyn MigrationOverride> {
        self.migration.as_deref()
    }

    /// Resolver bound to this class
    pub fn resolver<'a>(&'a self, config: &'a MigrationConfig) -> MigrationResolver<'a> {
        MigrationResolver::new(&self.name, self.current_version, &self.chain, config)
            .with_override(self.migration())
    }

    /// Field table as it was at `version`: the fields that survive to the
    /// current version, with the shape they had then. Fields introduced
    /// after `version` are left out.
    pub fn fields_at(&self, version: u32) -> MigrationResult<Vec<FieldDescriptor>> {
        if version > self.current_version {
            return Err(MigrationError::StoredVersionTooNew {
                class: self.name.clone(),
                stored: version,
                current: self.current_version,
            });
        }
        if version == self.current_version {
            return Ok(self.fields.clone());
        }

        let mut projected = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            let lineage = self.chain.lineage(field, version)?;
            if !lineage.is_introduced() {
                projected.push(lineage.origin().clone());
            }
        }
        Ok(projected)
    }
}

impl CurrentSchemaProvider for ClassSchema {
    fn class_name(&self) -> &str {
        &self.name
    }

    fn current_version(&self) -> u32 {
        self.current_version
    }

    fn get_expected_fields(&self, version: u32) -> MigrationResult<Vec<FieldDescriptor>> {
        self.fields_at(version)
    }
}

impl fmt::Debug for ClassSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassSchema")
            .field("name", &self.name)
            .field("current_version", &self.current_version)
            .field("fields", &self.fields)
            .field("chain", &self.chain)
            .field("migration", &self.migration.is_some())
            .finish()
    }
}

/// Collects a class's declaration; [`ClassSchemaBuilder::build`] validates
/// and finalizes it.
pub struct ClassSchemaBuilder {
    name: String,
    current_version: u32,
    fields: Vec<(String, FieldType)>,
    maps: Vec<VersionMap>,
    migration: Option<Box<dyn MigrationOverride>>,
}

impl ClassSchemaBuilder {
    /// Declares a field at the current version
    pub fn field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.push((name.into(), field_type));
        self
    }

    /// Adds the map for one version transition. Open maps are finalized by
    /// `build`; finalized maps are taken as they are.
    pub fn version_map(mut self, map: VersionMap) -> Self {
        self.maps.push(map);
        self
    }

    /// Installs the class's override, replacing any earlier one
    pub fn migration(mut self, migration: impl MigrationOverride + 'static) -> Self {
        self.migration = Some(Box::new(migration));
        self
    }

    pub fn build(self, config: &MigrationConfig) -> MigrationResult<ClassSchema> {
        let mut names = HashSet::with_capacity(self.fields.len());
        let mut fields = Vec::with_capacity(self.fields.len());
        for (name, field_type) in self.fields {
            if !names.insert(name.clone()) {
                return Err(MigrationError::DuplicateField {
                    class: self.name,
                    name,
                });
            }
            fields.push(FieldDescriptor::typed(name, field_type, self.current_version)?);
        }

        let mut chain = MapChain::new();
        for map in self.maps {
            chain.add(map)?;
        }
        chain.finalize_all();

        for map in chain.maps() {
            for (value, count) in map.ambiguous_targets() {
                if config.ambiguous_mappings == AmbiguityPolicy::Reject {
                    return Err(MigrationError::AmbiguousMapping {
                        version: map.version(),
                        value: value.clone(),
                        count: *count,
                    });
                }
            }
        }

        Ok(ClassSchema {
            name: self.name,
            current_version: self.current_version,
            fields,
            chain,
            migration: self.migration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::PrimitiveKind;

    fn scalar(name: &str, primitive: PrimitiveKind, version: u32) -> FieldDescriptor {
        FieldDescriptor::typed(name, FieldType::scalar(primitive), version).unwrap()
    }

    /// v0: number Int32, old_name Int8
    /// v1: number Int8, new_name Int8 (renamed), extra Bool (new)
    /// v2: number Float64
    fn schema() -> ClassSchema {
        let mut v1 = VersionMap::new(1);
        v1.put(scalar("number", PrimitiveKind::Int8, 1), scalar("number", PrimitiveKind::Int32, 0))
            .unwrap();
        v1.put(scalar("new_name", PrimitiveKind::Int8, 1), scalar("old_name", PrimitiveKind::Int8, 0))
            .unwrap();
        v1.put(scalar("extra", PrimitiveKind::Bool, 1), FieldDescriptor::nowhere())
            .unwrap();

        let mut v2 = VersionMap::new(2);
        v2.put(scalar("number", PrimitiveKind::Float64, 2), scalar("number", PrimitiveKind::Int8, 1))
            .unwrap();

        ClassSchema::builder("Sample", 2)
            .field("number", FieldType::scalar(PrimitiveKind::Float64))
            .field("new_name", FieldType::scalar(PrimitiveKind::Int8))
            .field("extra", FieldType::scalar(PrimitiveKind::Bool))
            .version_map(v1)
            .version_map(v2)
            .build(&MigrationConfig::default())
            .unwrap()
    }

    #[test]
    fn test_build_finalizes_maps() {
        let schema = schema();
        assert_eq!(schema.chain().len(), 2);
        assert!(schema.chain().maps().all(VersionMap::is_finalized));
        assert_eq!(schema.fields()[0], scalar("number", PrimitiveKind::Float64, 2));
        assert!(schema.migration().is_none());
    }

    #[test]
    fn test_expected_fields_current() {
        let schema = schema();
        assert_eq!(schema.get_expected_fields(2).unwrap(), schema.fields());
    }

    #[test]
    fn test_expected_fields_projected_back() {
        let schema = schema();
        assert_eq!(
            schema.get_expected_fields(1).unwrap(),
            vec![
                scalar("number", PrimitiveKind::Int8, 1),
                scalar("new_name", PrimitiveKind::Int8, 1),
                scalar("extra", PrimitiveKind::Bool, 1),
            ]
        );
        assert_eq!(
            schema.get_expected_fields(0).unwrap(),
            vec![
                scalar("number", PrimitiveKind::Int32, 0),
                scalar("old_name", PrimitiveKind::Int8, 0),
            ]
        );
    }

    #[test]
    fn test_expected_fields_future_version() {
        let err = schema().get_expected_fields(3).unwrap_err();
        assert_eq!(err.code(), "PARAMIG_STORED_VERSION_TOO_NEW");
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let err = ClassSchema::builder("Sample", 0)
            .field("a", FieldType::scalar(PrimitiveKind::Int8))
            .field("a", FieldType::scalar(PrimitiveKind::Int32))
            .build(&MigrationConfig::default())
            .unwrap_err();
        assert_eq!(
            err,
            MigrationError::DuplicateField {
                class: "Sample".into(),
                name: "a".into(),
            }
        );
    }

    #[test]
    fn test_empty_field_name_rejected() {
        let err = ClassSchema::builder("Sample", 0)
            .field("", FieldType::scalar(PrimitiveKind::Int8))
            .build(&MigrationConfig::default())
            .unwrap_err();
        assert_eq!(err.code(), "PARAMIG_INVALID_DESCRIPTOR");
    }

    #[test]
    fn test_ambiguity_policy() {
        let fan_out = || {
            let mut v1 = VersionMap::new(1);
            let old = scalar("features", PrimitiveKind::Int32, 0);
            v1.put(scalar("left", PrimitiveKind::Int32, 1), old.clone()).unwrap();
            v1.put(scalar("right", PrimitiveKind::Int32, 1), old).unwrap();
            ClassSchema::builder("Split", 1)
                .field("left", FieldType::scalar(PrimitiveKind::Int32))
                .field("right", FieldType::scalar(PrimitiveKind::Int32))
                .version_map(v1)
        };

        assert!(fan_out().build(&MigrationConfig::default()).is_ok());

        let err = fan_out().build(&MigrationConfig::strict()).unwrap_err();
        assert!(matches!(err, MigrationError::AmbiguousMapping { version: 1, count: 2, .. }));
    }

    #[test]
    fn test_prefinalized_map_accepted() {
        let mut v1 = VersionMap::new(1);
        v1.put(scalar("a", PrimitiveKind::Int8, 1), FieldDescriptor::nowhere()).unwrap();
        v1.finalize_map();

        let schema = ClassSchema::builder("Sample", 1)
            .field("a", FieldType::scalar(PrimitiveKind::Int8))
            .version_map(v1)
            .build(&MigrationConfig::default())
            .unwrap();
        assert_eq!(schema.get_expected_fields(0).unwrap(), Vec::new());
    }
}
