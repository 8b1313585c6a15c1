//! Version Chain Tests
//!
//! Objects stored several versions back are carried forward one version
//! at a time:
//! - a narrowing step in the middle of the chain applies even when the
//!   current type could hold the original value
//! - renames are followed across versions
//! - fields without map entries keep their shape
//! - fields introduced partway need the override
//! - object references survive a rename, matrices keep their shape

use paramig::config::MigrationConfig;
use paramig::descriptor::{ContainerKind, FieldDescriptor, FieldType, PrimitiveKind, StructKind};
use paramig::migration::{
    FieldValue, FnOverride, MigrationError, ObjectHandle, Primitive, RawFieldSet, Resolution,
};
use paramig::persist::{CurrentSchemaProvider, MigrationAdapter, ObjectRecord};
use paramig::registry::{ClassRegistry, ClassSchema};
use paramig::version_map::VersionMap;

// =============================================================================
// Helper Functions
// =============================================================================

fn text_type() -> FieldType {
    FieldType::new(ContainerKind::String, StructKind::None, PrimitiveKind::Char)
}

fn field(name: &str, field_type: FieldType, version: u32) -> FieldDescriptor {
    FieldDescriptor::typed(name, field_type, version).unwrap()
}

fn scalar(name: &str, primitive: PrimitiveKind, version: u32) -> FieldDescriptor {
    field(name, FieldType::scalar(primitive), version)
}

/// Sensor history:
///
/// | field    | v0           | v1           | v2            |
/// |----------|--------------|--------------|---------------|
/// | number   | Int32        | Int8         | Float64       |
/// | label    | old_label    | label        | label         |
/// | count    | UInt16       | UInt16       | UInt16        |
/// | taps     | Vector Int16 | Vector Int16 | Vector Int32  |
/// | flag     | -            | -            | Bool (new)    |
fn sensor_schema(config: &MigrationConfig) -> ClassSchema {
    let mut v1 = VersionMap::new(1);
    v1.put(scalar("number", PrimitiveKind::Int8, 1), scalar("number", PrimitiveKind::Int32, 0))
        .unwrap();
    v1.put(field("label", text_type(), 1), field("old_label", text_type(), 0))
        .unwrap();

    let mut v2 = VersionMap::new(2);
    v2.put(scalar("number", PrimitiveKind::Float64, 2), scalar("number", PrimitiveKind::Int8, 1))
        .unwrap();
    v2.put(
        field("taps", FieldType::vector(PrimitiveKind::Int32), 2),
        field("taps", FieldType::vector(PrimitiveKind::Int16), 1),
    )
    .unwrap();
    v2.put(scalar("flag", PrimitiveKind::Bool, 2), FieldDescriptor::nowhere())
        .unwrap();

    ClassSchema::builder("Sensor", 2)
        .field("number", FieldType::scalar(PrimitiveKind::Float64))
        .field("label", text_type())
        .field("count", FieldType::scalar(PrimitiveKind::UInt16))
        .field("taps", FieldType::vector(PrimitiveKind::Int32))
        .field("flag", FieldType::scalar(PrimitiveKind::Bool))
        .version_map(v1)
        .version_map(v2)
        .migration(FnOverride::new(|_: &RawFieldSet, _: &FieldDescriptor| {
            Ok(FieldValue::scalar(Primitive::Bool(false)))
        }))
        .build(config)
        .unwrap()
}

fn registry(config: &MigrationConfig) -> ClassRegistry {
    let mut registry = ClassRegistry::new();
    registry.register(sensor_schema(config)).unwrap();
    registry
}

fn v0_record(number: i32) -> ObjectRecord {
    ObjectRecord::new(
        "Sensor",
        0,
        vec![
            (scalar("number", PrimitiveKind::Int32, 0), FieldValue::scalar(Primitive::Int32(number))),
            (field("old_label", text_type(), 0), FieldValue::text("abc")),
            (scalar("count", PrimitiveKind::UInt16, 0), FieldValue::scalar(Primitive::UInt16(7))),
            (
                field("taps", FieldType::vector(PrimitiveKind::Int16), 0),
                FieldValue::vector([Primitive::Int16(1), Primitive::Int16(-2)]),
            ),
        ],
    )
    .unwrap()
}

// =============================================================================
// Two-Step Walk
// =============================================================================

#[test]
fn test_v0_object_walks_both_steps() {
    let config = MigrationConfig::default();
    let registry = registry(&config);
    let adapter = MigrationAdapter::new(&registry, &config);

    let loaded = adapter.load(&v0_record(100)).unwrap();
    assert_eq!(loaded.version(), 2);
    assert!(loaded.dropped().is_empty());

    let number = loaded.field("number").unwrap();
    assert_eq!(number.value, FieldValue::scalar(Primitive::Float64(100.0)));
    assert_eq!(
        number.resolution,
        Resolution::Mapped {
            from: scalar("number", PrimitiveKind::Int32, 0)
        }
    );

    let label = loaded.field("label").unwrap();
    assert_eq!(label.value, FieldValue::text("abc"));
    assert_eq!(
        label.resolution,
        Resolution::Mapped {
            from: field("old_label", text_type(), 0)
        }
    );

    let count = loaded.field("count").unwrap();
    assert_eq!(count.value, FieldValue::scalar(Primitive::UInt16(7)));
    assert_eq!(
        count.resolution,
        Resolution::Mapped {
            from: scalar("count", PrimitiveKind::UInt16, 0)
        }
    );

    // No entry at v1, widening at v2
    assert_eq!(
        loaded.get("taps"),
        Some(&FieldValue::vector([Primitive::Int32(1), Primitive::Int32(-2)]))
    );

    let flag = loaded.field("flag").unwrap();
    assert_eq!(flag.value, FieldValue::scalar(Primitive::Bool(false)));
    assert_eq!(flag.resolution, Resolution::Synthesized);
}

/// 300 fits in Float64, but the object passed through Int8 at v1.
#[test]
fn test_narrowing_in_the_middle_is_checked() {
    let config = MigrationConfig::default();
    let registry = registry(&config);
    let adapter = MigrationAdapter::new(&registry, &config);

    let err = adapter.load(&v0_record(300)).unwrap_err();
    match &err {
        MigrationError::ConversionFailed { class, from, to, .. } => {
            assert_eq!(class, "Sensor");
            assert_eq!(from, &scalar("number", PrimitiveKind::Int32, 0));
            assert_eq!(to, &scalar("number", PrimitiveKind::Int8, 1));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_narrowing_in_the_middle_truncates_when_lossy() {
    let config = MigrationConfig::lossy();
    let registry = registry(&config);
    let adapter = MigrationAdapter::new(&registry, &config);

    let loaded = adapter.load(&v0_record(300)).unwrap();
    assert_eq!(loaded.get("number"), Some(&FieldValue::scalar(Primitive::Float64(44.0))));
}

// =============================================================================
// One-Step and Zero-Step Walks
// =============================================================================

#[test]
fn test_v1_object_walks_one_step() {
    let config = MigrationConfig::default();
    let registry = registry(&config);
    let adapter = MigrationAdapter::new(&registry, &config);

    let record = ObjectRecord::new(
        "Sensor",
        1,
        vec![
            (scalar("number", PrimitiveKind::Int8, 1), FieldValue::scalar(Primitive::Int8(-5))),
            (field("label", text_type(), 1), FieldValue::text("xy")),
            (scalar("count", PrimitiveKind::UInt16, 1), FieldValue::scalar(Primitive::UInt16(3))),
            (
                field("taps", FieldType::vector(PrimitiveKind::Int16), 1),
                FieldValue::vector([Primitive::Int16(4)]),
            ),
        ],
    )
    .unwrap();

    let loaded = adapter.load(&record).unwrap();
    assert_eq!(loaded.get("number"), Some(&FieldValue::scalar(Primitive::Float64(-5.0))));
    assert_eq!(
        loaded.field("label").unwrap().resolution,
        Resolution::Mapped {
            from: field("label", text_type(), 1)
        }
    );
    assert_eq!(loaded.get("label"), Some(&FieldValue::text("xy")));
    assert_eq!(loaded.get("taps"), Some(&FieldValue::vector([Primitive::Int32(4)])));
    assert_eq!(loaded.field("flag").unwrap().resolution, Resolution::Synthesized);
}

#[test]
fn test_current_object_is_direct() {
    let config = MigrationConfig::default();
    let registry = registry(&config);
    let adapter = MigrationAdapter::new(&registry, &config);

    let record = adapter
        .save(
            "Sensor",
            vec![
                ("number", FieldValue::scalar(Primitive::Float64(2.5))),
                ("label", FieldValue::text("now")),
                ("count", FieldValue::scalar(Primitive::UInt16(1))),
                ("taps", FieldValue::vector(Vec::new())),
                ("flag", FieldValue::scalar(Primitive::Bool(true))),
            ],
        )
        .unwrap();

    let loaded = adapter.load(&record).unwrap();
    assert!(loaded.fields().iter().all(|f| f.resolution == Resolution::Direct));
    assert_eq!(loaded.get("flag"), Some(&FieldValue::scalar(Primitive::Bool(true))));
}

#[test]
fn test_future_version_rejected() {
    let config = MigrationConfig::default();
    let registry = registry(&config);
    let adapter = MigrationAdapter::new(&registry, &config);

    let record = ObjectRecord::new("Sensor", 3, Vec::new()).unwrap();
    let err = adapter.load(&record).unwrap_err();
    assert_eq!(
        err,
        MigrationError::StoredVersionTooNew {
            class: "Sensor".into(),
            stored: 3,
            current: 2,
        }
    );
}

// =============================================================================
// Lineage and Projection
// =============================================================================

#[test]
fn test_lineage_of_renamed_field() {
    let config = MigrationConfig::default();
    let schema = sensor_schema(&config);

    let lineage = schema
        .chain()
        .lineage(&field("label", text_type(), 2), 0)
        .unwrap();
    assert_eq!(
        lineage.steps(),
        &[
            field("label", text_type(), 2),
            field("label", text_type(), 1),
            field("old_label", text_type(), 0),
        ]
    );
    assert!(!lineage.is_unchanged());
    assert!(!lineage.is_introduced());

    let count = schema
        .chain()
        .lineage(&scalar("count", PrimitiveKind::UInt16, 2), 0)
        .unwrap();
    assert!(count.is_unchanged());
    assert_eq!(count.origin(), &scalar("count", PrimitiveKind::UInt16, 0));
}

#[test]
fn test_expected_fields_at_each_version() {
    let config = MigrationConfig::default();
    let schema = sensor_schema(&config);

    let at_v0 = schema.get_expected_fields(0).unwrap();
    assert_eq!(
        at_v0,
        vec![
            scalar("number", PrimitiveKind::Int32, 0),
            field("old_label", text_type(), 0),
            scalar("count", PrimitiveKind::UInt16, 0),
            field("taps", FieldType::vector(PrimitiveKind::Int16), 0),
        ]
    );

    let at_v1 = schema.get_expected_fields(1).unwrap();
    assert_eq!(at_v1.len(), 4);
    assert_eq!(at_v1[0], scalar("number", PrimitiveKind::Int8, 1));
    assert!(at_v1.iter().all(|d| d.name() != "flag"));

    assert_eq!(schema.get_expected_fields(2).unwrap().len(), 5);
}

// =============================================================================
// Object References and Matrices
// =============================================================================

/// Model history:
///
/// | field    | v0                 | v1                 | v2             |
/// |----------|--------------------|--------------------|----------------|
/// | features | int_features (obj) | float_features     | float_features |
/// | weights  | Matrix Int32       | Matrix Int32       | Matrix Float64 |
fn model_registry(config: &MigrationConfig) -> ClassRegistry {
    let object = FieldType::scalar(PrimitiveKind::ObjectRef);

    let mut v1 = VersionMap::new(1);
    v1.put(field("float_features", object, 1), field("int_features", object, 0))
        .unwrap();

    let mut v2 = VersionMap::new(2);
    v2.put(
        field("weights", FieldType::matrix(PrimitiveKind::Float64), 2),
        field("weights", FieldType::matrix(PrimitiveKind::Int32), 1),
    )
    .unwrap();

    let schema = ClassSchema::builder("Model", 2)
        .field("float_features", object)
        .field("weights", FieldType::matrix(PrimitiveKind::Float64))
        .version_map(v1)
        .version_map(v2)
        .build(config)
        .unwrap();

    let mut registry = ClassRegistry::new();
    registry.register(schema).unwrap();
    registry
}

fn v0_model(features: Option<ObjectHandle>) -> ObjectRecord {
    ObjectRecord::new(
        "Model",
        0,
        vec![
            (
                field("int_features", FieldType::scalar(PrimitiveKind::ObjectRef), 0),
                FieldValue::scalar(Primitive::Object(features)),
            ),
            (
                field("weights", FieldType::matrix(PrimitiveKind::Int32), 0),
                FieldValue::matrix(2, 3, (1..=6).map(Primitive::Int32)),
            ),
        ],
    )
    .unwrap()
}

#[test]
fn test_renamed_object_reference_keeps_handle() {
    let config = MigrationConfig::default();
    let registry = model_registry(&config);
    let adapter = MigrationAdapter::new(&registry, &config);

    let loaded = adapter.load(&v0_model(Some(ObjectHandle(7)))).unwrap();
    assert!(loaded.dropped().is_empty());

    let features = loaded.field("float_features").unwrap();
    assert_eq!(features.value, FieldValue::scalar(Primitive::Object(Some(ObjectHandle(7)))));
    assert_eq!(
        features.resolution,
        Resolution::Mapped {
            from: field("int_features", FieldType::scalar(PrimitiveKind::ObjectRef), 0)
        }
    );

    // A null reference is carried the same way
    let loaded = adapter.load(&v0_model(None)).unwrap();
    assert_eq!(
        loaded.get("float_features"),
        Some(&FieldValue::scalar(Primitive::Object(None)))
    );
}

#[test]
fn test_matrix_retyped_keeps_shape() {
    let config = MigrationConfig::default();
    let registry = model_registry(&config);
    let adapter = MigrationAdapter::new(&registry, &config);

    let loaded = adapter.load(&v0_model(Some(ObjectHandle(1)))).unwrap();
    let weights = loaded.field("weights").unwrap();
    assert_eq!(
        weights.resolution,
        Resolution::Mapped {
            from: field("weights", FieldType::matrix(PrimitiveKind::Int32), 0)
        }
    );
    match &weights.value {
        FieldValue::Matrix { rows, cols, .. } => {
            assert_eq!((*rows, *cols), (2, 3));
        }
        other => panic!("expected a matrix, got {:?}", other),
    }
    assert_eq!(
        weights.value,
        FieldValue::matrix(2, 3, (1..=6).map(|v| Primitive::Float64(v as f64)))
    );
}

#[test]
fn test_upgraded_model_reloads_directly() {
    let config = MigrationConfig::default();
    let registry = model_registry(&config);
    let adapter = MigrationAdapter::new(&registry, &config);

    let upgraded = adapter.load(&v0_model(Some(ObjectHandle(42)))).unwrap();
    let record = adapter.save_resolved(&upgraded).unwrap();
    assert_eq!(record.version(), 2);

    let reloaded = adapter.load(&record).unwrap();
    assert!(reloaded.fields().iter().all(|f| f.resolution == Resolution::Direct));
    assert_eq!(
        reloaded.get("float_features"),
        Some(&FieldValue::scalar(Primitive::Object(Some(ObjectHandle(42)))))
    );
    assert_eq!(reloaded.get("weights"), upgraded.get("weights"));
}
