//! Per-class migration hook
//!
//! A class that needs more than renames and representation changes
//! registers one [`MigrationOverride`] on its schema. The resolver asks it
//! first for every expected field, and again as the last resort for fields
//! no stored value can be found for.

use crate::descriptor::FieldDescriptor;

use super::errors::{MigrationError, MigrationResult};
use super::value::FieldValue;
use super::working_set::RawFieldSet;

/// Custom field migration for one class.
///
/// Values returned from either method are checked against `target`'s type;
/// a mismatch fails the load with `OverrideTypeMismatch`.
pub trait MigrationOverride: Send + Sync {
    /// Consulted when `target` is not stored under its exact descriptor,
    /// before the version maps are replayed. `Ok(None)` lets the resolver
    /// continue with its own rules.
    fn try_migrate(
        &self,
        raw: &RawFieldSet,
        target: &FieldDescriptor,
    ) -> MigrationResult<Option<FieldValue>> {
        let _ = (raw, target);
        Ok(None)
    }

    /// Called when `target` has no stored predecessor. The default refuses,
    /// which surfaces as `UnmappedRequiredField`.
    fn migrate(&self, raw: &RawFieldSet, target: &FieldDescriptor) -> MigrationResult<FieldValue> {
        Err(MigrationError::UnmappedRequiredField {
            class: raw.class_name().to_string(),
            field: target.clone(),
        })
    }
}

/// Override built from a closure over the `migrate` slot.
///
/// ```ignore
/// let hook = FnOverride::new(|_raw, target| {
///     Ok(FieldValue::scalar(Primitive::Int32(0)))
/// });
/// ```
pub struct FnOverride<F> {
    migrate: F,
}

impl<F> FnOverride<F>
where
    F: Fn(&RawFieldSet, &FieldDescriptor) -> MigrationResult<FieldValue> + Send + Sync,
{
    pub fn new(migrate: F) -> Self {
        Self { migrate }
    }
}

impl<F> MigrationOverride for FnOverride<F>
where
    F: Fn(&RawFieldSet, &FieldDescriptor) -> MigrationResult<FieldValue> + Send + Sync,
{
    fn migrate(&self, raw: &RawFieldSet, target: &FieldDescriptor) -> MigrationResult<FieldValue> {
        (self.migrate)(raw, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{FieldType, PrimitiveKind};
    use crate::migration::value::Primitive;

    struct Nothing;
    impl MigrationOverride for Nothing {}

    fn target() -> FieldDescriptor {
        FieldDescriptor::typed("m_number", FieldType::scalar(PrimitiveKind::Int32), 1).unwrap()
    }

    #[test]
    fn test_defaults_defer_then_refuse() {
        let raw = RawFieldSet::new("New", 0, Vec::new()).unwrap();
        assert_eq!(Nothing.try_migrate(&raw, &target()).unwrap(), None);

        let err = Nothing.migrate(&raw, &target()).unwrap_err();
        assert_eq!(
            err,
            MigrationError::UnmappedRequiredField {
                class: "New".into(),
                field: target(),
            }
        );
    }

    #[test]
    fn test_fn_override() {
        let raw = RawFieldSet::new("New", 0, Vec::new()).unwrap();
        let hook = FnOverride::new(|_: &RawFieldSet, _: &FieldDescriptor| {
            Ok(FieldValue::scalar(Primitive::Int32(7)))
        });
        assert_eq!(hook.try_migrate(&raw, &target()).unwrap(), None);
        assert_eq!(
            hook.migrate(&raw, &target()).unwrap(),
            FieldValue::scalar(Primitive::Int32(7))
        );
    }
}
