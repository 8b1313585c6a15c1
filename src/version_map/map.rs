//! VersionMap - field mappings for one class-version transition
//!
//! A map for version N records, for every field that changed between N-1
//! and N, what the field looked like at N-1. Fields introduced at N map to
//! the nowhere descriptor. Fields that did not change need no entry.
//!
//! Lifecycle:
//! - Open: `put` only
//! - Finalized: sorted by key shape, `get` only
//!
//! Misuse in either direction is returned as an error at the call site.

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

use crate::descriptor::FieldDescriptor;
use crate::migration::{MigrationError, MigrationResult};
use crate::observability::{log_event_with_fields, Event};

/// Mappings for the transition `version - 1 -> version`.
#[derive(Debug, Clone)]
pub struct VersionMap {
    /// Target version N
    version: u32,
    /// (descriptor at N, descriptor at N-1 or nowhere)
    entries: Vec<(FieldDescriptor, FieldDescriptor)>,
    finalized: bool,
    /// Predecessors shared by more than one key, with their fan-out
    ambiguous: Vec<(FieldDescriptor, usize)>,
}

impl VersionMap {
    /// Creates an empty, open map for the transition into `version`.
    pub fn new(version: u32) -> Self {
        Self {
            version,
            entries: Vec::new(),
            finalized: false,
            ambiguous: Vec::new(),
        }
    }

    /// Target version of this map
    #[inline]
    pub fn version(&self) -> u32 {
        self.version
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Entries in insertion order (open) or key order (finalized)
    pub fn entries(&self) -> &[(FieldDescriptor, FieldDescriptor)] {
        &self.entries
    }

    /// Records that `key` (at this map's version) was `value` one version
    /// earlier, or did not exist when `value` is the nowhere descriptor.
    ///
    /// Putting an identical entry twice is a no-op.
    pub fn put(&mut self, key: FieldDescriptor, value: FieldDescriptor) -> MigrationResult<()> {
        if self.finalized {
            return Err(MigrationError::MutateAfterFinalize {
                version: self.version,
            });
        }
        if key.is_nowhere() {
            return Err(MigrationError::SentinelKey {
                version: self.version,
            });
        }
        if key.version() != self.version {
            return Err(MigrationError::VersionMismatch {
                version: self.version,
                expected: self.version,
                found: key.version(),
                field: key,
            });
        }
        if !value.is_nowhere() && self.version.checked_sub(1) != Some(value.version()) {
            return Err(MigrationError::VersionMismatch {
                version: self.version,
                expected: self.version.saturating_sub(1),
                found: value.version(),
                field: value,
            });
        }

        if let Some((_, existing)) = self.entries.iter().find(|(k, _)| k.same_shape(&key)) {
            if *existing == value {
                return Ok(());
            }
            return Err(MigrationError::DuplicateMappingConflict {
                version: self.version,
                existing: existing.clone(),
                key,
                conflicting: value,
            });
        }

        self.entries.push((key, value));
        Ok(())
    }

    /// Sorts the entries and freezes the map. Calling it again is a no-op.
    ///
    /// Fan-out (one predecessor feeding several keys) is logged as
    /// MAPPING_AMBIGUOUS and kept in [`VersionMap::ambiguous_targets`].
    pub fn finalize_map(&mut self) {
        if self.finalized {
            return;
        }

        self.entries.sort_by(|(a, _), (b, _)| a.shape_cmp(b));

        let mut fan_out: BTreeMap<&FieldDescriptor, usize> = BTreeMap::new();
        for (_, value) in self.entries.iter().filter(|(_, v)| !v.is_nowhere()) {
            *fan_out.entry(value).or_insert(0) += 1;
        }
        self.ambiguous = fan_out
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(value, count)| (value.clone(), count))
            .collect();

        let version = self.version.to_string();
        for (value, count) in &self.ambiguous {
            log_event_with_fields(
                Event::MappingAmbiguous,
                &[
                    ("version", &version),
                    ("predecessor", &value.to_string()),
                    ("targets", &count.to_string()),
                ],
            );
        }

        self.finalized = true;
        log_event_with_fields(
            Event::MapFinalized,
            &[("version", &version), ("entries", &self.entries.len().to_string())],
        );
    }

    /// Predecessor of `key` at this transition, matched by shape only.
    ///
    /// `Ok(None)` means the map has no entry for this field.
    pub fn get(&self, key: &FieldDescriptor) -> MigrationResult<Option<&FieldDescriptor>> {
        if !self.finalized {
            return Err(MigrationError::UseBeforeFinalize {
                version: self.version,
            });
        }
        Ok(self
            .entries
            .binary_search_by(|(k, _)| k.shape_cmp(key))
            .ok()
            .map(|idx| &self.entries[idx].1))
    }

    /// Predecessors shared by several keys, with the number of keys
    pub fn ambiguous_targets(&self) -> &[(FieldDescriptor, usize)] {
        &self.ambiguous
    }

    /// Human-readable dump of every entry
    pub fn print_map(&self) -> String {
        let mut out = String::new();
        let order = if self.finalized {
            "finalized, key order"
        } else {
            "open, insertion order"
        };
        let _ = writeln!(
            out,
            "version map v{} ({}, {} entries)",
            self.version,
            order,
            self.entries.len()
        );
        for (key, value) in &self.entries {
            let _ = writeln!(out, "  {} <- {}", key, value);
        }
        out
    }
}

impl fmt::Display for VersionMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.print_map())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{FieldType, PrimitiveKind};

    fn scalar(name: &str, primitive: PrimitiveKind, version: u32) -> FieldDescriptor {
        FieldDescriptor::typed(name, FieldType::scalar(primitive), version).unwrap()
    }

    fn number_map() -> VersionMap {
        let mut map = VersionMap::new(1);
        map.put(
            scalar("number", PrimitiveKind::Float64, 1),
            scalar("number", PrimitiveKind::Int8, 0),
        )
        .unwrap();
        map.put(scalar("added", PrimitiveKind::Int32, 1), FieldDescriptor::nowhere())
            .unwrap();
        map
    }

    #[test]
    fn test_get_before_finalize_fails() {
        let map = number_map();
        let err = map.get(&scalar("number", PrimitiveKind::Float64, 1)).unwrap_err();
        assert_eq!(err, MigrationError::UseBeforeFinalize { version: 1 });
    }

    #[test]
    fn test_put_after_finalize_fails() {
        let mut map = number_map();
        map.finalize_map();
        let err = map
            .put(scalar("other", PrimitiveKind::Int32, 1), FieldDescriptor::nowhere())
            .unwrap_err();
        assert_eq!(err, MigrationError::MutateAfterFinalize { version: 1 });
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_get_matches_shape_only() {
        let mut map = number_map();
        map.finalize_map();

        // Version of the query does not matter
        for version in [0, 1, 7] {
            let pred = map.get(&scalar("number", PrimitiveKind::Float64, version)).unwrap();
            assert_eq!(pred, Some(&scalar("number", PrimitiveKind::Int8, 0)));
        }

        // Type does
        assert_eq!(map.get(&scalar("number", PrimitiveKind::Int8, 1)).unwrap(), None);
        assert_eq!(map.get(&scalar("missing", PrimitiveKind::Int8, 1)).unwrap(), None);
    }

    #[test]
    fn test_get_returns_sentinel_for_new_field() {
        let mut map = number_map();
        map.finalize_map();
        let pred = map.get(&scalar("added", PrimitiveKind::Int32, 1)).unwrap().unwrap();
        assert!(pred.is_nowhere());
    }

    #[test]
    fn test_identical_put_is_noop() {
        let mut map = number_map();
        map.put(
            scalar("number", PrimitiveKind::Float64, 1),
            scalar("number", PrimitiveKind::Int8, 0),
        )
        .unwrap();
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_conflicting_put_rejected() {
        let mut map = number_map();
        let err = map
            .put(
                scalar("number", PrimitiveKind::Float64, 1),
                scalar("number", PrimitiveKind::Int16, 0),
            )
            .unwrap_err();
        assert!(matches!(err, MigrationError::DuplicateMappingConflict { version: 1, .. }));
        assert_eq!(err.code(), "PARAMIG_DUPLICATE_MAPPING");
    }

    #[test]
    fn test_sentinel_key_rejected() {
        let mut map = VersionMap::new(1);
        let err = map
            .put(FieldDescriptor::nowhere(), scalar("number", PrimitiveKind::Int8, 0))
            .unwrap_err();
        assert_eq!(err, MigrationError::SentinelKey { version: 1 });
    }

    #[test]
    fn test_version_typos_rejected() {
        let mut map = VersionMap::new(2);
        let err = map
            .put(scalar("a", PrimitiveKind::Int8, 1), FieldDescriptor::nowhere())
            .unwrap_err();
        assert!(matches!(err, MigrationError::VersionMismatch { expected: 2, found: 1, .. }));

        let err = map
            .put(scalar("a", PrimitiveKind::Int8, 2), scalar("a", PrimitiveKind::Int8, 0))
            .unwrap_err();
        assert!(matches!(err, MigrationError::VersionMismatch { expected: 1, found: 0, .. }));
    }

    #[test]
    fn test_finalize_idempotent() {
        let mut map = number_map();
        map.finalize_map();
        let first: Vec<_> = map.entries().to_vec();
        map.finalize_map();
        assert_eq!(map.entries(), first.as_slice());
        assert!(map.is_finalized());
    }

    #[test]
    fn test_finalize_sorts_by_key() {
        let mut map = number_map();
        assert_eq!(map.entries()[0].0.name(), "number");
        map.finalize_map();
        assert_eq!(map.entries()[0].0.name(), "added");
        assert_eq!(map.entries()[1].0.name(), "number");
    }

    #[test]
    fn test_fan_out_detected() {
        let mut map = VersionMap::new(1);
        let old = scalar("features", PrimitiveKind::Int32, 0);
        map.put(scalar("left", PrimitiveKind::Int32, 1), old.clone()).unwrap();
        map.put(scalar("right", PrimitiveKind::Int32, 1), old.clone()).unwrap();
        map.put(scalar("x", PrimitiveKind::Int32, 1), FieldDescriptor::nowhere())
            .unwrap();
        map.put(scalar("y", PrimitiveKind::Int32, 1), FieldDescriptor::nowhere())
            .unwrap();
        map.finalize_map();

        // Shared sentinels are not fan-out
        assert_eq!(map.ambiguous_targets(), &[(old, 2)]);
    }

    #[test]
    fn test_print_map_states_order() {
        let mut map = number_map();
        let open = map.print_map();
        assert!(open.starts_with("version map v1 (open, insertion order, 2 entries)"));
        assert!(open.contains("\"added\" [scalar int32] v1 <- <nowhere>"));

        map.finalize_map();
        assert!(map.to_string().contains("finalized, key order"));
    }
}
