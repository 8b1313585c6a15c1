//! MapChain - every version map of one class, and the walk across them
//!
//! A field's lineage is the list of descriptors it had at each version,
//! from the current version back to the stored one. The walk asks the map
//! of each version in turn:
//!
//! - entry with a predecessor: continue from the predecessor
//! - entry with the nowhere descriptor: the field was introduced there, stop
//! - no entry, or no map for that version: unchanged, same shape one
//!   version earlier

use std::collections::BTreeMap;

use crate::descriptor::FieldDescriptor;
use crate::migration::MigrationResult;

use super::map::VersionMap;

/// Versions a field passed through, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lineage {
    steps: Vec<FieldDescriptor>,
}

impl Lineage {
    /// Descriptors newest first; the last one is the origin
    pub fn steps(&self) -> &[FieldDescriptor] {
        &self.steps
    }

    /// Where the walk ended: a descriptor at the stored version, or nowhere
    pub fn origin(&self) -> &FieldDescriptor {
        // Never empty: the target itself is always the first step
        &self.steps[self.steps.len() - 1]
    }

    /// The field did not exist at the stored version
    pub fn is_introduced(&self) -> bool {
        self.origin().is_nowhere()
    }

    /// The field kept its shape across every step
    pub fn is_unchanged(&self) -> bool {
        self.steps.windows(2).all(|w| w[0].same_shape(&w[1]))
    }

    /// Consecutive (older, newer) pairs, oldest first, for replaying
    /// conversions forward. Empty for introduced fields.
    pub fn forward_steps(&self) -> impl Iterator<Item = (&FieldDescriptor, &FieldDescriptor)> {
        let replayable = !self.is_introduced();
        self.steps
            .windows(2)
            .rev()
            .filter(move |_| replayable)
            .map(|w| (&w[1], &w[0]))
    }
}

/// Finalized version maps of one class, keyed by target version.
#[derive(Debug, Clone, Default)]
pub struct MapChain {
    maps: BTreeMap<u32, VersionMap>,
}

impl MapChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a map. A second map for the same version is merged into the
    /// first entry by entry, with the usual `put` checks.
    pub fn add(&mut self, map: VersionMap) -> MigrationResult<()> {
        match self.maps.get_mut(&map.version()) {
            None => {
                self.maps.insert(map.version(), map);
            }
            Some(existing) => {
                for (key, value) in map.entries() {
                    existing.put(key.clone(), value.clone())?;
                }
            }
        }
        Ok(())
    }

    /// Finalizes every map still open
    pub fn finalize_all(&mut self) {
        for map in self.maps.values_mut() {
            map.finalize_map();
        }
    }

    /// Map for the transition into `version`
    pub fn get(&self, version: u32) -> Option<&VersionMap> {
        self.maps.get(&version)
    }

    pub fn maps(&self) -> impl Iterator<Item = &VersionMap> {
        self.maps.values()
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    /// Walks `target` back from its own version to `to_version`.
    ///
    /// `to_version` above the target's version yields the target alone.
    pub fn lineage(&self, target: &FieldDescriptor, to_version: u32) -> MigrationResult<Lineage> {
        let mut steps = vec![target.clone()];
        let mut current = target.clone();

        for version in (to_version.saturating_add(1)..=target.version()).rev() {
            let previous = match self.maps.get(&version) {
                Some(map) => map.get(&current)?.cloned(),
                None => None,
            };
            let previous = previous.unwrap_or_else(|| current.with_version(version - 1));
            if previous.is_nowhere() {
                steps.push(previous);
                break;
            }
            steps.push(previous.clone());
            current = previous;
        }

        Ok(Lineage { steps })
    }
}
