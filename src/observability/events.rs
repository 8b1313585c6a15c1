//! Observable migration events
//!
//! Events are explicit and typed. Each event carries its default severity.

use std::fmt;

use super::logger::Severity;

/// Observable events during registration, load and save
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Registration
    /// A version map was sorted and frozen
    MapFinalized,
    /// One older field is the predecessor of several newer ones
    MappingAmbiguous,
    /// A class schema was added to a registry
    ClassRegistered,
    /// The global registry was published
    RegistryInitialized,

    // Load
    /// Resolution of one object begins
    ObjectLoadStart,
    /// One expected field was resolved
    FieldResolved,
    /// A stored field has no counterpart at the current version
    FieldDropped,
    /// Every expected field was resolved
    ObjectLoadComplete,
    /// The object was rejected
    ObjectLoadFailed,

    // Save
    /// An object was written at the current version
    ObjectSaved,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::MapFinalized => "MAP_FINALIZED",
            Event::MappingAmbiguous => "MAPPING_AMBIGUOUS",
            Event::ClassRegistered => "CLASS_REGISTERED",
            Event::RegistryInitialized => "REGISTRY_INITIALIZED",
            Event::ObjectLoadStart => "OBJECT_LOAD_START",
            Event::FieldResolved => "FIELD_RESOLVED",
            Event::FieldDropped => "FIELD_DROPPED",
            Event::ObjectLoadComplete => "OBJECT_LOAD_COMPLETE",
            Event::ObjectLoadFailed => "OBJECT_LOAD_FAILED",
            Event::ObjectSaved => "OBJECT_SAVED",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::FieldResolved | Event::FieldDropped | Event::ObjectLoadStart => Severity::Trace,
            Event::MappingAmbiguous => Severity::Warn,
            Event::ObjectLoadFailed => Severity::Error,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
