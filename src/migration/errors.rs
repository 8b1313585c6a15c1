//! Migration error types
//!
//! Error codes:
//! - PARAMIG_UNMAPPED_REQUIRED_FIELD (REJECT)
//! - PARAMIG_DUPLICATE_MAPPING (FATAL)
//! - PARAMIG_USE_BEFORE_FINALIZE (FATAL)
//! - PARAMIG_MUTATE_AFTER_FINALIZE (FATAL)
//!
//! REJECT errors abort the load of one object. FATAL errors are class
//! registration bugs and surface at the call site that misused the API.

use std::fmt;
use thiserror::Error;

use crate::descriptor::{FieldDescriptor, FieldType};

/// Severity levels for migration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The object being loaded is rejected, the caller continues
    Reject,
    /// Programming error in class registration
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Result type for migration operations
pub type MigrationResult<T> = Result<T, MigrationError>;

/// Errors raised while registering migrations or resolving stored fields.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MigrationError {
    // ==================
    // Data errors
    // ==================
    /// Expected field has no located value and no override produced one
    #[error("class '{class}': cannot materialize field {field}: no stored predecessor and no migration provided it")]
    UnmappedRequiredField { class: String, field: FieldDescriptor },

    /// Two stored entries claim the same identity
    #[error("class '{class}': stored field {field} appears more than once")]
    DuplicateStoredField { class: String, field: FieldDescriptor },

    /// Representation change between two versions of a field failed
    #[error("class '{class}': cannot convert {from} to {to}: {reason}")]
    ConversionFailed {
        class: String,
        from: FieldDescriptor,
        to: FieldDescriptor,
        reason: String,
    },

    /// Override returned a value whose shape does not match its target
    #[error("class '{class}': migration for {field} produced a {actual} value")]
    OverrideTypeMismatch {
        class: String,
        field: FieldDescriptor,
        actual: String,
    },

    /// Override reported its own failure
    #[error("class '{class}': migration for {field} failed: {reason}")]
    OverrideFailed {
        class: String,
        field: FieldDescriptor,
        reason: String,
    },

    /// Object was written by a newer build
    #[error("class '{class}': stored version {stored} is newer than current version {current}")]
    StoredVersionTooNew { class: String, stored: u32, current: u32 },

    /// No class with this name is registered
    #[error("unknown class '{0}'")]
    UnknownClass(String),

    /// Values handed to save do not match the class field table
    #[error("class '{class}': cannot save: {reason}")]
    SaveMismatch { class: String, reason: String },

    // ==================
    // Registration errors
    // ==================
    /// Descriptor failed construction checks
    #[error("invalid field descriptor: {reason}")]
    InvalidDescriptor { reason: String },

    /// Same key registered twice with different values
    #[error("version map v{version}: {key} already maps to {existing}, refusing {conflicting}")]
    DuplicateMappingConflict {
        version: u32,
        key: FieldDescriptor,
        existing: FieldDescriptor,
        conflicting: FieldDescriptor,
    },

    /// One older field feeds several newer fields under the reject policy
    #[error("version map v{version}: {value} is the predecessor of {count} fields")]
    AmbiguousMapping {
        version: u32,
        value: FieldDescriptor,
        count: usize,
    },

    /// The sentinel was used as a map key
    #[error("version map v{version}: the nowhere descriptor cannot be a key")]
    SentinelKey { version: u32 },

    /// Entry versions do not fit the map's transition
    #[error("version map v{version}: {field} has version {found}, expected {expected}")]
    VersionMismatch {
        version: u32,
        field: FieldDescriptor,
        expected: u32,
        found: u32,
    },

    /// Lookup on a map that was never finalized
    #[error("version map v{version} queried before finalize_map")]
    UseBeforeFinalize { version: u32 },

    /// Insert into a finalized map
    #[error("version map v{version} modified after finalize_map")]
    MutateAfterFinalize { version: u32 },

    /// Class field table declares a name twice
    #[error("class '{class}': field '{name}' declared more than once")]
    DuplicateField { class: String, name: String },

    /// Class registered twice
    #[error("class '{0}' is already registered")]
    DuplicateClass(String),
}

impl MigrationError {
    /// Convenience constructor for conversion failures
    pub fn conversion(
        class: impl Into<String>,
        from: &FieldDescriptor,
        to: &FieldDescriptor,
        reason: impl Into<String>,
    ) -> Self {
        MigrationError::ConversionFailed {
            class: class.into(),
            from: from.clone(),
            to: to.clone(),
            reason: reason.into(),
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            MigrationError::UnmappedRequiredField { .. } => "PARAMIG_UNMAPPED_REQUIRED_FIELD",
            MigrationError::DuplicateStoredField { .. } => "PARAMIG_DUPLICATE_STORED_FIELD",
            MigrationError::ConversionFailed { .. } => "PARAMIG_CONVERSION_FAILED",
            MigrationError::OverrideTypeMismatch { .. } => "PARAMIG_OVERRIDE_TYPE_MISMATCH",
            MigrationError::OverrideFailed { .. } => "PARAMIG_OVERRIDE_FAILED",
            MigrationError::StoredVersionTooNew { .. } => "PARAMIG_STORED_VERSION_TOO_NEW",
            MigrationError::UnknownClass(_) => "PARAMIG_UNKNOWN_CLASS",
            MigrationError::SaveMismatch { .. } => "PARAMIG_SAVE_MISMATCH",
            MigrationError::InvalidDescriptor { .. } => "PARAMIG_INVALID_DESCRIPTOR",
            MigrationError::DuplicateMappingConflict { .. } => "PARAMIG_DUPLICATE_MAPPING",
            MigrationError::AmbiguousMapping { .. } => "PARAMIG_AMBIGUOUS_MAPPING",
            MigrationError::SentinelKey { .. } => "PARAMIG_SENTINEL_KEY",
            MigrationError::VersionMismatch { .. } => "PARAMIG_VERSION_MISMATCH",
            MigrationError::UseBeforeFinalize { .. } => "PARAMIG_USE_BEFORE_FINALIZE",
            MigrationError::MutateAfterFinalize { .. } => "PARAMIG_MUTATE_AFTER_FINALIZE",
            MigrationError::DuplicateField { .. } => "PARAMIG_DUPLICATE_FIELD",
            MigrationError::DuplicateClass(_) => "PARAMIG_DUPLICATE_CLASS",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            MigrationError::UnmappedRequiredField { .. }
            | MigrationError::DuplicateStoredField { .. }
            | MigrationError::ConversionFailed { .. }
            | MigrationError::OverrideTypeMismatch { .. }
            | MigrationError::OverrideFailed { .. }
            | MigrationError::StoredVersionTooNew { .. }
            | MigrationError::UnknownClass(_)
            | MigrationError::SaveMismatch { .. } => Severity::Reject,
            _ => Severity::Fatal,
        }
    }

    /// Whether this error signals a class registration bug
    pub fn is_programming_error(&self) -> bool {
        self.severity() == Severity::Fatal
    }

    /// The class the error is about, if it is tied to one
    pub fn class(&self) -> Option<&str> {
        match self {
            MigrationError::UnmappedRequiredField { class, .. }
            | MigrationError::DuplicateStoredField { class, .. }
            | MigrationError::ConversionFailed { class, .. }
            | MigrationError::OverrideTypeMismatch { class, .. }
            | MigrationError::OverrideFailed { class, .. }
            | MigrationError::StoredVersionTooNew { class, .. }
            | MigrationError::SaveMismatch { class, .. }
            | MigrationError::DuplicateField { class, .. } => Some(class),
            MigrationError::UnknownClass(class) | MigrationError::DuplicateClass(class) => Some(class),
            _ => None,
        }
    }

    /// The field the error is about, if it is tied to one
    pub fn field(&self) -> Option<&FieldDescriptor> {
        match self {
            MigrationError::UnmappedRequiredField { field, .. }
            | MigrationError::DuplicateStoredField { field, .. }
            | MigrationError::OverrideTypeMismatch { field, .. }
            | MigrationError::OverrideFailed { field, .. }
            | MigrationError::VersionMismatch { field, .. } => Some(field),
            MigrationError::ConversionFailed { to, .. } => Some(to),
            MigrationError::DuplicateMappingConflict { key, .. } => Some(key),
            _ => None,
        }
    }
}
