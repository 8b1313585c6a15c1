//! Record codec errors
//!
//! Error codes:
//! - PARAMIG_RECORD_TRUNCATED
//! - PARAMIG_RECORD_CORRUPT
//! - PARAMIG_RECORD_IO
//! - PARAMIG_RECORD_MISMATCH
//!
//! Every decode failure other than I/O is corruption: the bytes were not
//! produced by a valid `ObjectRecord::serialize`.

use std::io;
use std::string::FromUtf8Error;
use thiserror::Error;

/// Result type for record encoding and decoding
pub type PersistResult<T> = Result<T, PersistError>;

/// Errors raised by the reference record codec.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("record truncated at offset {offset}: needed {needed} more bytes")]
    Truncated { offset: u64, needed: usize },

    #[error("invalid record length {length} at offset {offset}")]
    InvalidLength { offset: u64, length: usize },

    #[error("checksum mismatch at offset {offset}: computed {computed:08x}, stored {stored:08x}")]
    ChecksumMismatch { offset: u64, computed: u32, stored: u32 },

    #[error("invalid {what} tag {tag}")]
    InvalidTag { what: &'static str, tag: u8 },

    #[error("invalid field at offset {offset}: {reason}")]
    InvalidField { offset: u64, reason: String },

    #[error("invalid UTF-8 in record: {0}")]
    InvalidUtf8(#[from] FromUtf8Error),

    #[error("field '{field}': value is {actual}, descriptor declares {expected}")]
    ValueMismatch {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("record I/O failed: {0}")]
    Io(#[from] io::Error),
}

impl PersistError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            PersistError::Truncated { .. } => "PARAMIG_RECORD_TRUNCATED",
            PersistError::InvalidLength { .. }
            | PersistError::ChecksumMismatch { .. }
            | PersistError::InvalidTag { .. }
            | PersistError::InvalidField { .. }
            | PersistError::InvalidUtf8(_) => "PARAMIG_RECORD_CORRUPT",
            PersistError::ValueMismatch { .. } => "PARAMIG_RECORD_MISMATCH",
            PersistError::Io(_) => "PARAMIG_RECORD_IO",
        }
    }

    /// Whether the bytes themselves are bad, as opposed to the I/O or the
    /// caller's values
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            PersistError::Truncated { .. }
                | PersistError::InvalidLength { .. }
                | PersistError::ChecksumMismatch { .. }
                | PersistError::InvalidTag { .. }
                | PersistError::InvalidField { .. }
                | PersistError::InvalidUtf8(_)
        )
    }
}
