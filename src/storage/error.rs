//! Series storage error types
//!
//! Defines all errors that can occur while storing, referencing or reading
//! series entries.

use crate::container::ContainerError;
use crate::series::SeriesError;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur in the series storage
#[derive(Error, Debug)]
pub enum StorageError {
    /// Mutating call on a read-only handle
    #[error("Storage is read-only")]
    ReadOnlyViolation,

    /// Source file missing on load, or content identity absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Owner reference absent from an entry, or recorded more than once
    #[error("Reference {reference} not found exactly once on entry {content_id}")]
    ReferenceNotFound { content_id: Uuid, reference: String },

    /// Element type has no storage encoding
    #[error("Unsupported data kind: {0}")]
    UnsupportedDataKind(String),

    /// Stored array shape matches no decode rule for its data kind
    #[error("Malformed payload shape: {0}")]
    MalformedPayloadShape(String),

    /// Stored type tag has no registered series type
    #[error("Unresolvable type {module}::{type_name}")]
    UnresolvableType { module: String, type_name: String },

    /// Stored type cannot be read as the requested type
    #[error("Type mismatch: stored {stored}, requested {requested}")]
    TypeMismatch { stored: String, requested: String },

    /// Entry lacks an attribute every entry of its kind carries
    #[error("Entry {content_id} is missing attribute {name}")]
    MissingAttribute { content_id: Uuid, name: String },

    /// Row or column range that is not 1-based with first <= last
    #[error("Invalid index range {first}..={last}")]
    InvalidRange { first: usize, last: usize },

    /// Owner reference string is not `<uuid>__<name>`
    #[error("Invalid owner reference: {0}")]
    InvalidOwnerRef(String),

    /// Underlying container failed
    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<SeriesError> for StorageError {
    fn from(err: SeriesError) -> Self {
        match err {
            SeriesError::InvalidOwnerRef(s) => StorageError::InvalidOwnerRef(s),
            // Decoded content that does not form a valid series
            other => StorageError::MalformedPayloadShape(other.to_string()),
        }
    }
}

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
