//! Container error types
//!
//! Errors raised by the hierarchical container file: I/O, framing and
//! checksum failures, and misuse of the group/dataset tree.

use thiserror::Error;

/// Errors that can occur while reading or writing a container file
#[derive(Error, Debug)]
pub enum ContainerError {
    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Index serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Chunk compression or decompression failed
    #[error("Compression error: {0}")]
    Compression(String),

    /// Data corruption detected (checksum mismatch, truncated frame)
    #[error("Corrupt container: {0}")]
    Corruption(String),

    /// File is not a container or uses an unknown version
    #[error("Invalid container format: {0}")]
    InvalidFormat(String),

    /// No node exists at the given path
    #[error("Node not found: {0}")]
    NotFound(String),

    /// A node already exists at the given path
    #[error("Node already exists: {0}")]
    AlreadyExists(String),

    /// Path resolves to a dataset where a group was expected
    #[error("Not a group: {0}")]
    NotAGroup(String),

    /// Path resolves to a group (or string list) where a numeric dataset was expected
    #[error("Not a dataset: {0}")]
    NotADataset(String),

    /// Mutation attempted on a container opened read-only
    #[error("Container is open read-only")]
    ReadOnly,

    /// Array shape or selection does not fit the stored extent
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),
}

impl From<bincode::Error> for ContainerError {
    fn from(err: bincode::Error) -> Self {
        ContainerError::Serialization(err.to_string())
    }
}

/// Result type alias for container operations
pub type ContainerResult<T> = Result<T, ContainerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ContainerError::NotFound("time_series/abc".to_string());
        assert_eq!(err.to_string(), "Node not found: time_series/abc");

        let err = ContainerError::ReadOnly;
        assert_eq!(err.to_string(), "Container is open read-only");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ContainerError = io_err.into();
        assert!(matches!(err, ContainerError::Io(_)));
    }
}
