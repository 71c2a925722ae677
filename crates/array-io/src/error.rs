//! Error types for array I/O.

use thiserror::Error;

use crate::types::DataType;

/// Errors that can occur while planning or performing array I/O.
#[derive(Error, Debug)]
pub enum ArrayIoError {
    /// A range or section does not fit the shape it is applied to.
    #[error("invalid section: {0}")]
    InvalidSection(String),

    /// A record or element index outside `[0, len)`.
    #[error("index {index} out of range [0, {len})")]
    OutOfRange { index: i64, len: usize },

    /// The requested operation has no case for this element type.
    #[error("unsupported element type {data_type} for {operation}")]
    UnsupportedType {
        data_type: DataType,
        operation: &'static str,
    },

    /// No structure member with this name.
    #[error("unknown structure member: {0}")]
    UnknownMember(String),

    /// A structure layout declared the same member name twice.
    #[error("duplicate structure member: {0}")]
    DuplicateMember(String),

    /// The physical source failed while reading a section.
    #[error("I/O failure reading section {section}: {source}")]
    IoFailure {
        section: String,
        #[source]
        source: std::io::Error,
    },

    /// Storage/IO error outside of a section read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Destination or member data does not have the expected kind.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Member data has the wrong number of elements.
    #[error("member {member} expects {expected} elements, got {actual}")]
    MemberSize {
        member: String,
        expected: usize,
        actual: usize,
    },

    /// A request exceeds the addressable destination size.
    #[error("read request too large: {nelems} elements (limit {limit})")]
    TooLarge { nelems: u64, limit: u64 },

    /// A cancellable read was stopped between chunks.
    #[error("read of section {section} cancelled after {done} of {total} elements")]
    Cancelled {
        section: String,
        done: u64,
        total: u64,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ArrayIoError {
    /// Create an InvalidSection error.
    pub fn invalid_section(msg: impl Into<String>) -> Self {
        Self::InvalidSection(msg.into())
    }

    /// Create an OutOfRange error.
    pub fn out_of_range(index: i64, len: usize) -> Self {
        Self::OutOfRange { index, len }
    }

    /// Create an UnsupportedType error.
    pub fn unsupported(data_type: DataType, operation: &'static str) -> Self {
        Self::UnsupportedType {
            data_type,
            operation,
        }
    }

    /// Create a TypeMismatch error.
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Wrap a source error with the section being read.
    pub fn io_failure(section: impl ToString, source: std::io::Error) -> Self {
        Self::IoFailure {
            section: section.to_string(),
            source,
        }
    }

    /// True for errors raised by validation, before any I/O was attempted.
    pub fn is_validation(&self) -> bool {
        !matches!(
            self,
            Self::IoFailure { .. } | Self::Io(_) | Self::Cancelled { .. }
        )
    }
}

/// Result type for array I/O operations.
pub type Result<T> = std::result::Result<T, ArrayIoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_failure_carries_section_and_cause() {
        let err = ArrayIoError::io_failure(
            "0:1,2:3",
            std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short read"),
        );
        let msg = err.to_string();
        assert!(msg.contains("0:1,2:3"));
        assert!(msg.contains("short read"));
        assert!(std::error::Error::source(&err).is_some());
        assert!(!err.is_validation());
    }

    #[test]
    fn test_validation_classification() {
        assert!(ArrayIoError::invalid_section("bad").is_validation());
        assert!(ArrayIoError::out_of_range(5, 3).is_validation());
        assert!(ArrayIoError::unsupported(DataType::Sequence, "read").is_validation());
    }
}
