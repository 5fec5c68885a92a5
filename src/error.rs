//! Error types
//!
//! Setup-time errors (`SchemaError`, channel creation/publication) are fatal;
//! `CodecError` and submission back-pressure are per-record and isolated by
//! the bridge loop.

use thiserror::Error;

/// Malformed record layout. Fatal at construction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// Scalar or array element width outside {1, 2, 4, 8}
    #[error("field `{field}` has unsupported width {width} (expected 1, 2, 4 or 8)")]
    InvalidWidth { field: String, width: usize },

    /// Fixed array declared with zero elements
    #[error("array field `{0}` must have a positive element count")]
    EmptyArray(String),

    /// Same field name declared twice
    #[error("duplicate field name `{0}`")]
    DuplicateField(String),

    /// Field sizes or offsets exceed the largest record a ring can carry
    #[error("field `{field}` pushes the record past the maximum size of {max} bytes")]
    TooLarge { field: String, max: usize },

    /// Layout adds up to zero bytes
    #[error("schema has a total record size of zero")]
    Empty,
}

/// Per-record decode/encode failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("record size mismatch: expected {expected} bytes, got {actual}")]
    RecordSizeMismatch { expected: usize, actual: usize },

    #[error("event is missing field `{0}`")]
    MissingField(String),

    #[error("field `{field}`: expected {expected}, found {found}")]
    TypeMismatch {
        field: String,
        expected: String,
        found: String,
    },
}

/// Ring channel setup, submission and teardown errors.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("invalid capacity {capacity}: must be a power of two in {min}..={max}")]
    InvalidCapacity {
        capacity: usize,
        min: usize,
        max: usize,
    },

    #[error("name `{0}` is already published")]
    NameInUse(String),

    #[error("permission denied publishing `{0}`")]
    PermissionDenied(String),

    #[error("channel is already published as `{0}`")]
    AlreadyPublished(String),

    /// Back-pressure: not enough free space for the record right now
    #[error("buffer full: {needed} bytes needed, {free} free")]
    BufferFull { needed: usize, free: usize },

    #[error("record of {len} bytes exceeds the maximum record size of {max}")]
    RecordTooLarge { len: usize, max: usize },

    #[error("channel closed")]
    ChannelClosed,

    /// Attached region does not look like a ring buffer
    #[error("invalid ring layout: {0}")]
    InvalidLayout(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Crate-level error.
#[derive(Debug, Error)]
pub enum Error {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),
}

/// Result type for crate operations
pub type Result<T> = std::result::Result<T, Error>;
