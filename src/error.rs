//! Error types for punck-link.

use thiserror::Error;

use crate::params::FieldType;

/// Main error type for all link operations.
#[derive(Debug, Error)]
pub enum PunckError {
    /// I/O error on the underlying MIDI byte stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error (sequence files and configuration).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Protocol error (missing markers, oversized frame, etc.).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Frame is shorter than its command's header.
    #[error("Frame too short: {len} bytes, need at least {min}")]
    FrameTooShort { len: usize, min: usize },

    /// Command byte not in the layout table.
    #[error("Unknown command: {0:#04x}")]
    UnknownCommand(u8),

    /// Decoded payload is shorter than the schema or grid requires.
    #[error("Payload too short: expected {expected} bytes, got {actual}")]
    PayloadTooShort { expected: usize, actual: usize },

    /// Voice id not present in the catalog.
    #[error("Unknown voice: {0}")]
    UnknownVoice(u8),

    /// Voice has no editable parameter block.
    #[error("Voice {0} has no parameter block")]
    NoParameterBlock(&'static str),

    /// Field name not present in the schema.
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// Value type does not match the schema field.
    #[error("Field {field} expects {expected:?}")]
    FieldTypeMismatch {
        field: &'static str,
        expected: FieldType,
    },

    /// Grid index or value outside the allowed range.
    #[error("Out of range: {0}")]
    OutOfRange(String),

    /// Sequence file could not be interpreted.
    #[error("Invalid sequence file: {0}")]
    InvalidExport(String),

    /// Session task or writer has gone away.
    #[error("Connection closed")]
    ConnectionClosed,
}

/// Result type alias using PunckError.
pub type Result<T> = std::result::Result<T, PunckError>;
