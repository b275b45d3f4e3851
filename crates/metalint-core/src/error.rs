//! Error types and handling for the diagnostic pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for metalint operations
#[derive(Debug, Error)]
pub enum MetalintError {
    /// Configuration loading or validation errors
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// The raw analyzer payload could not be decoded
    #[error("Decode error: {message}")]
    DecodeError { message: String },

    /// File system I/O errors
    #[error("IO error for path '{path}': {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Two edits for the same file overlap; applying them would corrupt it
    #[error(
        "Overlapping edit for file '{file}': edit at byte {start} begins before offset {cursor}"
    )]
    OverlappingEdits {
        file: String,
        start: usize,
        cursor: usize,
    },

    /// An edit points outside the original file content
    #[error("Edit out of bounds for file '{file}': [{start}, {end}) in {len} bytes")]
    EditOutOfBounds {
        file: String,
        start: usize,
        end: usize,
        len: usize,
    },

    /// The analysis backend failed to produce a payload
    #[error("Backend error: {message}")]
    BackendError { message: String, code: i32 },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    InternalError { message: String },
}

/// Error kind enumeration for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Decode,
    Io,
    Overlap,
    Backend,
    Internal,
}

impl MetalintError {
    /// Get the error kind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            MetalintError::ConfigError { .. } => ErrorKind::Config,
            MetalintError::DecodeError { .. } => ErrorKind::Decode,
            MetalintError::IoError { .. } => ErrorKind::Io,
            MetalintError::OverlappingEdits { .. } => ErrorKind::Overlap,
            MetalintError::EditOutOfBounds { .. } => ErrorKind::Overlap,
            MetalintError::BackendError { .. } => ErrorKind::Backend,
            MetalintError::InternalError { .. } => ErrorKind::Internal,
        }
    }

    /// Check if this error may be swallowed with a log line and a narrowed
    /// effect (skip one issue) instead of aborting the run.
    ///
    /// Only read errors qualify; the patch engine still treats them as fatal
    /// because a fix cannot be applied without the original bytes.
    pub fn is_recoverable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Io)
    }

    /// Exit status to report for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            MetalintError::BackendError { code, .. } if *code != 0 => *code,
            _ => 1,
        }
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode_error(message: impl Into<String>) -> Self {
        Self::DecodeError {
            message: message.into(),
        }
    }

    /// Create an IO error with path context
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            source,
        }
    }

    /// Create a backend error
    pub fn backend_error(message: impl Into<String>, code: i32) -> Self {
        Self::BackendError {
            message: message.into(),
            code,
        }
    }

    /// Create an internal error
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }
}

/// Convert from std::io::Error
impl From<std::io::Error> for MetalintError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError {
            path: PathBuf::new(),
            source: err,
        }
    }
}
