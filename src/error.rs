use std::path::PathBuf;
use thiserror::Error;

/// Error type covering the buffer and column layers.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    #[error("allocation of {size} bytes failed")]
    AllocationFailed { size: usize },

    #[error("memory-mapping {path:?} failed after {attempts} attempts: {source}")]
    MmapFailed {
        path: PathBuf,
        attempts: usize,
        source: std::io::Error,
    },

    #[error("index out of bounds: index {index}, size {size}")]
    IndexOutOfBounds { index: usize, size: usize },

    #[error("column type mismatch: expected {expected:?}, found {found:?}")]
    TypeMismatch {
        expected: crate::types::Stype,
        found: crate::types::Stype,
    },

    #[error("length mismatch: expected {expected}, actual {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("invalid regular expression: {0}")]
    InvalidRegex(String),

    #[error("not implemented on this platform: {0}")]
    NotSupported(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("data integrity error: {0}")]
    Integrity(String),
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::InvalidRegex(err.to_string())
    }
}
