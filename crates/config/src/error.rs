//! Config Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// An explicitly requested configuration file does not exist
    #[display("configuration file not found: {}", _0.display())]
    FileNotFound(#[error(not(source))] PathBuf),
    /// A source could not be read or merged, or a value has the wrong type
    #[display("failed to load configuration: {_0}")]
    Load(#[error(not(source))] String),
    /// A value was read but is outside its permitted range
    #[display("invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl ErrorKind {
    /// Configuration errors never resolve on their own.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
