//! Batch Error Types
//!
//! Errors that abort a whole batch before any record is processed. Anything
//! that goes wrong with a single record is reported inline as a
//! [`RecordOutcome`](crate::scan::RecordOutcome) instead.

use derive_more::{Display, Error};

/// A batch error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for batch setup operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The user's input cannot describe a batch (no files, bad zone, ...)
    #[display("{_0}")]
    InvalidRequest(#[error(not(source))] String),
    /// The store's credential does not belong to a user allowed to edit
    #[display("{_0}")]
    Identity(#[error(not(source))] String),
    /// The boundary files could not be looked up
    #[display("{_0}")]
    Lookup(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            _ => false,
        }
    }
}
