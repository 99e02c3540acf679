//! Store Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A store error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Page or file does not exist
    #[display("File not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// Title is empty or contains characters that are never valid in file names
    #[display("invalid title: {_0}")]
    InvalidTitle(#[error(not(source))] String),
    /// The caller is not allowed to edit (anonymous, blocked, not autoconfirmed)
    #[display("{_0}")]
    Forbidden(#[error(not(source))] String),
    /// The API answered with an explicit error object
    #[display("API error [{code}]: {info}")]
    Api { code: String, info: String },
    /// Transport-level failure (connection, timeout, non-2xx status)
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
    /// A page of query results lacked its results container
    #[display("malformed result page: {_0}")]
    MalformedPage(#[error(not(source))] String),
    /// Any other response that does not have the expected shape
    #[display("invalid response: {_0}")]
    InvalidResponse(#[error(not(source))] String),
    /// Backend-specific error
    #[display("backend error: {_0}")]
    BackendError(#[error(not(source))] String),
}

/// API error codes that describe a transient condition.
const TRANSIENT_API_CODES: [&str; 5] = ["badtoken", "editconflict", "maxlag", "ratelimited", "readonly"];

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::BackendError(_) => true,
            Self::Api { code, .. } => TRANSIENT_API_CODES.contains(&code.as_str()),
            _ => false,
        }
    }

    /// Returns `true` if the scan that produced this error may carry on with
    /// the next page.
    pub fn is_page_local(&self) -> bool {
        matches!(self, Self::MalformedPage(_))
    }
}
