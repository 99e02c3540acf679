//! Time Zone Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};

/// A time zone error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for time zone operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A zone was given, but is neither a numeric offset nor a known region.
    #[display("{reason}: {value}")]
    InvalidZone {
        /// The zone as it was given.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },
    /// Neither zone of a pair was given.
    #[display("Please supply at least one time zone.")]
    NoZone,
    /// A capture timestamp does not match `YYYY:MM:DD HH:MM:SS`.
    #[display("failed to parse the timestamp: {_0}")]
    InvalidTimestamp(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Zones and timestamps are either valid or they're not.
        false
    }
}
