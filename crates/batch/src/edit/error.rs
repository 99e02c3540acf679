//! Error types for the [`edit`](super) module.

use derive_more::{Display, Error};

/// An edit error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for edit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a guarded edit did not happen.
///
/// The messages double as the outcome line shown to the user.
///
/// ### Skips (never retried)
/// - [`ErrorKind::FilterMismatch`]
/// - [`ErrorKind::NoChangeNeeded`]
/// - [`ErrorKind::DateFieldMissing`]
///
/// ### Failures
/// - [`ErrorKind::Fetch`]: not retried.
/// - [`ErrorKind::Save`]: only after every attempt failed.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("failed to fetch: {_0}")]
    Fetch(#[error(not(source))] String),
    #[display("author didn't match.")]
    FilterMismatch,
    #[display("no change needed.")]
    NoChangeNeeded,
    #[display("date field not found.")]
    DateFieldMissing,
    #[display("failed to save: {_0}")]
    Save(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// Returns `true` if the page was deliberately left alone rather than
    /// failing to be edited.
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::FilterMismatch | Self::NoChangeNeeded | Self::DateFieldMissing)
    }
}
