//! Store models.
//!
//! Everything here is produced by a [`DocumentStore`](crate::DocumentStore)
//! and consumed once; nothing is cached across edit attempts.

use std::fmt;

use crate::error::{ErrorKind, Result};

/// Opaque marker of a page's last-known revision, handed back on save so the
/// store can detect a conflicting edit made in the meantime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcurrencyToken(pub String);
impl fmt::Display for ConcurrencyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Current state of one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub title: String,
    pub text: String,
    pub token: ConcurrencyToken,
}

/// A full-text replacement of one page, guarded by the token of the
/// revision it was computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub title: String,
    pub text: String,
    pub token: ConcurrencyToken,
    pub summary: String,
}

/// Upload information for one file, as returned by image queries.
///
/// `upload_time` is the store's sortable timestamp string (ISO-8601 in UTC),
/// so string order is chronological order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImageRecord {
    pub title: String,
    pub upload_time: Option<String>,
    pub user: Option<String>,
    /// Exif `DateTimeOriginal`, camera-local wall-clock time.
    pub capture_time: Option<String>,
    /// Exif `Model`.
    pub camera_model: Option<String>,
}

/// Inclusive range of upload timestamps for a single uploader, with
/// `start <= end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRange {
    pub user: String,
    pub start: String,
    pub end: String,
}
impl UploadRange {
    /// Builds a range from two boundary timestamps given in any order.
    pub fn new(user: impl Into<String>, a: impl Into<String>, b: impl Into<String>) -> Self {
        let (a, b) = (a.into(), b.into());
        let (start, end) = if a <= b { (a, b) } else { (b, a) };
        Self {
            user: user.into(),
            start,
            end,
        }
    }

    pub fn contains(&self, upload_time: &str) -> bool {
        self.start.as_str() <= upload_time && upload_time <= self.end.as_str()
    }
}

/// The group that marks an account as trusted enough to run batch edits.
pub const TRUSTED_GROUP: &str = "autoconfirmed";

/// Who the store's credential belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Identity {
    pub username: String,
    pub anonymous: bool,
    pub blocked: bool,
    pub groups: Vec<String>,
}
impl Identity {
    /// Rejects identities that may not run batch edits.
    pub fn authorize(self) -> Result<Self> {
        if self.anonymous {
            exn::bail!(ErrorKind::Forbidden("Not logged in; check the configured access token.".to_string()));
        }
        if !self.groups.iter().any(|g| g == TRUSTED_GROUP) {
            exn::bail!(ErrorKind::Forbidden("User is not autoconfirmed.".to_string()));
        }
        if self.blocked {
            exn::bail!(ErrorKind::Forbidden("User is blocked.".to_string()));
        }
        Ok(self)
    }
}
