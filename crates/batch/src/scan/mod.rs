//! Range scanning.
//!
//! Walks a user's uploads between two timestamps, filters each record,
//! converts its capture time and hands it to [`attempt_edit`](crate::edit::attempt_edit).
//! The primary entry point is [`scan`], which streams one [`ScanEvent`] per
//! record as it goes.

mod event;
mod stream;

pub use self::event::{RecordOutcome, ScanEvent, ScanSummary};
pub use self::stream::{DEFAULT_PAGE_SIZE, DEFAULT_RECORD_PACING, ScanSettings, scan};
