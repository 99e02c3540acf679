//! Guarded rewriting of a single file page.
//!
//! [`attempt_edit`] fetches a page, locates its `date` field outside any
//! opaque regions, splices in the converted timestamp and saves with
//! optimistic concurrency, retrying only failed saves. Edits are paced by a
//! [`RateLimiter`], usually obtained from [`RateLimits`] so that every run for
//! the same user shares one.

mod editor;
pub mod error;
mod rate;

pub use self::editor::{DEFAULT_MAX_ATTEMPTS, DEFAULT_SUMMARY, DEFAULT_TEMPLATE, EditSettings, attempt_edit};
pub use self::rate::{DEFAULT_EDIT_INTERVAL, RateLimiter, RateLimits};
