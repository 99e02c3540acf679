//! Document store traits and implementations.
//!
//! This module defines [`DocumentStore`], the remote read/query/write surface
//! the batch editor depends on, and [`IdentityProvider`], which tells the
//! caller whose credential the store is using. Implementations:
//!
//! - [`MediaWikiStore`]: the MediaWiki Action API over HTTPS.
//! - [`ReadOnlyStore`]: wraps another store and drops saves (dry runs).
//! - `MockStore` (feature `mock`): in-memory, for tests.

mod mediawiki;
#[cfg(feature = "mock")]
mod mock;
mod ro;

pub use self::mediawiki::{MediaWikiOptions, MediaWikiStore};
#[cfg(feature = "mock")]
pub use self::mock::MockStore;
pub use self::ro::ReadOnlyStore;
use crate::error::Result;
use crate::models::{Document, Edit, Identity, ImageRecord, UploadRange};
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

/// One page of range query results, or why that page could not be read.
pub type RecordPageStream<'a> = Pin<Box<dyn Stream<Item = Result<Vec<ImageRecord>>> + Send + 'a>>;

/// Remote pages and file metadata.
///
/// # Range queries
/// [`query_range()`](Self::query_range) yields pages of records ordered by
/// ascending upload time. An `Err` item whose kind is
/// [`page-local`](crate::error::ErrorKind::is_page_local) only affects that
/// page and the stream carries on; any other error is yielded once and
/// ends the stream.
///
/// # Examples
///
/// ```
/// use futures::StreamExt;
/// use dtz_store::{DocumentStore, UploadRange, error::Result};
///
/// async fn count_uploads(store: &dyn DocumentStore, range: &UploadRange) -> Result<usize> {
///     let mut pages = store.query_range(range, 100);
///     let mut count = 0;
///     while let Some(page) = pages.next().await {
///         count += page?.len();
///     }
///     Ok(count)
/// }
/// ```
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Name of the store, used for logging only.
    fn name(&self) -> &str;

    /// Fetch the current text of a page with its concurrency token.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the page
    /// does not exist.
    async fn fetch(&self, title: &str) -> Result<Document>;

    /// Look up upload information for specific files.
    ///
    /// Asking for the same title twice yields a single record. Returns
    /// [`NotFound`](crate::error::ErrorKind::NotFound) if any file does not
    /// exist.
    async fn query_by_title(&self, titles: &[String]) -> Result<Vec<ImageRecord>>;

    /// Stream the uploads of `range.user` between `range.start` and
    /// `range.end` (both inclusive), at most `page_size` per page.
    fn query_range<'a>(&'a self, range: &'a UploadRange, page_size: u32) -> RecordPageStream<'a>;

    /// Replace a page's text, failing if the page changed since `edit.token`.
    async fn save(&self, edit: &Edit) -> Result<()>;
}

/// Resolves the credential a store is configured with to a user.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Returns the identity behind the credential, failing with
    /// [`Forbidden`](crate::error::ErrorKind::Forbidden) if it may not edit.
    async fn resolve_identity(&self) -> Result<Identity>;
}
