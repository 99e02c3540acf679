//! Read-only document store.
//!
//! Wraps another store and prevents saves from executing, but indicates
//! success on return. Used for dry runs: every page is still fetched and
//! every edit is still computed.

use async_trait::async_trait;
use std::sync::Arc;

use crate::backend::{DocumentStore, IdentityProvider, RecordPageStream};
use crate::error::Result;
use crate::models::{Document, Edit, Identity, ImageRecord, UploadRange};

/// Read-only document store.
///
/// Silently drops all saves, logging an [`info event`](tracing::Event)
/// instead.
pub struct ReadOnlyStore<S> {
    inner: Arc<S>,
}
impl<S> ReadOnlyStore<S> {
    pub fn new(inner: Arc<S>) -> Self {
        Self { inner }
    }
}
impl<S> Clone for ReadOnlyStore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl<S: DocumentStore> DocumentStore for ReadOnlyStore<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn fetch(&self, title: &str) -> Result<Document> {
        self.inner.fetch(title).await
    }

    async fn query_by_title(&self, titles: &[String]) -> Result<Vec<ImageRecord>> {
        self.inner.query_by_title(titles).await
    }

    fn query_range<'a>(&'a self, range: &'a UploadRange, page_size: u32) -> RecordPageStream<'a> {
        self.inner.query_range(range, page_size)
    }

    async fn save(&self, edit: &Edit) -> Result<()> {
        tracing::info!(title = %edit.title, bytes = edit.text.len(), "Skipping save during read-only mode");
        Ok(())
    }
}

#[async_trait]
impl<S: IdentityProvider> IdentityProvider for ReadOnlyStore<S> {
    async fn resolve_identity(&self) -> Result<Identity> {
        self.inner.resolve_identity().await
    }
}
