//! In-memory document store for testing.

use super::RecordPageStream;
use crate::backend::{DocumentStore, IdentityProvider};
use crate::error::{ErrorKind, Result};
use crate::models::{ConcurrencyToken, Document, Edit, Identity, ImageRecord, UploadRange};
use async_stream::stream;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// In-memory document store for testing.
///
/// Pages and image records are stored behind a [`RwLock`], so all trait
/// methods can operate on `&self` without external synchronisation. Every
/// fetch and save call is counted, and failures can be injected.
///
/// Concurrency tokens are revision numbers: a save whose token is not the
/// page's current revision fails with an `editconflict` API error, just like
/// the real thing.
///
/// # Examples
///
/// ```
/// use dtz_store::backend::MockStore;
/// use dtz_store::DocumentStore;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let store = MockStore::default().with_page("File:A.jpg", "|date=2020");
/// let document = store.fetch("File:A.jpg").await.unwrap();
/// assert_eq!(document.text, "|date=2020");
/// assert_eq!(store.fetch_count(), 1);
/// # }
/// ```
pub struct MockStore {
    name: String,
    pages: RwLock<HashMap<String, (u64, String)>>,
    images: RwLock<Vec<ImageRecord>>,
    identity: Identity,
    failing_saves: AtomicUsize,
    malformed_pages: HashSet<usize>,
    query_error_at: Option<usize>,
    fetches: AtomicUsize,
    saves: AtomicUsize,
}

impl MockStore {
    /// Change the name of the mock store.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Add (or replace) a page at revision 1.
    pub fn with_page(mut self, title: impl Into<String>, text: impl Into<String>) -> Self {
        self.pages.get_mut().insert(title.into(), (1, text.into()));
        self
    }

    /// Add an image record; it is also returned by range queries.
    pub fn with_image(mut self, record: ImageRecord) -> Self {
        self.images.get_mut().push(record);
        self
    }

    /// Replace the identity behind the store's credential.
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = identity;
        self
    }

    /// Make the next `count` saves fail with a transient error.
    pub fn with_failing_saves(self, count: usize) -> Self {
        self.failing_saves.store(count, Ordering::SeqCst);
        self
    }

    /// Replace the range query page at `index` (zero-based) with a
    /// malformed-page error.
    pub fn with_malformed_page(mut self, index: usize) -> Self {
        self.malformed_pages.insert(index);
        self
    }

    /// End the range query with an API error instead of the page at `index`.
    pub fn with_query_error_at(mut self, index: usize) -> Self {
        self.query_error_at = Some(index);
        self
    }

    /// Number of `fetch` calls so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Number of `save` calls so far, successful or not.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Current text of a page, without counting as a fetch.
    pub async fn text(&self, title: &str) -> Option<String> {
        self.pages.read().await.get(title).map(|(_, text)| text.clone())
    }

    fn matching_images(images: &[ImageRecord], range: &UploadRange) -> Vec<ImageRecord> {
        let mut matching: Vec<_> = images
            .iter()
            .filter(|r| r.user.as_deref() == Some(range.user.as_str()))
            .filter(|r| r.upload_time.as_deref().is_some_and(|t| range.contains(t)))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.upload_time.cmp(&b.upload_time));
        matching
    }
}

impl Default for MockStore {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            pages: RwLock::new(HashMap::new()),
            images: RwLock::new(Vec::new()),
            identity: Identity {
                username: "Mock".to_string(),
                groups: vec!["*".to_string(), "user".to_string(), "autoconfirmed".to_string()],
                ..Default::default()
            },
            failing_saves: AtomicUsize::new(0),
            malformed_pages: HashSet::new(),
            query_error_at: None,
            fetches: AtomicUsize::new(0),
            saves: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl DocumentStore for MockStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, title: &str) -> Result<Document> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let (revision, text) =
            self.pages.read().await.get(title).cloned().ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(title.to_string())))?;
        Ok(Document {
            title: title.to_string(),
            text,
            token: ConcurrencyToken(revision.to_string()),
        })
    }

    async fn query_by_title(&self, titles: &[String]) -> Result<Vec<ImageRecord>> {
        let images = self.images.read().await;
        let mut seen = HashSet::new();
        let mut records = Vec::new();
        for title in titles.iter().filter(|t| seen.insert(t.as_str())) {
            let record = images
                .iter()
                .find(|r| &r.title == title)
                .cloned()
                .ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(title.clone())))?;
            records.push(record);
        }
        Ok(records)
    }

    fn query_range<'a>(&'a self, range: &'a UploadRange, page_size: u32) -> RecordPageStream<'a> {
        Box::pin(stream! {
            // Snapshot under the read lock, then drop it before yielding to
            // avoid holding the lock across yield points.
            let matching = Self::matching_images(&self.images.read().await, range);
            let chunks: Vec<Vec<ImageRecord>> =
                matching.chunks(page_size.max(1) as usize).map(<[ImageRecord]>::to_vec).collect();
            for (index, page) in chunks.into_iter().enumerate() {
                if self.query_error_at == Some(index) {
                    yield Err(exn::Exn::from(ErrorKind::Api {
                        code: "internal_api_error".to_string(),
                        info: "injected query failure".to_string(),
                    }));
                    return;
                }
                if self.malformed_pages.contains(&index) {
                    yield Err(exn::Exn::from(ErrorKind::MalformedPage("missing pages array".to_string())));
                    continue;
                }
                yield Ok(page);
            }
        })
    }

    async fn save(&self, edit: &Edit) -> Result<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        let injected = self.failing_saves.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if injected.is_ok() {
            exn::bail!(ErrorKind::Api {
                code: "editconflict".to_string(),
                info: "injected save failure".to_string(),
            });
        }
        let mut pages = self.pages.write().await;
        let (revision, text) = pages.get_mut(&edit.title).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(edit.title.clone())))?;
        if revision.to_string() != edit.token.0 {
            exn::bail!(ErrorKind::Api {
                code: "editconflict".to_string(),
                info: "Edit conflict.".to_string(),
            });
        }
        *revision += 1;
        *text = edit.text.clone();
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for MockStore {
    async fn resolve_identity(&self) -> Result<Identity> {
        self.identity.clone().authorize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn image(title: &str, user: &str, upload_time: &str) -> ImageRecord {
        ImageRecord {
            title: title.to_string(),
            upload_time: Some(upload_time.to_string()),
            user: Some(user.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_fetch_and_save() {
        let store = MockStore::default().with_page("File:A.jpg", "old");
        let document = store.fetch("File:A.jpg").await.unwrap();
        let edit = Edit {
            title: document.title.clone(),
            text: "new".to_string(),
            token: document.token.clone(),
            summary: String::new(),
        };
        store.save(&edit).await.unwrap();
        assert_eq!(store.text("File:A.jpg").await.as_deref(), Some("new"));
        // The token is now stale.
        let err = store.save(&edit).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(store.save_count(), 2);
    }

    #[tokio::test]
    async fn test_fetch_not_found() {
        let store = MockStore::default();
        let err = store.fetch("File:Missing.jpg").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_failing_saves() {
        let store = MockStore::default().with_page("File:A.jpg", "old").with_failing_saves(1);
        let document = store.fetch("File:A.jpg").await.unwrap();
        let edit = Edit {
            title: document.title,
            text: "new".to_string(),
            token: document.token,
            summary: String::new(),
        };
        assert!(store.save(&edit).await.is_err());
        assert!(store.save(&edit).await.is_ok());
    }

    #[tokio::test]
    async fn test_query_by_title_dedupes() {
        let store = MockStore::default().with_image(image("File:A.jpg", "u", "2020-01-01T00:00:00Z"));
        let titles = vec!["File:A.jpg".to_string(), "File:A.jpg".to_string()];
        assert_eq!(store.query_by_title(&titles).await.unwrap().len(), 1);
        let titles = vec!["File:B.jpg".to_string()];
        assert!(store.query_by_title(&titles).await.is_err());
    }

    #[tokio::test]
    async fn test_query_range_pages_in_order() {
        let store = MockStore::default()
            .with_image(image("File:C.jpg", "u", "2020-01-03T00:00:00Z"))
            .with_image(image("File:A.jpg", "u", "2020-01-01T00:00:00Z"))
            .with_image(image("File:X.jpg", "other", "2020-01-02T00:00:00Z"))
            .with_image(image("File:B.jpg", "u", "2020-01-02T00:00:00Z"))
            .with_image(image("File:D.jpg", "u", "2020-01-04T00:00:00Z"));
        let range = UploadRange::new("u", "2020-01-01T00:00:00Z", "2020-01-03T00:00:00Z");
        let pages: Vec<_> = store.query_range(&range, 2).collect().await;
        let titles: Vec<Vec<String>> =
            pages.into_iter().map(|p| p.unwrap().into_iter().map(|r| r.title).collect()).collect();
        assert_eq!(titles, vec![vec!["File:A.jpg", "File:B.jpg"], vec!["File:C.jpg"]]);
    }

    #[tokio::test]
    async fn test_query_range_injected_errors() {
        let mut store = MockStore::default().with_malformed_page(0).with_query_error_at(2);
        for day in 1..=5 {
            store = store.with_image(image(&format!("File:{day}.jpg"), "u", &format!("2020-01-0{day}T00:00:00Z")));
        }
        let range = UploadRange::new("u", "2020-01-01T00:00:00Z", "2020-01-31T00:00:00Z");
        let pages: Vec<_> = store.query_range(&range, 2).collect().await;
        assert_eq!(pages.len(), 3);
        assert!(pages[0].as_ref().is_err_and(|e| e.is_page_local()));
        assert_eq!(pages[1].as_ref().unwrap().len(), 2);
        assert!(pages[2].as_ref().is_err_and(|e| !e.is_page_local()));
    }

    #[tokio::test]
    async fn test_identity() {
        let store = MockStore::default();
        assert_eq!(store.resolve_identity().await.unwrap().username, "Mock");
        let store = store.with_identity(Identity {
            username: "New".to_string(),
            groups: vec!["user".to_string()],
            ..Default::default()
        });
        assert!(store.resolve_identity().await.is_err());
    }
}
