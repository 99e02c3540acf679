//! MediaWiki Action API document store.

mod response;

use self::response::{
    EditResponse, Envelope, PageEntry, PagesQuery, QueryResponse, TokensQuery, UserInfoQuery,
};
use crate::backend::{DocumentStore, IdentityProvider, RecordPageStream};
use crate::error::{Error, ErrorKind, Result};
use crate::models::{ConcurrencyToken, Document, Edit, Identity, ImageRecord, UploadRange};
use async_stream::stream;
use async_trait::async_trait;
use exn::{OptionExt, ResultExt};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::instrument;

/// Connection settings for [`MediaWikiStore`].
#[derive(Clone)]
pub struct MediaWikiOptions {
    /// Full URL of `api.php`.
    pub api_url: String,
    pub user_agent: String,
    /// OAuth 2.0 owner-only access token, sent as a bearer credential.
    pub access_token: Option<String>,
    /// Ask the API to refuse requests while replication lag exceeds this
    /// many seconds.
    pub maxlag: Option<u32>,
    pub timeout: Duration,
}
impl fmt::Debug for MediaWikiOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaWikiOptions")
            .field("api_url", &self.api_url)
            .field("user_agent", &self.user_agent)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("maxlag", &self.maxlag)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Document store backed by a MediaWiki installation's Action API.
///
/// Every request is sent with `format=json&formatversion=2`. Responses are
/// deserialized into fixed shapes once, at the boundary; an `error` object in
/// any response becomes [`ErrorKind::Api`].
///
/// The concurrency token of a [`Document`] is the timestamp of the revision
/// it was read from, which is handed back as `basetimestamp` on save.
///
/// # Examples
///
/// ```no_run
/// use dtz_store::backend::{MediaWikiOptions, MediaWikiStore};
/// use std::time::Duration;
///
/// # fn example() -> dtz_store::error::Result<()> {
/// let store = MediaWikiStore::new("commons", MediaWikiOptions {
///     api_url: "https://commons.wikimedia.org/w/api.php".to_string(),
///     user_agent: "dtz/0.1 (https://example.org/dtz)".to_string(),
///     access_token: None,
///     maxlag: Some(5),
///     timeout: Duration::from_secs(30),
/// })?;
/// # Ok(())
/// # }
/// ```
pub struct MediaWikiStore {
    name: String,
    api_url: String,
    client: Client,
    access_token: Option<String>,
    maxlag: Option<u32>,
    /// Cached until the API rejects it.
    csrf_token: Mutex<Option<String>>,
}

impl MediaWikiStore {
    pub fn new(name: impl Into<String>, options: MediaWikiOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&options.user_agent)
            .timeout(options.timeout)
            .build()
            .or_raise(|| ErrorKind::BackendError("failed to build HTTP client".to_string()))?;
        Ok(Self {
            name: name.into(),
            api_url: options.api_url,
            client,
            access_token: options.access_token,
            maxlag: options.maxlag,
            csrf_token: Mutex::new(None),
        })
    }

    /// Parameters sent with every request, followed by `params`.
    fn with_common_params(&self, params: &[(&str, &str)]) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("format".to_string(), "json".to_string()),
            ("formatversion".to_string(), "2".to_string()),
        ];
        if let Some(maxlag) = self.maxlag {
            pairs.push(("maxlag".to_string(), maxlag.to_string()));
        }
        pairs.extend(params.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        pairs
    }

    async fn get<T: DeserializeOwned>(&self, params: &[(&str, &str)]) -> Result<T> {
        let request = self.client.get(&self.api_url).query(&self.with_common_params(params));
        self.send(request).await
    }

    async fn post<T: DeserializeOwned>(&self, params: &[(&str, &str)]) -> Result<T> {
        let request = self.client.post(&self.api_url).form(&self.with_common_params(params));
        self.send(request).await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let request = match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request
            .send()
            .await
            .or_raise(|| ErrorKind::Network(format!("request to {} failed", self.api_url)))?;
        let status = response.status();
        if !status.is_success() {
            exn::bail!(ErrorKind::Network(format!("HTTP {status} from {}", self.api_url)));
        }
        let envelope: Envelope<T> = response
            .json()
            .await
            .or_raise(|| ErrorKind::InvalidResponse("failed to decode API response".to_string()))?;
        if let Some(error) = envelope.error {
            exn::bail!(ErrorKind::Api {
                code: error.code,
                info: error.info,
            });
        }
        Ok(envelope.body)
    }

    async fn csrf_token(&self) -> Result<String> {
        let mut cached = self.csrf_token.lock().await;
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }
        let response: QueryResponse<TokensQuery> =
            self.get(&[("action", "query"), ("meta", "tokens"), ("type", "csrf")]).await?;
        let token = response
            .query
            .map(|q| q.tokens.csrftoken)
            .ok_or_raise(|| ErrorKind::InvalidResponse("missing csrf token".to_string()))?;
        *cached = Some(token.clone());
        Ok(token)
    }

    /// Drops the cached CSRF token if `err` says the API no longer accepts it.
    async fn forget_rejected_token(&self, err: &Error) {
        if matches!(&**err, ErrorKind::Api { code, .. } if code == "badtoken") {
            tracing::debug!("CSRF token rejected, fetching a new one next time");
            *self.csrf_token.lock().await = None;
        }
    }
}

/// Parameters of one `allimages` request, followed by the continuation of
/// the previous response.
fn range_params(range: &UploadRange, limit: &str, continuation: &BTreeMap<String, String>) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = [
        ("action", "query"),
        ("generator", "allimages"),
        ("gaiuser", range.user.as_str()),
        ("gaisort", "timestamp"),
        ("gaidir", "ascending"),
        ("gaistart", range.start.as_str()),
        ("gaiend", range.end.as_str()),
        ("gailimit", limit),
        ("prop", "imageinfo"),
        ("iiprop", "timestamp|user|commonmetadata"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    params.extend(continuation.iter().map(|(k, v)| (k.clone(), v.clone())));
    params
}

/// What one range query response contributes to the stream.
#[derive(Debug, PartialEq, Eq)]
enum RangePage {
    Records(Vec<ImageRecord>),
    /// The response had no `query` container although more may follow.
    Malformed,
    /// Nothing (more) matches.
    End,
}

/// Classifies a range query response, and returns the continuation to send
/// with the next request, if any.
fn range_step(response: QueryResponse<PagesQuery>) -> (RangePage, Option<BTreeMap<String, String>>) {
    let next = response.continuation;
    let page = match response.query {
        Some(query) if query.pages.is_empty() => return (RangePage::End, None),
        Some(query) => RangePage::Records(into_records(query.pages)),
        // No matching uploads at all.
        None if response.batchcomplete && next.is_none() => RangePage::End,
        None => RangePage::Malformed,
    };
    (page, next)
}

/// Follows a continued range query. `fetch` sends one request with the
/// given continuation parameters.
///
/// Unreadable responses are yielded as [`ErrorKind::MalformedPage`] and paging
/// carries on; a failed request is yielded once and ends the stream.
fn paginate<'a, F, Fut>(mut fetch: F) -> RecordPageStream<'a>
where
    F: FnMut(BTreeMap<String, String>) -> Fut + Send + 'a,
    Fut: Future<Output = Result<QueryResponse<PagesQuery>>> + Send + 'a,
{
    Box::pin(stream! {
        let mut continuation = BTreeMap::from([("continue".to_string(), String::new())]);
        loop {
            let response = match fetch(continuation).await {
                Ok(response) => response,
                Err(err) => {
                    yield Err(err);
                    return;
                },
            };
            let (page, next) = range_step(response);
            match page {
                RangePage::End => return,
                RangePage::Records(records) => {
                    yield Ok(records);
                },
                RangePage::Malformed => {
                    yield Err(exn::Exn::from(ErrorKind::MalformedPage("missing pages array".to_string())));
                },
            }
            match next {
                Some(next) => {
                    tracing::debug!(?next, "Continuing range query");
                    continuation = next;
                },
                None => return,
            }
        }
    })
}

/// Turns one response's pages into records ordered by upload time.
fn into_records(pages: Vec<PageEntry>) -> Vec<ImageRecord> {
    let mut records: Vec<_> = pages
        .into_iter()
        .filter_map(|page| {
            let record = page.into_record();
            if record.is_none() {
                tracing::warn!("Skipped an item with no title");
            }
            record
        })
        .collect();
    records.sort_by(|a, b| a.upload_time.cmp(&b.upload_time));
    records
}

#[async_trait]
impl DocumentStore for MediaWikiStore {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self), fields(store = %self.name))]
    async fn fetch(&self, title: &str) -> Result<Document> {
        let params = [
            ("action", "query"),
            ("titles", title),
            ("prop", "revisions"),
            ("rvprop", "content|timestamp"),
            ("rvslots", "main"),
        ];
        let response: QueryResponse<PagesQuery> = self.get(&params).await?;
        let page = response
            .query
            .and_then(|q| q.pages.into_iter().next())
            .ok_or_raise(|| ErrorKind::InvalidResponse("empty pages array".to_string()))?;
        if page.missing || page.invalid {
            exn::bail!(ErrorKind::NotFound(title.to_string()));
        }
        let revision = page
            .revisions
            .into_iter()
            .next()
            .ok_or_raise(|| ErrorKind::NotFound(title.to_string()))?;
        let text = revision
            .slots
            .main
            .content
            .ok_or_raise(|| ErrorKind::InvalidResponse(format!("revision text of {title} is hidden")))?;
        Ok(Document {
            title: page.title.unwrap_or_else(|| title.to_string()),
            text,
            token: ConcurrencyToken(revision.timestamp),
        })
    }

    #[instrument(skip(self), fields(store = %self.name))]
    async fn query_by_title(&self, titles: &[String]) -> Result<Vec<ImageRecord>> {
        let mut seen = HashSet::new();
        let unique: Vec<&str> = titles.iter().map(String::as_str).filter(|t| seen.insert(*t)).collect();
        let joined = unique.join("|");
        let params = [
            ("action", "query"),
            ("titles", joined.as_str()),
            ("prop", "imageinfo"),
            ("iiprop", "timestamp|user|commonmetadata"),
        ];
        let response: QueryResponse<PagesQuery> = self.get(&params).await?;
        let pages = response
            .query
            .map(|q| q.pages)
            .filter(|pages| !pages.is_empty())
            .ok_or_raise(|| ErrorKind::InvalidResponse("Empty pages array when requesting imageinfo.".to_string()))?;
        let mut records = Vec::with_capacity(pages.len());
        for page in pages {
            if page.missing || page.invalid || page.imageinfo.is_empty() {
                exn::bail!(ErrorKind::NotFound(page.title.unwrap_or_default()));
            }
            records.extend(page.into_record());
        }
        Ok(records)
    }

    fn query_range<'a>(&'a self, range: &'a UploadRange, page_size: u32) -> RecordPageStream<'a> {
        let limit = page_size.to_string();
        paginate(move |continuation| {
            let params = range_params(range, &limit, &continuation);
            async move {
                let params: Vec<_> = params.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
                self.get::<QueryResponse<PagesQuery>>(&params).await
            }
        })
    }

    #[instrument(skip(self, edit), fields(store = %self.name, title = %edit.title))]
    async fn save(&self, edit: &Edit) -> Result<()> {
        let token = self.csrf_token().await?;
        let params = [
            ("action", "edit"),
            ("title", edit.title.as_str()),
            ("text", edit.text.as_str()),
            ("summary", edit.summary.as_str()),
            ("basetimestamp", edit.token.0.as_str()),
            ("nocreate", "1"),
            ("assert", "user"),
            ("token", token.as_str()),
        ];
        let response: EditResponse = match self.post(&params).await {
            Ok(response) => response,
            Err(err) => {
                self.forget_rejected_token(&err).await;
                return Err(err);
            },
        };
        match response.edit {
            Some(result) if result.result == "Success" => Ok(()),
            Some(result) => exn::bail!(ErrorKind::BackendError(format!("edit result: {}", result.result))),
            None => exn::bail!(ErrorKind::InvalidResponse("missing edit result".to_string())),
        }
    }
}

#[async_trait]
impl IdentityProvider for MediaWikiStore {
    #[instrument(skip(self), fields(store = %self.name))]
    async fn resolve_identity(&self) -> Result<Identity> {
        let params = [("action", "query"), ("meta", "userinfo"), ("uiprop", "groups|blockinfo")];
        let response: QueryResponse<UserInfoQuery> = self.get(&params).await?;
        let info = response
            .query
            .map(|q| q.userinfo)
            .ok_or_raise(|| ErrorKind::InvalidResponse("missing userinfo".to_string()))?;
        tracing::debug!(user = %info.name, groups = ?info.groups, "Resolved identity");
        Identity {
            username: info.name,
            anonymous: info.anon,
            blocked: info.blockid.is_some(),
            groups: info.groups,
        }
        .authorize()
    }
}

#[cfg(test)]
mod tests {
    use super::response::tests::RANGE_PAGE;
    use super::*;
    use futures::StreamExt;
    use rstest::rstest;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex as StdMutex};

    const LAST_PAGE: &str = r#"{"batchcomplete": true, "query": {"pages": [
        {"title": "File:C.jpg", "imageinfo": [{"timestamp": "2020-01-03T00:00:00Z", "user": "Example"}]}
    ]}}"#;
    const CONTINUE_ONLY: &str = r#"{"continue": {"gaicontinue": "20200103000000|C.jpg", "continue": "gaicontinue||"}}"#;

    type Sent = Arc<StdMutex<Vec<BTreeMap<String, String>>>>;

    fn response(json: &str) -> QueryResponse<PagesQuery> {
        serde_json::from_str(json).unwrap()
    }

    /// Pages through canned responses, recording the continuation sent with
    /// each request.
    fn scripted(responses: Vec<Result<QueryResponse<PagesQuery>>>, sent: Sent) -> RecordPageStream<'static> {
        let mut responses = VecDeque::from(responses);
        paginate(move |continuation| {
            sent.lock().unwrap().push(continuation);
            let response = responses
                .pop_front()
                .unwrap_or_else(|| Err(exn::Exn::from(ErrorKind::Network("no more responses".to_string()))));
            async move { response }
        })
    }

    fn store(maxlag: Option<u32>) -> MediaWikiStore {
        MediaWikiStore::new(
            "test",
            MediaWikiOptions {
                api_url: "https://wiki.invalid/w/api.php".to_string(),
                user_agent: "dtz-test".to_string(),
                access_token: Some("secret".to_string()),
                maxlag,
                timeout: Duration::from_secs(1),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_common_params() {
        let pairs = store(Some(5)).with_common_params(&[("action", "query")]);
        let keys: Vec<_> = pairs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["format", "formatversion", "maxlag", "action"]);
        let pairs = store(None).with_common_params(&[]);
        assert!(pairs.iter().all(|(k, _)| k != "maxlag"));
    }

    #[test]
    fn test_options_debug_redacts_token() {
        let options = MediaWikiOptions {
            api_url: String::new(),
            user_agent: String::new(),
            access_token: Some("secret".to_string()),
            maxlag: None,
            timeout: Duration::from_secs(1),
        };
        assert!(!format!("{options:?}").contains("secret"));
    }

    #[test]
    fn test_into_records_sorted_and_untitled_dropped() {
        let json = r#"[
            {"title": "File:B.jpg", "imageinfo": [{"timestamp": "2020-01-02T00:00:00Z", "user": "u"}]},
            {"imageinfo": []},
            {"title": "File:A.jpg", "imageinfo": [{"timestamp": "2020-01-01T00:00:00Z", "user": "u"}]}
        ]"#;
        let pages: Vec<PageEntry> = serde_json::from_str(json).unwrap();
        let titles: Vec<_> = into_records(pages).into_iter().map(|r| r.title).collect();
        assert_eq!(titles, ["File:A.jpg", "File:B.jpg"]);
    }

    #[rstest]
    #[case::no_matches(r#"{"batchcomplete": true}"#, RangePage::End, false)]
    #[case::empty_pages(r#"{"batchcomplete": true, "query": {"pages": []}}"#, RangePage::End, false)]
    #[case::empty_pages_with_continue(
        r#"{"query": {"pages": []}, "continue": {"gaicontinue": "x", "continue": "gaicontinue||"}}"#,
        RangePage::End,
        false
    )]
    #[case::missing_query_with_continue(CONTINUE_ONLY, RangePage::Malformed, true)]
    #[case::missing_query_incomplete("{}", RangePage::Malformed, false)]
    fn test_range_step(#[case] json: &str, #[case] expected: RangePage, #[case] continues: bool) {
        let (page, next) = range_step(response(json));
        assert_eq!(page, expected);
        assert_eq!(next.is_some(), continues);
    }

    #[test]
    fn test_range_step_records() {
        let (page, next) = range_step(response(RANGE_PAGE));
        let RangePage::Records(records) = page else {
            panic!("expected records, got {page:?}");
        };
        let titles: Vec<_> = records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, ["File:A.jpg", "File:B.jpg"]);
        assert_eq!(next.unwrap()["gaicontinue"], "20200102000000|B.jpg");
    }

    #[test]
    fn test_range_params_append_continuation() {
        let range = UploadRange::new("Example", "2020-01-01T00:00:00Z", "2020-02-01T00:00:00Z");
        let continuation = BTreeMap::from([
            ("continue".to_string(), "gaicontinue||".to_string()),
            ("gaicontinue".to_string(), "20200102000000|B.jpg".to_string()),
        ]);
        let params = range_params(&range, "100", &continuation);
        let get = |key: &str| params.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str());
        assert_eq!(get("gaiuser"), Some("Example"));
        assert_eq!(get("gailimit"), Some("100"));
        assert_eq!(get("gaistart"), Some("2020-01-01T00:00:00Z"));
        assert_eq!(get("gaicontinue"), Some("20200102000000|B.jpg"));
        assert_eq!(get("continue"), Some("gaicontinue||"));
    }

    #[tokio::test]
    async fn test_paginate_follows_continuation() {
        let sent = Sent::default();
        let pages: Vec<_> = scripted(vec![Ok(response(RANGE_PAGE)), Ok(response(LAST_PAGE))], Arc::clone(&sent))
            .collect()
            .await;
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].as_ref().unwrap().len(), 2);
        assert_eq!(pages[1].as_ref().unwrap()[0].title, "File:C.jpg");
        let sent = sent.lock().unwrap();
        assert_eq!(sent[0], BTreeMap::from([("continue".to_string(), String::new())]));
        assert_eq!(sent[1]["gaicontinue"], "20200102000000|B.jpg");
        assert_eq!(sent[1]["continue"], "gaicontinue||");
    }

    #[tokio::test]
    async fn test_paginate_skips_malformed_page() {
        let sent = Sent::default();
        let pages: Vec<_> = scripted(vec![Ok(response(CONTINUE_ONLY)), Ok(response(LAST_PAGE))], Arc::clone(&sent))
            .collect()
            .await;
        assert_eq!(pages.len(), 2);
        assert!(pages[0].as_ref().is_err_and(|err| err.is_page_local()));
        assert_eq!(pages[1].as_ref().unwrap().len(), 1);
        assert_eq!(sent.lock().unwrap()[1]["gaicontinue"], "20200103000000|C.jpg");
    }

    #[tokio::test]
    async fn test_paginate_error_ends_stream() {
        let sent = Sent::default();
        let failure = exn::Exn::from(ErrorKind::Api {
            code: "maxlag".to_string(),
            info: "Waiting for replicas".to_string(),
        });
        let pages: Vec<_> = scripted(vec![Ok(response(RANGE_PAGE)), Err(failure), Ok(response(LAST_PAGE))], Arc::clone(&sent))
            .collect()
            .await;
        assert_eq!(pages.len(), 2);
        assert!(pages[0].is_ok());
        assert!(pages[1].as_ref().is_err_and(|err| !err.is_page_local()));
        assert_eq!(sent.lock().unwrap().len(), 2);
    }

    #[rstest]
    #[case("badtoken", true)]
    #[case("editconflict", false)]
    #[tokio::test]
    async fn test_rejected_token_is_forgotten(#[case] code: &str, #[case] forgotten: bool) {
        let store = store(None);
        *store.csrf_token.lock().await = Some("abc+\\".to_string());
        let err = exn::Exn::from(ErrorKind::Api {
            code: code.to_string(),
            info: String::new(),
        });
        store.forget_rejected_token(&err).await;
        assert_eq!(store.csrf_token.lock().await.is_none(), forgotten);
    }
}
