//! Typed Action API responses (`formatversion=2`).
//!
//! Every body field is optional or defaulted so that an error response, which
//! carries nothing but the `error` object, still deserializes.

use crate::models::ImageRecord;
use serde::Deserialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
#[serde(bound = "T: DeserializeOwned")]
pub(super) struct Envelope<T> {
    pub error: Option<ApiError>,
    #[serde(flatten)]
    pub body: T,
}

#[derive(Debug, Deserialize)]
pub(super) struct ApiError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub info: String,
}

#[derive(Debug, Deserialize)]
#[serde(bound = "Q: DeserializeOwned")]
pub(super) struct QueryResponse<Q> {
    pub query: Option<Q>,
    #[serde(rename = "continue")]
    pub continuation: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub batchcomplete: bool,
}

#[derive(Debug, Deserialize)]
pub(super) struct PagesQuery {
    #[serde(default)]
    pub pages: Vec<PageEntry>,
}

#[derive(Debug, Deserialize)]
pub(super) struct PageEntry {
    pub title: Option<String>,
    #[serde(default)]
    pub missing: bool,
    #[serde(default)]
    pub invalid: bool,
    #[serde(default)]
    pub imageinfo: Vec<ImageInfo>,
    #[serde(default)]
    pub revisions: Vec<Revision>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ImageInfo {
    pub timestamp: Option<String>,
    pub user: Option<String>,
    /// `null` for some file types.
    pub commonmetadata: Option<Vec<MetadataEntry>>,
}

#[derive(Debug, Deserialize)]
pub(super) struct MetadataEntry {
    pub name: String,
    pub value: MetadataValue,
}

/// Metadata values can be strings, numbers or nested arrays; only strings
/// are of interest.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum MetadataValue {
    Text(String),
    Other(IgnoredAny),
}

#[derive(Debug, Deserialize)]
pub(super) struct Revision {
    pub timestamp: String,
    pub slots: Slots,
}

#[derive(Debug, Deserialize)]
pub(super) struct Slots {
    pub main: Slot,
}

#[derive(Debug, Deserialize)]
pub(super) struct Slot {
    /// Absent when the revision text is hidden.
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TokensQuery {
    pub tokens: Tokens,
}

#[derive(Debug, Deserialize)]
pub(super) struct Tokens {
    pub csrftoken: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct UserInfoQuery {
    pub userinfo: UserInfo,
}

#[derive(Debug, Deserialize)]
pub(super) struct UserInfo {
    pub name: String,
    #[serde(default)]
    pub anon: bool,
    #[serde(default)]
    pub groups: Vec<String>,
    pub blockid: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct EditResponse {
    pub edit: Option<EditResult>,
}

#[derive(Debug, Deserialize)]
pub(super) struct EditResult {
    pub result: String,
}

const CAPTURE_TIME_FIELD: &str = "DateTimeOriginal";
const CAMERA_MODEL_FIELD: &str = "Model";

impl PageEntry {
    /// Converts an image page to a record. Pages without a title yield `None`.
    pub fn into_record(self) -> Option<ImageRecord> {
        let title = self.title?;
        let Some(info) = self.imageinfo.into_iter().next() else {
            return Some(ImageRecord {
                title,
                ..Default::default()
            });
        };
        let mut record = ImageRecord {
            title,
            upload_time: info.timestamp,
            user: info.user,
            ..Default::default()
        };
        for entry in info.commonmetadata.into_iter().flatten() {
            let MetadataValue::Text(value) = entry.value else {
                continue;
            };
            match entry.name.as_str() {
                CAPTURE_TIME_FIELD => record.capture_time = Some(value),
                CAMERA_MODEL_FIELD => record.camera_model = Some(value),
                _ => {},
            }
        }
        Some(record)
    }
}
