//! Turning user input into a batch that can be scanned.

use crate::Filter;
use crate::error::{ErrorKind, Result};
use dtz_store::{DocumentStore, Identity, IdentityProvider, ImageRecord, UploadRange, file_title};
use dtz_zone::ZonePair;
use tracing::instrument;

/// Raw user input, as typed. Every field is trimmed before use, and blank
/// fields count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestInput {
    /// First file of the range: a file name, `File:` title or page URL.
    pub first: Option<String>,
    /// Last file of the range; defaults to `first`.
    pub last: Option<String>,
    /// Zone the camera clock was set to.
    pub camera: Option<String>,
    /// Zone where the photos were taken.
    pub location: Option<String>,
    pub author: Option<String>,
    pub model: Option<String>,
}

/// Everything a scan needs, validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    pub identity: Identity,
    pub range: UploadRange,
    pub zones: ZonePair,
    pub author: Option<Filter>,
    pub model: Option<Filter>,
}

/// Validated input that needs no remote calls.
struct LocalInput {
    first: String,
    last: String,
    zones: ZonePair,
    author: Option<Filter>,
    model: Option<Filter>,
}

impl RequestInput {
    fn validate(&self) -> Result<LocalInput> {
        let zones = ZonePair::parse(self.camera.as_deref(), self.location.as_deref())
            .map_err(|err| {
                let reason = err.to_string();
                err.raise(ErrorKind::InvalidRequest(reason))
            })?;
        let title = |input: &Option<String>| -> Result<Option<String>> {
            match input {
                Some(input) => file_title(input).map_err(|err| {
                    let reason = err.to_string();
                    err.raise(ErrorKind::InvalidRequest(reason))
                }),
                None => Ok(None),
            }
        };
        let (first, last) = match (title(&self.first)?, title(&self.last)?) {
            (Some(first), Some(last)) => (first, last),
            (Some(only), None) | (None, Some(only)) => (only.clone(), only),
            (None, None) => exn::bail!(ErrorKind::InvalidRequest("Please supply at least one file name.".to_string())),
        };
        let filter = |input: &Option<String>| input.as_deref().and_then(Filter::new);
        Ok(LocalInput {
            first,
            last,
            zones,
            author: filter(&self.author),
            model: filter(&self.model),
        })
    }
}

/// Upload time and uploader of a boundary file.
fn boundary(record: &ImageRecord) -> Result<(&str, &str)> {
    match (record.upload_time.as_deref(), record.user.as_deref()) {
        (Some(upload_time), Some(user)) => Ok((upload_time, user)),
        _ => exn::bail!(ErrorKind::Lookup(format!("no upload information for {}", record.title))),
    }
}

impl BatchRequest {
    /// Validates `input`, resolves the caller's identity, and looks up the
    /// two boundary files.
    ///
    /// Input that can be checked locally is checked before any remote call;
    /// identity is the first remote call, so an unusable credential fails the
    /// batch before any file is looked up.
    #[instrument(skip_all)]
    pub async fn resolve(
        store: &dyn DocumentStore,
        identity: &dyn IdentityProvider,
        input: &RequestInput,
    ) -> Result<Self> {
        let local = input.validate()?;
        let identity = match identity.resolve_identity().await {
            Ok(identity) => identity,
            Err(err) => {
                let reason = err.to_string();
                return Err(err.raise(ErrorKind::Identity(reason)));
            },
        };
        tracing::info!(user = %identity.username, "Resolved identity");

        let titles = [local.first, local.last];
        let records = match store.query_by_title(&titles).await {
            Ok(records) => records,
            Err(err) => {
                let reason = err.to_string();
                return Err(err.raise(ErrorKind::Lookup(reason)));
            },
        };
        // Asking for the same file twice yields a single record.
        let (Some(first), Some(last)) = (records.first(), records.last()) else {
            exn::bail!(ErrorKind::Lookup("Empty pages array when requesting imageinfo.".to_string()));
        };
        let (first_time, first_user) = boundary(first)?;
        let (last_time, last_user) = boundary(last)?;
        if first_user != last_user {
            exn::bail!(ErrorKind::InvalidRequest("Two files must be uploaded by the same user.".to_string()));
        }
        let range = UploadRange::new(first_user, first_time, last_time);
        tracing::debug!(?range, zones = ?local.zones, "Resolved batch request");
        Ok(Self {
            identity,
            range,
            zones: local.zones,
            author: local.author,
            model: local.model,
        })
    }
}
