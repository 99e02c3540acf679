use super::event::{RecordOutcome, ScanEvent, ScanSummary};
use crate::BatchRequest;
use crate::edit::{EditSettings, RateLimiter, attempt_edit};
use async_stream::stream;
use dtz_store::{DocumentStore, ImageRecord};
use futures::Stream;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const DEFAULT_RECORD_PACING: Duration = Duration::from_secs(1);

/// Pacing of a scan and the edits it makes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSettings {
    /// Records requested per result page.
    pub page_size: u32,
    /// Delay before each record, whatever its outcome.
    pub record_pacing: Duration,
    pub edit: EditSettings,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            record_pacing: DEFAULT_RECORD_PACING,
            edit: EditSettings::default(),
        }
    }
}

/// Streams one [`ScanEvent`] per record uploaded by `request.range.user`
/// within the request's range, in upload order, then a final
/// [`ScanEvent::Finished`].
///
/// Records are processed strictly one at a time, and nothing happens unless
/// the stream is polled: dropping it stops the scan after the record in
/// progress. Unreadable result pages are reported and skipped; any other
/// query error ends the scan, and is carried by the final summary.
///
/// `limiter` is held for the duration of each guarded edit, so runs sharing
/// it never edit within its interval of each other.
pub fn scan<'a>(
    store: &'a dyn DocumentStore,
    request: &'a BatchRequest,
    limiter: Arc<Mutex<RateLimiter>>,
    settings: &'a ScanSettings,
) -> impl Stream<Item = ScanEvent> + 'a {
    // `rustfmt` does not format macros that use braces. Wrap in parentheses!
    stream!({
        let mut summary = ScanSummary::default();
        tracing::info!(
            user = %request.range.user,
            start = %request.range.start,
            end = %request.range.end,
            "Scanning uploads"
        );
        for await page in store.query_range(&request.range, settings.page_size) {
            let records = match page {
                Ok(records) => records,
                Err(err) if err.is_page_local() => {
                    tracing::warn!(error = %err, "Skipping unreadable result page");
                    summary.pages_skipped += 1;
                    yield ScanEvent::PageSkipped;
                    continue;
                },
                Err(err) => {
                    tracing::error!(error = ?err, "Range query failed");
                    summary.query_error = Some(err.to_string());
                    break;
                },
            };
            for record in records {
                tokio::time::sleep(settings.record_pacing).await;
                let outcome = process_record(store, request, &limiter, &settings.edit, &record).await;
                summary.count(&outcome);
                yield ScanEvent::Record {
                    title: record.title,
                    outcome,
                };
            }
        }
        tracing::info!(?summary, "Scan finished");
        yield ScanEvent::Finished(summary);
    })
}

/// Filters, converts and edits a single record.
async fn process_record(
    store: &dyn DocumentStore,
    request: &BatchRequest,
    limiter: &Mutex<RateLimiter>,
    settings: &EditSettings,
    record: &ImageRecord,
) -> RecordOutcome {
    let Some(capture_time) = record.capture_time.as_deref() else {
        return RecordOutcome::Skipped("time not found in metadata.".to_string());
    };
    if let Some(model) = &request.model
        && !record.camera_model.as_deref().is_some_and(|m| model.matches(m))
    {
        return RecordOutcome::Skipped("camera model didn't match.".to_string());
    }
    let conversion = match request.zones.convert(capture_time) {
        Ok(conversion) => conversion,
        Err(err) => return RecordOutcome::Skipped(err.to_string()),
    };
    let mut limiter = limiter.lock().await;
    let result = attempt_edit(
        store,
        &record.title,
        &conversion.converted,
        request.author.as_ref(),
        &mut limiter,
        settings,
    )
    .await;
    match result {
        Ok(()) => RecordOutcome::Converted(conversion),
        Err(err) if err.is_skip() => RecordOutcome::Skipped(err.to_string()),
        Err(err) => {
            tracing::warn!(title = %record.title, error = ?err, "Edit failed");
            RecordOutcome::Failed(err.to_string())
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Filter;
    use dtz_store::backend::{MockStore, ReadOnlyStore};
    use dtz_store::{Identity, UploadRange};
    use dtz_zone::ZonePair;
    use futures::StreamExt;
    use tokio::time::Instant;

    const PAGE: &str = "{{Information\n|date=2020-06-15\n|author=Jane\n}}\n";

    fn image(title: &str, upload_time: &str, capture_time: Option<&str>, model: Option<&str>) -> ImageRecord {
        ImageRecord {
            title: title.to_string(),
            upload_time: Some(upload_time.to_string()),
            user: Some("Jane".to_string()),
            capture_time: capture_time.map(String::from),
            camera_model: model.map(String::from),
        }
    }

    fn request(model: Option<&str>) -> BatchRequest {
        BatchRequest {
            identity: Identity::default(),
            range: UploadRange::new("Jane", "2020-01-01T00:00:00Z", "2020-12-31T00:00:00Z"),
            zones: ZonePair::parse(Some("+0900"), Some("-0500")).unwrap(),
            author: None,
            model: model.and_then(Filter::new),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_record_outcomes() {
        let store = MockStore::default()
            .with_image(image("File:A.jpg", "2020-01-01T00:00:00Z", Some("2020:06:15 10:00:00"), Some("X100V")))
            .with_image(image("File:B.jpg", "2020-01-02T00:00:00Z", None, Some("X100V")))
            .with_image(image("File:C.jpg", "2020-01-03T00:00:00Z", Some("2020:06:15 10:00:00"), Some("EOS R")))
            .with_image(image("File:D.jpg", "2020-01-04T00:00:00Z", Some("15/06/2020"), Some("x100v")))
            .with_image(image("File:E.jpg", "2020-01-05T00:00:00Z", Some("2020:06:15 10:00:00"), Some("X100V")))
            .with_page("File:A.jpg", PAGE);
        let request = request(Some("x100"));
        let settings = ScanSettings::default();
        let limiter = Arc::new(Mutex::new(RateLimiter::default()));
        let events: Vec<_> = scan(&store, &request, limiter, &settings).collect().await;
        let lines: Vec<_> = events.iter().map(ToString::to_string).collect();
        assert_eq!(
            lines,
            [
                "File:A.jpg: date-time 2020:06:15 10:00:00 converted to 2020:06:14 20:00:00",
                "File:B.jpg: time not found in metadata.",
                "File:C.jpg: camera model didn't match.",
                "File:D.jpg: failed to parse the timestamp: cannot parse \"15/06/2020\" as \"%Y:%m:%d %H:%M:%S\"",
                "File:E.jpg: failed to fetch: File not found: File:E.jpg",
                "Done: 1 converted, 3 skipped, 1 failed.",
            ]
        );
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_paces_every_record() {
        let mut store = MockStore::default();
        for day in 1..=3 {
            store = store.with_image(image(&format!("File:{day}.jpg"), &format!("2020-01-0{day}T00:00:00Z"), None, None));
        }
        let request = request(None);
        let settings = ScanSettings::default();
        let start = Instant::now();
        let events: Vec<_> =
            scan(&store, &request, Arc::new(Mutex::new(RateLimiter::default())), &settings).collect().await;
        assert_eq!(events.len(), 4);
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_edits_respect_interval() {
        let mut store = MockStore::default();
        for day in 1..=3 {
            let title = format!("File:{day}.jpg");
            store = store
                .with_image(image(&title, &format!("2020-01-0{day}T00:00:00Z"), Some("2020:06:15 10:00:00"), None))
                .with_page(title, PAGE);
        }
        let request = request(None);
        let settings = ScanSettings::default();
        let start = Instant::now();
        let events: Vec<_> =
            scan(&store, &request, Arc::new(Mutex::new(RateLimiter::default())), &settings).collect().await;
        assert!(matches!(events.last(), Some(ScanEvent::Finished(ScanSummary { converted: 3, .. }))));
        // 1s pacing, edit; 1s pacing, 4s wait, edit; 1s pacing, 4s wait, edit.
        assert_eq!(start.elapsed(), Duration::from_secs(11));
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_errors() {
        let mut store = MockStore::default().with_malformed_page(0).with_query_error_at(2);
        for day in 1..=6 {
            store = store.with_image(image(&format!("File:{day}.jpg"), &format!("2020-01-0{day}T00:00:00Z"), None, None));
        }
        let request = request(None);
        let settings = ScanSettings {
            page_size: 2,
            ..Default::default()
        };
        let events: Vec<_> =
            scan(&store, &request, Arc::new(Mutex::new(RateLimiter::default())), &settings).collect().await;
        assert_eq!(events[0], ScanEvent::PageSkipped);
        let titles: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                ScanEvent::Record { title, .. } => Some(title.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(titles, ["File:3.jpg", "File:4.jpg"]);
        let Some(ScanEvent::Finished(summary)) = events.last() else {
            panic!("scan did not finish");
        };
        assert_eq!(summary.pages_skipped, 1);
        assert_eq!(summary.skipped, 2);
        assert!(summary.query_error.as_deref().is_some_and(|e| e.contains("injected query failure")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dry_run_is_paced_by_records_only() {
        let mut store = MockStore::default();
        for day in 1..=3 {
            let title = format!("File:{day}.jpg");
            store = store
                .with_image(image(&title, &format!("2020-01-0{day}T00:00:00Z"), Some("2020:06:15 10:00:00"), None))
                .with_page(title, PAGE);
        }
        let store = Arc::new(store);
        let dry_run = ReadOnlyStore::new(Arc::clone(&store));
        let request = request(None);
        let settings = ScanSettings::default();
        let limiter = Arc::new(Mutex::new(RateLimiter::new(Duration::ZERO)));
        let start = Instant::now();
        let events: Vec<_> = scan(&dry_run, &request, limiter, &settings).collect().await;
        assert!(matches!(events.last(), Some(ScanEvent::Finished(ScanSummary { converted: 3, .. }))));
        assert_eq!(start.elapsed(), Duration::from_secs(3));
        assert_eq!(store.save_count(), 0);
        assert_eq!(store.text("File:1.jpg").await.as_deref(), Some(PAGE));
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_range_capture_time_is_skipped() {
        let store = MockStore::default()
            .with_image(image("File:A.jpg", "2020-01-01T00:00:00Z", Some("+262142:12:31 23:59:59"), None))
            .with_image(image("File:B.jpg", "2020-01-02T00:00:00Z", Some("2020:06:15 10:00:00"), None))
            .with_page("File:B.jpg", PAGE);
        let request = request(None);
        let settings = ScanSettings::default();
        let events: Vec<_> =
            scan(&store, &request, Arc::new(Mutex::new(RateLimiter::default())), &settings).collect().await;
        assert!(matches!(&events[0], ScanEvent::Record { outcome: RecordOutcome::Skipped(_), .. }));
        assert!(matches!(&events[1], ScanEvent::Record { outcome: RecordOutcome::Converted(_), .. }));
        assert!(matches!(events.last(), Some(ScanEvent::Finished(ScanSummary { converted: 1, skipped: 1, .. }))));
    }
}
