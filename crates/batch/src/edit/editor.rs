use super::error::{ErrorKind, Result};
use super::rate::RateLimiter;
use crate::Filter;
use chrono::{DateTime, FixedOffset};
use dtz_store::{DocumentStore, Edit};
use dtz_wikitext::find_positions;
use exn::OptionExt;
use tracing::instrument;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_SUMMARY: &str = "Set date from Exif with time zone";
pub const DEFAULT_TEMPLATE: &str = "DTZ";

/// How a guarded edit is carried out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSettings {
    /// Total save attempts, including the first.
    pub max_attempts: u32,
    pub summary: String,
    /// Name of the template wrapped around the new date.
    pub template: String,
}

impl Default for EditSettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            summary: DEFAULT_SUMMARY.to_string(),
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

/// Replaces the `date` field of `title` with `{{template|instant}}`.
///
/// Each attempt waits on `limiter`, fetches the page afresh, and saves with
/// that fetch's concurrency token, so a conflicting edit made in between is
/// picked up by the next attempt. Only a failed save is retried; everything
/// else ends the call straight away. The limiter is marked only after a
/// successful save.
#[instrument(skip(store, instant, author, limiter, settings), fields(store = store.name()))]
pub async fn attempt_edit(
    store: &dyn DocumentStore,
    title: &str,
    instant: &DateTime<FixedOffset>,
    author: Option<&Filter>,
    limiter: &mut RateLimiter,
    settings: &EditSettings,
) -> Result<()> {
    let replacement = dtz_zone::render(&settings.template, instant);
    let mut last_error = None;
    for attempt in 1..=settings.max_attempts {
        limiter.wait().await;
        let document = match store.fetch(title).await {
            Ok(document) => document,
            Err(err) => {
                let reason = err.to_string();
                return Err(err.raise(ErrorKind::Fetch(reason)));
            },
        };
        let positions = find_positions(&document.text);
        if let Some(author) = author
            && !positions.author.is_some_and(|span| author.matches(span.value(&document.text)))
        {
            exn::bail!(ErrorKind::FilterMismatch);
        }
        let date = positions.date.ok_or_raise(|| ErrorKind::DateFieldMissing)?;
        let text = date.splice(&document.text, &replacement);
        if text == document.text {
            exn::bail!(ErrorKind::NoChangeNeeded);
        }
        let edit = Edit {
            title: document.title,
            text,
            token: document.token,
            summary: settings.summary.clone(),
        };
        match store.save(&edit).await {
            Ok(()) => {
                limiter.mark();
                tracing::info!(attempt, "Saved");
                return Ok(());
            },
            Err(err) => {
                tracing::warn!(attempt, error = %err, "Save failed");
                last_error = Some(err);
            },
        }
    }
    match last_error {
        Some(err) => {
            let reason = err.to_string();
            Err(err.raise(ErrorKind::Save(reason)))
        },
        None => exn::bail!(ErrorKind::Save("no attempts were made".to_string())),
    }
}
