//! Writing scan progress to the user.

use crate::scan::{ScanEvent, ScanSummary};
use futures::{Stream, StreamExt};
use std::io::Write;
use std::pin::pin;

/// How the output of a scan ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Every event was written.
    Finished(ScanSummary),
    /// The reader went away after `lines` lines; the scan was stopped.
    Disconnected { lines: usize },
}

/// Writes each event as one line, flushing after every line so the reader
/// sees progress as it happens.
///
/// The first failed write or flush drops `events`, which stops the scan
/// without treating it as an error.
pub async fn write_events<W: Write>(events: impl Stream<Item = ScanEvent>, out: &mut W) -> Completion {
    let mut events = pin!(events);
    let mut lines = 0;
    let mut summary = ScanSummary::default();
    while let Some(event) = events.next().await {
        if let Err(err) = writeln!(out, "{event}").and_then(|()| out.flush()) {
            tracing::info!(lines, error = %err, "Output closed, stopping scan");
            return Completion::Disconnected { lines };
        }
        lines += 1;
        if let ScanEvent::Finished(finished) = event {
            summary = finished;
        }
    }
    Completion::Finished(summary)
}
