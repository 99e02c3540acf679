use dtz_zone::{CAPTURE_FORMAT, Conversion};
use std::fmt;

/// What happened to one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The page now carries the converted date.
    Converted(Conversion),
    /// The record was deliberately left alone.
    Skipped(String),
    /// The record should have been edited but could not be.
    Failed(String),
}

impl fmt::Display for RecordOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Converted(conversion) => write!(
                f,
                "date-time {} converted to {}",
                conversion.original.format(CAPTURE_FORMAT),
                conversion.converted.format(CAPTURE_FORMAT),
            ),
            Self::Skipped(reason) | Self::Failed(reason) => f.write_str(reason),
        }
    }
}

/// Counts of a finished scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub converted: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Result pages that could not be read and were skipped.
    pub pages_skipped: usize,
    /// The upstream error that ended the scan early, if any.
    pub query_error: Option<String>,
}

impl ScanSummary {
    pub fn records(&self) -> usize {
        self.converted + self.skipped + self.failed
    }

    pub(crate) fn count(&mut self, outcome: &RecordOutcome) {
        match outcome {
            RecordOutcome::Converted(_) => self.converted += 1,
            RecordOutcome::Skipped(_) => self.skipped += 1,
            RecordOutcome::Failed(_) => self.failed += 1,
        }
    }
}

impl fmt::Display for ScanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(error) = &self.query_error {
            write!(f, "Query returned an error: {error}. ")?;
        }
        write!(
            f,
            "Done: {} converted, {} skipped, {} failed",
            self.converted, self.skipped, self.failed
        )?;
        if self.pages_skipped > 0 {
            write!(f, ", {} result pages skipped", self.pages_skipped)?;
        }
        f.write_str(".")
    }
}

/// Progress events emitted by [`scan`](super::scan), one line of output each.
///
/// Events follow a strict ordering:
/// 1. [`Record`](Self::Record) and [`PageSkipped`](Self::PageSkipped): zero
///    or more times, in upload order.
/// 2. [`Finished`](Self::Finished): exactly once, unless the stream is
///    dropped first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    Record { title: String, outcome: RecordOutcome },
    /// A page of results could not be read; the scan carries on.
    PageSkipped,
    Finished(ScanSummary),
}

impl fmt::Display for ScanEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Record { title, outcome } => write!(f, "{title}: {outcome}"),
            Self::PageSkipped => f.write_str("Skipped a batch with missing pages array."),
            Self::Finished(summary) => summary.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dtz_zone::ZonePair;

    #[test]
    fn test_record_lines() {
        let conversion = ZonePair::parse(Some("900"), Some("-500")).unwrap().convert("2020:06:15 10:00:00").unwrap();
        let event = ScanEvent::Record {
            title: "File:A.jpg".to_string(),
            outcome: RecordOutcome::Converted(conversion),
        };
        assert_eq!(event.to_string(), "File:A.jpg: date-time 2020:06:15 10:00:00 converted to 2020:06:14 20:00:00");
        let event = ScanEvent::Record {
            title: "File:B.jpg".to_string(),
            outcome: RecordOutcome::Skipped("camera model didn't match.".to_string()),
        };
        assert_eq!(event.to_string(), "File:B.jpg: camera model didn't match.");
    }

    #[test]
    fn test_summary_line() {
        let mut summary = ScanSummary {
            converted: 3,
            skipped: 1,
            ..Default::default()
        };
        assert_eq!(summary.to_string(), "Done: 3 converted, 1 skipped, 0 failed.");
        summary.pages_skipped = 1;
        summary.query_error = Some("API error [maxlag]: lagged".to_string());
        assert_eq!(
            summary.to_string(),
            "Query returned an error: API error [maxlag]: lagged. Done: 3 converted, 1 skipped, 0 failed, 1 result pages skipped."
        );
        assert_eq!(summary.records(), 4);
    }
}
