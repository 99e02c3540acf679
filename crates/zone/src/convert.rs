//! Exif capture timestamp conversion and `{{DTZ}}`-style rendering.

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use exn::{OptionExt, ResultExt};
use tracing::instrument;

use crate::error::{ErrorKind, Result};
use crate::{ZonePair, ZoneSpec};

/// Exif `DateTimeOriginal` layout, e.g. `2020:06:15 10:00:00`.
pub const CAPTURE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// A capture time read in the camera's zone, and the same instant as
/// wall-clock time at the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conversion {
    pub original: DateTime<FixedOffset>,
    pub converted: DateTime<FixedOffset>,
}

/// Parses an Exif capture timestamp as wall-clock time in `zone`.
///
/// The year must be exactly four digits.
pub fn parse_capture(value: &str, zone: &ZoneSpec) -> Result<DateTime<FixedOffset>> {
    let invalid = || ErrorKind::InvalidTimestamp(format!("cannot parse {value:?} as {CAPTURE_FORMAT:?}"));
    let year = value.as_bytes().get(..5);
    if !year.is_some_and(|y| y[..4].iter().all(u8::is_ascii_digit) && y[4] == b':') {
        exn::bail!(invalid());
    }
    let naive = NaiveDateTime::parse_from_str(value, CAPTURE_FORMAT).or_raise(invalid)?;
    zone.localize(&naive).ok_or_raise(invalid)
}

impl ZonePair {
    /// Reads `value` in the camera zone and re-expresses it in the destination
    /// zone.
    ///
    /// ```
    /// use dtz_zone::ZonePair;
    ///
    /// let pair = ZonePair::parse(Some("900"), Some("-500")).unwrap();
    /// let conversion = pair.convert("2020:06:15 10:00:00").unwrap();
    /// assert_eq!(conversion.converted.to_string(), "2020-06-14 20:00:00 -05:00");
    /// ```
    #[instrument(level = "trace", skip(self))]
    pub fn convert(&self, value: &str) -> Result<Conversion> {
        let original = parse_capture(value, &self.camera)?;
        Ok(Conversion {
            original,
            converted: self.destination.convert(&original),
        })
    }
}

/// Formats an instant as ISO-8601 to the second with an explicit numeric
/// offset. Whole-hour offsets are written as hours only (`-05`), others as
/// `+05:30`.
pub fn format_iso(instant: &DateTime<FixedOffset>) -> String {
    let seconds = instant.offset().local_minus_utc();
    let sign = if seconds < 0 { '-' } else { '+' };
    let seconds = seconds.unsigned_abs();
    let (hours, minutes) = (seconds / 3600, seconds % 3600 / 60);
    let offset = match minutes {
        0 => format!("{sign}{hours:02}"),
        _ => format!("{sign}{hours:02}:{minutes:02}"),
    };
    format!("{}{offset}", instant.format("%Y-%m-%dT%H:%M:%S"))
}

/// Renders the replacement field value, `{{template|ISO-8601}}`.
///
/// ```
/// use chrono::DateTime;
/// use dtz_zone::render;
///
/// let instant = DateTime::parse_from_rfc3339("2020-06-14T20:00:00-05:00").unwrap();
/// assert_eq!(render("DTZ", &instant), "{{DTZ|2020-06-14T20:00:00-05}}");
/// ```
pub fn render(template: &str, instant: &DateTime<FixedOffset>) -> String {
    format!("{{{{{template}|{}}}}}", format_iso(instant))
}
