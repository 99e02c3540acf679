use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use exn::OptionExt;

use crate::error::{Error, ErrorKind, Result};

/// A time zone given either as a fixed UTC offset or as a tz database region.
///
/// Regions follow daylight saving rules; fixed offsets never change.
///
/// # Parsing
/// - Numeric values are `[+-]HHMM` with optional sign and no leading zeros
///   required: `1000` is UTC+10:00, `-800` is UTC-08:00, `+0530` is
///   UTC+05:30.
/// - Anything else must be a tz database name containing a slash, such as
///   `Africa/Abidjan` or `Etc/UTC`.
///
/// ```
/// use dtz_zone::ZoneSpec;
///
/// assert!("1000".parse::<ZoneSpec>().is_ok());
/// assert!("Australia/Sydney".parse::<ZoneSpec>().is_ok());
/// assert!("AEST".parse::<ZoneSpec>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneSpec {
    Fixed(FixedOffset),
    Named(Tz),
}

impl ZoneSpec {
    /// Interprets a wall-clock time as local to this zone.
    ///
    /// Ambiguous times (the repeated hour when clocks go back) resolve to the
    /// earlier instant. Times inside a gap (clocks going forward) are read
    /// with the offset in force just before the transition, which moves them
    /// past the gap.
    ///
    /// Returns `None` if the instant falls outside the representable range.
    pub fn localize(&self, naive: &NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        match self {
            Self::Fixed(offset) => Some(offset.from_utc_datetime(&to_utc(naive, offset)?)),
            Self::Named(tz) => match tz.from_local_datetime(naive).earliest() {
                Some(local) => Some(local.with_timezone(&local.offset().fix())),
                None => {
                    let day_before = naive.checked_sub_signed(TimeDelta::days(1))?;
                    let before = tz.offset_from_utc_datetime(&day_before).fix();
                    let local = Utc.from_utc_datetime(&to_utc(naive, &before)?).with_timezone(tz);
                    Some(local.with_timezone(&local.offset().fix()))
                },
            },
        }
    }

    /// Converts an instant to wall-clock time in this zone.
    pub fn convert(&self, instant: &DateTime<FixedOffset>) -> DateTime<FixedOffset> {
        match self {
            Self::Fixed(offset) => instant.with_timezone(offset),
            Self::Named(tz) => {
                let local = instant.with_timezone(tz);
                local.with_timezone(&local.offset().fix())
            },
        }
    }
}

fn to_utc(naive: &NaiveDateTime, offset: &FixedOffset) -> Option<NaiveDateTime> {
    naive.checked_sub_signed(TimeDelta::seconds(offset.local_minus_utc().into()))
}

impl FromStr for ZoneSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let value = s.trim();
        if let Ok(number) = value.parse::<i32>() {
            let (hours, minutes) = (number / 100, number % 100);
            if minutes.abs() >= 60 {
                exn::bail!(ErrorKind::InvalidZone {
                    value: value.to_string(),
                    reason: "Minutes in a numeric timezone must be less than 60",
                });
            }
            let offset = FixedOffset::east_opt((hours * 60 + minutes) * 60).ok_or_raise(|| ErrorKind::InvalidZone {
                value: value.to_string(),
                reason: "Numeric timezone must be within 24 hours of UTC",
            })?;
            return Ok(Self::Fixed(offset));
        }
        if !value.contains('/') {
            exn::bail!(ErrorKind::InvalidZone {
                value: value.to_string(),
                reason: "Timezone should be either numeric or a tz database zone name with a slash",
            });
        }
        let tz = value.parse::<Tz>().ok().ok_or_raise(|| ErrorKind::InvalidZone {
            value: value.to_string(),
            reason: "Unknown tz database zone",
        })?;
        Ok(Self::Named(tz))
    }
}

impl fmt::Display for ZoneSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(offset) => write!(f, "{offset}"),
            Self::Named(tz) => f.write_str(tz.name()),
        }
    }
}

/// The camera's zone and the zone where the photo was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZonePair {
    pub camera: ZoneSpec,
    pub destination: ZoneSpec,
}

impl ZonePair {
    /// Builds a pair from optional zones; if only one is given it is used for
    /// both, and if neither is given the pair cannot be resolved.
    ///
    /// ```
    /// use dtz_zone::{ZonePair, ZoneSpec};
    ///
    /// let tokyo: ZoneSpec = "Asia/Tokyo".parse().unwrap();
    /// let pair = ZonePair::resolve(None, Some(tokyo)).unwrap();
    /// assert_eq!(pair.camera, tokyo);
    /// assert!(ZonePair::resolve(None, None).is_err());
    /// ```
    pub fn resolve(camera: Option<ZoneSpec>, destination: Option<ZoneSpec>) -> Result<Self> {
        match (camera, destination) {
            (Some(camera), Some(destination)) => Ok(Self { camera, destination }),
            (Some(zone), None) | (None, Some(zone)) => Ok(Self {
                camera: zone,
                destination: zone,
            }),
            (None, None) => exn::bail!(ErrorKind::NoZone),
        }
    }

    /// Parses both zones from optional user input, treating blank input as
    /// absent.
    pub fn parse(camera: Option<&str>, destination: Option<&str>) -> Result<Self> {
        let parse = |value: Option<&str>| -> Result<Option<ZoneSpec>> {
            match value.map(str::trim).filter(|v| !v.is_empty()) {
                Some(v) => v.parse().map(Some),
                None => Ok(None),
            }
        };
        Self::resolve(parse(camera)?, parse(destination)?)
    }
}
