//! Time zones for Exif capture timestamps.
//!
//! Cameras record `DateTimeOriginal` as wall-clock time without any zone.
//! Given the zone the camera clock was set to and the zone where the photo
//! was taken, [`ZonePair::convert`] yields the local time at the destination,
//! and [`render`] writes it as a template call with an explicit UTC offset.

mod convert;
pub mod error;
mod zone;

pub use crate::convert::{CAPTURE_FORMAT, Conversion, format_iso, parse_capture, render};
pub use crate::zone::{ZonePair, ZoneSpec};
