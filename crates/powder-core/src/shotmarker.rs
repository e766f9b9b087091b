//! ShotMarker string records.
//!
//! A ShotMarker backup bundle is a tar archive of zlib-compressed JSON
//! documents, one per string of fire. This module covers the part after
//! decompression: turning one JSON document into a series. Unpacking the
//! archive lives with the caller since it needs the filesystem.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::trace;

use crate::error::Result;
use crate::models::{ParsedSeries, SeriesBuilder, VelocityUnit};

#[derive(Debug, Deserialize)]
struct StringRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    name: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    ts: f64,
    #[serde(default)]
    shots: Vec<ShotRecord>,
}

#[derive(Debug, Deserialize)]
struct ShotRecord {
    #[serde(default, deserialize_with = "lenient_f64")]
    v: f64,
    #[serde(default, deserialize_with = "lenient_bool")]
    hidden: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    sighter: bool,
    #[serde(default)]
    display_text: Option<Value>,
}

// A field holding the wrong JSON type reads as its zero value instead of
// failing the whole record.

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f64, D::Error> {
    Ok(Value::deserialize(deserializer)?.as_f64().unwrap_or(0.0))
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<bool, D::Error> {
    Ok(Value::deserialize(deserializer)?.as_bool().unwrap_or(false))
}

fn lenient_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        _ => String::new(),
    })
}

/// Convert a ShotMarker m/s reading to whole ft/s, truncating toward zero.
///
/// The yards-per-meter factor times three is slightly off the exact
/// 3.28084 and stays that way so results match earlier imports.
pub fn to_fps(meters_per_second: f64) -> f64 {
    (meters_per_second * 1.0936133 * 3.0).trunc()
}

/// Render epoch milliseconds as separate date and time strings in `tz`,
/// e.g. `("Sat Jun 1 2024", "09:12:44")`.
pub fn split_timestamp<Tz: TimeZone>(millis: i64, tz: &Tz) -> (String, String)
where
    Tz::Offset: std::fmt::Display,
{
    let utc = DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or_default();
    let local = utc.with_timezone(tz);
    (
        local.format("%a %b %-d %Y").to_string(),
        local.format("%H:%M:%S").to_string(),
    )
}

/// Decode one decompressed string record. `Ok(None)` when every shot was a
/// sighter or hidden. The series number is left at 0 for the caller to
/// assign.
pub fn decode_record<Tz: TimeZone>(json: &[u8], tz: &Tz) -> Result<Option<ParsedSeries>>
where
    Tz::Offset: std::fmt::Display,
{
    let record: StringRecord = serde_json::from_slice(json)?;

    let mut series = SeriesBuilder::with_units(VelocityUnit::FeetPerSecond);
    series.name = Some(record.name);
    let (date, time) = split_timestamp(record.ts as i64, tz);
    series.first_date = Some(date);
    series.first_time = Some(time);

    for shot in &record.shots {
        if shot.hidden {
            trace!(shot = ?shot.display_text, "shotmarker: ignoring hidden shot");
        } else if shot.sighter {
            trace!(shot = ?shot.display_text, "shotmarker: ignoring sighter shot");
        } else {
            series.muzzle_velocities.push(to_fps(shot.v));
        }
    }

    Ok(series.has_velocities().then(|| series.build(true)))
}
