//! Canonical series model produced by every decoder.
//!
//! A [`ParsedSeries`] is a plain value: decoders build it, hand it to the
//! caller, and never touch it again. Presentation state (enabled flags,
//! charge weights, widgets) belongs to whatever wraps it downstream.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Unit attached to the raw numbers in [`ParsedSeries::muzzle_velocities`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VelocityUnit {
    #[default]
    #[serde(rename = "ft/s")]
    FeetPerSecond,
    #[serde(rename = "m/s")]
    MetersPerSecond,
}

impl VelocityUnit {
    /// Label used in exports and summaries (`ft/s` or `m/s`).
    pub fn as_str(&self) -> &'static str {
        match self {
            VelocityUnit::FeetPerSecond => "ft/s",
            VelocityUnit::MetersPerSecond => "m/s",
        }
    }

    /// Interpret a vendor unit label. Returns `None` for anything unrecognized.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "ft/s" | "fps" => Some(VelocityUnit::FeetPerSecond),
            "m/s" | "mps" => Some(VelocityUnit::MetersPerSecond),
            _ => None,
        }
    }
}

impl fmt::Display for VelocityUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VelocityUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VelocityUnit::from_label(s)
            .ok_or_else(|| format!("unknown velocity unit '{}': expected fps or mps", s))
    }
}

/// One group of chronograph shots sharing a session, timestamp, and unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedSeries {
    /// 1-based display order; assignment rule is vendor specific.
    pub series_num: u32,
    pub name: Option<String>,
    pub velocity_units: VelocityUnit,
    /// Vendor-native date text. Not reparsed.
    pub first_date: String,
    /// Vendor-native time text. Empty when the vendor has no time component.
    pub first_time: String,
    /// One entry per shot, in shot order.
    pub muzzle_velocities: Vec<f64>,
    pub is_valid: bool,
    pub deleted: bool,
}

impl ParsedSeries {
    /// Display name, falling back to `Series {n}`.
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("Series {}", self.series_num),
        }
    }

    /// Smallest and largest velocity, or `None` for an empty series.
    pub fn velocity_range(&self) -> Option<(f64, f64)> {
        let mut iter = self.muzzle_velocities.iter().copied();
        let first = iter.next()?;
        Some(iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }

    /// One-line result summary, e.g. `5 shots, 2790-2815 ft/s`.
    pub fn summary(&self) -> String {
        let total = self.muzzle_velocities.len();
        let (lo, hi) = self.velocity_range().unwrap_or((0.0, 0.0));
        format!(
            "{} shot{}, {}-{} {}",
            total,
            if total == 1 { "" } else { "s" },
            lo,
            hi,
            self.velocity_units
        )
    }
}

/// Sort a result set into display order (ascending series number).
pub fn sort_for_display(series: &mut [ParsedSeries]) {
    series.sort_by_key(|s| s.series_num);
}

/// Accumulator used by decoders while a series is still open.
///
/// Fields the vendor may or may not provide stay `None` until observed so
/// completeness checks can tell "missing" apart from "empty".
#[derive(Debug, Clone, Default)]
pub(crate) struct SeriesBuilder {
    pub series_num: Option<u32>,
    pub name: Option<String>,
    pub velocity_units: Option<VelocityUnit>,
    pub first_date: Option<String>,
    pub first_time: Option<String>,
    pub muzzle_velocities: Vec<f64>,
}

impl SeriesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_units(units: VelocityUnit) -> Self {
        Self {
            velocity_units: Some(units),
            ..Self::default()
        }
    }

    pub fn has_velocities(&self) -> bool {
        !self.muzzle_velocities.is_empty()
    }

    /// Set date and time from a `"<date> <time>"` cell. Only an exact
    /// two-way split is accepted.
    pub fn set_timestamp_from(&mut self, cell: &str, separator: &str) -> bool {
        let parts: Vec<&str> = cell.split(separator).collect();
        if parts.len() != 2 {
            return false;
        }
        self.first_date = Some(parts[0].to_string());
        self.first_time = Some(parts[1].to_string());
        true
    }

    /// Freeze into a [`ParsedSeries`]. Unobserved fields become empty values.
    pub fn build(self, is_valid: bool) -> ParsedSeries {
        ParsedSeries {
            series_num: self.series_num.unwrap_or(0),
            name: self.name,
            velocity_units: self.velocity_units.unwrap_or_default(),
            first_date: self.first_date.unwrap_or_default(),
            first_time: self.first_time.unwrap_or_default(),
            muzzle_velocities: self.muzzle_velocities,
            is_valid,
            deleted: false,
        }
    }
}

/// Parse a trimmed integer cell as a velocity.
pub(crate) fn parse_int_cell(cell: &str) -> Option<f64> {
    cell.trim().parse::<i64>().ok().map(|v| v as f64)
}

/// Assign `1..=N` in current order.
pub(crate) fn number_in_order(series: &mut [ParsedSeries]) {
    for (i, s) in series.iter_mut().enumerate() {
        s.series_num = i as u32 + 1;
    }
}

/// Assign `1..=N` starting from the last element (newest-first exports).
pub(crate) fn number_in_reverse(series: &mut [ParsedSeries]) {
    let total = series.len() as u32;
    for (i, s) in series.iter_mut().enumerate() {
        s.series_num = total - i as u32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_labels() {
        assert_eq!(VelocityUnit::from_label("fps"), Some(VelocityUnit::FeetPerSecond));
        assert_eq!(VelocityUnit::from_label(" FT/S "), Some(VelocityUnit::FeetPerSecond));
        assert_eq!(VelocityUnit::from_label("m/s"), Some(VelocityUnit::MetersPerSecond));
        assert_eq!(VelocityUnit::from_label("knots"), None);
        assert!("furlongs".parse::<VelocityUnit>().is_err());
    }

    #[test]
    fn unit_serializes_as_label() {
        let json = serde_json::to_string(&VelocityUnit::FeetPerSecond).unwrap();
        assert_eq!(json, "\"ft/s\"");
    }

    #[test]
    fn summary_matches_series_list_format() {
        let mut b = SeriesBuilder::with_units(VelocityUnit::FeetPerSecond);
        b.muzzle_velocities = vec![2800.0, 2790.0, 2815.0];
        let s = b.build(true);
        assert_eq!(s.summary(), "3 shots, 2790-2815 ft/s");

        let mut b = SeriesBuilder::with_units(VelocityUnit::MetersPerSecond);
        b.muzzle_velocities = vec![853.5];
        assert_eq!(b.build(true).summary(), "1 shot, 853.5-853.5 m/s");
        assert_eq!(SeriesBuilder::new().build(false).summary(), "0 shots, 0-0 ft/s");
    }

    #[test]
    fn builder_defaults_are_well_formed() {
        let s = SeriesBuilder::new().build(false);
        assert_eq!(s.series_num, 0);
        assert_eq!(s.first_date, "");
        assert!(!s.is_valid);
        assert!(!s.deleted);
        assert_eq!(s.display_name(), "Series 0");
    }

    #[test]
    fn timestamp_split_requires_two_halves() {
        let mut b = SeriesBuilder::new();
        assert!(!b.set_timestamp_from("2024-05-01", " "));
        assert!(b.first_date.is_none());
        assert!(!b.set_timestamp_from("a b c", " "));
        assert!(b.set_timestamp_from("May 1, 2024 at 10:15:00", " at "));
        assert_eq!(b.first_date.as_deref(), Some("May 1, 2024"));
        assert_eq!(b.first_time.as_deref(), Some("10:15:00"));
    }

    #[test]
    fn reverse_numbering() {
        let mut v: Vec<ParsedSeries> = (0..3).map(|_| SeriesBuilder::new().build(true)).collect();
        number_in_reverse(&mut v);
        let nums: Vec<u32> = v.iter().map(|s| s.series_num).collect();
        assert_eq!(nums, vec![3, 2, 1]);
        sort_for_display(&mut v);
        assert_eq!(v[0].series_num, 1);
    }
}
