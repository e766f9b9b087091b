//! Manually entered velocities.
//!
//! Free text with one velocity per line. Lines that are not whole numbers
//! are skipped.

use tracing::trace;

use crate::models::{parse_int_cell, ParsedSeries, SeriesBuilder, VelocityUnit};

/// Parse one velocity per line, skipping anything that is not an integer.
pub fn parse_velocities(text: &str) -> Vec<f64> {
    text.lines()
        .filter_map(|line| {
            let v = parse_int_cell(line);
            if v.is_none() && !line.trim().is_empty() {
                trace!(line, "manual: skipping invalid number");
            }
            v
        })
        .collect()
}

/// Build series 1 from entered text, or `None` if nothing parsed.
pub fn series_from_text(text: &str, units: VelocityUnit) -> Option<ParsedSeries> {
    let velocities = parse_velocities(text);
    if velocities.is_empty() {
        return None;
    }
    let series = SeriesBuilder {
        series_num: Some(1),
        name: Some("Series 1".to_string()),
        velocity_units: Some(units),
        first_date: Some("-".to_string()),
        first_time: Some(String::new()),
        muzzle_velocities: velocities,
    };
    Some(series.build(true))
}
