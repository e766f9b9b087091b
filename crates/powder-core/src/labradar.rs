//! LabRadar series report decoder.
//!
//! A LabRadar report (`SR0001 Report.csv`) describes exactly one series.
//! Cells are `;`-separated and the file is often UTF-16 read as bytes, so
//! NUL characters are stripped before splitting.
//!
//! Rows of interest:
//!
//! - `Series No;<n>`: the device's series number.
//! - `Units velocity;<unit>`: `fps` is rewritten to `ft/s`.
//! - any row with at least 17 cells that is not the `Shot ID` header: one
//!   shot. Cell 2 is the velocity; cells 16 and 17 of the first shot row
//!   carry the date and time.

use std::io::BufRead;

use tracing::{debug, trace};

use crate::cells::Lines;
use crate::error::Result;
use crate::models::{parse_int_cell, ParsedSeries, SeriesBuilder, VelocityUnit};

const SHOT_ROW_MIN_CELLS: usize = 17;
const DATE_CELL: usize = 15;
const TIME_CELL: usize = 16;

/// Decode one LabRadar report. Always returns a series; it is valid only if
/// series number, unit, date, time and at least one velocity were seen.
///
/// Deleted series are exported without shots and come back invalid.
pub fn decode<R: BufRead>(reader: R) -> Result<ParsedSeries> {
    let mut series = SeriesBuilder::new();

    for line in Lines::new(reader) {
        let line = line?.replace('\0', "");
        let cells: Vec<&str> = line.split(';').map(str::trim).collect();

        if cells.len() < 2 {
            trace!("labradar: fewer than 2 cells, skipping row");
            continue;
        }

        if cells.len() >= SHOT_ROW_MIN_CELLS && cells[0] != "Shot ID" {
            if series.first_date.is_none() {
                series.first_date = Some(cells[DATE_CELL].to_string());
            }
            if series.first_time.is_none() {
                series.first_time = Some(cells[TIME_CELL].to_string());
            }
            match parse_int_cell(cells[1]) {
                Some(v) => series.muzzle_velocities.push(v),
                None => debug!(cell = cells[1], "labradar: unparseable velocity, skipping"),
            }
        } else if cells[0] == "Series No" {
            if let Ok(n) = cells[1].parse::<u32>() {
                series.series_num = Some(n);
            }
        } else if cells[0] == "Units velocity" {
            let label = cells[1].replace("fps", "ft/s");
            series.velocity_units = VelocityUnit::from_label(&label);
        }
    }

    let complete = series.series_num.is_some()
        && series.velocity_units.is_some()
        && series.first_date.is_some()
        && series.first_time.is_some();

    if !complete {
        debug!("labradar: series is missing expected fields, returning invalid");
        return Ok(series.build(false));
    }
    if !series.has_velocities() {
        debug!("labradar: series has no velocities (likely deleted), returning invalid");
        return Ok(series.build(false));
    }

    Ok(series.build(true))
}
