//! ProChrono export decoders.
//!
//! ProChrono has shipped two CSV layouts. Both list series newest first, so
//! series numbers are assigned from the end of the file: the last series in
//! the file is series 1. Velocities are always ft/s.
//!
//! **Format 1** has one shot per row:
//!
//! ```text
//! Shot List,Index,Speed,...,Date/Time
//! 42gr H4350,1,2801,,,,,,06/01/2024 09:12:44
//! 42gr H4350,2,2799,,,,,,06/01/2024 09:13:10
//! ```
//!
//! A row whose index is `1` opens a new series named after its first cell.
//!
//! **Format 2** packs a series' shots horizontally and gives its timestamp on
//! a separate row:
//!
//! ```text
//! Shot 1,Shot 2,Shot 3
//! 2801,2799,2810
//! 6/1/2024 09:12:44
//! ```

use std::io::BufRead;

use chrono::NaiveDateTime;
use tracing::{debug, trace};

use crate::cells::{split_trimmed, Lines};
use crate::error::Result;
use crate::models::{number_in_reverse, parse_int_cell, ParsedSeries, SeriesBuilder, VelocityUnit};

const FORMAT1_MIN_CELLS: usize = 9;
const FORMAT1_TIMESTAMP_CELL: usize = 8;
const FORMAT2_TIMESTAMP: &str = "%m/%d/%Y %H:%M:%S";

/// Which layout a ProChrono file uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    One,
    Two,
}

impl Format {
    /// Format 2 files start with a `Shot 1,...` header.
    pub fn detect(first_line: &str) -> Self {
        if first_line.trim_start_matches('\u{feff}').starts_with("Shot 1") {
            Format::Two
        } else {
            Format::One
        }
    }
}

fn new_series() -> SeriesBuilder {
    SeriesBuilder::with_units(VelocityUnit::FeetPerSecond)
}

fn close(current: SeriesBuilder, out: &mut Vec<ParsedSeries>) {
    if current.has_velocities() {
        out.push(current.build(true));
    }
}

/// Decode a format 1 export.
pub fn decode_format1<R: BufRead>(reader: R) -> Result<Vec<ParsedSeries>> {
    let mut out = Vec::new();
    let mut current = new_series();

    for line in Lines::new(reader) {
        let cells = split_trimmed(&line?, ',');
        if cells.len() < FORMAT1_MIN_CELLS || cells[0] == "Shot List" {
            continue;
        }
        let Ok(index) = cells[1].parse::<i64>() else {
            continue;
        };

        if index == 1 {
            close(std::mem::replace(&mut current, new_series()), &mut out);
            current.name = Some(cells[0].clone());
        }

        if current.first_date.is_none()
            && !current.set_timestamp_from(&cells[FORMAT1_TIMESTAMP_CELL], " ")
        {
            trace!(cell = %cells[FORMAT1_TIMESTAMP_CELL], "prochrono: failed to split date/time");
        }

        match parse_int_cell(&cells[2]) {
            Some(v) => current.muzzle_velocities.push(v),
            None => debug!(cell = %cells[2], "prochrono: unparseable velocity, skipping"),
        }
    }
    close(current, &mut out);

    number_in_reverse(&mut out);
    Ok(out)
}

/// Decode a format 2 export. Series are named `Series {n}` after numbering.
pub fn decode_format2<R: BufRead>(reader: R) -> Result<Vec<ParsedSeries>> {
    let mut out = Vec::new();
    let mut current = new_series();

    for line in Lines::new(reader) {
        let cells = split_trimmed(&line?, ',');
        let first = cells[0].as_str();

        if first.contains("Shot") {
            continue;
        }

        if first.parse::<i64>().is_ok() {
            close(std::mem::replace(&mut current, new_series()), &mut out);
            current
                .muzzle_velocities
                .extend(cells.iter().filter_map(|c| parse_int_cell(c)));
        } else if NaiveDateTime::parse_from_str(first, FORMAT2_TIMESTAMP).is_ok()
            && current.first_date.is_none()
        {
            current.set_timestamp_from(first, " ");
        }
    }
    close(current, &mut out);

    number_in_reverse(&mut out);
    for s in &mut out {
        s.name = Some(format!("Series {}", s.series_num));
    }
    Ok(out)
}

/// Detect the layout from the first line and decode accordingly.
pub fn decode(text: &str) -> Result<Vec<ParsedSeries>> {
    let first_line = text.lines().next().unwrap_or("");
    match Format::detect(first_line) {
        Format::One => decode_format1(text.as_bytes()),
        Format::Two => decode_format2(text.as_bytes()),
    }
}
