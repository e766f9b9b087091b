//! MagnetoSpeed export decoder.
//!
//! One comma-separated file holds any number of series, each closed by a
//! `----` row. Two layouts exist:
//!
//! - **Classic** (V3 device export): `Series,<n>,Shots:,<count>` gives the
//!   series number; shot rows are `<id>,<?>,<velocity>,<unit>,...`.
//! - **XFR** (phone app export), recognised by a `Synced on:` row: the
//!   `Series` cell holds a date instead of a number, the name comes from
//!   `Notes`, and shot rows are `<id>,<velocity>,<unit>,...`.
//!
//! Every returned series is renumbered `1..=N` in file order.

use std::io::BufRead;

use tracing::{debug, trace};

use crate::cells::{split_trimmed, Lines};
use crate::error::Result;
use crate::models::{number_in_order, parse_int_cell, ParsedSeries, SeriesBuilder, VelocityUnit};

const SENTINEL: &str = "----";
const UNNAMED: &str = "Unnamed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Classic,
    Xfr,
}

impl Layout {
    /// (velocity column, unit column) of a shot row.
    fn shot_columns(self) -> (usize, usize) {
        match self {
            Layout::Classic => (2, 3),
            Layout::Xfr => (1, 2),
        }
    }
}

struct Decoder {
    layout: Layout,
    current: SeriesBuilder,
    finished: Vec<ParsedSeries>,
}

impl Decoder {
    fn new() -> Self {
        Self {
            layout: Layout::Classic,
            current: SeriesBuilder::new(),
            finished: Vec::new(),
        }
    }

    /// Close the open series; keep it only if it is complete for the layout.
    fn finalize(&mut self) {
        let series = std::mem::take(&mut self.current);
        let numbered = self.layout == Layout::Xfr || series.series_num.is_some();
        if !numbered || series.velocity_units.is_none() {
            debug!("magnetospeed: series missing expected fields, skipping");
            return;
        }
        if !series.has_velocities() {
            debug!("magnetospeed: series has no velocities, skipping");
            return;
        }
        self.finished.push(series.build(true));
    }

    fn row(&mut self, cells: &[String]) {
        let first = cells[0].as_str();
        let cell = |i: usize| cells.get(i).map(String::as_str).unwrap_or("");

        if first == SENTINEL {
            self.finalize();
        } else if first == "Synced on:" {
            self.layout = Layout::Xfr;
            if !self.current.set_timestamp_from(cell(1), " ") {
                debug!(cell = cell(1), "magnetospeed: failed to split sync time");
            }
        } else if first == "Series" && cell(2) == "Shots:" {
            // XFR files put a date here; the Notes row names those series instead.
            if let Ok(n) = cell(1).parse::<u32>() {
                self.current.series_num = Some(n);
                self.current.name = Some(format!("Series {}", n));
            }
        } else if first == "Notes" {
            let notes = cell(1);
            self.current.name = Some(if notes.is_empty() { UNNAMED } else { notes }.to_string());
        } else if first.parse::<i64>().is_ok() {
            let (velocity_col, unit_col) = self.layout.shot_columns();
            match parse_int_cell(cell(velocity_col)) {
                Some(v) => {
                    self.current.muzzle_velocities.push(v);
                    if self.current.muzzle_velocities.len() == 1 {
                        self.current.velocity_units = VelocityUnit::from_label(cell(unit_col));
                    }
                }
                None => trace!(cell = cell(velocity_col), "magnetospeed: skipping velocity"),
            }
        }
    }
}

/// Decode every complete series in a MagnetoSpeed export.
pub fn decode<R: BufRead>(reader: R) -> Result<Vec<ParsedSeries>> {
    let mut decoder = Decoder::new();

    for line in Lines::new(reader) {
        let cells = split_trimmed(&line?, ',');
        decoder.row(&cells);
    }

    // A sentinel leaves an empty builder behind, so this only picks up a
    // final block that was never closed.
    if decoder.current.has_velocities() {
        decoder.finalize();
    }

    let mut series = decoder.finished;
    number_in_order(&mut series);
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLASSIC: &str = "\
Series,1,Shots:,3
Min,2790,
Max,2815,
----
Series,1,Shots:,3
Notes,
1,Yes,2801,ft/s,
2,Yes,2790,ft/s,
3,Yes,2815,ft/s,
----
Series,2,Shots:,2
1,Yes,2750,ft/s,
2,Yes,2760,ft/s,
----
";

    const XFR: &str = "\
Synced on:,2024-06-01 09:12:44
Series,06/01/2024 09:00,Shots:,2
Notes,42.0gr H4350
1,2801,ft/s
2,2799,ft/s
----
Synced on:,2024-06-01 09:30:10
Series,06/01/2024 09:20,Shots:,1
Notes,
1,2755,ft/s
----
";

    #[test]
    fn classic_two_series_in_file_order() {
        let series = decode(CLASSIC.as_bytes()).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].muzzle_velocities, vec![2801.0, 2790.0, 2815.0]);
        assert_eq!(series[1].muzzle_velocities, vec![2750.0, 2760.0]);
        assert_eq!(series[0].series_num, 1);
        assert_eq!(series[1].series_num, 2);
        assert_eq!(series[1].name.as_deref(), Some("Series 2"));
        assert!(series.iter().all(|s| s.is_valid && !s.deleted));
    }

    #[test]
    fn xfr_names_from_notes_and_numbers_sequentially() {
        let series = decode(XFR.as_bytes()).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].name.as_deref(), Some("42.0gr H4350"));
        assert_eq!(series[1].name.as_deref(), Some("Unnamed"));
        assert_eq!(series[0].first_date, "2024-06-01");
        assert_eq!(series[0].first_time, "09:12:44");
        assert_eq!(series[0].muzzle_velocities, vec![2801.0, 2799.0]);
        assert_eq!(
            series.iter().map(|s| s.series_num).collect::<Vec<_>>(),
            vec![1, 2]
        );
    }

    #[test]
    fn classic_block_without_series_row_is_dropped() {
        let text = "1,Yes,2801,ft/s\n----\nSeries,5,Shots:,1\n1,Yes,2700,ft/s\n----\n";
        let series = decode(text.as_bytes()).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].muzzle_velocities, vec![2700.0]);
        assert_eq!(series[0].series_num, 1);
    }

    #[test]
    fn unclosed_final_block_is_kept_once() {
        let text = "Series,1,Shots:,1\n1,Yes,2801,ft/s\n----\nSeries,2,Shots:,1\n1,Yes,2700,ft/s\n";
        let series = decode(text.as_bytes()).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[1].muzzle_velocities, vec![2700.0]);
    }

    #[test]
    fn short_series_row_does_not_panic() {
        let text = "Series\nSeries,1\n----\n";
        assert!(decode(text.as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn leading_bom_keeps_series_number() {
        let text = "\u{feff}Series,1,Shots:,1\n1,Yes,2801,ft/s\n----\n";
        let series = decode(text.as_bytes()).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].name.as_deref(), Some("Series 1"));
        assert_eq!(series[0].muzzle_velocities, vec![2801.0]);
    }

    #[test]
    fn empty_input() {
        assert!(decode(&b""[..]).unwrap().is_empty());
    }
}
