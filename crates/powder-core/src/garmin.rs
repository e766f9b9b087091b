//! Garmin Xero export decoders.
//!
//! Garmin exports a session either as a workbook (one sheet per series) or
//! as a single-series CSV. Both share the same grid:
//!
//! ```text
//! row 1: <series name>
//! row 2: <header>, "SPEED (FPS)" | "SPEED (MPS)", ...
//! row n: <shot #>, <velocity>, ...
//! row m: "DATE", "June 1, 2024 at 9:12 AM"
//! ```
//!
//! Velocities may use a comma as the decimal mark.

use std::collections::BTreeMap;

use tracing::{debug, trace, warn};

use crate::cells::parse_localized_decimal;
use crate::models::{ParsedSeries, SeriesBuilder, VelocityUnit};
use crate::tokenizer;

const NO_DATE: &str = "-";
const DATE_LABEL: &str = "DATE";
const FIRST_DATA_ROW: u32 = 3;

/// A worksheet as a sparse grid of cell text, addressed 1-based like the
/// spreadsheet itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Worksheet {
    pub name: String,
    cells: BTreeMap<(u32, u32), String>,
    max_row: u32,
}

impl Worksheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the text of cell (`row`, `col`), both 1-based.
    pub fn set(&mut self, row: u32, col: u32, text: impl Into<String>) {
        self.max_row = self.max_row.max(row);
        self.cells.insert((row, col), text.into());
    }

    /// Cell text, or `""` for an empty cell.
    pub fn get(&self, row: u32, col: u32) -> &str {
        self.cells.get(&(row, col)).map(String::as_str).unwrap_or("")
    }

    pub fn max_row(&self) -> u32 {
        self.max_row
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
}

fn units_from_header(header: &str) -> VelocityUnit {
    if header.contains("FPS") {
        VelocityUnit::FeetPerSecond
    } else {
        VelocityUnit::MetersPerSecond
    }
}

fn push_velocity(series: &mut SeriesBuilder, cell: &str) {
    match parse_localized_decimal(cell) {
        Some(v) => series.muzzle_velocities.push(v),
        None => trace!(cell, "garmin: skipping velocity entry"),
    }
}

fn new_series() -> SeriesBuilder {
    SeriesBuilder {
        first_date: Some(NO_DATE.to_string()),
        first_time: Some(String::new()),
        ..SeriesBuilder::new()
    }
}

/// Decode one worksheet. `None` when the sheet has no parseable velocity.
fn decode_sheet(sheet: &Worksheet) -> Option<SeriesBuilder> {
    let mut series = new_series();
    series.name = Some(sheet.get(1, 1).trim().to_string());
    series.velocity_units = Some(units_from_header(sheet.get(2, 2)));

    for row in FIRST_DATA_ROW..=sheet.max_row() {
        let first = sheet.get(row, 1).trim();
        if first.parse::<i64>().is_ok() {
            push_velocity(&mut series, sheet.get(row, 2));
        } else if first == DATE_LABEL {
            let cell = sheet.get(row, 2).trim();
            if !series.set_timestamp_from(cell, " at ") {
                debug!(cell, "garmin: failed to split date/time");
            }
        }
    }

    series.has_velocities().then_some(series)
}

/// Decode every sheet of a workbook. Sheets without velocities are left
/// out; the rest are numbered `1..=N` in sheet order.
pub fn decode_workbook(sheets: &[Worksheet]) -> Vec<ParsedSeries> {
    let mut out = Vec::new();
    for sheet in sheets {
        match decode_sheet(sheet) {
            Some(mut series) => {
                series.series_num = Some(out.len() as u32 + 1);
                out.push(series.build(true));
            }
            None => debug!(sheet = %sheet.name, "garmin: sheet has no velocities, skipping"),
        }
    }
    out
}

/// Decode a single-series Garmin CSV. Returns an empty list when no
/// velocity was found.
pub fn decode_csv(text: &str) -> Vec<ParsedSeries> {
    let mut series = new_series();
    series.series_num = Some(1);
    series.velocity_units = Some(VelocityUnit::FeetPerSecond);

    for (i, row) in tokenizer::rows(text).enumerate() {
        let cells: Vec<String> = match row {
            Ok(cells) => cells.into_iter().map(|c| c.trim().to_string()).collect(),
            Err(e) => {
                warn!(error = %e, "garmin: discarding row");
                break;
            }
        };
        let cell = |n: usize| cells.get(n).map(String::as_str).unwrap_or("");

        if i == 0 {
            series.name = Some(cell(0).to_string());
        } else if i == 1 {
            series.velocity_units = Some(units_from_header(cell(1)));
        } else if cell(0) == DATE_LABEL {
            series.first_date = Some(cell(1).to_string());
            series.first_time = Some(String::new());
        } else if cell(0).parse::<i64>().is_ok() {
            push_velocity(&mut series, cell(1));
        }
    }

    if !series.has_velocities() {
        debug!("garmin: no velocities in csv");
        return Vec::new();
    }
    vec![series.build(true)]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(name: &str, unit_header: &str, shots: &[&str], date: Option<&str>) -> Worksheet {
        let mut ws = Worksheet::new(name);
        ws.set(1, 1, name);
        ws.set(2, 1, "#");
        ws.set(2, 2, unit_header);
        let mut row = 3;
        for (i, v) in shots.iter().enumerate() {
            ws.set(row, 1, (i + 1).to_string());
            ws.set(row, 2, *v);
            row += 1;
        }
        ws.set(row, 1, "AVERAGE SPEED");
        ws.set(row, 2, "2800");
        if let Some(d) = date {
            ws.set(row + 1, 1, "DATE");
            ws.set(row + 1, 2, d);
        }
        ws
    }

    #[test]
    fn workbook_sheet_per_series() {
        let sheets = vec![
            sheet("42.0gr", "SPEED (FPS)", &["2801", "2795,5"], Some("June 1, 2024 at 9:12 AM")),
            sheet("empty", "SPEED (FPS)", &[], None),
            sheet("metric", "SPEED (MPS)", &["853.4", "bad"], None),
        ];
        let series = decode_workbook(&sheets);
        assert_eq!(series.len(), 2);

        assert_eq!(series[0].series_num, 1);
        assert_eq!(series[0].name.as_deref(), Some("42.0gr"));
        assert_eq!(series[0].muzzle_velocities, vec![2801.0, 2795.5]);
        assert_eq!(series[0].first_date, "June 1, 2024");
        assert_eq!(series[0].first_time, "9:12 AM");

        assert_eq!(series[1].series_num, 2);
        assert_eq!(series[1].velocity_units, VelocityUnit::MetersPerSecond);
        assert_eq!(series[1].muzzle_velocities, vec![853.4]);
        assert_eq!(series[1].first_date, "-");
        assert_eq!(series[1].first_time, "");
    }

    const CSV: &str = "\
\"Load, 42.0gr\"
#,SPEED (FPS),\u{394} AVG (FPS)
1,2801,
2,\"2795,5\",
3,2810.0,
AVERAGE SPEED,2802.2
DATE,\"June 1, 2024 at 9:12 AM\"
";

    #[test]
    fn csv_single_series() {
        let series = decode_csv(CSV);
        assert_eq!(series.len(), 1);
        let s = &series[0];
        assert_eq!(s.series_num, 1);
        assert_eq!(s.name.as_deref(), Some("Load, 42.0gr"));
        assert_eq!(s.velocity_units, VelocityUnit::FeetPerSecond);
        assert_eq!(s.muzzle_velocities, vec![2801.0, 2795.5, 2810.0]);
        assert_eq!(s.first_date, "June 1, 2024 at 9:12 AM");
        assert_eq!(s.first_time, "");
        assert!(s.is_valid);
    }

    #[test]
    fn csv_leading_bom_not_in_name() {
        let series = decode_csv("\u{feff}Load A\n#,SPEED (FPS)\n1,2801\n");
        assert_eq!(series[0].name.as_deref(), Some("Load A"));
    }

    #[test]
    fn csv_metric_units() {
        let text = "name\n#,SPEED (MPS)\n1,853\n";
        assert_eq!(decode_csv(text)[0].velocity_units, VelocityUnit::MetersPerSecond);
    }

    #[test]
    fn csv_without_velocities_is_empty() {
        assert!(decode_csv("name\n#,SPEED (FPS)\nDATE,today\n").is_empty());
        assert!(decode_csv("").is_empty());
    }

    #[test]
    fn csv_stops_at_unterminated_quote() {
        let text = "name\n#,SPEED (FPS)\n1,2801\n2,\"2799\n";
        let series = decode_csv(text);
        assert_eq!(series[0].muzzle_velocities, vec![2801.0]);
    }
}
