//! Line and cell helpers shared by the fixed-delimiter decoders.
//!
//! Vendor exports are not reliably UTF-8, so lines are decoded lossily
//! rather than rejected.

use std::io::{self, BufRead};

const BOM: char = '\u{feff}';

/// Lossy line iterator. Strips the line terminator (`\n` or `\r\n`) and a
/// byte-order mark at the start of the stream.
pub struct Lines<R> {
    reader: R,
    buf: Vec<u8>,
    first: bool,
}

impl<R: BufRead> Lines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            first: true,
        }
    }
}

impl<R: BufRead> Iterator for Lines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                if self.buf.ends_with(b"\n") {
                    self.buf.pop();
                    if self.buf.ends_with(b"\r") {
                        self.buf.pop();
                    }
                }
                let mut line = String::from_utf8_lossy(&self.buf).into_owned();
                if std::mem::take(&mut self.first) && line.starts_with(BOM) {
                    line.remove(0);
                }
                Some(Ok(line))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

/// Split on `delimiter` and trim every cell.
pub fn split_trimmed(line: &str, delimiter: char) -> Vec<String> {
    line.split(delimiter).map(|c| c.trim().to_string()).collect()
}

/// Parse a velocity written with either `.` or `,` as the decimal mark.
///
/// With a single kind of separator, `,` is read as the decimal mark. When
/// both appear, whichever comes last is the decimal mark and the other is
/// a grouping mark.
pub fn parse_localized_decimal(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    let last_comma = cell.rfind(',');
    let last_dot = cell.rfind('.');
    let normalized = match (last_comma, last_dot) {
        (Some(c), Some(d)) if c > d => cell.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cell.replace(',', ""),
        (Some(_), None) => cell.replace(',', "."),
        _ => cell.to_string(),
    };
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}
