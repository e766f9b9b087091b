//! Rendering extracted series for the terminal or for scripts.
//!
//! Results go to **stdout**; diagnostics go to stderr through `tracing`, so
//! JSON output stays parseable.

use std::io::Write;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use powder_core::models::{sort_for_display, ParsedSeries};

/// Output mode for the CLI: a human table or one JSON document.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    /// Default: human output when stdout is a TTY, otherwise JSON.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stdout) {
            OutputFormat::Human
        } else {
            OutputFormat::Json
        }
    }
}

/// JSON document printed by `powder extract --format json`.
#[derive(Debug, Serialize)]
pub struct ExtractReport<'a> {
    pub vendor: &'a str,
    pub source: String,
    pub series: &'a [ParsedSeries],
}

/// Write `series` in display order (ascending series number).
pub fn render(
    out: &mut impl Write,
    format: OutputFormat,
    vendor: &str,
    source: &str,
    series: &mut [ParsedSeries],
) -> Result<()> {
    sort_for_display(series);
    match format {
        OutputFormat::Json => {
            let report = ExtractReport {
                vendor,
                source: source.to_string(),
                series,
            };
            serde_json::to_writer_pretty(&mut *out, &report)?;
            writeln!(out)?;
        }
        OutputFormat::Human => {
            writeln!(out, "Detected {} data in '{}'", vendor, source)?;
            writeln!(out)?;
            writeln!(
                out,
                "{:>3}  {:<28} {:<32} {}",
                "#", "SERIES NAME", "SERIES RESULT", "SERIES DATE"
            )?;
            writeln!(out, "{}", "-".repeat(86))?;
            for s in series.iter() {
                writeln!(
                    out,
                    "{:>3}  {:<28} {:<32} {} {}",
                    s.series_num,
                    truncate(&s.display_name(), 28),
                    s.summary(),
                    s.first_date,
                    s.first_time
                )?;
            }
        }
    }
    Ok(())
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    cut.push('~');
    cut
}
