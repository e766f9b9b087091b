use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::output::OutputFormat;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub shotmarker: ShotMarkerConfig,
    #[serde(default)]
    pub workbook: WorkbookConfig,
    #[serde(default)]
    pub labradar: LabRadarConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ShotMarkerConfig {
    /// Upper bound on one decompressed record. Larger members are skipped.
    #[serde(default = "default_max_member_bytes")]
    pub max_member_bytes: u64,
    #[serde(default = "default_member_suffix")]
    pub member_suffix: String,
}

impl Default for ShotMarkerConfig {
    fn default() -> Self {
        Self {
            max_member_bytes: default_max_member_bytes(),
            member_suffix: default_member_suffix(),
        }
    }
}

fn default_max_member_bytes() -> u64 {
    1024 * 1024
}
fn default_member_suffix() -> String {
    ".z".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct WorkbookConfig {
    #[serde(default = "default_max_sheets")]
    pub max_sheets: usize,
    #[serde(default = "default_max_cells_per_sheet")]
    pub max_cells_per_sheet: usize,
    /// Maximum decompressed bytes read from a single xlsx part (zip-bomb protection).
    #[serde(default = "default_max_entry_bytes")]
    pub max_entry_bytes: u64,
}

impl Default for WorkbookConfig {
    fn default() -> Self {
        Self {
            max_sheets: default_max_sheets(),
            max_cells_per_sheet: default_max_cells_per_sheet(),
            max_entry_bytes: default_max_entry_bytes(),
        }
    }
}

fn default_max_sheets() -> usize {
    100
}
fn default_max_cells_per_sheet() -> usize {
    100_000
}
fn default_max_entry_bytes() -> u64 {
    50 * 1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct LabRadarConfig {
    #[serde(default = "default_series_dir_glob")]
    pub series_dir_glob: String,
    #[serde(default = "default_report_glob")]
    pub report_glob: String,
}

impl Default for LabRadarConfig {
    fn default() -> Self {
        Self {
            series_dir_glob: default_series_dir_glob(),
            report_glob: default_report_glob(),
        }
    }
}

fn default_series_dir_glob() -> String {
    "SR[0-9][0-9][0-9][0-9]*".to_string()
}
fn default_report_glob() -> String {
    "* Report.csv".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct OutputConfig {
    /// `human` or `json`. Unset means human on a terminal, JSON otherwise.
    #[serde(default)]
    pub format: Option<OutputFormat>,
}

/// Load the config file. A missing file yields the defaults; a file that
/// exists but does not parse or validate is an error.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.shotmarker.max_member_bytes == 0 {
        anyhow::bail!("shotmarker.max_member_bytes must be > 0");
    }

    if config.shotmarker.member_suffix.is_empty() {
        anyhow::bail!("shotmarker.member_suffix must not be empty");
    }

    if config.workbook.max_sheets == 0 || config.workbook.max_cells_per_sheet == 0 {
        anyhow::bail!("workbook.max_sheets and workbook.max_cells_per_sheet must be > 0");
    }

    for (key, pattern) in [
        ("labradar.series_dir_glob", &config.labradar.series_dir_glob),
        ("labradar.report_glob", &config.labradar.report_glob),
    ] {
        globset::Glob::new(pattern)
            .with_context(|| format!("{} is not a valid glob: '{}'", key, pattern))?;
    }

    Ok(config)
}
