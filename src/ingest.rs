//! Vendor dispatch.
//!
//! Maps a [`Vendor`] and an input path to the matching decoder, opening
//! files and loading workbooks as each decoder expects.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::{debug, info};

use powder_core::{garmin, magnetospeed, prochrono, ParsedSeries};

use crate::archive;
use crate::config::Config;
use crate::labradar_dir;
use crate::workbook;

/// Supported chronograph ecosystems.
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum Vendor {
    #[value(name = "labradar")]
    LabRadar,
    #[value(name = "magnetospeed")]
    MagnetoSpeed,
    #[value(name = "prochrono")]
    ProChrono,
    #[value(name = "garmin")]
    Garmin,
    #[value(name = "shotmarker")]
    ShotMarker,
}

impl Vendor {
    pub const ALL: [Vendor; 5] = [
        Vendor::LabRadar,
        Vendor::MagnetoSpeed,
        Vendor::ProChrono,
        Vendor::Garmin,
        Vendor::ShotMarker,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            Vendor::LabRadar => "LabRadar",
            Vendor::MagnetoSpeed => "MagnetoSpeed",
            Vendor::ProChrono => "ProChrono",
            Vendor::Garmin => "Garmin",
            Vendor::ShotMarker => "ShotMarker",
        }
    }

    /// What the vendor's export looks like on disk.
    pub fn accepted_input(&self) -> &'static str {
        match self {
            Vendor::LabRadar => "device directory (LBR/SR####) or SR#### Report.csv",
            Vendor::MagnetoSpeed => "CSV export (classic or XFR)",
            Vendor::ProChrono => "CSV export (either layout)",
            Vendor::Garmin => ".xlsx workbook or .csv export",
            Vendor::ShotMarker => ".tar backup bundle",
        }
    }
}

impl std::fmt::Display for Vendor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

fn open(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(BufReader::new(file))
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}

/// Decode `path` as `vendor` data. An empty list means the input held no
/// usable series; unreadable or unsupported inputs are errors. Series that
/// failed their decoder's completeness checks are never returned.
pub fn extract(vendor: Vendor, path: &Path, config: &Config) -> Result<Vec<ParsedSeries>> {
    let mut series = match vendor {
        Vendor::LabRadar => {
            if path.is_dir() {
                labradar_dir::scan_device(path, &config.labradar)?
            } else {
                let series = powder_core::labradar::decode(open(path)?)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                vec![series]
            }
        }
        Vendor::MagnetoSpeed => magnetospeed::decode(open(path)?)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        Vendor::ProChrono => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            prochrono::decode(&String::from_utf8_lossy(&bytes))?
        }
        Vendor::Garmin => {
            if has_extension(path, "xlsx") {
                let sheets = workbook::load_workbook(path, &config.workbook)?;
                garmin::decode_workbook(&sheets)
            } else if has_extension(path, "csv") {
                let bytes = std::fs::read(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                garmin::decode_csv(&String::from_utf8_lossy(&bytes))
            } else {
                bail!(
                    "Unsupported Garmin file '{}': only Garmin .xlsx and .csv files are supported",
                    path.display()
                );
            }
        }
        Vendor::ShotMarker => {
            if !has_extension(path, "tar") {
                bail!(
                    "Unsupported ShotMarker file '{}': only .tar backup bundles contain velocity data",
                    path.display()
                );
            }
            archive::read_bundle(path, &config.shotmarker)
        }
    };

    series.retain(|s| {
        if !s.is_valid {
            debug!(vendor = %vendor, series = s.series_num, "dropping incomplete series");
        }
        s.is_valid
    });

    info!(vendor = %vendor, path = %path.display(), count = series.len(), "extracted series");
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn garmin_rejects_other_extensions() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("session.fit");
        fs::write(&path, b"").unwrap();
        let err = extract(Vendor::Garmin, &path, &Config::default()).unwrap_err();
        assert!(err.to_string().contains(".xlsx and .csv"));
    }

    #[test]
    fn shotmarker_requires_tar() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("backup.zip");
        fs::write(&path, b"").unwrap();
        let err = extract(Vendor::ShotMarker, &path, &Config::default()).unwrap_err();
        assert!(err.to_string().contains(".tar"));
    }

    #[test]
    fn prochrono_detects_layout() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("pc.csv");
        fs::write(&path, "Shot 1,Shot 2\n2800,2810\n06/01/2024 09:12:44\n").unwrap();
        let series = extract(Vendor::ProChrono, &path, &Config::default()).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].muzzle_velocities, vec![2800.0, 2810.0]);
    }

    #[test]
    fn deleted_labradar_report_yields_nothing() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("SR0002 Report.csv");
        fs::write(
            &path,
            "sep=;\nSeries No;0002;\nUnits velocity;fps;\nShot ID;V0;\n",
        )
        .unwrap();
        let series = extract(Vendor::LabRadar, &path, &Config::default()).unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn missing_file_is_an_error() {
        let missing = Path::new("/nonexistent/export.csv");
        assert!(extract(Vendor::MagnetoSpeed, missing, &Config::default()).is_err());
    }

    #[test]
    fn vendor_names() {
        assert_eq!(Vendor::LabRadar.to_string(), "LabRadar");
        assert_eq!(Vendor::ALL.len(), 5);
    }
}
