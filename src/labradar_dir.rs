//! LabRadar device directory scanning.
//!
//! The device stores one `SR####` directory per series, each holding a
//! `SR#### Report.csv`. Users may point at the mount root (containing
//! `LBR`), at `LBR` itself, or at one series folder (containing `TRK`).
//! All of these resolve to the directory that holds the series folders.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobMatcher};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use powder_core::{labradar, ParsedSeries};

use crate::config::LabRadarConfig;

/// Resolve the directory that contains the `SR####` series folders.
pub fn series_root(dir: &Path) -> PathBuf {
    let lbr = dir.join("LBR");
    if lbr.is_dir() {
        return lbr;
    }
    if dir.join("TRK").is_dir() {
        if let Some(parent) = dir.parent() {
            return parent.to_path_buf();
        }
    }
    dir.to_path_buf()
}

fn matcher(pattern: &str) -> Result<GlobMatcher> {
    Ok(Glob::new(pattern)
        .with_context(|| format!("Invalid glob pattern: {}", pattern))?
        .compile_matcher())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Immediate children of `dir` matching `glob`, sorted by name.
fn children(dir: &Path, glob: &GlobMatcher, want_dirs: bool) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if entry.file_type().is_dir() != want_dirs {
            continue;
        }
        if glob.is_match(entry.file_name()) {
            out.push(entry.into_path());
        }
    }
    Ok(out)
}

/// Decode every valid series found under a LabRadar device directory.
/// Invalid or unreadable series are skipped. Each series is named after
/// its directory and keeps the device's series number.
pub fn scan_device(dir: &Path, config: &LabRadarConfig) -> Result<Vec<ParsedSeries>> {
    if !dir.is_dir() {
        bail!("LabRadar directory does not exist: {}", dir.display());
    }
    let root = series_root(dir);
    let series_glob = matcher(&config.series_dir_glob)?;
    let report_glob = matcher(&config.report_glob)?;

    let mut out = Vec::new();
    for series_dir in children(&root, &series_glob, true)? {
        let name = file_name(&series_dir);
        let Some(report) = children(&series_dir, &report_glob, false)?.into_iter().next() else {
            debug!(series = %name, "labradar: no report file");
            continue;
        };

        let series = match File::open(&report) {
            Ok(f) => labradar::decode(BufReader::new(f)),
            Err(e) => {
                warn!(report = %report.display(), error = %e, "labradar: cannot open report");
                continue;
            }
        };
        match series {
            Ok(mut series) if series.is_valid => {
                series.name = Some(name);
                out.push(series);
            }
            Ok(_) => debug!(series = %name, "labradar: incomplete series, skipping"),
            Err(e) => warn!(report = %report.display(), error = %e, "labradar: cannot read report"),
        }
    }

    info!(root = %root.display(), count = out.len(), "labradar: scanned device directory");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const HEADER: &str = "sep=;\nDevice ID;LBR-0123;\n";

    fn report(series_no: u32, velocities: &[u32]) -> String {
        let mut text = format!(
            "{}Series No;{:04};\nUnits velocity;fps;\nShot ID;V0;V1;\n",
            HEADER, series_no
        );
        for (i, v) in velocities.iter().enumerate() {
            let mut cells = vec![format!("{:04}", i + 1), v.to_string()];
            cells.extend((2..15).map(|_| "0".to_string()));
            cells.push("06-01-2024".to_string());
            cells.push("09:12:44".to_string());
            text.push_str(&cells.join(";"));
            text.push_str(";\n");
        }
        text
    }

    fn write_series(root: &Path, dir: &str, series_no: u32, velocities: &[u32]) {
        let d = root.join(dir);
        fs::create_dir_all(&d).unwrap();
        fs::write(d.join(format!("{} Report.csv", dir)), report(series_no, velocities)).unwrap();
    }

    #[test]
    fn scans_lbr_folder_in_name_order() {
        let tmp = TempDir::new().unwrap();
        let lbr = tmp.path().join("LBR");
        write_series(&lbr, "SR0002", 2, &[2810]);
        write_series(&lbr, "SR0001", 1, &[2800, 2805]);
        write_series(&lbr, "SR0003", 3, &[]);
        fs::create_dir_all(lbr.join("NOTES")).unwrap();

        let series = scan_device(tmp.path(), &LabRadarConfig::default()).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].name.as_deref(), Some("SR0001"));
        assert_eq!(series[0].series_num, 1);
        assert_eq!(series[0].muzzle_velocities, vec![2800.0, 2805.0]);
        assert_eq!(series[1].name.as_deref(), Some("SR0002"));
        assert_eq!(series[1].series_num, 2);
    }

    #[test]
    fn trk_folder_resolves_to_parent() {
        let tmp = TempDir::new().unwrap();
        let inner = tmp.path().join("SR0007");
        fs::create_dir_all(inner.join("TRK")).unwrap();
        fs::write(inner.join("SR0007 Report.csv"), report(7, &[2790])).unwrap();

        assert_eq!(series_root(&inner), tmp.path());
        let series = scan_device(&inner, &LabRadarConfig::default()).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].series_num, 7);
    }

    #[test]
    fn missing_directory_is_an_error() {
        assert!(scan_device(Path::new("/nonexistent/lbr"), &LabRadarConfig::default()).is_err());
    }
}
