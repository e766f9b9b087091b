//! ShotMarker backup bundles.
//!
//! A bundle is a tar archive whose `.z` members are zlib-compressed JSON
//! string records. The archive is unpacked into a call-scoped
//! [`TempDir`], which is removed on every exit path when it drops.

use std::fs::File;
use std::io::Read;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, TimeZone};
use flate2::read::ZlibDecoder;
use tempfile::TempDir;
use tracing::{debug, warn};

use powder_core::shotmarker::decode_record;
use powder_core::ParsedSeries;

use crate::config::ShotMarkerConfig;

/// Decode every string in the bundle at `path`, with timestamps in local
/// time. Failure to open or unpack the archive yields an empty list.
pub fn read_bundle(path: &Path, config: &ShotMarkerConfig) -> Vec<ParsedSeries> {
    read_bundle_in(path, config, &Local)
}

/// [`read_bundle`] with an explicit time zone.
pub fn read_bundle_in<Tz: TimeZone>(
    path: &Path,
    config: &ShotMarkerConfig,
    tz: &Tz,
) -> Vec<ParsedSeries>
where
    Tz::Offset: std::fmt::Display,
{
    match TempDir::new() {
        Ok(scratch) => read_bundle_with(path, config, tz, scratch),
        Err(e) => {
            warn!(error = %e, "shotmarker: cannot create scratch directory");
            Vec::new()
        }
    }
}

/// Decode using `scratch` for extraction. The directory is removed when
/// this returns, whatever the outcome.
fn read_bundle_with<Tz: TimeZone>(
    path: &Path,
    config: &ShotMarkerConfig,
    tz: &Tz,
    scratch: TempDir,
) -> Vec<ParsedSeries>
where
    Tz::Offset: std::fmt::Display,
{
    let members = match unpack(path, scratch.path(), &config.member_suffix) {
        Ok(members) => members,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "shotmarker: cannot unpack archive");
            return Vec::new();
        }
    };

    let mut out = Vec::new();
    for member in &members {
        let json = match inflate_bounded(member, config.max_member_bytes) {
            Ok(Some(json)) => json,
            Ok(None) => {
                warn!(
                    member = %member.display(),
                    max_bytes = config.max_member_bytes,
                    "shotmarker: member exceeds size limit, skipping"
                );
                continue;
            }
            Err(e) => {
                warn!(member = %member.display(), error = %e, "shotmarker: cannot decompress member, skipping");
                continue;
            }
        };
        match decode_record(&json, tz) {
            Ok(Some(mut series)) => {
                series.series_num = out.len() as u32 + 1;
                out.push(series);
            }
            Ok(None) => debug!(member = %member.display(), "shotmarker: no qualifying shots"),
            Err(e) => warn!(member = %member.display(), error = %e, "shotmarker: bad record, skipping"),
        }
    }
    out
}

/// Unpack the archive into `dest`, returning the extracted members whose
/// names end in `suffix`, in archive order.
fn unpack(archive_path: &Path, dest: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    let file = File::open(archive_path)
        .with_context(|| format!("Failed to open archive: {}", archive_path.display()))?;
    let mut archive = tar::Archive::new(file);

    let mut members = Vec::new();
    for entry in archive.entries()? {
        let mut entry = entry?;
        let relative = entry.path()?.into_owned();
        let is_file = entry.header().entry_type().is_file();
        if !entry.unpack_in(dest)? {
            debug!(member = %relative.display(), "shotmarker: skipping entry outside archive root");
            continue;
        }
        if is_file && relative.to_string_lossy().ends_with(suffix) {
            members.push(extracted_path(dest, &relative));
        }
    }
    debug!(count = members.len(), "shotmarker: unpacked members");
    Ok(members)
}

/// Where `unpack_in` placed an entry: root, prefix and `.` components are
/// dropped, so absolute member names land under `dest` too.
fn extracted_path(dest: &Path, member: &Path) -> PathBuf {
    let mut path = dest.to_path_buf();
    for component in member.components() {
        if let Component::Normal(part) = component {
            path.push(part);
        }
    }
    path
}

/// Inflate a zlib member. `Ok(None)` when the output would exceed
/// `max_bytes`.
fn inflate_bounded(path: &Path, max_bytes: u64) -> Result<Option<Vec<u8>>> {
    let decoder = ZlibDecoder::new(File::open(path)?);
    let mut out = Vec::new();
    decoder.take(max_bytes + 1).read_to_end(&mut out)?;
    if out.len() as u64 > max_bytes {
        return Ok(None);
    }
    Ok(Some(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn zlib(body: &[u8]) -> Vec<u8> {
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(body).unwrap();
        enc.finish().unwrap()
    }

    fn build_tar(path: &Path, members: &[(&str, Vec<u8>)]) {
        let mut builder = tar::Builder::new(File::create(path).unwrap());
        for (name, data) in members {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, data.as_slice()).unwrap();
        }
        builder.finish().unwrap();
    }

    fn build_tar_raw_names(path: &Path, members: &[(&str, Vec<u8>)]) {
        let mut builder = tar::Builder::new(File::create(path).unwrap());
        for (name, data) in members {
            let mut header = tar::Header::new_gnu();
            let raw = &mut header.as_gnu_mut().unwrap().name;
            raw[..name.len()].copy_from_slice(name.as_bytes());
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_entry_type(tar::EntryType::Regular);
            header.set_cksum();
            builder.append(&header, data.as_slice()).unwrap();
        }
        builder.finish().unwrap();
    }

    fn record(name: &str, v: f64) -> Vec<u8> {
        zlib(format!(r#"{{"name":"{}","ts":1717233164000,"shots":[{{"v":{}}}]}}"#, name, v).as_bytes())
    }

    #[test]
    fn members_numbered_in_archive_order() {
        let tmp = TempDir::new().unwrap();
        let bundle = tmp.path().join("backup.tar");
        build_tar(
            &bundle,
            &[
                ("strings/b.z", record("second in name order", 853.0)),
                ("strings/readme.txt", b"ignored".to_vec()),
                ("strings/a.z", record("first in name order", 850.0)),
                ("strings/sighters.z", zlib(br#"{"name":"s","ts":0,"shots":[{"v":1.0,"sighter":true}]}"#)),
                ("strings/broken.z", b"not zlib".to_vec()),
                ("strings/badjson.z", zlib(b"{nope")),
            ],
        );

        let series = read_bundle_in(&bundle, &ShotMarkerConfig::default(), &Utc);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].series_num, 1);
        assert_eq!(series[0].name.as_deref(), Some("second in name order"));
        assert_eq!(series[0].muzzle_velocities, vec![2798.0]);
        assert_eq!(series[0].first_time, "09:12:44");
        assert_eq!(series[1].series_num, 2);
        assert_eq!(series[1].name.as_deref(), Some("first in name order"));
    }

    #[test]
    fn oversized_member_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let bundle = tmp.path().join("backup.tar");
        build_tar(&bundle, &[("a.z", record("big", 853.0))]);

        let config = ShotMarkerConfig {
            max_member_bytes: 16,
            ..ShotMarkerConfig::default()
        };
        assert!(read_bundle_in(&bundle, &config, &Utc).is_empty());
    }

    #[test]
    fn unreadable_archive_is_empty() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("missing.tar");
        assert!(read_bundle(&missing, &ShotMarkerConfig::default()).is_empty());

        let garbage = tmp.path().join("garbage.tar");
        std::fs::write(&garbage, vec![0xffu8; 1024]).unwrap();
        assert!(read_bundle(&garbage, &ShotMarkerConfig::default()).is_empty());
    }

    #[test]
    fn absolute_member_names_stay_in_scratch() {
        let tmp = TempDir::new().unwrap();
        let bundle = tmp.path().join("backup.tar");
        build_tar_raw_names(
            &bundle,
            &[
                ("/powder_strings_abs/a.z", record("absolute", 853.0)),
                ("./strings/b.z", record("dotted", 850.0)),
            ],
        );

        let series = read_bundle_in(&bundle, &ShotMarkerConfig::default(), &Utc);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].name.as_deref(), Some("absolute"));
        assert_eq!(series[0].muzzle_velocities, vec![2798.0]);
        assert_eq!(series[1].name.as_deref(), Some("dotted"));
        assert!(!Path::new("/powder_strings_abs").exists());
    }

    #[test]
    fn extracted_paths_are_rooted_at_dest() {
        let dest = Path::new("/scratch");
        assert_eq!(extracted_path(dest, Path::new("/x/a.z")), Path::new("/scratch/x/a.z"));
        assert_eq!(extracted_path(dest, Path::new("./x/a.z")), Path::new("/scratch/x/a.z"));
        assert_eq!(extracted_path(dest, Path::new("a.z")), Path::new("/scratch/a.z"));
    }

    #[test]
    fn scratch_dir_removed_after_failures() {
        let parent = TempDir::new().unwrap();
        let tmp = TempDir::new().unwrap();

        let bundle = tmp.path().join("backup.tar");
        build_tar(&bundle, &[("a.z", b"not zlib".to_vec()), ("b.z", zlib(b"{nope"))]);
        let scratch = TempDir::new_in(parent.path()).unwrap();
        let series = read_bundle_with(&bundle, &ShotMarkerConfig::default(), &Utc, scratch);
        assert!(series.is_empty());
        assert_eq!(std::fs::read_dir(parent.path()).unwrap().count(), 0);

        let garbage = tmp.path().join("garbage.tar");
        std::fs::write(&garbage, vec![0xffu8; 1024]).unwrap();
        let scratch = TempDir::new_in(parent.path()).unwrap();
        assert!(read_bundle_with(&garbage, &ShotMarkerConfig::default(), &Utc, scratch).is_empty());
        assert_eq!(std::fs::read_dir(parent.path()).unwrap().count(), 0);
    }
}
