//! Minimal xlsx reader producing [`Worksheet`] grids for the Garmin decoder.
//!
//! Reads the OOXML parts directly: `xl/workbook.xml` for sheet order and
//! names, its relationships for the part paths, `xl/sharedStrings.xml`,
//! then each worksheet's `<c>` cells. Only cell text is kept; styles,
//! formulas and formatting are ignored.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, warn};

use powder_core::garmin::Worksheet;

use crate::config::WorkbookConfig;

type Archive<'a> = zip::ZipArchive<std::io::Cursor<&'a [u8]>>;

/// Load every worksheet of the workbook at `path`, in workbook order.
pub fn load_workbook(path: &Path, config: &WorkbookConfig) -> Result<Vec<Worksheet>> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read workbook: {}", path.display()))?;
    read_workbook(&bytes, config)
        .with_context(|| format!("Failed to load workbook: {}", path.display()))
}

/// Parse an in-memory xlsx.
pub fn read_workbook(bytes: &[u8], config: &WorkbookConfig) -> Result<Vec<Worksheet>> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))?;
    let shared_strings = read_shared_strings(&mut archive, config.max_entry_bytes)?;
    let sheets = list_sheets(&mut archive, config.max_entry_bytes)?;

    let mut out = Vec::new();
    for (name, part) in sheets.into_iter().take(config.max_sheets) {
        let xml = match read_entry_bounded(&mut archive, &part, config.max_entry_bytes) {
            Ok(xml) => xml,
            Err(e) => {
                warn!(sheet = %name, error = %e, "workbook: skipping unreadable sheet");
                continue;
            }
        };
        let sheet = read_sheet_cells(&name, &xml, &shared_strings, config.max_cells_per_sheet)?;
        debug!(sheet = %name, cells = sheet.cell_count(), "workbook: loaded sheet");
        out.push(sheet);
    }
    Ok(out)
}

fn read_entry_bounded(archive: &mut Archive<'_>, name: &str, max_bytes: u64) -> Result<Vec<u8>> {
    let entry = archive.by_name(name)?;
    let mut out = Vec::new();
    entry.take(max_bytes).read_to_end(&mut out)?;
    if out.len() as u64 >= max_bytes {
        bail!("xlsx part {} exceeds size limit ({} bytes)", name, max_bytes);
    }
    Ok(out)
}

fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes().flatten().find_map(|a| {
        if a.key.as_ref() == key || a.key.local_name().as_ref() == key {
            a.unescape_value().ok().map(|v| v.into_owned())
        } else {
            None
        }
    })
}

fn read_shared_strings(archive: &mut Archive<'_>, max_bytes: u64) -> Result<Vec<String>> {
    if archive.index_for_name("xl/sharedStrings.xml").is_none() {
        return Ok(Vec::new());
    }
    let xml = read_entry_bounded(archive, "xl/sharedStrings.xml", max_bytes)?;
    let mut strings = Vec::new();
    let mut reader = Reader::from_reader(xml.as_slice());
    let mut buf = Vec::new();
    let mut current: Option<String> = None;
    let mut in_t = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"t" => in_t = true,
                _ => {}
            },
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Ok(Event::Text(te)) if in_t => {
                if let Some(s) = current.as_mut() {
                    s.push_str(&te.unescape()?);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_t = false,
                b"si" => strings.push(current.take().unwrap_or_default()),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(anyhow!("sharedStrings.xml: {}", e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

/// (sheet name, part path) in workbook order.
fn list_sheets(archive: &mut Archive<'_>, max_bytes: u64) -> Result<Vec<(String, String)>> {
    let rels = read_relationships(archive, max_bytes).unwrap_or_default();
    let mut sheets = Vec::new();

    if archive.index_for_name("xl/workbook.xml").is_some() {
        let xml = read_entry_bounded(archive, "xl/workbook.xml", max_bytes)?;
        let mut reader = Reader::from_reader(xml.as_slice());
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"sheet" => {
                    let name = attr(&e, b"name").unwrap_or_default();
                    let part = attr(&e, b"id").and_then(|id| rels.get(&id).cloned());
                    if let Some(part) = part {
                        sheets.push((name, part));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(anyhow!("workbook.xml: {}", e)),
                _ => {}
            }
            buf.clear();
        }
    }

    if sheets.is_empty() {
        sheets = list_worksheet_parts(archive)
            .into_iter()
            .map(|part| {
                let name = part
                    .trim_start_matches("xl/worksheets/")
                    .trim_end_matches(".xml")
                    .to_string();
                (name, part)
            })
            .collect();
    }
    Ok(sheets)
}

/// Relationship id → part path, from `xl/_rels/workbook.xml.rels`.
fn read_relationships(archive: &mut Archive<'_>, max_bytes: u64) -> Result<HashMap<String, String>> {
    let xml = read_entry_bounded(archive, "xl/_rels/workbook.xml.rels", max_bytes)?;
    let mut rels = HashMap::new();
    let mut reader = Reader::from_reader(xml.as_slice());
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                if let (Some(id), Some(target)) = (attr(&e, b"Id"), attr(&e, b"Target")) {
                    let part = match target.strip_prefix('/') {
                        Some(absolute) => absolute.to_string(),
                        None => format!("xl/{}", target),
                    };
                    rels.insert(id, part);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(anyhow!("workbook.xml.rels: {}", e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(rels)
}

fn list_worksheet_parts(archive: &Archive<'_>) -> Vec<String> {
    let mut names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with("xl/worksheets/sheet") && n.ends_with(".xml"))
        .map(|s| s.to_string())
        .collect();
    names.sort_by_key(|name| {
        name.trim_start_matches("xl/worksheets/sheet")
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });
    names
}

/// Split an `A1`-style reference into 1-based (row, column).
fn parse_cell_ref(reference: &str) -> Option<(u32, u32)> {
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() {
        return None;
    }
    let mut col: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        col = col
            .checked_mul(26)?
            .checked_add(c.to_ascii_uppercase() as u32 - 'A' as u32 + 1)?;
    }
    let row = digits.parse::<u32>().ok()?;
    Some((row, col))
}

fn read_sheet_cells(
    name: &str,
    xml: &[u8],
    shared_strings: &[String],
    max_cells: usize,
) -> Result<Worksheet> {
    let mut sheet = Worksheet::new(name);
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();

    let mut row: u32 = 0;
    let mut col: u32 = 0;
    let mut cell_type = String::new();
    let mut value: Option<String> = None;
    let mut in_value = false;

    loop {
        if sheet.cell_count() >= max_cells {
            warn!(sheet = name, max_cells, "workbook: cell limit reached, truncating sheet");
            break;
        }
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"row" => {
                    row = attr(&e, b"r").and_then(|r| r.parse().ok()).unwrap_or(row + 1);
                    col = 0;
                }
                b"c" => {
                    let position = attr(&e, b"r").and_then(|r| parse_cell_ref(&r));
                    match position {
                        Some((r, c)) => {
                            row = r;
                            col = c;
                        }
                        None => col += 1,
                    }
                    cell_type = attr(&e, b"t").unwrap_or_default();
                    value = None;
                }
                b"v" | b"t" => in_value = true,
                _ => {}
            },
            Ok(Event::Text(te)) if in_value => {
                value
                    .get_or_insert_with(String::new)
                    .push_str(&te.unescape()?);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => {
                    if let Some(raw) = value.take() {
                        let text = if cell_type == "s" {
                            raw.trim()
                                .parse::<usize>()
                                .ok()
                                .and_then(|i| shared_strings.get(i).cloned())
                                .unwrap_or_default()
                        } else {
                            raw
                        };
                        if row > 0 && col > 0 {
                            sheet.set(row, col, text);
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(anyhow!("worksheet {}: {}", name, e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(sheet)
}
