//! EXIF metadata for the listing endpoint.
//!
//! Most RAW formats (CR2, NEF, ARW, DNG, PEF, ...) are TIFF containers, and
//! `kamadak-exif` reads their primary IFDs directly. Formats it can't parse
//! simply report no tags.
//!
//! ## Output shape
//!
//! A flat `tag name → display string` map, e.g.
//!
//! ```text
//! Make          → Canon
//! Model         → Canon EOS 5D Mark IV
//! ExposureTime  → 1/125 s
//! FNumber       → f/8
//! ```
//!
//! Skipped: every field of the thumbnail IFD and the binary maker note.
//! When a tag occurs in more than one IFD the first occurrence wins, which
//! is the primary image's value.
//!
//! Reading never fails from the caller's point of view: an unreadable file
//! or one without EXIF yields an empty map and a debug log line.

use exif::{Exif, Field, In, Reader, Tag, Value};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Tag name → rendered value.
pub type ExifInfo = BTreeMap<String, String>;

/// Read EXIF tags from `path`, or an empty map if there are none.
pub fn read_exif(path: &Path) -> ExifInfo {
    match try_read_exif(path) {
        Ok(info) => info,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "no EXIF data");
            ExifInfo::new()
        }
    }
}

/// Read EXIF tags from `path`, surfacing parse and I/O errors.
pub fn try_read_exif(path: &Path) -> Result<ExifInfo, exif::Error> {
    let file = File::open(path)?;
    let exif = Reader::new().read_from_container(&mut BufReader::new(file))?;
    Ok(collect_fields(&exif))
}

fn collect_fields(exif: &Exif) -> ExifInfo {
    let mut info = ExifInfo::new();
    for field in exif.fields() {
        if field.ifd_num == In::THUMBNAIL || field.tag == Tag::MakerNote {
            continue;
        }
        info.entry(field.tag.to_string())
            .or_insert_with(|| render_value(field, exif));
    }
    info
}

/// Render a field as display text. ASCII values come out bare, without the
/// quoting `kamadak-exif` applies.
fn render_value(field: &Field, exif: &Exif) -> String {
    match &field.value {
        Value::Ascii(strings) => strings
            .iter()
            .map(|s| {
                String::from_utf8_lossy(s)
                    .trim_end_matches('\0')
                    .trim()
                    .to_string()
            })
            .collect::<Vec<_>>()
            .join(", "),
        _ => field.display_value().with_unit(exif).to_string(),
    }
}
