//! Request names → source and preview file names.
//!
//! Every endpoint addresses a RAW file by its bare name (`IMG_0042.CR2`).
//! This module decides whether such a name may be served at all and what
//! its preview is called on disk.
//!
//! ## Preview names
//!
//! The extension is swapped for [`PREVIEW_EXTENSION`], the stem is kept:
//! - `IMG_0042.CR2` → `IMG_0042.jpg`
//! - `dsc.0001.nef` → `dsc.0001.jpg`
//!
//! Two sources differing only in extension (`a.CR2`, `a.NEF`) share a
//! preview name. Shooting RAW+RAW into one folder is not a workflow we
//! support; whichever was rendered last wins.

use crate::scan::is_raw_file;

/// Extension of every generated preview.
pub const PREVIEW_EXTENSION: &str = "jpg";

/// Reason a requested name was refused before any filesystem access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameRejection {
    Empty,
    /// Contains a path separator or a `..` component.
    NotAFileName,
    /// Does not carry a recognized RAW extension.
    NotRaw,
}

/// Accept a requested name only if it is a bare RAW file name.
///
/// Names are never joined onto a directory before passing this check, so a
/// request can't escape the RAW directory.
pub fn validate_source_name(name: &str) -> Result<&str, NameRejection> {
    if name.is_empty() {
        return Err(NameRejection::Empty);
    }
    if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
        return Err(NameRejection::NotAFileName);
    }
    if name.contains('\0') {
        return Err(NameRejection::NotAFileName);
    }
    if !is_raw_file(name) {
        return Err(NameRejection::NotRaw);
    }
    Ok(name)
}

/// Preview file name for a source file name.
pub fn preview_file_name(source_name: &str) -> String {
    let stem = match source_name.rfind('.') {
        Some(dot) if dot > 0 => &source_name[..dot],
        _ => source_name,
    };
    format!("{}.{}", stem, PREVIEW_EXTENSION)
}
