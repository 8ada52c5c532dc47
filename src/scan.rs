//! Source inventory: which files in the RAW directory are servable.
//!
//! The inventory is a flat, non-recursive listing of the configured RAW
//! directory, filtered by extension. Matching is case-insensitive on the
//! extension only: `a.cr2`, `a.CR2` and `a.Cr2` all qualify, the rest of the
//! name is left exactly as found on disk.
//!
//! Ordering follows the filesystem's enumeration order. Callers that display
//! the list are free to sort it; nothing in the cache depends on order.

use std::io;
use std::path::Path;

/// Extensions recognized as camera RAW formats (upper case, no dot).
pub const RAW_EXTENSIONS: &[&str] = &[
    "IIQ", "3FR", "DCR", "K25", "KDC", "CRW", "CR2", "CR3", "ERF", "MEF", "MOS", "NEF", "NRW",
    "ORF", "PEF", "RW2", "ARW", "SRF", "SR2", "DNG",
];

/// Whether a file name carries one of the [`RAW_EXTENSIONS`].
pub fn is_raw_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            RAW_EXTENSIONS
                .iter()
                .any(|raw| raw.eq_ignore_ascii_case(ext))
        })
}

/// List the RAW files directly inside `root`.
///
/// Returns bare file names, not paths. Subdirectories are skipped even if
/// their name ends in a RAW extension. A missing or unreadable directory is
/// an error; entries that vanish mid-listing are skipped.
pub fn list_sources(root: &Path) -> io::Result<Vec<String>> {
    let mut sources = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let Ok(entry) = entry else { continue };
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if !is_raw_file(&name) {
            continue;
        }
        if entry.file_type().map(|t| t.is_dir()).unwrap_or(true) {
            continue;
        }
        sources.push(name);
    }
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn sorted(mut v: Vec<String>) -> Vec<String> {
        v.sort();
        v
    }

    #[test]
    fn filters_to_raw_extensions() {
        let tmp = TempDir::new().unwrap();
        for name in ["a.CR2", "notes.txt", "b.NEF"] {
            fs::write(tmp.path().join(name), b"x").unwrap();
        }

        let sources = sorted(list_sources(tmp.path()).unwrap());
        assert_eq!(sources, vec!["a.CR2", "b.NEF"]);
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let tmp = TempDir::new().unwrap();
        for name in ["lower.cr2", "Mixed.Dng", "upper.ARW"] {
            fs::write(tmp.path().join(name), b"x").unwrap();
        }

        let sources = sorted(list_sources(tmp.path()).unwrap());
        assert_eq!(sources, vec!["Mixed.Dng", "lower.cr2", "upper.ARW"]);
    }

    #[test]
    fn every_known_extension_is_recognized() {
        for ext in RAW_EXTENSIONS {
            assert!(is_raw_file(&format!("shot.{ext}")), "{ext}");
            assert!(
                is_raw_file(&format!("shot.{}", ext.to_lowercase())),
                "{ext}"
            );
        }
    }

    #[test]
    fn suffix_without_dot_is_not_an_extension() {
        assert!(!is_raw_file("CR2"));
        assert!(!is_raw_file("backupNEF"));
        assert!(!is_raw_file("photo.jpg"));
        assert!(!is_raw_file("photo.CR2.jpg"));
    }

    #[test]
    fn skips_subdirectories() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("nested.CR2")).unwrap();
        fs::write(tmp.path().join("nested.CR2").join("inner.NEF"), b"x").unwrap();
        fs::write(tmp.path().join("top.NEF"), b"x").unwrap();

        assert_eq!(list_sources(tmp.path()).unwrap(), vec!["top.NEF"]);
    }

    #[test]
    fn empty_directory_lists_nothing() {
        let tmp = TempDir::new().unwrap();
        assert!(list_sources(tmp.path()).unwrap().is_empty());
    }

    #[test]
    fn missing_directory_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let err = list_sources(&tmp.path().join("nope")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
