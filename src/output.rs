//! CLI output formatting.
//!
//! Each command has a `format_*` function returning `Vec<String>` and a
//! `print_*` wrapper that writes to stdout. Format functions are pure, so
//! tests assert on lines instead of capturing stdout.
//!
//! # Output Format
//!
//! ## List
//!
//! ```text
//! 001 IMG_0001.CR2
//!     Make: Canon
//!     Model: Canon EOS R5
//! 002 DSC_1234.NEF
//!     (no EXIF)
//! ```
//!
//! ## Preview / Warm
//!
//! ```text
//! IMG_0001.CR2 → IMG_0001.jpg: cached
//! DSC_1234.NEF → DSC_1234.jpg: generated 2000x1333
//! broken.ARW: failed: Preview generation failed for broken.ARW: ...
//!
//! 1 cached, 1 generated, 1 failed (3 total)
//! ```

use crate::naming::preview_file_name;
use crate::preview::{PreviewError, PreviewStatus, WarmReport};
use crate::types::ImageList;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

// ============================================================================
// List
// ============================================================================

/// Format the RAW inventory with its EXIF tags as indented context lines.
pub fn format_listing(list: &ImageList) -> Vec<String> {
    if list.images.is_empty() {
        return vec!["No RAW files found".to_string()];
    }
    let mut lines = Vec::new();
    for (i, entry) in list.images.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), entry.file_name));
        if entry.exif_info.is_empty() {
            lines.push("    (no EXIF)".to_string());
        }
        for (tag, value) in &entry.exif_info {
            lines.push(format!("    {}: {}", tag, value));
        }
    }
    lines
}

pub fn print_listing(list: &ImageList) {
    for line in format_listing(list) {
        println!("{}", line);
    }
}

// ============================================================================
// Preview / Warm
// ============================================================================

/// One line describing what a refresh did for `name`.
pub fn format_refresh(name: &str, result: &Result<PreviewStatus, PreviewError>) -> String {
    match result {
        Ok(status) => {
            let what = match status {
                PreviewStatus::Cached => "cached".to_string(),
                PreviewStatus::Generated(d) => format!("generated {}x{}", d.width, d.height),
            };
            format!("{} \u{2192} {}: {}", name, preview_file_name(name), what)
        }
        Err(e) => format!("{}: failed: {}", name, e),
    }
}

/// Per-file lines, a blank line, then the stats summary.
pub fn format_warm_report(report: &WarmReport) -> Vec<String> {
    let mut lines: Vec<String> = report
        .results
        .iter()
        .map(|(name, result)| format_refresh(name, result))
        .collect();
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(report.stats.to_string());
    lines
}

pub fn print_warm_report(report: &WarmReport) {
    for line in format_warm_report(report) {
        println!("{}", line);
    }
}
