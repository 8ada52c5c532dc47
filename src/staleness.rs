//! Staleness decision: does a source need its preview re-rendered?
//!
//! A preview is current when both hold:
//! 1. the ledger's recorded mtime for the source is at least the source's
//!    current mtime, and
//! 2. the preview file exists.
//!
//! The existence check runs every time, so deleting a preview by hand
//! forces a re-render even though the ledger still looks current.
//! A source with no ledger entry compares as recorded at 0 and is therefore
//! always stale on first sight.

use crate::ledger::Ledger;
use std::io;
use std::path::Path;
use std::time::UNIX_EPOCH;

/// Modification time of `path` in seconds since the Unix epoch.
///
/// Fails with [`io::ErrorKind::NotFound`] when the file is absent; the
/// preview path relies on that to answer 404.
pub fn modified_secs(path: &Path) -> io::Result<f64> {
    let modified = std::fs::metadata(path)?.modified()?;
    Ok(match modified.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs_f64(),
        Err(e) => -e.duration().as_secs_f64(),
    })
}

/// The pure half of the decision.
pub fn is_stale(recorded: Option<f64>, current_mtime: f64, preview_exists: bool) -> bool {
    recorded.unwrap_or(0.0) < current_mtime || !preview_exists
}

/// Decide whether `source` must be rendered again into `preview`.
///
/// `key` is the ledger key for the source. The ledger is loaded fresh on
/// every call.
pub fn needs_regeneration(
    ledger: &dyn Ledger,
    key: &str,
    source: &Path,
    preview: &Path,
) -> io::Result<bool> {
    let entries = ledger.load();
    let recorded = entries.get(key).copied();
    let current = modified_secs(source)?;
    Ok(is_stale(recorded, current, preview.exists()))
}
