//! # rawshelf
//!
//! Serve a directory of camera RAW files over HTTP: an inventory with EXIF
//! tags, the original files for download, and bounded JPEG previews that are
//! rendered on demand and cached on disk.
//!
//! # Architecture: Incremental Preview Cache
//!
//! Decoding a RAW file is expensive, so a preview is rendered once and reused
//! until its source changes. Three pieces of state cooperate:
//!
//! ```text
//! raw_images/IMG_0001.CR2        source of truth
//! converted_images/IMG_0001.jpg  derived preview
//! process_info.json              {"IMG_0001.CR2": 1700000000.123}
//! ```
//!
//! The ledger records, per source, the modification time the source had when
//! its preview was last rendered. A preview is stale when it's missing, when
//! the source has no ledger entry, or when the source is newer than the
//! recorded time. A source whose mtime moves backwards keeps its preview.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`preview`] | Orchestration: resolve a name, check staleness, render, record |
//! | [`staleness`] | The regenerate-or-not decision |
//! | [`ledger`] | Persistent `source → mtime` map (JSON file or in-memory) |
//! | [`imaging`] | RAW decode behind a backend trait, bounded resize, atomic JPEG write |
//! | [`scan`] | RAW extension set and non-recursive directory inventory |
//! | [`naming`] | Request-name validation and source → preview file naming |
//! | [`metadata`] | EXIF extraction for the listing |
//! | [`server`] | axum routes, error mapping, graceful shutdown |
//! | [`config`] | `config.toml` loading, stock defaults, validation |
//! | [`types`] | JSON response bodies |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Record Only After Success
//!
//! The ledger is written only once a preview has actually been produced, and
//! the source's modification time is read again after rendering. A failed
//! render leaves no entry behind, so the next request retries instead of
//! serving a missing or half-written preview forever.
//!
//! ## Atomic Writes
//!
//! Both the preview JPEG and the ledger are written to a temp file in the
//! target directory and renamed into place. Readers see the old file or the
//! new one, never a truncated one. Ledger updates are additionally
//! serialized, so concurrent records for different files don't drop each
//! other's entries.
//!
//! ## One Render Per File At A Time
//!
//! Refreshes of the same file are serialized by a per-file lock; refreshes of
//! different files run in parallel. Ten simultaneous cold requests for one
//! preview decode it once.
//!
//! ## Names, Not Paths
//!
//! Requests carry bare file names. Anything with a path separator, `.`/`..`,
//! or a non-RAW extension is refused before it touches the filesystem, so the
//! routes can't reach outside the RAW directory.

pub mod config;
pub mod imaging;
pub mod ledger;
pub mod metadata;
pub mod naming;
pub mod output;
pub mod preview;
pub mod scan;
pub mod server;
pub mod staleness;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
