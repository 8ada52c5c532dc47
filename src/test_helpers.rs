//! Shared test utilities for the rawshelf test suite.
//!
//! Builds throwaway RAW/preview directories and a [`PreviewCache`] wired to
//! the mock backend and an in-memory ledger.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::test_helpers::*;
//!
//! let dirs = TestDirs::new();
//! dirs.add_source("a.CR2");
//! let backend = Arc::new(MockBackend::new());
//! let cache = dirs.cache(backend.clone());
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};
use tempfile::TempDir;

use crate::imaging::PreviewSettings;
use crate::imaging::backend::tests::MockBackend;
use crate::ledger::{Ledger, MemoryLedger};
use crate::preview::PreviewCache;

// =========================================================================
// File helpers
// =========================================================================

/// Write `bytes` to `dir/name` and return the full path.
pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

/// Set a file's modification time to `secs` after the epoch.
pub fn set_mtime(path: &Path, secs: u64) {
    let file = std::fs::File::options().write(true).open(path).unwrap();
    file.set_modified(UNIX_EPOCH + Duration::from_secs(secs))
        .unwrap();
}

// =========================================================================
// Fixture directories
// =========================================================================

/// A RAW directory and a preview directory inside one temp root.
pub struct TestDirs {
    pub root: TempDir,
    pub raw_dir: PathBuf,
    pub preview_dir: PathBuf,
}

impl TestDirs {
    pub fn new() -> Self {
        let root = TempDir::new().unwrap();
        let raw_dir = root.path().join("raw_images");
        let preview_dir = root.path().join("converted_images");
        std::fs::create_dir_all(&raw_dir).unwrap();
        std::fs::create_dir_all(&preview_dir).unwrap();
        Self {
            root,
            raw_dir,
            preview_dir,
        }
    }

    /// Drop a fake RAW file into the RAW directory.
    pub fn add_source(&self, name: &str) -> PathBuf {
        write_file(&self.raw_dir, name, b"fake raw bytes")
    }

    pub fn preview_path(&self, name: &str) -> PathBuf {
        self.preview_dir.join(name)
    }

    /// Cache over these directories with an in-memory ledger.
    pub fn cache(&self, backend: Arc<MockBackend>) -> PreviewCache {
        self.cache_with_ledger(backend, Arc::new(MemoryLedger::new()))
    }

    pub fn cache_with_ledger(
        &self,
        backend: Arc<MockBackend>,
        ledger: Arc<dyn Ledger>,
    ) -> PreviewCache {
        PreviewCache::new(
            &self.raw_dir,
            &self.preview_dir,
            ledger,
            backend,
            PreviewSettings::default(),
        )
    }
}
