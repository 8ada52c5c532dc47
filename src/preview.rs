//! Preview cache: the serving path for RAW previews.
//!
//! [`PreviewCache`] ties the pieces together for one requested file name:
//!
//! ```text
//! name ──validate──▶ raw_dir/name, preview_dir/stem.jpg
//!      ──staleness──▶ fresh?  ──yes──▶ serve preview bytes
//!                       │
//!                       no
//!                       ▼
//!                 create_preview ──ok──▶ record(name, mtime re-read now) ──▶ serve
//!                       │
//!                      err ──▶ log, no ledger write, GenerationFailed
//! ```
//!
//! The ledger entry is written only after the preview was rendered and
//! renamed into place, with the source mtime read *after* rendering. A
//! source modified mid-render therefore records the newer time; the preview
//! may lag that one edit until the next modification.
//!
//! A failed render is retried on the next request. There is no backoff: a
//! permanently undecodable file is decoded again on every request for it.
//!
//! Requests for the same file are serialized so two concurrent cold
//! requests decode once; different files render in parallel.

use crate::config::ServerConfig;
use crate::imaging::{
    BackendError, Dimensions, ImageBackend, PreviewSettings, RawBackend, create_preview,
};
use crate::ledger::{JsonLedger, Ledger, LedgerError};
use crate::metadata::read_exif;
use crate::naming::{preview_file_name, validate_source_name};
use crate::scan;
use crate::staleness::{modified_secs, needs_regeneration};
use crate::types::{ImageEntry, ImageList};
use rayon::prelude::*;
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum PreviewError {
    #[error("Not a servable RAW file name: {0}")]
    InvalidName(String),
    #[error("Source not found: {0}")]
    SourceNotFound(String),
    #[error("Preview generation failed for {name}: {source}")]
    GenerationFailed {
        name: String,
        #[source]
        source: BackendError,
    },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl PreviewError {
    /// Whether the request addressed a file that isn't there to serve.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::InvalidName(_) | Self::SourceNotFound(_))
    }
}

/// What [`PreviewCache::refresh`] had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewStatus {
    /// The existing preview was current.
    Cached,
    /// The preview was rendered at these dimensions.
    Generated(Dimensions),
}

/// A validated source and where its preview lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Bare file name; also the ledger key.
    pub name: String,
    pub path: PathBuf,
    pub preview: PathBuf,
}

pub struct PreviewCache {
    raw_dir: PathBuf,
    preview_dir: PathBuf,
    ledger: Arc<dyn Ledger>,
    backend: Arc<dyn ImageBackend>,
    settings: PreviewSettings,
    locks: KeyedLocks,
}

impl PreviewCache {
    pub fn new(
        raw_dir: impl Into<PathBuf>,
        preview_dir: impl Into<PathBuf>,
        ledger: Arc<dyn Ledger>,
        backend: Arc<dyn ImageBackend>,
        settings: PreviewSettings,
    ) -> Self {
        Self {
            raw_dir: raw_dir.into(),
            preview_dir: preview_dir.into(),
            ledger,
            backend,
            settings,
            locks: KeyedLocks::default(),
        }
    }

    /// Production wiring: JSON ledger, RAW backend, directories from config.
    ///
    /// Creates the preview directory and the ledger's parent directory if
    /// they are missing. The RAW directory is left alone.
    pub fn from_config(config: &ServerConfig) -> io::Result<Self> {
        std::fs::create_dir_all(&config.preview_dir)?;
        if let Some(parent) = config.ledger_file.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self::new(
            &config.raw_dir,
            &config.preview_dir,
            Arc::new(JsonLedger::new(&config.ledger_file)),
            Arc::new(RawBackend::new()),
            config.preview.settings(),
        ))
    }

    pub fn raw_dir(&self) -> &Path {
        &self.raw_dir
    }

    pub fn preview_dir(&self) -> &Path {
        &self.preview_dir
    }

    /// RAW file names currently in the RAW directory.
    pub fn list_sources(&self) -> io::Result<Vec<String>> {
        scan::list_sources(&self.raw_dir)
    }

    /// Inventory with EXIF tags, as served by `GET /images`.
    pub fn listing(&self) -> io::Result<ImageList> {
        let images = self
            .list_sources()?
            .into_iter()
            .map(|file_name| {
                let exif_info = read_exif(&self.raw_dir.join(&file_name));
                ImageEntry {
                    file_name,
                    exif_info,
                }
            })
            .collect();
        Ok(ImageList { images })
    }

    /// Validate a requested name and compute its paths. No filesystem access.
    pub fn resolve(&self, name: &str) -> Result<SourceFile, PreviewError> {
        let name =
            validate_source_name(name).map_err(|_| PreviewError::InvalidName(name.to_string()))?;
        Ok(SourceFile {
            name: name.to_string(),
            path: self.raw_dir.join(name),
            preview: self.preview_dir.join(preview_file_name(name)),
        })
    }

    /// Whether `name`'s preview would be re-rendered by the next request.
    pub fn needs_regeneration(&self, name: &str) -> Result<bool, PreviewError> {
        let source = self.resolve(name)?;
        needs_regeneration(&*self.ledger, &source.name, &source.path, &source.preview)
            .map_err(|e| source_error(e, &source.name))
    }

    /// Bring `name`'s preview up to date, rendering it if stale.
    pub fn refresh(&self, name: &str) -> Result<PreviewStatus, PreviewError> {
        let source = self.resolve(name)?;
        self.locks.with_lock(&source.name, || self.refresh_locked(&source))
    }

    fn refresh_locked(&self, source: &SourceFile) -> Result<PreviewStatus, PreviewError> {
        let stale = needs_regeneration(&*self.ledger, &source.name, &source.path, &source.preview)
            .map_err(|e| source_error(e, &source.name))?;
        if !stale {
            debug!(source = %source.name, "preview is current");
            return Ok(PreviewStatus::Cached);
        }

        info!(source = %source.name, "rendering preview");
        let dims = create_preview(
            &*self.backend,
            &source.path,
            &source.preview,
            &self.settings,
        )
        .map_err(|e| {
            warn!(source = %source.name, error = %e, "preview generation failed");
            PreviewError::GenerationFailed {
                name: source.name.clone(),
                source: e,
            }
        })?;

        let modified = modified_secs(&source.path).map_err(|e| source_error(e, &source.name))?;
        self.ledger.record(&source.name, modified)?;
        debug!(
            source = %source.name,
            width = dims.width,
            height = dims.height,
            "preview recorded"
        );
        Ok(PreviewStatus::Generated(dims))
    }

    /// Refresh `name`'s preview and return its JPEG bytes.
    pub fn read_preview(&self, name: &str) -> Result<Vec<u8>, PreviewError> {
        self.refresh(name)?;
        let source = self.resolve(name)?;
        Ok(std::fs::read(&source.preview)?)
    }

    /// Path of an existing RAW file, for download.
    pub fn source_path(&self, name: &str) -> Result<PathBuf, PreviewError> {
        let source = self.resolve(name)?;
        if !source.path.is_file() {
            return Err(PreviewError::SourceNotFound(source.name));
        }
        Ok(source.path)
    }

    /// Refresh every source in the inventory, in parallel.
    ///
    /// Individual failures are collected, not propagated; only a failure to
    /// list the RAW directory aborts.
    pub fn warm(&self) -> io::Result<WarmReport> {
        let mut names = self.list_sources()?;
        names.sort();

        let results: Vec<(String, Result<PreviewStatus, PreviewError>)> = names
            .into_par_iter()
            .map(|name| {
                let result = self.refresh(&name);
                (name, result)
            })
            .collect();

        let mut stats = CacheStats::default();
        for (_, result) in &results {
            stats.observe(result);
        }
        Ok(WarmReport { results, stats })
    }
}

fn source_error(e: io::Error, name: &str) -> PreviewError {
    if e.kind() == io::ErrorKind::NotFound {
        PreviewError::SourceNotFound(name.to_string())
    } else {
        PreviewError::Io(e)
    }
}

/// One mutex per key, dropped again once nobody holds or waits on it.
#[derive(Default)]
struct KeyedLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    fn with_lock<T>(&self, key: &str, f: impl FnOnce() -> T) -> T {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(key.to_string()).or_default())
        };

        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };

        // Every clone and drop of an entry happens under the map guard, so the
        // count seen here is exact. Map entry + ours: nobody else is waiting.
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        let last = Arc::strong_count(&lock) == 2;
        drop(lock);
        if last {
            locks.remove(key);
        }
        result
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Outcome of [`PreviewCache::warm`].
#[derive(Debug)]
pub struct WarmReport {
    pub results: Vec<(String, Result<PreviewStatus, PreviewError>)>,
    pub stats: CacheStats,
}

/// Summary of cache behaviour over a batch of refreshes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub generated: u32,
    pub failed: u32,
}

impl CacheStats {
    pub fn observe(&mut self, result: &Result<PreviewStatus, PreviewError>) {
        match result {
            Ok(PreviewStatus::Cached) => self.hits += 1,
            Ok(PreviewStatus::Generated(_)) => self.generated += 1,
            Err(_) => self.failed += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.hits + self.generated + self.failed
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.failed > 0 {
            write!(
                f,
                "{} cached, {} generated, {} failed ({} total)",
                self.hits,
                self.generated,
                self.failed,
                self.total()
            )
        } else if self.hits > 0 {
            write!(
                f,
                "{} cached, {} generated ({} total)",
                self.hits,
                self.generated,
                self.total()
            )
        } else {
            write!(f, "{} generated", self.generated)
        }
    }
}
