//! Validity ledger for incremental preview generation.
//!
//! RAW decoding is the bottleneck of the whole server: a single 45MP file
//! can take seconds to demosaic. The ledger remembers, per source file, the
//! modification time the source had when its preview was last rendered
//! successfully, so a preview request only decodes when something changed.
//!
//! # Design
//!
//! The ledger is a flat mapping `source name → mtime (seconds since epoch)`.
//! Keys are the exact strings callers pass in; the cache always uses the
//! bare file name relative to the RAW directory. No normalization happens
//! here, so inconsistent keys simply miss.
//!
//! Entries are only ever written after a successful render. A failed render
//! leaves the previous entry (or its absence) in place, which makes the next
//! request try again.
//!
//! ## Storage
//!
//! [`JsonLedger`] keeps the mapping in one pretty-printed JSON object:
//!
//! ```json
//! {
//!   "IMG_0042.CR2": 1718035200.123,
//!   "IMG_0043.NEF": 1718035261.5
//! }
//! ```
//!
//! The file is read in full on every [`Ledger::load`] and rewritten in full
//! on every [`Ledger::record`]; nothing is cached in memory across calls. A
//! missing or unparsable file reads as an empty ledger, which at worst costs
//! one extra render per source. A file that exists but can't be read is
//! logged and refused for writing, so its history is not overwritten.
//!
//! Writes go to a temporary file next to the ledger and are renamed over
//! it, and the load-modify-write cycle runs under a mutex, so concurrent
//! records from one process never lose each other's entries. Several
//! processes sharing a ledger file are not coordinated.

use serde_json::Value;
use std::collections::BTreeMap;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

/// Default ledger file name, relative to the working directory.
pub const LEDGER_FILENAME: &str = "process_info.json";

/// Source name → modification time recorded at last successful render.
pub type LedgerMap = BTreeMap<String, f64>;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persisted record of which previews are known to be current.
///
/// `load` never fails: absence and corruption both read as empty.
pub trait Ledger: Send + Sync {
    /// Read the full mapping.
    fn load(&self) -> LedgerMap;

    /// Upsert one entry, keeping every other entry as loaded.
    fn record(&self, source: &str, modified: f64) -> Result<(), LedgerError>;
}

/// Ledger backed by a single JSON file.
#[derive(Debug)]
pub struct JsonLedger {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current entries. Only an absent file or unparsable content reads as
    /// empty; any other I/O failure is returned so the caller doesn't
    /// overwrite a ledger it merely couldn't read.
    fn read(&self) -> io::Result<LedgerMap> {
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(LedgerMap::new()),
            Err(e) => return Err(e),
        };
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(value) => Ok(entries_from_value(value)),
            Err(e) => {
                tracing::debug!(path = %self.path.display(), error = %e, "unparsable ledger, starting empty");
                Ok(LedgerMap::new())
            }
        }
    }

    fn write(&self, entries: &LedgerMap) -> Result<(), LedgerError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::Builder::new()
            .prefix(".ledger-")
            .suffix(".tmp")
            .tempfile_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, entries)?;
            writer.flush()?;
        }
        tmp.persist(&self.path).map_err(|e| LedgerError::Io(e.error))?;
        Ok(())
    }
}

impl Ledger for JsonLedger {
    fn load(&self) -> LedgerMap {
        self.read().unwrap_or_else(|e| {
            tracing::warn!(path = %self.path.display(), error = %e, "cannot read ledger, treating as empty");
            LedgerMap::new()
        })
    }

    fn record(&self, source: &str, modified: f64) -> Result<(), LedgerError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.read()?;
        entries.insert(source.to_string(), modified);
        self.write(&entries)
    }
}

/// Keep only `string → number` pairs from a parsed ledger document.
///
/// Anything that is not a JSON object reads as empty; individual non-numeric
/// values are dropped rather than poisoning the whole ledger.
fn entries_from_value(value: Value) -> LedgerMap {
    match value {
        Value::Object(map) => map
            .into_iter()
            .filter_map(|(key, v)| v.as_f64().map(|t| (key, t)))
            .collect(),
        _ => LedgerMap::new(),
    }
}

/// In-memory ledger. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    entries: Mutex<LedgerMap>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: LedgerMap) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }
}

impl Ledger for MemoryLedger {
    fn load(&self) -> LedgerMap {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, source: &str, modified: f64) -> Result<(), LedgerError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(source.to_string(), modified);
        Ok(())
    }
}
