//! Server configuration module.
//!
//! Handles loading, validating, and merging a `config.toml`. User values are
//! layered over stock defaults, so a config file only needs the keys it
//! wants to change. Command-line flags override the file.
//!
//! ## Keys
//!
//! ```toml
//! # Every key may be omitted; these are the stock values
//!
//! raw_dir = "raw_images"              # Directory of RAW files to serve
//! preview_dir = "converted_images"    # Where JPEG previews are written
//! ledger_file = "process_info.json"   # Validity ledger for the preview cache
//!
//! [server]
//! host = "0.0.0.0"
//! port = 8000
//! cors = true                         # Allow cross-origin requests from any origin
//!
//! [preview]
//! max_dimension = 2000                # Longest preview edge, in pixels
//! quality = 90                        # JPEG quality (1-100)
//!
//! [processing]
//! max_processes = 4                   # Max parallel workers for `warm` (omit for auto)
//! ```
//!
//! A misspelled key is a load error, not a silently ignored setting.

use crate::imaging::{DEFAULT_MAX_DIMENSION, PreviewSettings, Quality};
use crate::ledger::LEDGER_FILENAME;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Server configuration loaded from `config.toml`.
///
/// All fields have sensible defaults. Unknown keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Directory holding the RAW files. Listed non-recursively.
    pub raw_dir: PathBuf,
    /// Directory previews are written to. Created on startup.
    pub preview_dir: PathBuf,
    /// Path of the validity ledger JSON file.
    pub ledger_file: PathBuf,
    /// HTTP listener settings.
    pub server: HttpConfig,
    /// Preview rendering settings (bounding box, quality).
    pub preview: PreviewConfig,
    /// Worker pool for `warm`.
    pub processing: ProcessingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("raw_images"),
            preview_dir: PathBuf::from("converted_images"),
            ledger_file: PathBuf::from(LEDGER_FILENAME),
            server: HttpConfig::default(),
            preview: PreviewConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Reject values the server can't run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.preview.max_dimension == 0 {
            return Err(ConfigError::Validation(
                "preview.max_dimension must be greater than 0".into(),
            ));
        }
        if self.preview.quality == 0 || self.preview.quality > 100 {
            return Err(ConfigError::Validation(
                "preview.quality must be 1-100".into(),
            ));
        }
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port must not be 0".into(),
            ));
        }
        if self.raw_dir == self.preview_dir {
            return Err(ConfigError::Validation(
                "raw_dir and preview_dir must differ".into(),
            ));
        }
        Ok(())
    }

    /// `host:port` string for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    /// Attach a permissive CORS layer (any origin, any method).
    pub cors: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors: true,
        }
    }
}

/// Preview rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreviewConfig {
    /// Longest edge of a preview in pixels. Smaller sources are not upscaled.
    pub max_dimension: u32,
    /// JPEG quality (1-100).
    pub quality: u32,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            quality: Quality::default().value(),
        }
    }
}

impl PreviewConfig {
    pub fn settings(&self) -> PreviewSettings {
        PreviewSettings {
            max_dimension: self.max_dimension,
            quality: Quality::new(self.quality),
        }
    }
}

/// Worker pool settings for the `warm` command.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel preview workers for `warm`.
    /// When absent, defaults to the number of CPU cores.
    /// Capped at the core count.
    pub max_processes: Option<usize>,
}

/// Worker count for `warm`: all cores unless `max_processes` asks for fewer.
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let available = std::thread::available_parallelism().map_or(1, |n| n.get());
    match config.max_processes {
        Some(requested) => requested.clamp(1, available),
        None => available,
    }
}

// =============================================================================
// Loading
// =============================================================================

/// [`ServerConfig::default`] as a TOML table, the base layer for merging.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(ServerConfig::default()).expect("default config must serialize")
}

/// Lay `overlay` over `base`. Tables merge per key, recursively; any other
/// overlay value wins outright.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut lower), toml::Value::Table(upper)) => {
            for (key, value) in upper {
                let combined = match lower.remove(&key) {
                    Some(below) => merge_toml(below, value),
                    None => value,
                };
                lower.insert(key, combined);
            }
            toml::Value::Table(lower)
        }
        (_, upper) => upper,
    }
}

/// Parse the TOML at `path`. A missing file is `Ok(None)`, not an error.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(toml::from_str(&text)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Apply `overlay` (if any) to `base` and type-check the result. Values are
/// not validated yet.
pub fn merge_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ServerConfig, ConfigError> {
    let value = match overlay {
        Some(upper) => merge_toml(base, upper),
        None => base,
    };
    Ok(ServerConfig::deserialize(value)?)
}

/// Stock defaults overlaid with `path`, which may be absent.
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    load_config_with(path, |_| {})
}

/// Like [`load_config`], but lets the caller adjust the merged values (e.g.
/// command-line flags) before they are validated.
pub fn load_config_with(
    path: &Path,
    overrides: impl FnOnce(&mut ServerConfig),
) -> Result<ServerConfig, ConfigError> {
    let mut config = merge_config(stock_defaults_value(), load_raw_config(path)?)?;
    overrides(&mut config);
    config.validate()?;
    Ok(config)
}

/// Commented stock `config.toml`, printed by `gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# rawshelf configuration
# ======================
# Every setting is optional; delete what you don't want to change.
# Values shown below are the defaults. Unknown keys will cause an error.

# Directory of camera RAW files to serve. Only files directly inside it are
# listed; recognized extensions: IIQ 3FR DCR K25 KDC CRW CR2 CR3 ERF MEF MOS
# NEF NRW ORF PEF RW2 ARW SRF SR2 DNG (any case).
raw_dir = "raw_images"

# Directory JPEG previews are written to. Created if missing.
preview_dir = "converted_images"

# Validity ledger: records, per RAW file, the modification time it had when
# its preview was last rendered. Safe to delete; previews are re-rendered.
ledger_file = "process_info.json"

# ---------------------------------------------------------------------------
# HTTP server
# ---------------------------------------------------------------------------
[server]
host = "0.0.0.0"
port = 8000

# Allow cross-origin requests from any origin.
cors = true

# ---------------------------------------------------------------------------
# Previews
# ---------------------------------------------------------------------------
[preview]
# Longest edge of a preview, in pixels. Smaller images are never upscaled.
max_dimension = 2000

# JPEG encoding quality (1 = worst, 100 = best).
quality = 90

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers for `rawshelf warm`.
# Leave unset to use one worker per CPU core.
# max_processes = 4
"##
}
