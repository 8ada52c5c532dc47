//! Decoding backend trait and shared types.
//!
//! The [`ImageBackend`] trait is the seam between preview policy and pixel
//! work: a backend turns a RAW file on disk into an 8-bit RGB raster, and
//! nothing else. Resizing and encoding stay in
//! [`operations`](super::operations) so every backend produces previews
//! under the same rules.
//!
//! The production implementation is
//! [`RawBackend`](super::raw_backend::RawBackend).

use image::RgbImage;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Pixel dimensions of a decoded or encoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for RAW decoding backends.
///
/// `Send + Sync` so one backend can be shared by the HTTP workers and the
/// parallel `warm` command.
pub trait ImageBackend: Send + Sync {
    /// Decode a RAW file into a full-resolution RGB raster.
    fn decode(&self, path: &Path) -> Result<RgbImage, BackendError>;
}
