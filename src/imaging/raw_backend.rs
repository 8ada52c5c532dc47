//! Pure Rust RAW decoding backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Container parse + sensor unpack | `rawloader` (via `imagepipe`) |
//! | Demosaic, white balance, sRGB | `imagepipe::simple_decode_8bit` |
//! | Raster hand-off | `image::RgbImage` |
//!
//! Supported camera models are whatever `rawloader` knows; unsupported
//! variants surface as [`BackendError::ProcessingFailed`].

use super::backend::{BackendError, ImageBackend};
use image::RgbImage;
use std::path::Path;

/// RAW backend built on the `rawloader`/`imagepipe` pipeline.
pub struct RawBackend;

impl RawBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RawBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageBackend for RawBackend {
    fn decode(&self, path: &Path) -> Result<RgbImage, BackendError> {
        // imagepipe reports a missing file as a plain string; check first so
        // callers can tell I/O failures from undecodable content.
        std::fs::metadata(path)?;

        // 0x0 disables imagepipe's own downscaling: the full raster comes
        // back and the bounding box is applied by the preview operation.
        let decoded = imagepipe::simple_decode_8bit(path, 0, 0).map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
        })?;

        let width = u32::try_from(decoded.width).map_err(|_| {
            BackendError::ProcessingFailed(format!("Image too wide: {}", decoded.width))
        })?;
        let height = u32::try_from(decoded.height).map_err(|_| {
            BackendError::ProcessingFailed(format!("Image too tall: {}", decoded.height))
        })?;

        RgbImage::from_raw(width, height, decoded.data).ok_or_else(|| {
            BackendError::ProcessingFailed(format!(
                "Decoded buffer does not match {}x{} for {}",
                width,
                height,
                path.display()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_nonexistent_file_is_io_error() {
        let backend = RawBackend::new();
        let result = backend.decode(Path::new("/nonexistent/image.CR2"));
        assert!(matches!(result, Err(BackendError::Io(_))));
    }

    #[test]
    fn decode_garbage_is_processing_failure() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("broken.NEF");
        std::fs::write(&path, b"definitely not a nikon raw file").unwrap();

        let backend = RawBackend::new();
        let result = backend.decode(&path);
        assert!(matches!(result, Err(BackendError::ProcessingFailed(_))));
    }
}
