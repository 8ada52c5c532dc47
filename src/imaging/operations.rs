//! High-level preview operations.
//!
//! [`create_preview`] owns the decode → resize → encode policy. Decoding is
//! delegated to an [`ImageBackend`]; the bounding box comes from
//! [`fit_within`]; the JPEG is written through a temporary file in the
//! destination directory and renamed into place, so a crash mid-write never
//! leaves a truncated preview under the final name.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::fit_within;
use super::params::PreviewSettings;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ExtendedColorType, ImageEncoder, RgbImage};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Compute the output dimensions for a decoded raster without touching pixels.
pub fn plan_preview(original: (u32, u32), settings: &PreviewSettings) -> Dimensions {
    let (width, height) = fit_within(original, settings.max_dimension);
    Dimensions { width, height }
}

/// Render a preview of `source` to `output`.
///
/// Any existing file at `output` is replaced only once the new JPEG is fully
/// written. On failure the temporary file is removed and `output` is left as
/// it was.
pub fn create_preview(
    backend: &dyn ImageBackend,
    source: &Path,
    output: &Path,
    settings: &PreviewSettings,
) -> Result<Dimensions> {
    let decoded = backend.decode(source)?;
    let dims = plan_preview(decoded.dimensions(), settings);

    let resized = if (dims.width, dims.height) == decoded.dimensions() {
        decoded
    } else {
        image::imageops::resize(&decoded, dims.width, dims.height, FilterType::Lanczos3)
    };

    write_jpeg_atomic(&resized, output, settings)?;
    Ok(dims)
}

fn write_jpeg_atomic(img: &RgbImage, output: &Path, settings: &PreviewSettings) -> Result<()> {
    let dir = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::Builder::new()
        .prefix(".preview-")
        .suffix(".tmp")
        .tempfile_in(dir)?;

    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        JpegEncoder::new_with_quality(&mut writer, settings.quality.value() as u8)
            .write_image(
                img.as_raw(),
                img.width(),
                img.height(),
                ExtendedColorType::Rgb8,
            )
            .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {}", e)))?;
        writer.flush()?;
    }

    tmp.persist(output).map_err(|e| BackendError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::Quality;
    use crate::imaging::backend::tests::MockBackend;
    use tempfile::TempDir;

    fn leftover_temp_files(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|n| n.ends_with(".tmp"))
            .collect()
    }

    #[test]
    fn plan_preview_bounds_large_raster() {
        let dims = plan_preview((6000, 4000), &PreviewSettings::default());
        assert_eq!(
            dims,
            Dimensions {
                width: 2000,
                height: 1333
            }
        );
    }

    #[test]
    fn create_preview_downscales_to_bounding_box() {
        let tmp = TempDir::new().unwrap();
        let output = tmp.path().join("a.jpg");
        let backend = MockBackend::with_size(300, 200);
        let settings = PreviewSettings {
            max_dimension: 150,
            quality: Quality::new(80),
        };

        let dims =
            create_preview(&backend, Path::new("/raw/a.CR2"), &output, &settings).unwrap();

        assert_eq!(
            dims,
            Dimensions {
                width: 150,
                height: 100
            }
        );
        assert_eq!(image::image_dimensions(&output).unwrap(), (150, 100));
    }

    #[test]
    fn create_preview_never_upscales() {
        let tmp = TempDir::new().unwrap();
        let output = tmp.path().join("small.jpg");
        let backend = MockBackend::with_size(64, 48);

        create_preview(
            &backend,
            Path::new("/raw/small.DNG"),
            &output,
            &PreviewSettings::default(),
        )
        .unwrap();

        assert_eq!(image::image_dimensions(&output).unwrap(), (64, 48));
    }

    #[test]
    fn create_preview_overwrites_existing_output() {
        let tmp = TempDir::new().unwrap();
        let output = tmp.path().join("a.jpg");
        std::fs::write(&output, b"old preview").unwrap();

        create_preview(
            &MockBackend::new(),
            Path::new("/raw/a.CR2"),
            &output,
            &PreviewSettings::default(),
        )
        .unwrap();

        assert_ne!(std::fs::read(&output).unwrap(), b"old preview");
        assert!(leftover_temp_files(tmp.path()).is_empty());
    }

    #[test]
    fn decode_failure_leaves_output_untouched() {
        let tmp = TempDir::new().unwrap();
        let output = tmp.path().join("a.jpg");
        std::fs::write(&output, b"old preview").unwrap();

        let result = create_preview(
            &MockBackend::failing("bad raw"),
            Path::new("/raw/a.CR2"),
            &output,
            &PreviewSettings::default(),
        );

        assert!(result.is_err());
        assert_eq!(std::fs::read(&output).unwrap(), b"old preview");
        assert!(leftover_temp_files(tmp.path()).is_empty());
    }

    #[test]
    fn write_failure_cleans_up_and_errors() {
        let tmp = TempDir::new().unwrap();
        // Output directory does not exist: the temp file cannot be created.
        let output = tmp.path().join("missing").join("a.jpg");

        let result = create_preview(
            &MockBackend::new(),
            Path::new("/raw/a.CR2"),
            &output,
            &PreviewSettings::default(),
        );

        assert!(matches!(result, Err(BackendError::Io(_))));
        assert!(!output.exists());
    }
}
