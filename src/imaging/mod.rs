//! Preview rendering: RAW decode, bounded resize, JPEG encode.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `imagepipe` over `rawloader` ([`RawBackend`]) |
//! | **Resize** | `image::imageops::resize` with Lanczos3 |
//! | **Encode** | `image::codecs::jpeg::JpegEncoder`, written via temp file + rename |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing the preview policy
//! - **Backend**: [`ImageBackend`] trait + [`RawBackend`]
//! - **Operations**: [`create_preview`], combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod raw_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::fit_within;
pub use operations::{create_preview, plan_preview};
pub use params::{DEFAULT_MAX_DIMENSION, PreviewSettings, Quality};
pub use raw_backend::RawBackend;
