//! Parameter types for preview rendering.
//!
//! These structs describe *what* to produce, not *how*. They are the
//! interface between the caching layer (which decides *when* a preview is
//! rendered) and [`operations`](super::operations) (which does the
//! decode → resize → encode work through a backend).
//!
//! ## Types
//!
//! - [`Quality`]: JPEG encoding quality (1–100, default 90). Clamped on construction.
//! - [`PreviewSettings`]: bounding box and quality for every preview.

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Longest edge a preview may have, in pixels.
pub const DEFAULT_MAX_DIMENSION: u32 = 2000;

/// How previews are rendered.
///
/// Neither output dimension exceeds `max_dimension`; sources that already
/// fit are encoded at their native size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewSettings {
    pub max_dimension: u32,
    pub quality: Quality,
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            quality: Quality::default(),
        }
    }
}
