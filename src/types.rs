//! Response bodies shared by the HTTP server and the CLI.

use crate::metadata::ExifInfo;
use serde::{Deserialize, Serialize};

/// One RAW file in the listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageEntry {
    /// Bare file name, usable as-is in the preview and download routes.
    pub file_name: String,
    pub exif_info: ExifInfo,
}

/// Body of `GET /images`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageList {
    pub images: Vec<ImageEntry>,
}

/// JSON error body, `{"detail": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}
