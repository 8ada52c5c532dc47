//! Pure calculation functions for preview dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Fit `source` inside a `max_dimension` square, preserving aspect ratio.
///
/// Images that already fit are returned unchanged; previews are never
/// upscaled. The scaled dimensions are rounded and never drop below 1px.
///
/// # Examples
/// ```
/// # use rawshelf::imaging::fit_within;
/// // 6000x4000 landscape → longer edge clamped to 2000
/// assert_eq!(fit_within((6000, 4000), 2000), (2000, 1333));
///
/// // Already small enough: untouched
/// assert_eq!(fit_within((1200, 800), 2000), (1200, 800));
/// ```
pub fn fit_within(source: (u32, u32), max_dimension: u32) -> (u32, u32) {
    let (src_w, src_h) = source;
    let longer_edge = src_w.max(src_h);

    if longer_edge <= max_dimension || longer_edge == 0 {
        return source;
    }

    let ratio = max_dimension as f64 / longer_edge as f64;
    let w = ((src_w as f64 * ratio).round() as u32).max(1);
    let h = ((src_h as f64 * ratio).round() as u32).max(1);
    (w.min(max_dimension), h.min(max_dimension))
}
