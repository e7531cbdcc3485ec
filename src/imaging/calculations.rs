//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.
//! Every result is at least 1x1: encoders reject empty images.

/// Round `value · factor` to the nearest pixel, never below 1.
pub fn scale_dimension(value: u32, factor: f64) -> u32 {
    let scaled = (value as f64 * factor).round();
    if scaled < 1.0 {
        1
    } else if scaled >= u32::MAX as f64 {
        u32::MAX
    } else {
        scaled as u32
    }
}

/// Scale both axes by the same factor.
///
/// # Examples
/// ```
/// # use bigthumb::imaging::calculations::scale_dimensions;
/// assert_eq!(scale_dimensions((12000, 8000), 0.5), (6000, 4000));
/// assert_eq!(scale_dimensions((3, 3), 0.01), (1, 1));
/// ```
pub fn scale_dimensions(source: (u32, u32), factor: f64) -> (u32, u32) {
    (
        scale_dimension(source.0, factor),
        scale_dimension(source.1, factor),
    )
}

/// Dimensions for a given width, keeping the source aspect ratio.
pub fn fit_to_width(source: (u32, u32), width: u32) -> (u32, u32) {
    let (src_w, src_h) = source;
    let factor = width as f64 / src_w as f64;
    (width.max(1), scale_dimension(src_h, factor))
}

/// Dimensions for a given height, keeping the source aspect ratio.
pub fn fit_to_height(source: (u32, u32), height: u32) -> (u32, u32) {
    let (src_w, src_h) = source;
    let factor = height as f64 / src_h as f64;
    (scale_dimension(src_w, factor), height.max(1))
}

/// Largest size with the source aspect ratio that fits inside `bounds`.
///
/// One dimension matches its bound exactly, the other is at most its bound.
///
/// # Examples
/// ```
/// # use bigthumb::imaging::calculations::fit_within;
/// // 840x800 into a 100x100 box → width-limited
/// assert_eq!(fit_within((840, 800), (100, 100)), (100, 95));
/// ```
pub fn fit_within(source: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (max_w, max_h) = bounds;

    let src_aspect = src_w as f64 / src_h as f64;
    let box_aspect = max_w as f64 / max_h as f64;

    if src_aspect > box_aspect {
        // Source is wider: width hits the bound first
        fit_to_width(source, max_w)
    } else {
        // Source is taller (or same shape): height hits the bound first
        fit_to_height(source, max_h)
    }
}
