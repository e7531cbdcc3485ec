//! Parameter types for image operations.
//!
//! These describe *what* the backend should produce, not *how*.
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`OutputFormat`]: Codec chosen for a target path, resolved from its extension.
//! - [`Region`]: Rectangle of the source to decode.

use image::ImageFormat;
use std::path::Path;

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

/// Encoder selected from a target path's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFormat(ImageFormat);

impl OutputFormat {
    /// Resolve the codec for `path`.
    ///
    /// Returns `None` when the path has no extension, the extension is not a
    /// known image format, or this build has no encoder for it.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        let format = ImageFormat::from_extension(ext)?;
        format.writing_enabled().then_some(Self(format))
    }

    pub fn image_format(self) -> ImageFormat {
        self.0
    }
}

/// Rectangular area of a source image, in source pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The whole of a `width`×`height` image.
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Whether this region lies entirely within a `width`×`height` image.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x as u64 + self.width as u64 <= width as u64
            && self.y as u64 + self.height as u64 <= height as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_90() {
        assert_eq!(Quality::default().value(), 90);
    }

    #[test]
    fn output_format_from_extension() {
        let png = OutputFormat::from_path(Path::new("/out/thumb.png")).unwrap();
        assert_eq!(png.image_format(), ImageFormat::Png);

        let jpg = OutputFormat::from_path(Path::new("thumb.JPEG")).unwrap();
        assert_eq!(jpg.image_format(), ImageFormat::Jpeg);
    }

    #[test]
    fn output_format_rejects_unknown_or_missing_extension() {
        assert_eq!(OutputFormat::from_path(Path::new("thumb")), None);
        assert_eq!(OutputFormat::from_path(Path::new("thumb.xyz")), None);
    }

    #[test]
    fn region_bounds() {
        assert!(Region::new(2, 3, 8, 7).fits_within(10, 10));
        assert!(!Region::new(2, 3, 9, 7).fits_within(10, 10));
        assert!(!Region::new(u32::MAX, 0, 1, 1).fits_within(10, 10));
        assert!(Region::full(10, 10).fits_within(10, 10));
    }
}
