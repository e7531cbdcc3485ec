//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the four operations the tiling pipeline
//! needs from an image library: identify, read_region, rescale, and encode.
//! Everything else in the crate is backend-agnostic.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate.

use super::buffer::PixelBuffer;
use super::params::{OutputFormat, Quality, Region};
use image::ImageFormat;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation: header data only, no pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceInfo {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
}

/// Trait for image processing backends.
///
/// `Sync` is required because tiles are rescaled from rayon workers that
/// share one backend.
pub trait ImageBackend: Sync {
    /// Read dimensions and format without decoding pixel data.
    fn identify(&self, path: &Path) -> Result<SourceInfo, BackendError>;

    /// Decode one rectangle of the source as RGB8.
    fn read_region(&self, path: &Path, region: Region) -> Result<PixelBuffer, BackendError>;

    /// Drop anything kept for `path` between `read_region` calls.
    ///
    /// Called once no more regions of `path` will be read, whether or not
    /// the reads succeeded.
    fn release(&self, _path: &Path) {}

    /// Resample `buffer` to exactly `width`×`height`.
    fn rescale(
        &self,
        buffer: &PixelBuffer,
        width: u32,
        height: u32,
    ) -> Result<PixelBuffer, BackendError>;

    /// Write `buffer` to `path` using `format`.
    fn encode(
        &self,
        buffer: &PixelBuffer,
        path: &Path,
        format: OutputFormat,
        quality: Quality,
    ) -> Result<(), BackendError>;
}
