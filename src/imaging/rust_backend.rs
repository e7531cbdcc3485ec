//! Pure Rust image processing backend built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `ImageReader::with_guessed_format` + `into_dimensions` (header only) |
//! | Region (PNG) | `png::Reader::next_row`, one row in memory at a time |
//! | Region (TIFF) | `tiff::decoder::Decoder::read_chunk` on overlapping strips/tiles |
//! | Region (JPEG, WebP, BMP, ...) | `ImageReader::decode` once, then `crop_imm` |
//! | Rescale | `image::imageops::resize` with `Lanczos3` filter |
//! | Encode | `JpegEncoder` (with quality) or `image::save_buffer_with_format` |
//!
//! PNG and TIFF sources are read band by band, so a tile costs memory in
//! proportion to the tile, not to the source. Other formats (and PNG/TIFF
//! layouts the band readers do not handle) are decoded whole under the
//! `image` crate's default allocation limits: a source too large for those
//! fails with a decode error instead of exhausting memory. The whole decode
//! is kept in a single-entry cache keyed by path, size and modification
//! time, and dropped by [`ImageBackend::release`].

use super::backend::{BackendError, ImageBackend, SourceInfo};
use super::buffer::PixelBuffer;
use super::params::{OutputFormat, Quality, Region};
use super::regions::{outside_source, png_region, tiff_region};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{
    DynamicImage, ExtendedColorType, ImageBuffer, ImageEncoder, ImageError, ImageFormat,
    ImageReader, Rgb,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;

/// Identity of a file's contents as far as the filesystem reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FileStamp {
    path: PathBuf,
    len: u64,
    modified: Option<SystemTime>,
}

impl FileStamp {
    fn of(path: &Path) -> Result<Self, BackendError> {
        let meta = std::fs::metadata(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            len: meta.len(),
            modified: meta.modified().ok(),
        })
    }
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
#[derive(Default)]
pub struct RustBackend {
    decoded: Mutex<Option<CachedDecode>>,
}

type CachedDecode = (FileStamp, Arc<DynamicImage>);

impl RustBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn cache(&self) -> Result<MutexGuard<'_, Option<CachedDecode>>, BackendError> {
        self.decoded
            .lock()
            .map_err(|_| BackendError::ProcessingFailed("decode cache poisoned".into()))
    }

    /// Decode `path`, or return the cached decode if the file is unchanged.
    fn decoded(&self, path: &Path) -> Result<Arc<DynamicImage>, BackendError> {
        let stamp = FileStamp::of(path)?;
        let mut slot = self.cache()?;

        if let Some((cached, img)) = slot.as_ref() {
            if *cached == stamp {
                return Ok(Arc::clone(img));
            }
        }

        // Drop the previous source before decoding the next one.
        *slot = None;
        let img = Arc::new(load_image(path)?);
        *slot = Some((stamp, Arc::clone(&img)));
        Ok(img)
    }

    /// Crop `region` out of a whole decode.
    fn region_from_decode(
        &self,
        path: &Path,
        region: Region,
    ) -> Result<PixelBuffer, BackendError> {
        let img = self.decoded(path)?;
        if !region.fits_within(img.width(), img.height()) {
            return Err(outside_source(path, region, img.width(), img.height()));
        }
        let cropped = img.crop_imm(region.x, region.y, region.width, region.height);
        Ok(PixelBuffer::from(cropped.to_rgb8()))
    }
}

fn decode_error(path: &Path, err: ImageError) -> BackendError {
    match err {
        ImageError::IoError(e) => BackendError::Io(e),
        ImageError::Unsupported(e) => {
            BackendError::UnsupportedFormat(format!("{}: {}", path.display(), e))
        }
        other => BackendError::Decode(format!("{}: {}", path.display(), other)),
    }
}

fn encode_error(path: &Path, err: ImageError) -> BackendError {
    match err {
        ImageError::IoError(e) => BackendError::Io(e),
        ImageError::Unsupported(e) => {
            BackendError::UnsupportedFormat(format!("{}: {}", path.display(), e))
        }
        other => BackendError::Encode(format!("{}: {}", path.display(), other)),
    }
}

type FileReader = ImageReader<std::io::BufReader<std::fs::File>>;

/// Open `path` and resolve its format from content, falling back to the extension.
fn open_reader(path: &Path) -> Result<(FileReader, ImageFormat), BackendError> {
    let reader = ImageReader::open(path)?
        .with_guessed_format()
        .map_err(BackendError::Io)?;
    let format = reader.format().ok_or_else(|| {
        BackendError::UnsupportedFormat(format!("{}: unknown image type", path.display()))
    })?;
    if !format.reading_enabled() {
        return Err(BackendError::UnsupportedFormat(format!(
            "{}: no decoder for {:?}",
            path.display(),
            format
        )));
    }
    Ok((reader, format))
}

/// Load and decode an image from disk, within the decoder's default limits.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    let (reader, _) = open_reader(path)?;
    reader.decode().map_err(|e| decode_error(path, e))
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<SourceInfo, BackendError> {
        let (reader, format) = open_reader(path)?;
        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| decode_error(path, e))?;
        Ok(SourceInfo {
            width,
            height,
            format,
        })
    }

    fn read_region(&self, path: &Path, region: Region) -> Result<PixelBuffer, BackendError> {
        let (_, format) = open_reader(path)?;
        let streamed = match format {
            ImageFormat::Png => png_region(path, region)?,
            ImageFormat::Tiff => tiff_region(path, region)?,
            _ => None,
        };
        match streamed {
            Some(buffer) => Ok(buffer),
            None => {
                log::debug!("{}: decoding whole {:?} source", path.display(), format);
                self.region_from_decode(path, region)
            }
        }
    }

    fn release(&self, path: &Path) {
        if let Ok(mut slot) = self.cache() {
            if slot.as_ref().is_some_and(|(stamp, _)| stamp.path.as_path() == path) {
                *slot = None;
            }
        }
    }

    fn rescale(
        &self,
        buffer: &PixelBuffer,
        width: u32,
        height: u32,
    ) -> Result<PixelBuffer, BackendError> {
        if width == 0 || height == 0 {
            return Err(BackendError::ProcessingFailed(format!(
                "cannot rescale to {width}x{height}"
            )));
        }
        let src = ImageBuffer::<Rgb<u8>, &[u8]>::from_raw(
            buffer.width(),
            buffer.height(),
            buffer.as_raw(),
        )
        .ok_or_else(|| BackendError::ProcessingFailed("pixel buffer length mismatch".into()))?;
        let resized = image::imageops::resize(&src, width, height, FilterType::Lanczos3);
        Ok(PixelBuffer::from(resized))
    }

    fn encode(
        &self,
        buffer: &PixelBuffer,
        path: &Path,
        format: OutputFormat,
        quality: Quality,
    ) -> Result<(), BackendError> {
        let (width, height) = buffer.dimensions();
        match format.image_format() {
            ImageFormat::Jpeg => {
                let file = std::fs::File::create(path)?;
                let writer = std::io::BufWriter::new(file);
                JpegEncoder::new_with_quality(writer, quality.value() as u8)
                    .write_image(buffer.as_raw(), width, height, ExtendedColorType::Rgb8)
                    .map_err(|e| encode_error(path, e))
            }
            other => image::save_buffer_with_format(
                path,
                buffer.as_raw(),
                width,
                height,
                ExtendedColorType::Rgb8,
                other,
            )
            .map_err(|e| encode_error(path, e)),
        }
    }
}
