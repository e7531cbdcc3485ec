//! Region readers that never hold more than one band of the source.
//!
//! - **PNG**: rows are pulled one at a time with `png::Reader::next_row`.
//!   Rows above the region are decoded and dropped, decoding stops at the
//!   region's last row, and only the region's columns are kept.
//! - **TIFF**: only the strips or tiles that overlap the region are read,
//!   each with `tiff::decoder::Decoder::read_chunk`.
//!
//! Each reader returns `Ok(None)` for layouts it does not stream (interlaced
//! PNG, planar or non-8-bit TIFF, ...); the caller then decodes whole.

use super::backend::BackendError;
use super::buffer::{CHANNELS, PixelBuffer};
use super::params::Region;
use png::{BitDepth, ColorType, Transformations};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tiff::decoder::{Decoder as TiffDecoder, DecodingResult};
use tiff::tags::Tag;
use tiff::TiffError;

pub(super) fn outside_source(
    path: &Path,
    region: Region,
    width: u32,
    height: u32,
) -> BackendError {
    BackendError::ProcessingFailed(format!(
        "region {}x{} at ({}, {}) outside {}x{} source {}",
        region.width,
        region.height,
        region.x,
        region.y,
        width,
        height,
        path.display()
    ))
}

fn truncated(path: &Path, what: String) -> BackendError {
    BackendError::Decode(format!("{}: {}", path.display(), what))
}

fn png_error(path: &Path, err: png::DecodingError) -> BackendError {
    match err {
        png::DecodingError::IoError(e) => BackendError::Io(e),
        other => BackendError::Decode(format!("{}: {}", path.display(), other)),
    }
}

fn tiff_error(path: &Path, err: TiffError) -> BackendError {
    match err {
        TiffError::IoError(e) => BackendError::Io(e),
        TiffError::UnsupportedError(e) => {
            BackendError::UnsupportedFormat(format!("{}: {}", path.display(), e))
        }
        other => BackendError::Decode(format!("{}: {}", path.display(), other)),
    }
}

/// Append `samples` (gray, gray+alpha, RGB or RGBA) as RGB.
fn push_rgb(out: &mut Vec<u8>, samples: &[u8], channels: usize) {
    for px in samples.chunks_exact(channels) {
        if channels < CHANNELS {
            out.extend_from_slice(&[px[0], px[0], px[0]]);
        } else {
            out.extend_from_slice(&px[..CHANNELS]);
        }
    }
}

fn into_buffer(region: Region, data: Vec<u8>) -> Result<PixelBuffer, BackendError> {
    PixelBuffer::from_raw(region.width, region.height, data)
        .map_err(|e| BackendError::ProcessingFailed(e.to_string()))
}

/// Stream `region` out of a non-interlaced PNG.
pub(super) fn png_region(
    path: &Path,
    region: Region,
) -> Result<Option<PixelBuffer>, BackendError> {
    let mut decoder = png::Decoder::new(BufReader::new(File::open(path)?));
    decoder.set_transformations(Transformations::EXPAND | Transformations::STRIP_16);
    let mut reader = decoder.read_info().map_err(|e| png_error(path, e))?;

    let (width, height, interlaced) = {
        let info = reader.info();
        (info.width, info.height, info.interlaced)
    };
    if !region.fits_within(width, height) {
        return Err(outside_source(path, region, width, height));
    }
    if interlaced {
        return Ok(None);
    }
    let channels = match reader.output_color_type() {
        (ColorType::Grayscale, BitDepth::Eight) => 1,
        (ColorType::GrayscaleAlpha, BitDepth::Eight) => 2,
        (ColorType::Rgb, BitDepth::Eight) => 3,
        (ColorType::Rgba, BitDepth::Eight) => 4,
        _ => return Ok(None),
    };

    let start = region.x as usize * channels;
    let end = start + region.width as usize * channels;
    let mut data = Vec::with_capacity(region.width as usize * region.height as usize * CHANNELS);
    for y in 0..region.y + region.height {
        let row = reader
            .next_row()
            .map_err(|e| png_error(path, e))?
            .ok_or_else(|| truncated(path, format!("image data ends before row {y}")))?;
        if y < region.y {
            continue;
        }
        let samples = row
            .data()
            .get(start..end)
            .ok_or_else(|| truncated(path, format!("row {y} is short")))?;
        push_rgb(&mut data, samples, channels);
    }
    into_buffer(region, data).map(Some)
}

/// Read `region` from the strips or tiles of a chunky 8-bit RGB(A) TIFF.
pub(super) fn tiff_region(
    path: &Path,
    region: Region,
) -> Result<Option<PixelBuffer>, BackendError> {
    let mut decoder =
        TiffDecoder::new(BufReader::new(File::open(path)?)).map_err(|e| tiff_error(path, e))?;
    let (width, height) = decoder.dimensions().map_err(|e| tiff_error(path, e))?;
    if !region.fits_within(width, height) {
        return Err(outside_source(path, region, width, height));
    }
    let channels = match decoder.colortype().map_err(|e| tiff_error(path, e))? {
        tiff::ColorType::RGB(8) => 3,
        tiff::ColorType::RGBA(8) => 4,
        _ => return Ok(None),
    };
    // 1 = chunky; planar chunks hold a single sample each.
    let planar = decoder
        .find_tag_unsigned::<u16>(Tag::PlanarConfiguration)
        .map_err(|e| tiff_error(path, e))?;
    if planar.is_some_and(|p| p != 1) {
        return Ok(None);
    }

    let (chunk_w, chunk_h) = decoder.chunk_dimensions();
    if chunk_w == 0 || chunk_h == 0 || region.width == 0 || region.height == 0 {
        return Ok(None);
    }
    let across = width.div_ceil(chunk_w);
    let (right, bottom) = (region.x + region.width, region.y + region.height);

    let out_stride = region.width as usize * CHANNELS;
    let mut data = vec![0u8; out_stride * region.height as usize];
    for chunk_row in region.y / chunk_h..=(bottom - 1) / chunk_h {
        for chunk_col in region.x / chunk_w..=(right - 1) / chunk_w {
            let index = chunk_row * across + chunk_col;
            let (data_w, data_h) = decoder.chunk_data_dimensions(index);
            let DecodingResult::U8(chunk) =
                decoder.read_chunk(index).map_err(|e| tiff_error(path, e))?
            else {
                return Ok(None);
            };

            let (origin_x, origin_y) = (chunk_col * chunk_w, chunk_row * chunk_h);
            let (x0, x1) = (region.x.max(origin_x), right.min(origin_x + data_w));
            let (y0, y1) = (region.y.max(origin_y), bottom.min(origin_y + data_h));
            if x0 >= x1 || y0 >= y1 {
                continue;
            }

            let chunk_stride = data_w as usize * channels;
            for y in y0..y1 {
                let row_start = (y - origin_y) as usize * chunk_stride;
                let samples = chunk
                    .get(
                        row_start + (x0 - origin_x) as usize * channels
                            ..row_start + (x1 - origin_x) as usize * channels,
                    )
                    .ok_or_else(|| truncated(path, format!("chunk {index} is short")))?;
                let dst = (y - region.y) as usize * out_stride + (x0 - region.x) as usize * CHANNELS;
                for (i, px) in samples.chunks_exact(channels).enumerate() {
                    let at = dst + i * CHANNELS;
                    data[at..at + CHANNELS].copy_from_slice(&px[..CHANNELS]);
                }
            }
        }
    }
    into_buffer(region, data).map(Some)
}
