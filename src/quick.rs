//! Single-call operations for images small enough to decode whole.
//!
//! No tiling here: the source is read as one region, transformed once by the
//! backend, and written with the same format resolution and atomic rename as
//! the tiled pipeline.
//!
//! | Operation | Result size |
//! |---|---|
//! | [`scale`] | source × factor |
//! | [`fit_width`] / [`fit_height`] | one edge fixed, aspect kept |
//! | [`force_size`] | exactly the requested size |
//! | [`crop`] | the region, optionally fitted inside a box |
//! | [`convert`] | unchanged, re-encoded |

use crate::imaging::calculations::{fit_to_height, fit_to_width, fit_within, scale_dimensions};
use crate::imaging::{ImageBackend, OutputFormat, PixelBuffer, Quality, Region};
use crate::pipeline::{PipelineError, output_format, write_output};
use std::path::{Path, PathBuf};

/// Where to read from, where to write to, and how hard to compress.
#[derive(Debug, Clone, Copy)]
pub struct Job<'a> {
    pub source: &'a Path,
    pub target: &'a Path,
    pub quality: Quality,
}

impl<'a> Job<'a> {
    pub fn new(source: &'a Path, target: &'a Path) -> Self {
        Self {
            source,
            target,
            quality: Quality::default(),
        }
    }

    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }
}

/// Decoded source plus everything needed to write the result.
struct Loaded {
    pixels: PixelBuffer,
    format: OutputFormat,
}

fn invalid(msg: impl Into<String>) -> PipelineError {
    PipelineError::InvalidArgument(msg.into())
}

fn check_paths(job: &Job) -> Result<(), PipelineError> {
    if job.source.to_string_lossy().trim().is_empty() {
        return Err(invalid("source path must not be empty"));
    }
    if job.target.to_string_lossy().trim().is_empty() {
        return Err(invalid("target path must not be empty"));
    }
    Ok(())
}

/// Validate, resolve the encoder, then read `region` (or the whole image).
fn load(
    backend: &impl ImageBackend,
    job: &Job,
    region: Option<Region>,
) -> Result<Loaded, PipelineError> {
    check_paths(job)?;
    let format = output_format(job.target)?;

    let info = backend.identify(job.source)?;
    if info.width == 0 || info.height == 0 {
        return Err(invalid(format!("{} has no pixels", job.source.display())));
    }
    let region = region.unwrap_or(Region::full(info.width, info.height));
    if !region.fits_within(info.width, info.height) {
        return Err(invalid(format!(
            "region {}x{} at ({}, {}) exceeds {}x{} source",
            region.width, region.height, region.x, region.y, info.width, info.height
        )));
    }

    let pixels = backend.read_region(job.source, region);
    backend.release(job.source);
    Ok(Loaded {
        pixels: pixels?,
        format,
    })
}

fn resize_and_store(
    backend: &impl ImageBackend,
    job: &Job,
    loaded: Loaded,
    (width, height): (u32, u32),
) -> Result<PathBuf, PipelineError> {
    let pixels = if loaded.pixels.dimensions() == (width, height) {
        loaded.pixels
    } else {
        backend.rescale(&loaded.pixels, width, height)?
    };
    write_output(backend, &pixels, job.target, loaded.format, job.quality)?;
    log::info!(
        "{} → {} ({}x{})",
        job.source.display(),
        job.target.display(),
        width,
        height
    );
    Ok(job.target.to_path_buf())
}

/// Scale both axes by `factor`.
pub fn scale(
    backend: &impl ImageBackend,
    job: &Job,
    factor: f64,
) -> Result<PathBuf, PipelineError> {
    if !(factor.is_finite() && factor > 0.0) {
        return Err(invalid(format!(
            "scale factor must be a positive number, got {factor}"
        )));
    }
    let loaded = load(backend, job, None)?;
    let size = scale_dimensions(loaded.pixels.dimensions(), factor);
    resize_and_store(backend, job, loaded, size)
}

/// Resize to `width`, height following the aspect ratio.
pub fn fit_width(
    backend: &impl ImageBackend,
    job: &Job,
    width: u32,
) -> Result<PathBuf, PipelineError> {
    if width == 0 {
        return Err(invalid("width must be non-zero"));
    }
    let loaded = load(backend, job, None)?;
    let size = fit_to_width(loaded.pixels.dimensions(), width);
    resize_and_store(backend, job, loaded, size)
}

/// Resize to `height`, width following the aspect ratio.
pub fn fit_height(
    backend: &impl ImageBackend,
    job: &Job,
    height: u32,
) -> Result<PathBuf, PipelineError> {
    if height == 0 {
        return Err(invalid("height must be non-zero"));
    }
    let loaded = load(backend, job, None)?;
    let size = fit_to_height(loaded.pixels.dimensions(), height);
    resize_and_store(backend, job, loaded, size)
}

/// Resize to exactly `width`×`height`, distorting if needed.
pub fn force_size(
    backend: &impl ImageBackend,
    job: &Job,
    width: u32,
    height: u32,
) -> Result<PathBuf, PipelineError> {
    if width == 0 || height == 0 {
        return Err(invalid(format!(
            "target size must be non-zero, got {width}x{height}"
        )));
    }
    let loaded = load(backend, job, None)?;
    resize_and_store(backend, job, loaded, (width, height))
}

/// Cut `region` out of the source.
///
/// With `fit`, the cut is then resized to the largest size with its own
/// aspect ratio that fits inside the box.
pub fn crop(
    backend: &impl ImageBackend,
    job: &Job,
    region: Region,
    fit: Option<(u32, u32)>,
) -> Result<PathBuf, PipelineError> {
    if region.width == 0 || region.height == 0 {
        return Err(invalid("crop region must be non-empty"));
    }
    if let Some((w, h)) = fit.filter(|&(w, h)| w == 0 || h == 0) {
        return Err(invalid(format!("fit box must be non-zero, got {w}x{h}")));
    }
    let loaded = load(backend, job, Some(region))?;
    let size = match fit {
        Some(bounds) => fit_within(loaded.pixels.dimensions(), bounds),
        None => loaded.pixels.dimensions(),
    };
    resize_and_store(backend, job, loaded, size)
}

/// Re-encode the source in the format the target's extension names.
pub fn convert(backend: &impl ImageBackend, job: &Job) -> Result<PathBuf, PipelineError> {
    let loaded = load(backend, job, None)?;
    let size = loaded.pixels.dimensions();
    resize_and_store(backend, job, loaded, size)
}
