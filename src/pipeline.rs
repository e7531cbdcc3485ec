//! Tiled thumbnail pipeline.
//!
//! Ties the stages together for one source image:
//!
//! ```text
//! identify → plan grid → rescale tiles (parallel) → merge rows → merge rows together → encode
//! ```
//!
//! ## Ordering
//!
//! Tiles are independent, so they are rescaled on the rayon pool. Results are
//! collected with an indexed `collect`, which keeps grid row-major order
//! regardless of which worker finishes first; the merger relies on that order.
//!
//! ## Failure
//!
//! Any error aborts the whole run and nothing is written to the target path.
//! The final image is encoded to a hidden sibling file and renamed into place
//! only once encoding succeeds.
//!
//! ## Cancellation
//!
//! A [`CancelFlag`] attached with [`ThumbnailPipeline::with_cancel`] is checked
//! before each tile and before encoding.

use crate::config::ThumbConfig;
use crate::grid::{self, Grid};
use crate::imaging::buffer::buffer_bytes;
use crate::imaging::{
    BackendError, ImageBackend, OutputFormat, PixelBuffer, Quality, RustBackend,
};
use crate::merge::{MergeError, merge_grid};
use crate::rescale::{ScaleMode, TileRescaler};
use image::ImageFormat;
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::time::Instant;
use thiserror::Error;

/// Scale factor used by [`thumbnail`].
pub const DEFAULT_SCALE: f64 = 0.01;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
    #[error("Image processing failed: {0}")]
    Processing(String),
    #[error("Merge failed: {0}")]
    Merge(#[from] MergeError),
    #[error("Cancelled")]
    Cancelled,
}

impl From<BackendError> for PipelineError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Io(e) => PipelineError::Io(e),
            BackendError::UnsupportedFormat(msg) => PipelineError::UnsupportedFormat(msg),
            BackendError::Decode(msg) => PipelineError::Decode(msg),
            BackendError::Encode(msg) => PipelineError::Encode(msg),
            BackendError::ProcessingFailed(msg) => PipelineError::Processing(msg),
        }
    }
}

impl From<grid::GridError> for PipelineError {
    fn from(err: grid::GridError) -> Self {
        PipelineError::InvalidArgument(err.to_string())
    }
}

/// An opened source image. Read-only for the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
}

/// Shared cancellation switch. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Progress notifications, sent in the order the work happens.
///
/// `TileRescaled` events arrive in completion order, which is not grid order
/// when tiles run in parallel.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Planned {
        source: PathBuf,
        width: u32,
        height: u32,
        rows: u32,
        cols: u32,
        output_width: u32,
        output_height: u32,
    },
    TileRescaled {
        row: u32,
        col: u32,
        width: u32,
        height: u32,
    },
    Written {
        target: PathBuf,
        width: u32,
        height: u32,
        elapsed_ms: u64,
    },
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThumbnailReport {
    pub source: PathBuf,
    pub source_format: String,
    pub source_width: u32,
    pub source_height: u32,
    pub rows: u32,
    pub cols: u32,
    pub target: PathBuf,
    pub output_width: u32,
    pub output_height: u32,
    pub elapsed_ms: u64,
}

fn require_path(path: &Path, what: &str) -> Result<(), PipelineError> {
    if path.to_string_lossy().trim().is_empty() {
        return Err(PipelineError::InvalidArgument(format!(
            "{what} path must not be empty"
        )));
    }
    Ok(())
}

/// Resolve the encoder for `target`, failing before any pixel work.
pub(crate) fn output_format(target: &Path) -> Result<OutputFormat, PipelineError> {
    OutputFormat::from_path(target).ok_or_else(|| {
        PipelineError::UnsupportedFormat(format!("no encoder for {}", target.display()))
    })
}

/// Make sure the directory that will hold `target` exists.
///
/// A regular file sitting where the directory should be is removed and
/// replaced by the directory.
pub(crate) fn ensure_parent_dir(target: &Path) -> Result<(), PipelineError> {
    let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    if parent.is_file() {
        log::warn!(
            "replacing file {} with a directory for {}",
            parent.display(),
            target.display()
        );
        fs::remove_file(parent)?;
    }
    fs::create_dir_all(parent)?;
    Ok(())
}

/// Encode to a hidden sibling of `target`, then rename it into place.
pub(crate) fn write_output(
    backend: &impl ImageBackend,
    buffer: &PixelBuffer,
    target: &Path,
    format: OutputFormat,
    quality: Quality,
) -> Result<(), PipelineError> {
    ensure_parent_dir(target)?;

    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            PipelineError::InvalidArgument(format!("{} has no file name", target.display()))
        })?;
    let partial = target.with_file_name(format!(".{name}.partial"));

    if let Err(e) = backend.encode(buffer, &partial, format, quality) {
        fs::remove_file(&partial).ok();
        return Err(e.into());
    }
    if let Err(e) = fs::rename(&partial, target) {
        fs::remove_file(&partial).ok();
        return Err(e.into());
    }
    Ok(())
}

/// Orchestrates one tiled thumbnail run against an [`ImageBackend`].
///
/// Holds no per-image state; one pipeline can run many images.
pub struct ThumbnailPipeline<'a, B: ImageBackend> {
    backend: &'a B,
    config: ThumbConfig,
    cancel: Option<CancelFlag>,
    events: Option<Sender<PipelineEvent>>,
}

impl<'a, B: ImageBackend> ThumbnailPipeline<'a, B> {
    pub fn new(backend: &'a B, config: ThumbConfig) -> Self {
        Self {
            backend,
            config,
            cancel: None,
            events: None,
        }
    }

    pub fn with_cancel(mut self, flag: CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn with_events(mut self, tx: Sender<PipelineEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(tx) = &self.events {
            // A dropped receiver only means nobody is listening.
            tx.send(event).ok();
        }
    }

    fn check_cancelled(&self) -> Result<(), PipelineError> {
        match &self.cancel {
            Some(flag) if flag.is_cancelled() => Err(PipelineError::Cancelled),
            _ => Ok(()),
        }
    }

    /// Read the source's size and format without decoding its pixels.
    pub fn describe(&self, source: &Path) -> Result<SourceDescriptor, PipelineError> {
        require_path(source, "source")?;
        let info = self.backend.identify(source)?;
        if info.width == 0 || info.height == 0 {
            return Err(PipelineError::InvalidArgument(format!(
                "{} has no pixels ({}x{})",
                source.display(),
                info.width,
                info.height
            )));
        }
        Ok(SourceDescriptor {
            path: source.to_path_buf(),
            width: info.width,
            height: info.height,
            format: info.format,
        })
    }

    /// Partition the source with the configured tile size.
    pub fn plan(&self, source: &SourceDescriptor) -> Result<Grid, PipelineError> {
        Ok(grid::plan(
            source.width,
            source.height,
            self.config.tiling.tile_size(),
        )?)
    }

    /// Thumbnail `source` into `target`, returning the target path.
    pub fn run(
        &self,
        source: &Path,
        target: &Path,
        mode: ScaleMode,
    ) -> Result<PathBuf, PipelineError> {
        self.run_with_report(source, target, mode)
            .map(|report| report.target)
    }

    /// Thumbnail `source` into `target`, returning a summary of the run.
    pub fn run_with_report(
        &self,
        source: &Path,
        target: &Path,
        mode: ScaleMode,
    ) -> Result<ThumbnailReport, PipelineError> {
        let started = Instant::now();

        require_path(source, "source")?;
        require_path(target, "target")?;
        mode.validate().map_err(PipelineError::InvalidArgument)?;
        let format = output_format(target)?;

        let descriptor = self.describe(source)?;
        let grid = self.plan(&descriptor)?;
        let rescaler = TileRescaler::new(
            self.backend,
            &descriptor.path,
            (descriptor.width, descriptor.height),
            self.config.tiling.tile_size(),
            mode,
        )
        .with_height_guard(self.config.apportion.height_guard);
        let (output_width, output_height) = rescaler.output_dimensions(&grid);
        if buffer_bytes(output_width, output_height).is_none() {
            return Err(PipelineError::InvalidArgument(format!(
                "{output_width}x{output_height} output is too large to hold in memory"
            )));
        }

        log::debug!(
            "{}: {}x{} as {}x{} tiles → {}x{}",
            descriptor.path.display(),
            descriptor.width,
            descriptor.height,
            grid.rows(),
            grid.cols(),
            output_width,
            output_height
        );
        self.emit(PipelineEvent::Planned {
            source: descriptor.path.clone(),
            width: descriptor.width,
            height: descriptor.height,
            rows: grid.rows(),
            cols: grid.cols(),
            output_width,
            output_height,
        });

        let rescaled = grid
            .tiles()
            .par_iter()
            .map(|tile| {
                self.check_cancelled()?;
                let buffer = rescaler.rescale(tile)?;
                log::debug!(
                    "tile ({}, {}) {}x{} → {}x{}",
                    tile.row,
                    tile.col,
                    tile.width,
                    tile.height,
                    buffer.width(),
                    buffer.height()
                );
                self.emit(PipelineEvent::TileRescaled {
                    row: tile.row,
                    col: tile.col,
                    width: buffer.width(),
                    height: buffer.height(),
                });
                Ok(buffer)
            })
            .collect::<Result<Vec<_>, PipelineError>>();
        self.backend.release(&descriptor.path);
        let rescaled = rescaled?;

        let cols = grid.cols() as usize;
        let mut tiles = rescaled.into_iter();
        let rows: Vec<Vec<PixelBuffer>> = (0..grid.rows())
            .map(|_| tiles.by_ref().take(cols).collect())
            .collect();
        let merged = merge_grid(rows)?;

        self.check_cancelled()?;
        write_output(
            self.backend,
            &merged,
            target,
            format,
            self.config.output.quality(),
        )?;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        log::info!(
            "{} → {} ({}x{}) in {} ms",
            descriptor.path.display(),
            target.display(),
            merged.width(),
            merged.height(),
            elapsed_ms
        );
        self.emit(PipelineEvent::Written {
            target: target.to_path_buf(),
            width: merged.width(),
            height: merged.height(),
            elapsed_ms,
        });

        Ok(ThumbnailReport {
            source: descriptor.path,
            source_format: format!("{:?}", descriptor.format).to_lowercase(),
            source_width: descriptor.width,
            source_height: descriptor.height,
            rows: grid.rows(),
            cols: grid.cols(),
            target: target.to_path_buf(),
            output_width: merged.width(),
            output_height: merged.height(),
            elapsed_ms,
        })
    }
}

/// Thumbnail at [`DEFAULT_SCALE`] with the stock configuration.
pub fn thumbnail(source: &Path, target: &Path) -> Result<PathBuf, PipelineError> {
    thumbnail_for_scale(source, target, DEFAULT_SCALE)
}

/// Thumbnail by a uniform factor with the stock configuration.
pub fn thumbnail_for_scale(
    source: &Path,
    target: &Path,
    factor: f64,
) -> Result<PathBuf, PipelineError> {
    let backend = RustBackend::new();
    ThumbnailPipeline::new(&backend, ThumbConfig::default()).run(
        source,
        target,
        ScaleMode::Uniform(factor),
    )
}

/// Thumbnail to an approximate overall size with the stock configuration.
pub fn thumbnail_for_size(
    source: &Path,
    target: &Path,
    width: u32,
    height: u32,
) -> Result<PathBuf, PipelineError> {
    let backend = RustBackend::new();
    ThumbnailPipeline::new(&backend, ThumbConfig::default()).run(
        source,
        target,
        ScaleMode::Apportioned { width, height },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TilingConfig;
    use crate::imaging::Region;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use std::sync::mpsc;
    use tempfile::TempDir;

    fn config_with_tiles(width: u32, height: u32) -> ThumbConfig {
        ThumbConfig {
            tiling: TilingConfig {
                tile_width: width,
                tile_height: height,
            },
            ..ThumbConfig::default()
        }
    }

    fn patterned(width: u32, height: u32) -> PixelBuffer {
        PixelBuffer::from_fn(width, height, |x, y| {
            [(x * 11) as u8, (y * 7) as u8, (x ^ y) as u8]
        })
    }

    // =========================================================================
    // Argument validation (no I/O)
    // =========================================================================

    #[test]
    fn empty_source_path_fails_before_io() {
        let backend = MockBackend::with_dimensions(100, 100);
        let pipeline = ThumbnailPipeline::new(&backend, ThumbConfig::default());

        let result = pipeline.run(Path::new(""), Path::new("/out/t.png"), ScaleMode::Uniform(0.5));

        assert!(matches!(result, Err(PipelineError::InvalidArgument(_))));
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn blank_target_path_fails_before_io() {
        let backend = MockBackend::with_dimensions(100, 100);
        let pipeline = ThumbnailPipeline::new(&backend, ThumbConfig::default());

        let result = pipeline.run(Path::new("/in.png"), Path::new("  "), ScaleMode::Uniform(0.5));

        assert!(matches!(result, Err(PipelineError::InvalidArgument(_))));
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn bad_scale_factor_fails_before_io() {
        let backend = MockBackend::with_dimensions(100, 100);
        let pipeline = ThumbnailPipeline::new(&backend, ThumbConfig::default());

        let result = pipeline.run(Path::new("/in.png"), Path::new("/t.png"), ScaleMode::Uniform(0.0));

        assert!(matches!(result, Err(PipelineError::InvalidArgument(_))));
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn unknown_output_extension_fails_before_decoding() {
        let backend = MockBackend::with_dimensions(100, 100);
        let pipeline = ThumbnailPipeline::new(&backend, ThumbConfig::default());

        let result = pipeline.run(Path::new("/in.png"), Path::new("/t.xyz"), ScaleMode::Uniform(0.5));

        assert!(matches!(result, Err(PipelineError::UnsupportedFormat(_))));
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn unreadable_source_is_unsupported() {
        let tmp = TempDir::new().unwrap();
        let backend = MockBackend::unreadable();
        let pipeline = ThumbnailPipeline::new(&backend, ThumbConfig::default());

        let result = pipeline.run(
            Path::new("/in.bin"),
            &tmp.path().join("t.png"),
            ScaleMode::Uniform(0.5),
        );
        assert!(matches!(result, Err(PipelineError::UnsupportedFormat(_))));
    }

    #[test]
    fn zero_sized_source_is_invalid() {
        let tmp = TempDir::new().unwrap();
        let backend = MockBackend::with_dimensions(0, 10);
        let pipeline = ThumbnailPipeline::new(&backend, ThumbConfig::default());

        let result = pipeline.run(
            Path::new("/in.png"),
            &tmp.path().join("t.png"),
            ScaleMode::Uniform(0.5),
        );
        assert!(matches!(result, Err(PipelineError::InvalidArgument(_))));
    }

    // =========================================================================
    // Full runs against the mock backend
    // =========================================================================

    #[test]
    fn uniform_half_halves_output() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("thumb.png");
        let backend = MockBackend::with_dimensions(120, 80);
        let pipeline = ThumbnailPipeline::new(&backend, config_with_tiles(50, 50));

        let report = pipeline
            .run_with_report(Path::new("/big.png"), &target, ScaleMode::Uniform(0.5))
            .unwrap();

        assert_eq!((report.rows, report.cols), (2, 3));
        assert_eq!((report.output_width, report.output_height), (60, 40));
        assert_eq!(report.target, target);
        assert!(target.exists());
        assert_eq!(backend.encoded_buffer().unwrap().dimensions(), (60, 40));
    }

    #[test]
    fn factor_one_reproduces_source() {
        let tmp = TempDir::new().unwrap();
        let source = patterned(23, 17);
        for (tw, th) in [(23, 17), (5, 4), (1, 1), (7, 17), (100, 3)] {
            let backend = MockBackend::with_source(source.clone());
            let pipeline = ThumbnailPipeline::new(&backend, config_with_tiles(tw, th));

            pipeline
                .run(
                    Path::new("/src.png"),
                    &tmp.path().join("copy.png"),
                    ScaleMode::Uniform(1.0),
                )
                .unwrap();

            assert_eq!(
                backend.encoded_buffer().unwrap(),
                source,
                "tile {tw}x{th} changed pixels"
            );
            assert!(backend.rescales().is_empty());
        }
    }

    #[test]
    fn apportioned_tiles_request_their_share() {
        let tmp = TempDir::new().unwrap();
        let backend = MockBackend::with_dimensions(12000, 8000);
        let pipeline = ThumbnailPipeline::new(&backend, ThumbConfig::default());

        let report = pipeline
            .run_with_report(
                Path::new("/big.png"),
                &tmp.path().join("t.png"),
                ScaleMode::Apportioned {
                    width: 1000,
                    height: 1000,
                },
            )
            .unwrap();

        let rescales = backend.rescales();
        assert_eq!(rescales.len(), 6);
        assert!(rescales.iter().all(|(_, to)| *to == (416, 625)));
        assert_eq!((report.output_width, report.output_height), (1248, 1250));
    }

    #[test]
    fn tile_failure_aborts_without_output() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("t.png");
        let backend = MockBackend::with_dimensions(10, 10).failing_at(Region::new(5, 5, 5, 5));
        let pipeline = ThumbnailPipeline::new(&backend, config_with_tiles(5, 5));

        let result = pipeline.run(Path::new("/in.png"), &target, ScaleMode::Uniform(0.5));

        assert!(matches!(result, Err(PipelineError::Decode(_))));
        assert!(!target.exists());
        assert!(
            !backend
                .get_operations()
                .iter()
                .any(|op| matches!(op, RecordedOp::Encode { .. }))
        );
    }

    #[test]
    fn source_is_released_after_failed_tile() {
        let tmp = TempDir::new().unwrap();
        let backend = MockBackend::with_dimensions(10, 10).failing_at(Region::new(0, 0, 5, 5));
        let pipeline = ThumbnailPipeline::new(&backend, config_with_tiles(5, 5));

        let result = pipeline.run(
            Path::new("/in.png"),
            &tmp.path().join("t.png"),
            ScaleMode::Uniform(0.5),
        );

        assert!(result.is_err());
        let ops = backend.get_operations();
        assert!(ops.contains(&RecordedOp::Release("/in.png".to_string())));
    }

    #[test]
    fn source_is_released_before_encoding() {
        let tmp = TempDir::new().unwrap();
        let backend = MockBackend::with_dimensions(10, 10);
        let pipeline = ThumbnailPipeline::new(&backend, config_with_tiles(5, 5));

        pipeline
            .run(Path::new("/in.png"), &tmp.path().join("t.png"), ScaleMode::Uniform(0.5))
            .unwrap();

        let ops = backend.get_operations();
        let released = ops
            .iter()
            .position(|op| matches!(op, RecordedOp::Release(_)))
            .unwrap();
        let encoded = ops
            .iter()
            .position(|op| matches!(op, RecordedOp::Encode { .. }))
            .unwrap();
        assert!(released < encoded);
        assert!(
            ops[released..]
                .iter()
                .all(|op| !matches!(op, RecordedOp::ReadRegion(_)))
        );
    }

    #[test]
    fn oversized_output_fails_before_reading_tiles() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("t.png");
        let backend = MockBackend::with_dimensions(10, 10);
        let pipeline = ThumbnailPipeline::new(&backend, ThumbConfig::default());

        let result = pipeline.run(Path::new("/in.png"), &target, ScaleMode::Uniform(1e9));

        assert!(matches!(result, Err(PipelineError::InvalidArgument(_))));
        assert!(
            !backend
                .get_operations()
                .iter()
                .any(|op| matches!(op, RecordedOp::ReadRegion(_) | RecordedOp::Rescale { .. }))
        );
        assert!(!target.exists());
    }

    #[test]
    fn cancelled_run_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("t.png");
        let backend = MockBackend::with_dimensions(10, 10);
        let flag = CancelFlag::new();
        flag.cancel();
        let pipeline =
            ThumbnailPipeline::new(&backend, config_with_tiles(5, 5)).with_cancel(flag.clone());

        let result = pipeline.run(Path::new("/in.png"), &target, ScaleMode::Uniform(0.5));

        assert!(matches!(result, Err(PipelineError::Cancelled)));
        assert!(flag.is_cancelled());
        assert!(!target.exists());
    }

    #[test]
    fn events_follow_the_run() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("t.png");
        let backend = MockBackend::with_dimensions(12, 8);
        let (tx, rx) = mpsc::channel();
        let pipeline = ThumbnailPipeline::new(&backend, config_with_tiles(4, 4)).with_events(tx);

        pipeline
            .run(Path::new("/in.png"), &target, ScaleMode::Uniform(0.5))
            .unwrap();
        drop(pipeline);
        let events: Vec<PipelineEvent> = rx.iter().collect();

        assert_eq!(
            events.first(),
            Some(&PipelineEvent::Planned {
                source: PathBuf::from("/in.png"),
                width: 12,
                height: 8,
                rows: 2,
                cols: 3,
                output_width: 6,
                output_height: 4,
            })
        );
        let tiles = events
            .iter()
            .filter(|e| matches!(e, PipelineEvent::TileRescaled { .. }))
            .count();
        assert_eq!(tiles, 6);
        assert!(matches!(
            events.last(),
            Some(PipelineEvent::Written { width: 6, height: 4, .. })
        ));
    }

    #[test]
    fn encodes_with_configured_quality_and_format() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("t.jpg");
        let backend = MockBackend::with_dimensions(10, 10);
        let mut config = config_with_tiles(5, 5);
        config.output.quality = 70;
        let pipeline = ThumbnailPipeline::new(&backend, config);

        pipeline
            .run(Path::new("/in.png"), &target, ScaleMode::Uniform(0.5))
            .unwrap();

        let encode = backend
            .get_operations()
            .into_iter()
            .find(|op| matches!(op, RecordedOp::Encode { .. }))
            .unwrap();
        assert!(matches!(
            encode,
            RecordedOp::Encode {
                format: ImageFormat::Jpeg,
                quality: 70,
                ..
            }
        ));
        // Encoded to a hidden sibling, then renamed
        assert!(target.exists());
        assert!(!tmp.path().join(".t.jpg.partial").exists());
    }

    // =========================================================================
    // Target directory handling
    // =========================================================================

    #[test]
    fn creates_missing_target_directories() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("a/b/c/thumb.png");
        let backend = MockBackend::with_dimensions(10, 10);
        let pipeline = ThumbnailPipeline::new(&backend, ThumbConfig::default());

        let out = pipeline
            .run(Path::new("/in.png"), &target, ScaleMode::Uniform(0.5))
            .unwrap();

        assert_eq!(out, target);
        assert!(target.exists());
    }

    #[test]
    fn file_in_place_of_parent_becomes_directory() {
        let tmp = TempDir::new().unwrap();
        let parent = tmp.path().join("images");
        fs::write(&parent, "not a directory").unwrap();
        let target = parent.join("thumb.png");

        ensure_parent_dir(&target).unwrap();

        assert!(parent.is_dir());
    }

    #[test]
    fn failed_rename_leaves_no_partial_file() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("thumb.png");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("occupied"), "keeps the directory non-empty").unwrap();
        let backend = MockBackend::with_dimensions(4, 4);

        let result = write_output(
            &backend,
            &PixelBuffer::new(2, 2),
            &target,
            output_format(&target).unwrap(),
            Quality::default(),
        );

        assert!(matches!(result, Err(PipelineError::Io(_))));
        assert!(!tmp.path().join(".thumb.png.partial").exists());
        assert!(target.is_dir());
    }

    #[test]
    fn bare_file_name_needs_no_directory() {
        assert!(ensure_parent_dir(Path::new("thumb.png")).is_ok());
    }

    #[test]
    fn backend_errors_keep_their_kind() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(matches!(
            PipelineError::from(BackendError::Io(io)),
            PipelineError::Io(_)
        ));
        assert!(matches!(
            PipelineError::from(BackendError::Encode("x".into())),
            PipelineError::Encode(_)
        ));
        assert!(matches!(
            PipelineError::from(BackendError::UnsupportedFormat("x".into())),
            PipelineError::UnsupportedFormat(_)
        ));
    }
}
