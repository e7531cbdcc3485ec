//! Per-tile rescaling.
//!
//! Each tile is read from the source on its own and resampled to a target
//! size derived from the requested [`ScaleMode`]:
//!
//! - **Uniform**: every tile is scaled by the same factor, so the stitched
//!   result is the whole source scaled by that factor.
//! - **Apportioned**: the requested whole-image size is split between tiles
//!   in proportion to the configured tile size. Width and height are forced
//!   independently; aspect ratio is not kept.
//!
//! ## Apportioned height guard
//!
//! The apportioned height deliberately compares the tile height against the
//! source **width**, reproducing the established behavior of this
//! algorithm. [`HeightGuard::SourceHeight`] switches the comparison to the
//! source height for callers that want the symmetric rule.

use crate::grid::{Grid, Tile, TileSize};
use crate::imaging::calculations::scale_dimension;
use crate::imaging::{BackendError, ImageBackend, PixelBuffer};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How the whole image should be resized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScaleMode {
    /// Multiply both axes by this factor.
    Uniform(f64),
    /// Aim for this overall size, apportioned per tile.
    Apportioned { width: u32, height: u32 },
}

impl ScaleMode {
    /// Reject factors and sizes that cannot produce an image.
    pub fn validate(&self) -> Result<(), String> {
        match *self {
            ScaleMode::Uniform(factor) if !(factor.is_finite() && factor > 0.0) => {
                Err(format!("scale factor must be a positive number, got {factor}"))
            }
            ScaleMode::Apportioned { width, height } if width == 0 || height == 0 => Err(format!(
                "target size must be non-zero, got {width}x{height}"
            )),
            _ => Ok(()),
        }
    }
}

/// Which source dimension the apportioned height is guarded by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HeightGuard {
    /// `tile.height >= source.width`, the established rule.
    #[default]
    SourceWidth,
    /// `tile.height >= source.height`.
    SourceHeight,
}

/// `floor(tile_edge · target / source_edge)`, at least 1.
fn apportion(tile_edge: u32, target: u32, source_edge: u32) -> u32 {
    let share = tile_edge as u64 * target as u64 / source_edge as u64;
    share.clamp(1, u32::MAX as u64) as u32
}

/// Computes per-tile target sizes and resamples tiles through a backend.
pub struct TileRescaler<'a, B: ImageBackend> {
    backend: &'a B,
    source: &'a Path,
    source_size: (u32, u32),
    tile_size: TileSize,
    mode: ScaleMode,
    height_guard: HeightGuard,
}

impl<'a, B: ImageBackend> TileRescaler<'a, B> {
    pub fn new(
        backend: &'a B,
        source: &'a Path,
        source_size: (u32, u32),
        tile_size: TileSize,
        mode: ScaleMode,
    ) -> Self {
        Self {
            backend,
            source,
            source_size,
            tile_size,
            mode,
            height_guard: HeightGuard::default(),
        }
    }

    pub fn with_height_guard(mut self, guard: HeightGuard) -> Self {
        self.height_guard = guard;
        self
    }

    /// Size the given tile will be resampled to.
    pub fn target_dimensions(&self, tile: &Tile) -> (u32, u32) {
        match self.mode {
            ScaleMode::Uniform(factor) => (
                scale_dimension(tile.width, factor),
                scale_dimension(tile.height, factor),
            ),
            ScaleMode::Apportioned { width, height } => {
                let (source_w, source_h) = self.source_size;

                let tile_w = if tile.width >= source_w {
                    width
                } else {
                    apportion(self.tile_size.width, width, source_w)
                };

                let guard = match self.height_guard {
                    HeightGuard::SourceWidth => source_w,
                    HeightGuard::SourceHeight => source_h,
                };
                let tile_h = if tile.height >= guard {
                    height
                } else {
                    apportion(self.tile_size.height, height, source_h)
                };

                (tile_w.max(1), tile_h.max(1))
            }
        }
    }

    /// Size of the stitched image once every tile is rescaled and merged.
    ///
    /// Rows are as wide as the sum of their tiles and as tall as their
    /// tallest tile; the image is as wide as its widest row.
    pub fn output_dimensions(&self, grid: &Grid) -> (u32, u32) {
        grid.row_slices()
            .map(|row| {
                row.iter()
                    .map(|tile| self.target_dimensions(tile))
                    .fold((0u32, 0u32), |(w, h), (tw, th)| {
                        (w.saturating_add(tw), h.max(th))
                    })
            })
            .fold((0u32, 0u32), |(w, h), (rw, rh)| {
                (w.max(rw), h.saturating_add(rh))
            })
    }

    /// Read the tile's region from the source and resample it.
    ///
    /// A region that already has the target size is returned as read.
    pub fn rescale(&self, tile: &Tile) -> Result<PixelBuffer, BackendError> {
        let region = self.backend.read_region(self.source, tile.region())?;
        self.rescale_region(tile, region)
    }

    /// Resample an already-read region of `tile`.
    pub fn rescale_region(
        &self,
        tile: &Tile,
        region: PixelBuffer,
    ) -> Result<PixelBuffer, BackendError> {
        let (width, height) = self.target_dimensions(tile);
        if region.dimensions() == (width, height) {
            return Ok(region);
        }
        self.backend.rescale(&region, width, height)
    }
}
