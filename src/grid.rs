//! Grid planning: partition a source image into fixed-size tiles.
//!
//! ```text
//! 12000x8000 source, 5000x5000 tiles → 2 rows x 3 cols
//!
//!   x:   0        5000      10000  12000
//! y: 0   ┌─────────┬─────────┬─────┐
//!        │ (0,0)   │ (0,1)   │(0,2)│  5000 tall
//!   5000 ├─────────┼─────────┼─────┤
//!        │ (1,0)   │ (1,1)   │(1,2)│  3000 tall
//!   8000 └─────────┴─────────┴─────┘
//!          5000      5000     2000
//! ```
//!
//! Interior tiles are exactly [`TileSize`]; tiles on the right and bottom
//! edges are clipped to the source. Tiles are stored row-major, and that
//! order is the order the merger stitches them back together.

use crate::imaging::Region;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default tile edge, in source pixels.
pub const DEFAULT_TILE_EDGE: u32 = 5000;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum GridError {
    #[error("source dimensions must be non-zero, got {width}x{height}")]
    EmptySource { width: u32, height: u32 },
    #[error("tile size must be non-zero, got {width}x{height}")]
    EmptyTile { width: u32, height: u32 },
}

/// Maximum size of one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileSize {
    pub width: u32,
    pub height: u32,
}

impl TileSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for TileSize {
    fn default() -> Self {
        Self::new(DEFAULT_TILE_EDGE, DEFAULT_TILE_EDGE)
    }
}

/// One rectangle of the source, with its position in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Tile {
    pub row: u32,
    pub col: u32,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Tile {
    /// The source area covered by this tile.
    pub fn region(&self) -> Region {
        Region::new(self.x, self.y, self.width, self.height)
    }
}

/// Row-major partition of a source image into tiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Grid {
    rows: u32,
    cols: u32,
    tiles: Vec<Tile>,
}

impl Grid {
    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    /// All tiles, row-major.
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn tile(&self, row: u32, col: u32) -> Option<&Tile> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.tiles.get((row * self.cols + col) as usize)
    }

    /// Iterate over rows, each a left-to-right slice of tiles.
    pub fn row_slices(&self) -> impl Iterator<Item = &[Tile]> {
        self.tiles.chunks(self.cols as usize)
    }
}

/// Partition a `width`×`height` source into tiles of at most `tile_size`.
pub fn plan(width: u32, height: u32, tile_size: TileSize) -> Result<Grid, GridError> {
    if width == 0 || height == 0 {
        return Err(GridError::EmptySource { width, height });
    }
    if tile_size.width == 0 || tile_size.height == 0 {
        return Err(GridError::EmptyTile {
            width: tile_size.width,
            height: tile_size.height,
        });
    }

    let rows = height.div_ceil(tile_size.height);
    let cols = width.div_ceil(tile_size.width);

    let mut tiles = Vec::with_capacity(rows as usize * cols as usize);
    for row in 0..rows {
        // u64: row * tile height can pass u32::MAX on the last row
        let y = row as u64 * tile_size.height as u64;
        let tile_h = (height as u64 - y).min(tile_size.height as u64) as u32;
        for col in 0..cols {
            let x = col as u64 * tile_size.width as u64;
            let tile_w = (width as u64 - x).min(tile_size.width as u64) as u32;
            tiles.push(Tile {
                row,
                col,
                x: x as u32,
                y: y as u32,
                width: tile_w,
                height: tile_h,
            });
        }
    }

    Ok(Grid { rows, cols, tiles })
}
