//! # bigthumb
//!
//! Thumbnails for images too large to decode and resample in one piece.
//!
//! # Architecture: Tile, Rescale, Stitch
//!
//! A source is never resampled whole. It is cut into a grid of tiles, each
//! tile is resampled on its own, and the small results are stitched back
//! together before encoding:
//!
//! ```text
//! 1. Plan     source size  →  Grid        (pure arithmetic, no pixels)
//! 2. Rescale  each Tile    →  PixelBuffer (parallel, one tile per worker)
//! 3. Merge    buffers      →  one image   (rows left→right, then top→bottom)
//! 4. Encode   image        →  target      (format from the extension)
//! ```
//!
//! Resampling a 5000x5000 tile needs a small, fixed amount of working memory
//! no matter how large the source is, which is what makes sources of tens of
//! thousands of pixels per side practical.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`grid`] | Partitions a source into row-major tiles |
//! | [`rescale`] | Per-tile target sizes (uniform or apportioned) and resampling |
//! | [`merge`] | Stitches buffers horizontally or vertically |
//! | [`pipeline`] | Runs the four stages for one image; errors, events, reports |
//! | [`quick`] | Single-call scale, fit, crop, convert for normal-size images |
//! | [`config`] | `bigthumb.toml` loading, validation, and stock defaults |
//! | [`imaging`] | Backend trait, `image`-crate backend, pixel buffers, dimension math |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Backend Trait
//!
//! All pixel work goes through [`imaging::ImageBackend`]: identify, read a
//! region, rescale, encode. The tiling logic never touches a codec, so it is
//! tested against a recording mock. [`imaging::RustBackend`] streams PNG rows
//! and TIFF strips, so a tile read holds one band of the source, not all of it.
//!
//! ## Order-Preserving Parallelism
//!
//! Tiles are independent, so they are rescaled with rayon. The results are
//! collected in grid order, and the merge depends on that order, not on which
//! worker finished first.
//!
//! ## Nothing Half-Written
//!
//! Any failure aborts the run. The final image is encoded to a hidden sibling
//! and renamed over the target only after encoding succeeds.
//!
//! ## Apportioned Height Guard
//!
//! The apportioned mode compares a tile's height against the source **width**
//! when deciding whether it gets the full target height. That asymmetry is
//! the established behavior and is kept by default;
//! [`rescale::HeightGuard`] selects the symmetric rule.

pub mod config;
pub mod grid;
pub mod imaging;
pub mod merge;
pub mod output;
pub mod pipeline;
pub mod quick;
pub mod rescale;

pub use pipeline::{
    CancelFlag, PipelineError, PipelineEvent, ThumbnailPipeline, ThumbnailReport, thumbnail,
    thumbnail_for_scale, thumbnail_for_size,
};
pub use rescale::ScaleMode;
