//! Image processing: the seam between tiling logic and pixel work.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `ImageReader::into_dimensions` (header only) |
//! | **Region** | PNG rows and TIFF strips/tiles streamed; other formats decoded once |
//! | **Rescale** | `imageops::resize` with Lanczos3 |
//! | **Encode** | codec picked from the target extension |
//!
//! The module is split into:
//! - **Buffer**: [`PixelBuffer`], the owned RGB8 unit passed between stages
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]

pub mod backend;
pub mod buffer;
pub mod calculations;
mod params;
mod regions;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend, SourceInfo};
pub use buffer::{BufferError, PixelBuffer};
pub use params::{OutputFormat, Quality, Region};
pub use rust_backend::RustBackend;
