//! Owned RGB8 pixel buffers.
//!
//! [`PixelBuffer`] is the unit of data handed between pipeline stages: the
//! backend produces one per tile region, the rescaler one per tile, and the
//! merger one per row plus the final image. Data is interleaved `R, G, B`,
//! row-major, with no padding between rows.
//!
//! All rectangular copies are bounds-checked up front. A copy that would
//! leave the destination is an error, never a partial write.

use image::RgbImage;
use thiserror::Error;

/// Bytes per pixel (RGB, 8 bits per channel, no alpha).
pub const CHANNELS: usize = 3;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum BufferError {
    #[error(
        "{width}x{height} at ({x}, {y}) does not fit in a {target_width}x{target_height} buffer"
    )]
    OutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        target_width: u32,
        target_height: u32,
    },
    #[error("expected {expected} bytes for {width}x{height} RGB, got {actual}")]
    LengthMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

/// Rectangular RGB8 image owned in a single contiguous allocation.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl std::fmt::Debug for PixelBuffer {
    // Pixel data is omitted; buffers are routinely tens of megabytes.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

fn byte_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * CHANNELS
}

/// Bytes a `width` x `height` buffer would occupy, or `None` when that
/// cannot be allocated on this platform.
///
/// ```
/// # use bigthumb::imaging::buffer::buffer_bytes;
/// assert_eq!(buffer_bytes(4, 3), Some(36));
/// assert_eq!(buffer_bytes(u32::MAX, u32::MAX), None);
/// ```
pub fn buffer_bytes(width: u32, height: u32) -> Option<usize> {
    let bytes = (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(CHANNELS)?;
    (bytes <= isize::MAX as usize).then_some(bytes)
}

impl PixelBuffer {
    /// Allocate a black buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; byte_len(width, height)],
        }
    }

    /// Wrap existing interleaved RGB data.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self, BufferError> {
        let expected = byte_len(width, height);
        if data.len() != expected {
            return Err(BufferError::LengthMismatch {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Build a buffer by evaluating `f` at every pixel.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> [u8; 3]) -> Self {
        let mut buffer = Self::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let idx = buffer.index(x, y);
                buffer.data[idx..idx + CHANNELS].copy_from_slice(&f(x, y));
            }
        }
        buffer
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * CHANNELS
    }

    #[inline]
    fn row_stride(&self) -> usize {
        self.width as usize * CHANNELS
    }

    /// Read one pixel, or `None` outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = self.index(x, y);
        Some([self.data[idx], self.data[idx + 1], self.data[idx + 2]])
    }

    fn check_rect(&self, x: u32, y: u32, width: u32, height: u32) -> Result<(), BufferError> {
        let fits_x = x as u64 + width as u64 <= self.width as u64;
        let fits_y = y as u64 + height as u64 <= self.height as u64;
        if fits_x && fits_y {
            Ok(())
        } else {
            Err(BufferError::OutOfBounds {
                x,
                y,
                width,
                height,
                target_width: self.width,
                target_height: self.height,
            })
        }
    }

    /// Copy all of `src` into `self` with its top-left corner at `(x, y)`.
    pub fn blit(&mut self, src: &PixelBuffer, x: u32, y: u32) -> Result<(), BufferError> {
        self.check_rect(x, y, src.width, src.height)?;

        let src_stride = src.row_stride();
        if src_stride == 0 {
            return Ok(());
        }
        for (row, src_row) in src.data.chunks_exact(src_stride).enumerate() {
            let start = self.index(x, y + row as u32);
            self.data[start..start + src_stride].copy_from_slice(src_row);
        }
        Ok(())
    }

    /// Copy the rectangle at `(x, y)` of the given size into a new buffer.
    pub fn crop(&self, x: u32, y: u32, width: u32, height: u32) -> Result<Self, BufferError> {
        self.check_rect(x, y, width, height)?;

        let mut out = Self::new(width, height);
        let out_stride = out.row_stride();
        if out_stride == 0 {
            return Ok(out);
        }
        for (row, dst_row) in out.data.chunks_exact_mut(out_stride).enumerate() {
            let start = self.index(x, y + row as u32);
            dst_row.copy_from_slice(&self.data[start..start + out_stride]);
        }
        Ok(out)
    }
}

impl From<RgbImage> for PixelBuffer {
    fn from(img: RgbImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            data: img.into_raw(),
        }
    }
}
