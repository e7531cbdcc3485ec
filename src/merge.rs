//! Stitching rescaled tiles back into one image.
//!
//! A grid is merged in two passes: each row's tiles side by side
//! ([`Direction::Horizontal`]), then the resulting row strips top to bottom
//! ([`Direction::Vertical`]). Buffers are placed edge to edge in the order
//! given, with no padding logic: where a buffer is shorter (or narrower)
//! than the largest one in the sequence, the gap stays black.

use crate::imaging::{BufferError, PixelBuffer};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MergeError {
    #[error("nothing to merge")]
    Empty,
    #[error("merged size exceeds {max}px along one axis")]
    TooLarge { max: u32 },
    #[error(transparent)]
    Buffer(#[from] BufferError),
}

/// Axis along which buffers are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Left to right; the result is as tall as the tallest buffer.
    Horizontal,
    /// Top to bottom; the result is as wide as the widest buffer.
    Vertical,
}

/// Σwidth, Σheight, max width, max height, gathered in one pass.
#[derive(Debug, Default)]
struct Extent {
    total_width: u64,
    total_height: u64,
    max_width: u32,
    max_height: u32,
}

fn extent(buffers: &[PixelBuffer]) -> Extent {
    buffers.iter().fold(Extent::default(), |acc, b| Extent {
        total_width: acc.total_width + b.width() as u64,
        total_height: acc.total_height + b.height() as u64,
        max_width: acc.max_width.max(b.width()),
        max_height: acc.max_height.max(b.height()),
    })
}

fn to_u32(value: u64) -> Result<u32, MergeError> {
    u32::try_from(value).map_err(|_| MergeError::TooLarge { max: u32::MAX })
}

/// Lay `buffers` out along `direction` into one new buffer.
///
/// Inputs are consumed; each is dropped as soon as it has been copied.
pub fn merge(direction: Direction, buffers: Vec<PixelBuffer>) -> Result<PixelBuffer, MergeError> {
    if buffers.is_empty() {
        return Err(MergeError::Empty);
    }

    let ext = extent(&buffers);
    let (width, height) = match direction {
        Direction::Horizontal => (to_u32(ext.total_width)?, ext.max_height),
        Direction::Vertical => (ext.max_width, to_u32(ext.total_height)?),
    };

    let mut dest = PixelBuffer::new(width, height);
    let mut offset = 0u32;
    for buffer in buffers {
        match direction {
            Direction::Horizontal => {
                dest.blit(&buffer, offset, 0)?;
                offset += buffer.width();
            }
            Direction::Vertical => {
                dest.blit(&buffer, 0, offset)?;
                offset += buffer.height();
            }
        }
    }
    Ok(dest)
}

/// Merge each row horizontally, then all rows vertically.
///
/// `rows` must be in grid order: top row first, each row left to right.
pub fn merge_grid(rows: Vec<Vec<PixelBuffer>>) -> Result<PixelBuffer, MergeError> {
    let strips = rows
        .into_iter()
        .map(|row| merge(Direction::Horizontal, row))
        .collect::<Result<Vec<_>, _>>()?;
    merge(Direction::Vertical, strips)
}
