//! Frame types that flow through the counting pipeline.
//!
//! - `RawFrame`: packed RGB24 pixels as produced by the decode collaborator.
//! - `Frame`: transformed single-channel intensity frame with a sequence index.
//! - `Detection` / `BoundingBox`: what the motion detector reports per frame.
//!
//! A `Frame` is owned by exactly one pipeline stage at a time (producer while
//! transforming, queue while buffered, consumer while detecting). It is not
//! `Clone` and its pixels cannot be mutated after construction:
//!
//! ```compile_fail
//! use insect_counter::Frame;
//!
//! let frame = Frame::new(vec![0u8; 4], 2, 2, 1).unwrap();
//! let _copy = frame.clone();
//! ```
//!
//! ```compile_fail
//! use insect_counter::Frame;
//!
//! let frame = Frame::new(vec![0u8; 4], 2, 2, 1).unwrap();
//! frame.pixels[0] = 255;
//! ```

use anyhow::{anyhow, Result};
use image::{GrayImage, RgbImage};

// ----------------------------------------------------------------------------
// RawFrame: decoder output
// ----------------------------------------------------------------------------

/// A decoded color frame, packed RGB24, row-major, no stride padding.
pub struct RawFrame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl RawFrame {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = checked_len(width, height, 3)?;
        if data.len() != expected {
            return Err(anyhow!(
                "RGB frame length mismatch: expected {}, got {}",
                expected,
                data.len()
            ));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn into_rgb_image(self) -> Result<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.data)
            .ok_or_else(|| anyhow!("RGB buffer does not match frame dimensions"))
    }
}

// ----------------------------------------------------------------------------
// Frame: transformed, single-channel
// ----------------------------------------------------------------------------

/// A transformed 8-bit intensity frame.
///
/// `index` is the decode-order number of the source frame it was built from
/// and increases monotonically within one video.
pub struct Frame {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    index: u64,
}

impl Frame {
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, index: u64) -> Result<Self> {
        let expected = checked_len(width, height, 1)?;
        if pixels.len() != expected {
            return Err(anyhow!(
                "intensity frame length mismatch: expected {}, got {}",
                expected,
                pixels.len()
            ));
        }
        Ok(Self {
            pixels,
            width,
            height,
            index,
        })
    }

    pub(crate) fn from_gray_image(image: GrayImage, index: u64) -> Result<Self> {
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height, index)
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

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Copy of the pixels as an image, for rendering only.
    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_raw(self.width, self.height, self.pixels.clone())
            .unwrap_or_else(|| GrayImage::new(self.width, self.height))
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

fn checked_len(width: u32, height: u32, channels: u32) -> Result<usize> {
    if width == 0 || height == 0 {
        return Err(anyhow!("frame dimensions must be non-zero"));
    }
    width
        .checked_mul(height)
        .and_then(|v| v.checked_mul(channels))
        .map(|v| v as usize)
        .ok_or_else(|| anyhow!("frame dimensions overflow"))
}

// ----------------------------------------------------------------------------
// Detection results
// ----------------------------------------------------------------------------

/// Axis-aligned bounding rectangle in frame pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Result of checking one frame for motion.
///
/// `boxes` is `Some` only when boxes were requested, and then holds exactly
/// `count` entries.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Detection {
    pub count: usize,
    pub boxes: Option<Vec<BoundingBox>>,
}

impl Detection {
    pub(crate) fn empty(want_boxes: bool) -> Self {
        Self {
            count: 0,
            boxes: want_boxes.then(Vec::new),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
