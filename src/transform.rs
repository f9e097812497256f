//! Per-frame preprocessing applied to sampled frames before detection.
//!
//! Resize to a fixed width (aspect ratio preserved), convert to intensity,
//! then smooth with a Gaussian blur so sensor noise does not read as motion.

use anyhow::{anyhow, Result};
use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, RgbImage};

use crate::frame::{Frame, RawFrame};

pub const TARGET_WIDTH: u32 = 300;

/// Sigma of a 21x21 Gaussian kernel with automatic sigma
/// (`0.3 * ((21 - 1) * 0.5 - 1) + 0.8`).
pub const BLUR_SIGMA: f32 = 3.5;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameTransform {
    target_width: Option<u32>,
    blur_sigma: Option<f32>,
}

impl Default for FrameTransform {
    fn default() -> Self {
        Self {
            target_width: Some(TARGET_WIDTH),
            blur_sigma: Some(BLUR_SIGMA),
        }
    }
}

impl FrameTransform {
    pub fn new(target_width: Option<u32>, blur_sigma: Option<f32>) -> Result<Self> {
        if target_width == Some(0) {
            return Err(anyhow!("target width must be greater than zero"));
        }
        if blur_sigma.is_some_and(|sigma| sigma.is_nan() || sigma <= 0.0) {
            return Err(anyhow!("blur sigma must be positive"));
        }
        Ok(Self {
            target_width,
            blur_sigma,
        })
    }

    /// Intensity conversion only, no resize and no blur.
    pub fn grayscale_only() -> Self {
        Self {
            target_width: None,
            blur_sigma: None,
        }
    }

    /// Dimensions a source frame of `width` x `height` has after `apply`.
    pub fn output_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        match self.target_width {
            Some(target) if width > 0 => {
                let scaled = (height as f64 * target as f64 / width as f64) as u32;
                (target, scaled.max(1))
            }
            _ => (width, height),
        }
    }

    pub fn apply(&self, raw: RawFrame, index: u64) -> Result<Frame> {
        let (width, height) = self.output_dimensions(raw.width, raw.height);
        let mut rgb = raw.into_rgb_image()?;
        if rgb.dimensions() != (width, height) {
            rgb = imageops::resize(&rgb, width, height, FilterType::Triangle);
        }
        let mut gray = luma_bt601(&rgb);
        if let Some(sigma) = self.blur_sigma {
            gray = imageops::blur(&gray, sigma);
        }
        Frame::from_gray_image(gray, index)
    }
}

/// BT.601 luma in 14-bit fixed point, rounded: `0.299 R + 0.587 G + 0.114 B`.
fn luma_bt601(rgb: &RgbImage) -> GrayImage {
    const R: u32 = 4899;
    const G: u32 = 9617;
    const B: u32 = 1868;
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        let luma = (u32::from(r) * R + u32::from(g) * G + u32::from(b) * B + (1 << 13)) >> 14;
        Luma([luma as u8])
    })
}
