use anyhow::Result;

use crate::frame::{Detection, Frame};

use super::background::BackgroundModel;
use super::components::{external_components, SizeBounds};
use super::mask::BinaryMask;

/// Exponential-average weight of the newest frame in the background model.
pub const BACKGROUND_ALPHA: f64 = 0.5;

/// Dilation passes applied to the changed-pixel mask before labeling.
pub const DILATE_ITERATIONS: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DetectorSettings {
    /// Minimum per-pixel intensity change (exclusive) that counts as motion.
    pub min_brightness_change: u8,
    /// Accepted object area in pixels², inclusive on both ends.
    pub size: SizeBounds,
    /// Record a bounding box for each counted object.
    pub want_boxes: bool,
}

/// Background-subtraction motion counter.
///
/// Owns the background model for one video. The first frame only seeds the
/// model; every later frame is compared against the running average.
pub struct MotionDetector {
    settings: DetectorSettings,
    background: Option<BackgroundModel>,
}

impl MotionDetector {
    pub fn new(settings: DetectorSettings) -> Self {
        Self {
            settings,
            background: None,
        }
    }

    pub fn settings(&self) -> &DetectorSettings {
        &self.settings
    }

    pub fn is_seeded(&self) -> bool {
        self.background.is_some()
    }

    /// Count moving objects in `frame`.
    ///
    /// Fails with [`super::DimensionMismatch`] when `frame` does not match the
    /// dimensions the background was seeded with.
    pub fn check(&mut self, frame: &Frame) -> Result<Detection> {
        let Some(background) = self.background.as_mut() else {
            self.background = Some(BackgroundModel::seed(frame));
            return Ok(Detection::empty(self.settings.want_boxes));
        };

        background.accumulate(frame, BACKGROUND_ALPHA)?;
        let diff = background.abs_diff(frame)?;

        let mask = BinaryMask::threshold(
            &diff,
            frame.width(),
            frame.height(),
            self.settings.min_brightness_change,
        )
        .dilate(DILATE_ITERATIONS);

        let survivors: Vec<_> = external_components(&mask)
            .into_iter()
            .filter(|c| self.settings.size.contains(c.area))
            .collect();

        Ok(Detection {
            count: survivors.len(),
            boxes: self
                .settings
                .want_boxes
                .then(|| survivors.iter().map(|c| c.bounds).collect()),
        })
    }
}
