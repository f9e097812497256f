//! Motion detection: background model, changed-pixel mask, component labeling.

mod background;
mod components;
mod mask;
mod motion;

pub use background::BackgroundModel;
pub use components::{external_components, Component, SizeBounds};
pub use mask::BinaryMask;
pub use motion::{DetectorSettings, MotionDetector, BACKGROUND_ALPHA, DILATE_ITERATIONS};

/// A frame's dimensions differ from the background model it was fed to.
///
/// Fatal for the current video's analysis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DimensionMismatch {
    pub expected: (u32, u32),
    pub actual: (u32, u32),
}

impl std::fmt::Display for DimensionMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "frame is {}x{} but the background model is {}x{}",
            self.actual.0, self.actual.1, self.expected.0, self.expected.1
        )
    }
}
impl std::error::Error for DimensionMismatch {}
