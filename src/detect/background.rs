use crate::frame::Frame;

use super::DimensionMismatch;

/// Running floating-point estimate of the static scene.
///
/// Created from the first frame of a video and updated in place by every
/// later frame. Its dimensions never change.
pub struct BackgroundModel {
    accumulator: Vec<f64>,
    width: u32,
    height: u32,
}

impl BackgroundModel {
    pub fn seed(frame: &Frame) -> Self {
        Self {
            accumulator: frame.pixels().iter().map(|&p| p as f64).collect(),
            width: frame.width(),
            height: frame.height(),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn ensure_matches(&self, frame: &Frame) -> Result<(), DimensionMismatch> {
        if frame.dimensions() != self.dimensions() {
            return Err(DimensionMismatch {
                expected: self.dimensions(),
                actual: frame.dimensions(),
            });
        }
        Ok(())
    }

    /// `acc = acc * (1 - alpha) + frame * alpha`, pixel-wise.
    pub fn accumulate(&mut self, frame: &Frame, alpha: f64) -> Result<(), DimensionMismatch> {
        self.ensure_matches(frame)?;
        for (acc, &p) in self.accumulator.iter_mut().zip(frame.pixels()) {
            *acc = *acc * (1.0 - alpha) + p as f64 * alpha;
        }
        Ok(())
    }

    /// Absolute difference between `frame` and the background rounded to
    /// 8-bit intensity (saturating, ties to even).
    pub fn abs_diff(&self, frame: &Frame) -> Result<Vec<u8>, DimensionMismatch> {
        self.ensure_matches(frame)?;
        Ok(self
            .accumulator
            .iter()
            .zip(frame.pixels())
            .map(|(&acc, &p)| p.abs_diff(acc.round_ties_even().clamp(0.0, 255.0) as u8))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(values: &[u8], width: u32, height: u32) -> Frame {
        Frame::new(values.to_vec(), width, height, 1).unwrap()
    }

    #[test]
    fn seed_then_accumulate_moves_halfway() {
        let mut model = BackgroundModel::seed(&frame(&[0, 100, 200, 50], 2, 2));
        let next = frame(&[100, 100, 0, 51], 2, 2);
        model.accumulate(&next, 0.5).unwrap();
        assert_eq!(model.accumulator, vec![50.0, 100.0, 100.0, 50.5]);
        // 50.5 rounds to 50
        assert_eq!(model.abs_diff(&next).unwrap(), vec![50, 0, 100, 1]);
    }

    #[test]
    fn half_values_round_to_even() {
        let mut model = BackgroundModel::seed(&frame(&[0, 0, 0, 0], 2, 2));
        let next = frame(&[21, 23, 1, 3], 2, 2);
        model.accumulate(&next, 0.5).unwrap();
        // 10.5 -> 10, 11.5 -> 12, 0.5 -> 0, 1.5 -> 2
        assert_eq!(model.abs_diff(&next).unwrap(), vec![11, 11, 1, 1]);
    }

    #[test]
    fn mismatched_dimensions_are_reported() {
        let mut model = BackgroundModel::seed(&frame(&[0; 6], 3, 2));
        let err = model.accumulate(&frame(&[0; 6], 2, 3), 0.5).unwrap_err();
        assert_eq!(err.expected, (3, 2));
        assert_eq!(err.actual, (2, 3));
    }
}
