//! PNG rendering of analyzed frames with their counted objects boxed in green.

use anyhow::{Context, Result};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};

use crate::frame::{BoundingBox, Frame};
use crate::pipeline::{Visualizer, VisualizerAction};

const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// Writes `{dir}/{stem}_{frame_index:06}.png` for every frame it is shown.
///
/// With a frame limit set, asks the pipeline to stop once that many frames
/// have been written.
pub struct AnnotatedFrameWriter {
    dir: PathBuf,
    stem: String,
    frame_limit: Option<u64>,
    written: u64,
}

impl AnnotatedFrameWriter {
    pub fn new(dir: impl Into<PathBuf>, video_name: &str) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("create annotation directory {}", dir.display()))?;
        let stem = Path::new(video_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| video_name.to_string());
        Ok(Self {
            dir,
            stem,
            frame_limit: None,
            written: 0,
        })
    }

    pub fn with_frame_limit(mut self, limit: u64) -> Self {
        self.frame_limit = Some(limit);
        self
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    fn path_for(&self, frame: &Frame) -> PathBuf {
        self.dir
            .join(format!("{}_{:06}.png", self.stem, frame.index()))
    }
}

/// Gray frame as RGB with each box outlined.
pub fn annotate(frame: &Frame, boxes: &[BoundingBox]) -> RgbImage {
    let mut image = DynamicImage::ImageLuma8(frame.to_gray_image()).to_rgb8();
    for b in boxes {
        let rect = Rect::at(b.x as i32, b.y as i32).of_size(b.width.max(1), b.height.max(1));
        draw_hollow_rect_mut(&mut image, rect, BOX_COLOR);
    }
    image
}

impl Visualizer for AnnotatedFrameWriter {
    fn show(&mut self, frame: &Frame, boxes: &[BoundingBox]) -> Result<VisualizerAction> {
        let path = self.path_for(frame);
        annotate(frame, boxes)
            .save(&path)
            .with_context(|| format!("write {}", path.display()))?;
        self.written += 1;
        log::debug!("render: {} ({} boxes)", path.display(), boxes.len());

        match self.frame_limit {
            Some(limit) if self.written >= limit => Ok(VisualizerAction::Stop),
            _ => Ok(VisualizerAction::Continue),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outlines_boxes_in_green() {
        let frame = Frame::new(vec![50u8; 16 * 12], 16, 12, 4).unwrap();
        let image = annotate(
            &frame,
            &[BoundingBox {
                x: 2,
                y: 3,
                width: 5,
                height: 4,
            }],
        );
        assert_eq!(image.get_pixel(2, 3), &BOX_COLOR);
        assert_eq!(image.get_pixel(6, 6), &BOX_COLOR);
        assert_eq!(image.get_pixel(4, 4), &Rgb([50, 50, 50]));
    }

    #[test]
    fn writes_numbered_pngs_and_honours_limit() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = AnnotatedFrameWriter::new(dir.path().join("annotated"), "meadow.mp4")
            .unwrap()
            .with_frame_limit(2);
        let first = Frame::new(vec![0u8; 8 * 8], 8, 8, 10).unwrap();
        let second = Frame::new(vec![0u8; 8 * 8], 8, 8, 20).unwrap();

        assert_eq!(writer.show(&first, &[]).unwrap(), VisualizerAction::Continue);
        assert_eq!(writer.show(&second, &[]).unwrap(), VisualizerAction::Stop);
        assert!(dir.path().join("annotated/meadow_000010.png").exists());
        assert!(dir.path().join("annotated/meadow_000020.png").exists());
        assert_eq!(writer.written(), 2);
    }
}
