//! Metadata probing: is this path an analyzable video, and what does it hold?

use anyhow::Result;
use std::path::Path;

#[cfg(feature = "ingest-file-ffmpeg")]
use super::file_ffmpeg::probe_file;
use super::is_stub_path;
use super::synthetic::SyntheticSpec;
use crate::transform::FrameTransform;

/// What the pipeline needs to know about a video before analyzing it.
///
/// `width` and `height` are the dimensions of a *transformed* frame, and are
/// zero for invalid videos.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub name: String,
    pub path: String,
    pub valid: bool,
    pub fps: f64,
    pub frames: u64,
    pub width: u32,
    pub height: u32,
    pub length_secs: f64,
}

impl VideoMetadata {
    fn invalid(name: String, path: &str, fps: f64, frames: u64) -> Self {
        Self {
            name,
            path: path.to_string(),
            valid: false,
            fps,
            frames,
            width: 0,
            height: 0,
            length_secs: 0.0,
        }
    }

    fn from_container(
        name: String,
        path: &str,
        fps: f64,
        frames: u64,
        source_dims: (u32, u32),
        transform: &FrameTransform,
    ) -> Self {
        let (src_w, src_h) = source_dims;
        if fps.is_nan() || fps <= 0.0 || frames == 0 || src_w == 0 || src_h == 0 {
            return Self::invalid(name, path, fps, frames);
        }
        let (width, height) = transform.output_dimensions(src_w, src_h);
        Self {
            name,
            path: path.to_string(),
            valid: true,
            fps,
            frames,
            width,
            height,
            length_secs: frames as f64 / fps,
        }
    }

    /// Decoded frames per analyzed frame: one sampled frame per second of video.
    pub fn sample_interval(&self) -> u32 {
        if self.fps.is_finite() && self.fps >= 1.0 {
            self.fps.round().min(u32::MAX as f64) as u32
        } else {
            1
        }
    }

    /// Transformed frame area in pixels².
    pub fn frame_area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Probe `path`. Unreadable or non-video files are reported as invalid
/// rather than as errors.
pub fn probe(path: &str, extension: &str, transform: &FrameTransform) -> Result<VideoMetadata> {
    if is_stub_path(path) {
        let spec = SyntheticSpec::parse(path)?;
        return Ok(VideoMetadata::from_container(
            spec.name.clone(),
            path,
            spec.fps,
            spec.frames,
            (spec.width, spec.height),
            transform,
        ));
    }

    let file = Path::new(path);
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string());
    let has_extension = file.extension().is_some_and(|ext| ext == extension);
    if !file.exists() || !has_extension {
        return Ok(VideoMetadata::invalid(name, path, 0.0, 0));
    }

    probe_container(name, path, transform)
}

#[cfg(feature = "ingest-file-ffmpeg")]
fn probe_container(name: String, path: &str, transform: &FrameTransform) -> Result<VideoMetadata> {
    match probe_file(path) {
        Ok(info) => Ok(VideoMetadata::from_container(
            name,
            path,
            info.fps,
            info.frames,
            (info.width, info.height),
            transform,
        )),
        Err(err) => {
            log::warn!("probe failed for {}: {:#}", path, err);
            Ok(VideoMetadata::invalid(name, path, 0.0, 0))
        }
    }
}

#[cfg(not(feature = "ingest-file-ffmpeg"))]
fn probe_container(name: String, path: &str, _transform: &FrameTransform) -> Result<VideoMetadata> {
    log::warn!(
        "cannot read {}: built without the ingest-file-ffmpeg feature",
        path
    );
    Ok(VideoMetadata::invalid(name, path, 0.0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_video_reports_transformed_dimensions() {
        let meta = probe(
            "stub://meadow?frames=50&fps=25&width=640&height=480",
            "mp4",
            &FrameTransform::default(),
        )
        .unwrap();
        assert!(meta.valid);
        assert_eq!(meta.name, "meadow");
        assert_eq!((meta.width, meta.height), (300, 225));
        assert_eq!(meta.length_secs, 2.0);
        assert_eq!(meta.sample_interval(), 25);
    }

    #[test]
    fn zero_fps_or_frames_is_invalid() {
        let transform = FrameTransform::default();
        for path in ["stub://a?fps=0", "stub://b?frames=0"] {
            let meta = probe(path, "mp4", &transform).unwrap();
            assert!(!meta.valid, "{path}");
            assert_eq!(meta.frame_area(), 0);
        }
    }

    #[test]
    fn missing_or_foreign_files_are_invalid() {
        let transform = FrameTransform::default();
        let meta = probe("/definitely/not/here.mp4", "mp4", &transform).unwrap();
        assert!(!meta.valid);
        assert_eq!(meta.name, "here.mp4");

        let file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        let meta = probe(file.path().to_str().unwrap(), "mp4", &transform).unwrap();
        assert!(!meta.valid);
    }

    #[test]
    fn extension_match_is_case_sensitive() {
        let file = tempfile::Builder::new().suffix(".MP4").tempfile().unwrap();
        let path = file.path().to_str().unwrap();
        let meta = probe(path, "mp4", &FrameTransform::default()).unwrap();
        assert!(!meta.valid);
        assert_eq!(
            crate::ingest::listing::filter_videos(vec!["CLIP.MP4".to_string()], "mp4"),
            Vec::<String>::new()
        );
    }

    #[test]
    fn fractional_rates_round_to_an_interval() {
        let transform = FrameTransform::default();
        let meta = probe("stub://c?fps=29.97", "mp4", &transform).unwrap();
        assert_eq!(meta.sample_interval(), 30);
        let meta = probe("stub://d?fps=0.5", "mp4", &transform).unwrap();
        assert_eq!(meta.sample_interval(), 1);
    }
}
