//! Local file frame source.
//!
//! `FileSource` is the decode collaborator of the pipeline. It reads frames
//! sequentially from a local video file (FFmpeg backend) or renders them from
//! a synthetic `stub://` description. It never fetches remote URLs.

use anyhow::{anyhow, Result};

#[cfg(feature = "ingest-file-ffmpeg")]
use super::file_ffmpeg::FfmpegFileSource;
use super::synthetic::{SyntheticDecoder, SyntheticSpec};
use super::{is_stub_path, DecodeStream};
use crate::frame::RawFrame;

/// Local file frame source.
pub struct FileSource {
    path: String,
    backend: FileBackend,
    frames_decoded: u64,
}

enum FileBackend {
    Synthetic(SyntheticDecoder),
    #[cfg(feature = "ingest-file-ffmpeg")]
    Ffmpeg(FfmpegFileSource),
}

impl FileSource {
    pub fn open(path: &str) -> Result<Self> {
        if !is_local_file_path(path) {
            return Err(anyhow!(
                "file ingestion only supports local paths (no URL schemes)"
            ));
        }
        let backend = if is_stub_path(path) {
            FileBackend::Synthetic(SyntheticDecoder::new(SyntheticSpec::parse(path)?))
        } else {
            #[cfg(feature = "ingest-file-ffmpeg")]
            {
                FileBackend::Ffmpeg(FfmpegFileSource::open(path)?)
            }
            #[cfg(not(feature = "ingest-file-ffmpeg"))]
            {
                return Err(anyhow!(
                    "file decoding requires the ingest-file-ffmpeg feature"
                ))
            }
        };
        log::info!("FileSource: opened {}", path);
        Ok(Self {
            path: path.to_string(),
            backend,
            frames_decoded: 0,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }
}

impl DecodeStream for FileSource {
    fn next_frame(&mut self) -> Result<Option<RawFrame>> {
        let frame = match &mut self.backend {
            FileBackend::Synthetic(source) => source.next_frame()?,
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.next_frame()?,
        };
        if frame.is_some() {
            self.frames_decoded += 1;
        }
        Ok(frame)
    }

    fn describe(&self) -> String {
        match &self.backend {
            FileBackend::Synthetic(source) => format!("{} (synthetic)", source.spec().name),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(_) => format!("{} (ffmpeg)", self.path),
        }
    }
}

impl Drop for FileSource {
    fn drop(&mut self) {
        log::debug!(
            "FileSource: released {} after {} frames",
            self.path,
            self.frames_decoded
        );
    }
}

fn is_local_file_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    if is_stub_path(path) {
        return true;
    }
    !path.contains("://")
}
