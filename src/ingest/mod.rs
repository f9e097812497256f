//! Video ingestion: decoding, metadata probing and folder enumeration.
//!
//! - `FileSource`: decodes a local video file (feature: ingest-file-ffmpeg)
//!   or a synthetic `stub://` scene into `RawFrame`s.
//! - `probe`: decides whether a path is an analyzable video and reports its
//!   frame rate, frame count and transformed dimensions.
//! - `list_videos`: turns a folder or file argument into a sorted list of
//!   candidate videos.
//!
//! The pipeline only sees the `DecodeStream` trait, so anything that can hand
//! over decoded frames one at a time can feed it.

use anyhow::Result;

use crate::frame::RawFrame;

pub mod file;
#[cfg(feature = "ingest-file-ffmpeg")]
pub(crate) mod file_ffmpeg;
pub mod listing;
pub mod probe;
mod synthetic;

pub use file::FileSource;
pub use listing::{list_videos, VideoList};
pub use probe::{probe, VideoMetadata};

/// Sequential source of decoded color frames.
///
/// Dropping the stream releases the underlying decode handle.
pub trait DecodeStream: Send {
    /// Next decoded frame, or `None` once the stream is exhausted.
    fn next_frame(&mut self) -> Result<Option<RawFrame>>;

    /// Short label for logs.
    fn describe(&self) -> String;
}

impl<D: DecodeStream + ?Sized> DecodeStream for Box<D> {
    fn next_frame(&mut self) -> Result<Option<RawFrame>> {
        (**self).next_frame()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

pub(crate) fn is_stub_path(path: &str) -> bool {
    path.starts_with(synthetic::STUB_SCHEME)
}
