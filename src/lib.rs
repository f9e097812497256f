//! Insect Counter
//!
//! Counts moving, insect-sized objects in each sampled frame of field-camera
//! videos.
//!
//! # Architecture
//!
//! Each video is analyzed by an isolated two-thread pipeline:
//!
//! 1. **Producer** (`source`): decodes every frame, keeps one per sampling
//!    interval, resizes, converts to intensity, blurs, and pushes it.
//! 2. **Queue** (`queue`): bounded FIFO with blocking backpressure.
//! 3. **Consumer** (`pipeline`): pops frames in order, runs the background
//!    subtraction detector (`detect`), and emits one record per frame.
//!
//! # Module Structure
//!
//! - `frame`: RawFrame, Frame, Detection, BoundingBox
//! - `ingest`: decode collaborator (`FileSource`), metadata probe, folder listing
//! - `config`: batch settings from options file and environment
//! - `analysis`: per-video driver used by the `count_insects` binary
//! - `sink`, `render`: CSV output and annotated PNG frames

pub mod analysis;
pub mod config;
pub mod detect;
pub mod frame;
pub mod ingest;
pub mod pipeline;
pub mod queue;
pub mod render;
pub mod sink;
pub mod source;
pub mod transform;

pub use analysis::{Analyzer, VideoOutcome};
pub use config::{area_fraction_to_pixels, CounterSettings};
pub use detect::{DetectorSettings, DimensionMismatch, MotionDetector, SizeBounds};
pub use frame::{BoundingBox, Detection, Frame, RawFrame};
pub use ingest::{list_videos, probe, DecodeStream, FileSource, VideoList, VideoMetadata};
pub use pipeline::{
    FrameCount, Orchestrator, PipelineConfig, PipelineControl, ResultSink, RunSummary,
    Visualizer, VisualizerAction,
};
pub use queue::{ChannelState, FrameQueue, Pop, StopFlag, DEFAULT_QUEUE_CAPACITY};
pub use render::AnnotatedFrameWriter;
pub use sink::{CsvResultSink, MemorySink, VideoInfoLog};
pub use source::{FrameSource, SourceHandle, SourceStats};
pub use transform::FrameTransform;
