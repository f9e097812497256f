//! Consumer side: the orchestrator that drives one video's analysis.
//!
//! ```text
//! FrameSource (thread) -> FrameQueue -> Orchestrator -> MotionDetector
//!                                              |-> ResultSink
//!                                              `-> Visualizer (optional)
//! ```
//!
//! Records are emitted in queue order from a single thread. `PipelineControl`
//! can be cloned out of the orchestrator and used from anywhere (a Ctrl-C
//! handler, a visualizer) to stop the run.

use anyhow::{anyhow, Result};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::detect::{DetectorSettings, MotionDetector, SizeBounds};
use crate::frame::{BoundingBox, Frame};
use crate::ingest::DecodeStream;
use crate::queue::{FrameQueue, Pop, StopFlag, DEFAULT_QUEUE_CAPACITY};
use crate::source::{FrameSource, SourceHandle};
use crate::transform::FrameTransform;

// ----------------------------------------------------------------------------
// Configuration
// ----------------------------------------------------------------------------

/// Absolute parameters of one pipeline run. Area bounds are in pixels² of the
/// transformed frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineConfig {
    pub min_brightness_change: u8,
    pub min_size: u64,
    pub max_size: u64,
    pub sample_interval: u32,
    pub queue_capacity: usize,
    pub want_boxes: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_brightness_change: 10,
            min_size: 0,
            max_size: u64::MAX,
            sample_interval: 1,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            want_boxes: false,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_size > self.max_size {
            return Err(anyhow!(
                "min_size ({}) must not exceed max_size ({})",
                self.min_size,
                self.max_size
            ));
        }
        if self.sample_interval == 0 {
            return Err(anyhow!("sample_interval must be at least 1"));
        }
        if self.queue_capacity == 0 {
            return Err(anyhow!("queue_capacity must be greater than zero"));
        }
        Ok(())
    }

    pub fn detector_settings(&self) -> DetectorSettings {
        DetectorSettings {
            min_brightness_change: self.min_brightness_change,
            size: SizeBounds {
                min: self.min_size,
                max: self.max_size,
            },
            want_boxes: self.want_boxes,
        }
    }
}

// ----------------------------------------------------------------------------
// Collaborators
// ----------------------------------------------------------------------------

/// One per-frame result row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameCount {
    pub video: String,
    pub frame_index: u64,
    pub count: usize,
}

pub trait ResultSink {
    fn record(&mut self, record: &FrameCount) -> Result<()>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VisualizerAction {
    Continue,
    Stop,
}

/// Receives every analyzed frame with the boxes of its counted objects.
pub trait Visualizer {
    fn show(&mut self, frame: &Frame, boxes: &[BoundingBox]) -> Result<VisualizerAction>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames_analyzed: u64,
    pub objects_counted: u64,
    pub stopped_early: bool,
}

// ----------------------------------------------------------------------------
// PipelineControl
// ----------------------------------------------------------------------------

struct ControlInner {
    stop: StopFlag,
    queue: Arc<FrameQueue>,
    producer: Mutex<Option<SourceHandle>>,
    // Held while a record is emitted; stop() takes it to set the flag.
    emit_gate: Mutex<()>,
}

/// Cloneable stop handle for a running pipeline.
#[derive(Clone)]
pub struct PipelineControl {
    inner: Arc<ControlInner>,
}

impl PipelineControl {
    /// Stop the pipeline. Returns once the producer thread has exited and
    /// released its decode handle. No record is emitted after this returns.
    /// Idempotent.
    pub fn stop(&self) -> Result<()> {
        {
            let _gate = lock(&self.inner.emit_gate);
            if !self.inner.stop.is_requested() && self.is_running() {
                log::info!("pipeline: stop requested");
            }
            self.inner.stop.request();
        }
        self.inner.queue.close();
        self.join_producer()
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stop.is_requested()
    }

    /// True until the producer thread has been joined.
    pub fn is_running(&self) -> bool {
        lock(&self.inner.producer).is_some()
    }

    // The slot stays locked during the join so a concurrent caller returns
    // only after the producer has exited.
    fn join_producer(&self) -> Result<()> {
        let mut slot = lock(&self.inner.producer);
        if let Some(handle) = slot.take() {
            let label = handle.label().to_string();
            let stats = handle.join()?;
            log::debug!(
                "pipeline: producer {} joined ({} read, {} sampled)",
                label,
                stats.frames_read,
                stats.frames_sampled
            );
        }
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ----------------------------------------------------------------------------
// Orchestrator
// ----------------------------------------------------------------------------

pub struct Orchestrator {
    video: String,
    detector: MotionDetector,
    control: PipelineControl,
}

impl Orchestrator {
    /// Validate `config`, build the queue, and start the producer thread on
    /// `stream`.
    pub fn start<D: DecodeStream + 'static>(
        video: impl Into<String>,
        stream: D,
        config: &PipelineConfig,
        transform: FrameTransform,
    ) -> Result<Self> {
        config.validate()?;
        let video = video.into();
        let queue = Arc::new(FrameQueue::new(config.queue_capacity)?);
        let stop = StopFlag::new();
        let producer = FrameSource::new(
            stream,
            queue.clone(),
            stop.clone(),
            config.sample_interval,
            transform,
        )?
        .spawn()?;
        log::debug!(
            "pipeline: started {} (interval {}, capacity {})",
            video,
            config.sample_interval,
            config.queue_capacity
        );

        Ok(Self {
            video,
            detector: MotionDetector::new(config.detector_settings()),
            control: PipelineControl {
                inner: Arc::new(ControlInner {
                    stop,
                    queue,
                    producer: Mutex::new(Some(producer)),
                    emit_gate: Mutex::new(()),
                }),
            },
        })
    }

    pub fn video(&self) -> &str {
        &self.video
    }

    pub fn control(&self) -> PipelineControl {
        self.control.clone()
    }

    pub fn stop(&self) -> Result<()> {
        self.control.stop()
    }

    /// Consume frames until the stream ends or the pipeline is stopped.
    ///
    /// A detector failure stops the producer and is returned. A producer
    /// failure is returned once the queue has drained.
    pub fn run(
        &mut self,
        sink: &mut dyn ResultSink,
        mut visualizer: Option<&mut dyn Visualizer>,
    ) -> Result<RunSummary> {
        match self.consume(sink, &mut visualizer) {
            Ok(summary) => {
                self.control.join_producer()?;
                log::info!(
                    "pipeline: {} analyzed {} frames, counted {} objects{}",
                    self.video,
                    summary.frames_analyzed,
                    summary.objects_counted,
                    if summary.stopped_early { " (stopped)" } else { "" }
                );
                Ok(summary)
            }
            Err(err) => {
                if let Err(stop_err) = self.control.stop() {
                    log::warn!("pipeline: stopping after failure: {:#}", stop_err);
                }
                Err(err)
            }
        }
    }

    fn consume(
        &mut self,
        sink: &mut dyn ResultSink,
        visualizer: &mut Option<&mut dyn Visualizer>,
    ) -> Result<RunSummary> {
        let inner = self.control.inner.clone();
        let mut summary = RunSummary::default();

        loop {
            if inner.stop.is_requested() {
                summary.stopped_early = true;
                break;
            }
            let frame = match inner.queue.pop() {
                Pop::Frame(frame) => frame,
                Pop::EndOfStream => {
                    summary.stopped_early = inner.stop.is_requested();
                    break;
                }
            };
            let frame_index = summary.frames_analyzed + 1;
            let detection = self.detector.check(&frame)?;

            let gate = lock(&inner.emit_gate);
            if inner.stop.is_requested() {
                summary.stopped_early = true;
                break;
            }
            summary.frames_analyzed = frame_index;
            summary.objects_counted += detection.count as u64;
            sink.record(&FrameCount {
                video: self.video.clone(),
                frame_index,
                count: detection.count,
            })?;
            let action = match visualizer.as_deref_mut() {
                Some(viz) => viz.show(&frame, detection.boxes.as_deref().unwrap_or(&[]))?,
                None => VisualizerAction::Continue,
            };
            drop(gate);

            if action == VisualizerAction::Stop {
                log::info!("pipeline: visualizer asked to stop {}", self.video);
                self.control.stop()?;
                summary.stopped_early = true;
                break;
            }
        }
        Ok(summary)
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        if !self.control.is_running() {
            return;
        }
        if let Err(err) = self.control.stop() {
            log::warn!("pipeline: {} shut down with error: {:#}", self.video, err);
        }
    }
}
