//! Per-video driver: probe, log, convert bounds, run the pipeline.

use anyhow::{Context, Result};

use crate::config::CounterSettings;
use crate::ingest::{probe, FileSource, VideoMetadata};
use crate::pipeline::{
    Orchestrator, PipelineConfig, PipelineControl, ResultSink, RunSummary, Visualizer,
};
use crate::render::AnnotatedFrameWriter;
use crate::sink::VideoInfoLog;
use crate::transform::FrameTransform;

#[derive(Clone, Debug, PartialEq)]
pub enum VideoOutcome {
    /// Probed invalid: no frames were decoded and no records written.
    Skipped(VideoMetadata),
    Analyzed {
        meta: VideoMetadata,
        summary: RunSummary,
    },
}

impl VideoOutcome {
    pub fn metadata(&self) -> &VideoMetadata {
        match self {
            Self::Skipped(meta) | Self::Analyzed { meta, .. } => meta,
        }
    }

    pub fn stopped_early(&self) -> bool {
        matches!(self, Self::Analyzed { summary, .. } if summary.stopped_early)
    }
}

pub struct Analyzer {
    settings: CounterSettings,
    transform: FrameTransform,
}

impl Analyzer {
    pub fn new(settings: CounterSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            transform: FrameTransform::default(),
        })
    }

    pub fn with_transform(mut self, transform: FrameTransform) -> Self {
        self.transform = transform;
        self
    }

    pub fn settings(&self) -> &CounterSettings {
        &self.settings
    }

    /// Absolute pipeline parameters for a valid video.
    pub fn pipeline_config(&self, meta: &VideoMetadata) -> PipelineConfig {
        let (min_size, max_size) = self.settings.size_bounds(meta.width, meta.height);
        PipelineConfig {
            min_brightness_change: self.settings.min_brightness,
            min_size,
            max_size,
            sample_interval: meta.sample_interval(),
            queue_capacity: self.settings.queue_capacity,
            want_boxes: self.settings.annotate_dir.is_some(),
        }
    }

    /// Analyze one video.
    ///
    /// The info row is appended before the validity check. `on_start` receives
    /// the stop handle once the producer is running.
    pub fn analyze(
        &self,
        path: &str,
        info_log: Option<&mut VideoInfoLog>,
        sink: &mut dyn ResultSink,
        on_start: &mut dyn FnMut(PipelineControl),
    ) -> Result<VideoOutcome> {
        let meta = probe(path, self.settings.extension(), &self.transform)
            .with_context(|| format!("probe {}", path))?;
        if let Some(log) = info_log {
            log.append(&meta)?;
        }
        if !meta.valid {
            log::warn!("skipping {}: not a readable video", meta.name);
            return Ok(VideoOutcome::Skipped(meta));
        }
        log::info!(
            "{}: {:.2} fps, {} frames, {:.1}s",
            meta.name,
            meta.fps,
            meta.frames,
            meta.length_secs
        );

        let config = self.pipeline_config(&meta);
        let mut writer = match &self.settings.annotate_dir {
            Some(dir) => Some(AnnotatedFrameWriter::new(dir, &meta.name)?),
            None => None,
        };

        let stream = FileSource::open(path)?;
        let mut orchestrator =
            Orchestrator::start(meta.name.clone(), stream, &config, self.transform)?;
        on_start(orchestrator.control());
        let summary = orchestrator.run(sink, writer.as_mut().map(|w| w as &mut dyn Visualizer))?;
        Ok(VideoOutcome::Analyzed { meta, summary })
    }
}
