//! count_insects - count moving insects in every video of a folder
//!
//! For each candidate video:
//! 1. Probe it and append a row to the video info file
//! 2. Skip it if it is not a readable video
//! 3. Otherwise run the producer/consumer pipeline and append one
//!    `video,frame,count` row per sampled frame to the result file
//!
//! Videos are analyzed one at a time. Ctrl-C stops the current video and
//! ends the batch.

use anyhow::{anyhow, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use insect_counter::config::DEFAULT_ANNOTATE_DIR;
use insect_counter::{
    list_videos, Analyzer, CounterSettings, CsvResultSink, PipelineControl, StopFlag,
    VideoInfoLog, VideoOutcome,
};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(
    name = "count_insects",
    about = "Count moving insects per sampled frame of field-camera videos"
)]
struct Args {
    /// Options file (TOML, or JSON with a .json extension)
    #[arg(long, env = "COUNTER_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Folder of videos, or a single video file
    #[arg(short = 'f', long = "folderpath", value_name = "PATH")]
    folder: Option<PathBuf>,

    /// Minimum per-pixel brightness change that counts as motion
    #[arg(short = 'b', long)]
    min_brightness: Option<u8>,

    /// Minimum object area, in millionths of the frame
    #[arg(short = 's', long)]
    min_size: Option<u64>,

    /// Maximum object area, in millionths of the frame
    #[arg(short = 'S', long)]
    max_size: Option<u64>,

    /// Write every analyzed frame with its boxes as PNG
    #[arg(short = 'w', long)]
    window: bool,

    /// Directory for annotated frames (implies --window)
    #[arg(long, value_name = "DIR")]
    annotate_dir: Option<PathBuf>,

    /// Per-frame counts output
    #[arg(long, value_name = "PATH")]
    result_file: Option<PathBuf>,

    /// Per-video metadata output
    #[arg(long, value_name = "PATH")]
    video_info_file: Option<PathBuf>,

    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

impl Args {
    fn apply(self, settings: &mut CounterSettings) {
        if let Some(folder) = self.folder {
            settings.folder = Some(folder);
        }
        if let Some(value) = self.min_brightness {
            settings.min_brightness = value;
        }
        if let Some(value) = self.min_size {
            settings.min_size = value;
        }
        if let Some(value) = self.max_size {
            settings.max_size = value;
        }
        if let Some(path) = self.result_file {
            settings.result_file = path;
        }
        if let Some(path) = self.video_info_file {
            settings.video_info_file = path;
        }
        if let Some(dir) = self.annotate_dir {
            settings.annotate_dir = Some(dir);
        } else if self.window && settings.annotate_dir.is_none() {
            settings.annotate_dir = Some(PathBuf::from(DEFAULT_ANNOTATE_DIR));
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let ui = ui::Ui::from_args(Some(&args.ui), std::io::stderr().is_terminal());

    let mut settings = CounterSettings::load(args.config.as_deref())?;
    args.apply(&mut settings);
    settings.validate()?;

    let folder = settings
        .folder
        .clone()
        .ok_or_else(|| anyhow!("no video folder given (use --folderpath or COUNTER_FOLDER)"))?;
    let videos = list_videos(&folder, settings.extension())?;
    if videos.is_empty() {
        log::warn!(
            "no .{} videos found in {}",
            settings.extension(),
            folder.display()
        );
        return Ok(());
    }
    log::info!(
        "{} videos in {}, results to {}",
        videos.len(),
        videos.folder.display(),
        settings.result_file.display()
    );

    let mut sink = CsvResultSink::open(&settings.result_file)?;
    let mut info_log = VideoInfoLog::open(&settings.video_info_file)?;

    let batch_stop = StopFlag::new();
    let current: Arc<Mutex<Option<PipelineControl>>> = Arc::new(Mutex::new(None));
    {
        let batch_stop = batch_stop.clone();
        let current = current.clone();
        ctrlc::set_handler(move || {
            batch_stop.request();
            let control = lock_control(&current).clone();
            if let Some(control) = control {
                if let Err(err) = control.stop() {
                    log::error!("stopping pipeline: {:#}", err);
                }
            }
        })
        .map_err(|e| anyhow!("error setting Ctrl-C handler: {}", e))?;
    }

    let analyzer = Analyzer::new(settings)?;
    let total = videos.len();
    let mut analyzed = 0usize;
    let mut failed = 0usize;

    for (i, path) in videos.paths().enumerate() {
        if batch_stop.is_requested() {
            log::info!("batch interrupted before video {}/{}", i + 1, total);
            break;
        }
        let path = path.to_string_lossy().into_owned();
        let name = videos.files.get(i).map(String::as_str).unwrap_or(&path);
        let mut stage = ui.video(i + 1, total, name);

        let outcome = analyzer.analyze(&path, Some(&mut info_log), &mut sink, &mut |control| {
            *lock_control(&current) = Some(control.clone());
            // Ctrl-C may have arrived while the pipeline was starting.
            if batch_stop.is_requested() {
                if let Err(err) = control.stop() {
                    log::error!("stopping pipeline: {:#}", err);
                }
            }
        });
        lock_control(&current).take();

        match outcome {
            Ok(VideoOutcome::Analyzed { summary, .. }) => {
                analyzed += 1;
                stage.set_detail(format!(
                    "{} frames, {} insects{}",
                    summary.frames_analyzed,
                    summary.objects_counted,
                    if summary.stopped_early { ", stopped" } else { "" }
                ));
            }
            Ok(VideoOutcome::Skipped(_)) => stage.set_detail("skipped (invalid)"),
            Err(err) => {
                failed += 1;
                stage.set_detail("failed");
                log::error!("{}: {:#}", name, err);
            }
        }
        sink.flush()?;
    }

    log::info!(
        "done: {} analyzed, {} failed, {} total",
        analyzed,
        failed,
        total
    );
    Ok(())
}

fn lock_control(
    slot: &Mutex<Option<PipelineControl>>,
) -> MutexGuard<'_, Option<PipelineControl>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
