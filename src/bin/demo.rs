//! demo - run the counting pipeline on a synthetic video and print the counts

use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;

use insect_counter::{
    probe, Analyzer, AnnotatedFrameWriter, CounterSettings, FileSource, FrameTransform,
    MemorySink, Orchestrator, Visualizer,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Seconds of synthetic video.
    #[arg(long, default_value_t = 10)]
    seconds: u64,
    /// Frames per second of the synthetic video.
    #[arg(long, default_value_t = 10)]
    fps: u32,
    /// Number of insects crossing the scene.
    #[arg(long, default_value_t = 3)]
    insects: u32,
    /// Write annotated frames to this directory.
    #[arg(long)]
    annotate_dir: Option<PathBuf>,
    /// Stop after this many annotated frames.
    #[arg(long, requires = "annotate_dir")]
    max_frames: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let path = format!(
        "stub://demo?frames={}&fps={}&insects={}",
        args.seconds * u64::from(args.fps),
        args.fps,
        args.insects
    );
    let analyzer = Analyzer::new(CounterSettings {
        annotate_dir: args.annotate_dir.clone(),
        ..CounterSettings::default()
    })?;
    let transform = FrameTransform::default();
    let meta = probe(&path, analyzer.settings().extension(), &transform)?;
    if !meta.valid {
        return Err(anyhow!("synthetic video {} has no frames", path));
    }
    let config = analyzer.pipeline_config(&meta);
    log::info!(
        "demo: {}x{} frames, sizes {}..={} px², one frame in {}",
        meta.width,
        meta.height,
        config.min_size,
        config.max_size,
        config.sample_interval
    );

    let mut writer = match &args.annotate_dir {
        Some(dir) => {
            let writer = AnnotatedFrameWriter::new(dir, &meta.name)?;
            Some(match args.max_frames {
                Some(limit) => writer.with_frame_limit(limit),
                None => writer,
            })
        }
        None => None,
    };

    let mut orchestrator =
        Orchestrator::start(meta.name.clone(), FileSource::open(&path)?, &config, transform)?;
    let mut sink = MemorySink::default();
    let summary = orchestrator.run(&mut sink, writer.as_mut().map(|w| w as &mut dyn Visualizer))?;

    println!("frame,count");
    for record in &sink.records {
        println!("{},{}", record.frame_index, record.count);
    }
    println!();
    println!(
        "{} frames analyzed, {} objects counted",
        summary.frames_analyzed, summary.objects_counted
    );
    Ok(())
}
