use anyhow::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use insect_counter::{
    BoundingBox, DecodeStream, Frame, FrameCount, FrameTransform, MemorySink, Orchestrator,
    PipelineConfig, RawFrame, ResultSink, Visualizer, VisualizerAction,
};

const WIDTH: u32 = 64;
const HEIGHT: u32 = 64;
const BACKGROUND: u8 = 40;
const SQUARE: u8 = 220;

/// Ten frames of a static scene; frame 4 adds a bright 20x20 square at (20, 20).
struct ScriptedVideo {
    decoded: u64,
}

impl DecodeStream for ScriptedVideo {
    fn next_frame(&mut self) -> Result<Option<RawFrame>> {
        if self.decoded == 10 {
            return Ok(None);
        }
        self.decoded += 1;
        let mut data = vec![BACKGROUND; (WIDTH * HEIGHT * 3) as usize];
        if self.decoded == 4 {
            for y in 20..40 {
                for x in 20..40 {
                    let i = ((y * WIDTH + x) * 3) as usize;
                    data[i..i + 3].fill(SQUARE);
                }
            }
        }
        RawFrame::new(data, WIDTH, HEIGHT).map(Some)
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

#[derive(Default)]
struct BoxRecorder {
    frames: Vec<(u64, Vec<BoundingBox>)>,
}

impl Visualizer for BoxRecorder {
    fn show(&mut self, frame: &Frame, boxes: &[BoundingBox]) -> Result<VisualizerAction> {
        self.frames.push((frame.index(), boxes.to_vec()));
        Ok(VisualizerAction::Continue)
    }
}

fn config(want_boxes: bool) -> PipelineConfig {
    PipelineConfig {
        min_brightness_change: 10,
        min_size: 300,
        max_size: 10_000,
        sample_interval: 1,
        queue_capacity: 4,
        want_boxes,
    }
}

#[test]
fn square_on_fourth_frame_is_counted_once() {
    let mut orchestrator = Orchestrator::start(
        "scripted.mp4",
        ScriptedVideo { decoded: 0 },
        &config(true),
        FrameTransform::grayscale_only(),
    )
    .expect("start pipeline");
    let mut sink = MemorySink::default();
    let mut recorder = BoxRecorder::default();
    let summary = orchestrator
        .run(&mut sink, Some(&mut recorder))
        .expect("run pipeline");

    assert_eq!(summary.frames_analyzed, 10);
    assert!(!summary.stopped_early);
    assert_eq!(sink.records.len(), 10);
    let counts: Vec<usize> = sink.records.iter().map(|r| r.count).collect();
    assert_eq!(&counts[..4], &[0, 0, 0, 1]);
    let indices: Vec<u64> = sink.records.iter().map(|r| r.frame_index).collect();
    assert_eq!(indices, (1..=10).collect::<Vec<u64>>());

    let (index, boxes) = &recorder.frames[3];
    assert_eq!(*index, 4);
    assert_eq!(boxes.len(), 1);
    let b = boxes[0];
    assert!(b.x.abs_diff(20) <= 2 && b.y.abs_diff(20) <= 2, "{b:?}");
    assert!((20..=24).contains(&b.width) && (20..=24).contains(&b.height), "{b:?}");
}

#[test]
fn same_input_gives_same_counts() {
    let run = || {
        let mut orchestrator = Orchestrator::start(
            "scripted.mp4",
            ScriptedVideo { decoded: 0 },
            &config(false),
            FrameTransform::grayscale_only(),
        )
        .unwrap();
        let mut sink = MemorySink::default();
        orchestrator.run(&mut sink, None).unwrap();
        sink.records
    };
    assert_eq!(run(), run());
}

// ---- Shutdown ----

/// Never ends on its own; counts how often it is dropped.
struct EndlessVideo {
    drops: Arc<AtomicUsize>,
    tick: u64,
}

impl DecodeStream for EndlessVideo {
    fn next_frame(&mut self) -> Result<Option<RawFrame>> {
        self.tick += 1;
        let shade = (self.tick % 200) as u8;
        RawFrame::new(vec![shade; 32 * 32 * 3], 32, 32).map(Some)
    }

    fn describe(&self) -> String {
        "endless".to_string()
    }
}

impl Drop for EndlessVideo {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Clone, Default)]
struct SharedSink(Arc<Mutex<Vec<FrameCount>>>);

impl SharedSink {
    fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }
}

impl ResultSink for SharedSink {
    fn record(&mut self, record: &FrameCount) -> Result<()> {
        self.0.lock().unwrap().push(record.clone());
        // Keep the consumer slower than the producer.
        std::thread::sleep(Duration::from_millis(2));
        Ok(())
    }
}

#[test]
fn stop_mid_stream_releases_decoder_and_silences_sink() {
    let drops = Arc::new(AtomicUsize::new(0));
    let stream = EndlessVideo {
        drops: drops.clone(),
        tick: 0,
    };
    let mut orchestrator = Orchestrator::start(
        "endless",
        stream,
        &config(false),
        FrameTransform::grayscale_only(),
    )
    .unwrap();
    let control = orchestrator.control();
    let sink = SharedSink::default();

    let consumer = {
        let mut sink = sink.clone();
        std::thread::spawn(move || orchestrator.run(&mut sink, None))
    };

    let deadline = Instant::now() + Duration::from_secs(10);
    while sink.len() < 5 {
        assert!(Instant::now() < deadline, "pipeline produced no records");
        std::thread::sleep(Duration::from_millis(5));
    }

    control.stop().expect("stop");
    assert_eq!(drops.load(Ordering::SeqCst), 1);
    let emitted = sink.len();

    let summary = consumer.join().unwrap().expect("run result");
    assert!(summary.stopped_early);
    assert_eq!(sink.len(), emitted);
    assert_eq!(summary.frames_analyzed as usize, emitted);

    control.stop().expect("second stop");
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[test]
fn dimension_change_aborts_the_video() {
    struct Resizing {
        decoded: u64,
    }

    impl DecodeStream for Resizing {
        fn next_frame(&mut self) -> Result<Option<RawFrame>> {
            self.decoded += 1;
            let (w, h) = if self.decoded < 3 { (16, 16) } else { (20, 16) };
            RawFrame::new(vec![0u8; w * h * 3], w as u32, h as u32).map(Some)
        }

        fn describe(&self) -> String {
            "resizing".to_string()
        }
    }

    let mut orchestrator = Orchestrator::start(
        "resizing",
        Resizing { decoded: 0 },
        &config(false),
        FrameTransform::grayscale_only(),
    )
    .unwrap();
    let mut sink = MemorySink::default();
    let err = orchestrator.run(&mut sink, None).unwrap_err();
    assert!(err
        .downcast_ref::<insect_counter::DimensionMismatch>()
        .is_some());
    assert_eq!(sink.records.len(), 2);
}
