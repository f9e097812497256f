//! Producer side of the pipeline.
//!
//! `FrameSource` owns the decode stream on its own thread. Every decoded frame
//! bumps the read counter; only every `sample_interval`-th frame is
//! transformed and pushed. When the stream ends, fails, or a stop is
//! requested, the stream is dropped (releasing the decode handle) and the
//! queue is closed, in that order.

use anyhow::{anyhow, Result};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::ingest::DecodeStream;
use crate::queue::{FrameQueue, StopFlag};
use crate::transform::FrameTransform;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SourceStats {
    pub frames_read: u64,
    pub frames_sampled: u64,
}

pub struct FrameSource<D> {
    stream: D,
    queue: Arc<FrameQueue>,
    stop: StopFlag,
    sample_interval: u32,
    transform: FrameTransform,
}

impl<D: DecodeStream + 'static> FrameSource<D> {
    pub fn new(
        stream: D,
        queue: Arc<FrameQueue>,
        stop: StopFlag,
        sample_interval: u32,
        transform: FrameTransform,
    ) -> Result<Self> {
        if sample_interval == 0 {
            return Err(anyhow!("sample interval must be at least 1"));
        }
        Ok(Self {
            stream,
            queue,
            stop,
            sample_interval,
            transform,
        })
    }

    /// Start the producer thread.
    pub fn spawn(self) -> Result<SourceHandle> {
        let label = self.stream.describe();
        let join = std::thread::Builder::new()
            .name("frame-source".to_string())
            .spawn(move || self.run())
            .map_err(|e| anyhow!("failed to start frame source thread: {}", e))?;
        Ok(SourceHandle {
            label,
            join: Some(join),
        })
    }

    fn run(self) -> Result<SourceStats> {
        let Self {
            mut stream,
            queue,
            stop,
            sample_interval,
            transform,
        } = self;
        let label = stream.describe();
        let mut stats = SourceStats::default();

        let result = pump(
            &mut stream,
            &queue,
            &stop,
            sample_interval,
            &transform,
            &mut stats,
        );
        drop(stream);
        queue.close();

        log::info!(
            "FrameSource: {} finished, {} frames read, {} sampled",
            label,
            stats.frames_read,
            stats.frames_sampled
        );
        result.map(|()| stats)
    }
}

fn pump<D: DecodeStream>(
    stream: &mut D,
    queue: &FrameQueue,
    stop: &StopFlag,
    sample_interval: u32,
    transform: &FrameTransform,
    stats: &mut SourceStats,
) -> Result<()> {
    loop {
        if stop.is_requested() {
            log::debug!("FrameSource: stop requested before decode");
            return Ok(());
        }
        let raw = match stream.next_frame() {
            Ok(Some(raw)) => raw,
            Ok(None) => return Ok(()),
            Err(err) => {
                log::warn!(
                    "FrameSource: decode failed after {} frames, ending stream: {:#}",
                    stats.frames_read,
                    err
                );
                return Ok(());
            }
        };
        stats.frames_read += 1;
        if stats.frames_read % u64::from(sample_interval) != 0 {
            continue;
        }

        let frame = transform.apply(raw, stats.frames_read)?;
        if stop.is_requested() {
            return Ok(());
        }
        match queue.push(frame) {
            Ok(()) => stats.frames_sampled += 1,
            Err(_) if stop.is_requested() => return Ok(()),
            Err(err) => return Err(err),
        }
    }
}

/// Join handle of a running producer.
#[derive(Debug)]
pub struct SourceHandle {
    label: String,
    join: Option<JoinHandle<Result<SourceStats>>>,
}

impl SourceHandle {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Wait for the producer to exit. The decode handle has been released by
    /// the time this returns.
    pub fn join(mut self) -> Result<SourceStats> {
        match self.join.take() {
            Some(join) => join
                .join()
                .map_err(|_| anyhow!("frame source thread panicked ({})", self.label))?,
            None => Ok(SourceStats::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::RawFrame;
    use crate::queue::Pop;

    struct Counting {
        remaining: u64,
        fail_after: Option<u64>,
        decoded: u64,
    }

    impl Counting {
        fn new(frames: u64) -> Self {
            Self {
                remaining: frames,
                fail_after: None,
                decoded: 0,
            }
        }
    }

    impl DecodeStream for Counting {
        fn next_frame(&mut self) -> Result<Option<RawFrame>> {
            if self.fail_after == Some(self.decoded) {
                return Err(anyhow!("corrupt packet"));
            }
            if self.remaining == 0 {
                return Ok(None);
            }
            self.remaining -= 1;
            self.decoded += 1;
            RawFrame::new(vec![self.decoded as u8; 4 * 4 * 3], 4, 4).map(Some)
        }

        fn describe(&self) -> String {
            "counting".to_string()
        }
    }

    fn drain(queue: &FrameQueue) -> Vec<u64> {
        std::iter::from_fn(|| match queue.pop() {
            Pop::Frame(frame) => Some(frame.index()),
            Pop::EndOfStream => None,
        })
        .collect()
    }

    #[test]
    fn keeps_every_nth_frame_and_closes_queue() {
        let queue = Arc::new(FrameQueue::new(16).unwrap());
        let source = FrameSource::new(
            Counting::new(10),
            queue.clone(),
            StopFlag::new(),
            3,
            FrameTransform::grayscale_only(),
        )
        .unwrap();
        let stats = source.spawn().unwrap().join().unwrap();
        assert_eq!(
            stats,
            SourceStats {
                frames_read: 10,
                frames_sampled: 3
            }
        );
        assert_eq!(drain(&queue), vec![3, 6, 9]);
    }

    #[test]
    fn decode_error_ends_the_stream() {
        let queue = Arc::new(FrameQueue::new(16).unwrap());
        let mut stream = Counting::new(10);
        stream.fail_after = Some(2);
        let source = FrameSource::new(
            stream,
            queue.clone(),
            StopFlag::new(),
            1,
            FrameTransform::grayscale_only(),
        )
        .unwrap();
        let stats = source.spawn().unwrap().join().unwrap();
        assert_eq!(stats.frames_read, 2);
        assert_eq!(drain(&queue), vec![1, 2]);
    }

    #[test]
    fn stop_before_start_reads_nothing() {
        let queue = Arc::new(FrameQueue::new(4).unwrap());
        let stop = StopFlag::new();
        stop.request();
        let source = FrameSource::new(
            Counting::new(10),
            queue.clone(),
            stop,
            1,
            FrameTransform::grayscale_only(),
        )
        .unwrap();
        let stats = source.spawn().unwrap().join().unwrap();
        assert_eq!(stats.frames_read, 0);
        assert!(drain(&queue).is_empty());
    }

    #[test]
    fn zero_interval_is_rejected() {
        let queue = Arc::new(FrameQueue::new(4).unwrap());
        assert!(FrameSource::new(
            Counting::new(1),
            queue,
            StopFlag::new(),
            0,
            FrameTransform::grayscale_only()
        )
        .is_err());
    }
}
