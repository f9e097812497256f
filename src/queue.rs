//! Bounded frame channel between the producer and the consumer.
//!
//! `FrameQueue` blocks the producer while full and the consumer while empty,
//! so a decoder that runs ahead of analysis cannot grow memory without bound.
//! Closing is one-directional: `Open -> Closing (items remain) -> Closed (drained)`.

use anyhow::{anyhow, Result};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use crate::frame::Frame;

pub const DEFAULT_QUEUE_CAPACITY: usize = 128;

/// Outcome of a blocking `pop`.
#[derive(Debug)]
pub enum Pop {
    Frame(Frame),
    EndOfStream,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelState {
    Open,
    Closing,
    Closed,
}

struct Inner {
    items: VecDeque<Frame>,
    closed: bool,
}

pub struct FrameQueue {
    inner: Mutex<Inner>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
}

impl FrameQueue {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(anyhow!("queue capacity must be greater than zero"));
        }
        Ok(Self {
            inner: Mutex::new(Inner {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a frame, blocking while the queue is full.
    ///
    /// Pushing after `close()` is a caller bug and returns an error. A push
    /// blocked on a full queue is released with the same error when the queue
    /// is closed underneath it.
    pub fn push(&self, frame: Frame) -> Result<()> {
        let mut inner = self.lock();
        while !inner.closed && inner.items.len() >= self.capacity {
            inner = self
                .not_full
                .wait(inner)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
        if inner.closed {
            return Err(anyhow!("push to closed frame queue"));
        }
        inner.items.push_back(frame);
        drop(inner);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Remove the oldest frame, blocking while the queue is empty and open.
    pub fn pop(&self) -> Pop {
        let mut inner = self.lock();
        loop {
            if let Some(frame) = inner.items.pop_front() {
                drop(inner);
                self.not_full.notify_one();
                return Pop::Frame(frame);
            }
            if inner.closed {
                return Pop::EndOfStream;
            }
            inner = self
                .not_empty
                .wait(inner)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }

    /// Mark that no further pushes will occur. Idempotent.
    pub fn close(&self) {
        let mut inner = self.lock();
        if inner.closed {
            return;
        }
        inner.closed = true;
        drop(inner);
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    pub fn state(&self) -> ChannelState {
        let inner = self.lock();
        match (inner.closed, inner.items.is_empty()) {
            (false, _) => ChannelState::Open,
            (true, false) => ChannelState::Closing,
            (true, true) => ChannelState::Closed,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    // Poisoning cannot leave the deque half-updated.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// ----------------------------------------------------------------------------
// StopFlag: cooperative cancellation shared by producer and consumer
// ----------------------------------------------------------------------------

#[derive(Clone, Debug, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
