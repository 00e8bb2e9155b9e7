// SYNOID Panel Frame Buffer
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Bounded FIFO of display-ready frames with ring-buffer semantics: pushing
// into a full buffer drops the oldest frame instead of blocking or growing.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use super::Frame;

/// Bounded FIFO of decoded frames.
#[derive(Debug)]
pub struct FrameBuffer {
    frames: VecDeque<Frame>,
    capacity: usize,
    pushed: u64,
    evicted: u64,
}

impl FrameBuffer {
    /// Create a buffer holding at most `capacity` frames (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
            pushed: 0,
            evicted: 0,
        }
    }

    /// Append a frame at the tail, evicting the head first when full.
    ///
    /// Returns `false` when the oldest frame had to be dropped to make room.
    pub fn try_push(&mut self, frame: Frame) -> bool {
        let mut kept_all = true;
        if self.frames.len() >= self.capacity {
            self.frames.pop_front();
            self.evicted += 1;
            kept_all = false;
        }
        self.frames.push_back(frame);
        self.pushed += 1;
        kept_all
    }

    /// Remove and return the oldest frame, `None` when exhausted.
    pub fn pop_front(&mut self) -> Option<Frame> {
        self.frames.pop_front()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every queued frame. Counters are kept.
    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Total frames ever pushed.
    pub fn pushed(&self) -> u64 {
        self.pushed
    }

    /// Total frames dropped because the buffer was full.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }
}

/// Frame buffer shared between the scheduler and a fill worker.
///
/// Every operation takes the lock for its own duration only, so push, pop,
/// len and clear are atomic with respect to each other and never wait on
/// decode or display work.
#[derive(Debug, Clone)]
pub struct SharedFrameBuffer {
    inner: Arc<Mutex<FrameBuffer>>,
}

impl SharedFrameBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(FrameBuffer::new(capacity))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FrameBuffer> {
        // A panic while holding the lock cannot leave the deque half-updated
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn try_push(&self, frame: Frame) -> bool {
        self.lock().try_push(frame)
    }

    pub fn pop_front(&self) -> Option<Frame> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }

    pub fn clear(&self) {
        self.lock().clear()
    }

    pub fn evicted(&self) -> u64 {
        self.lock().evicted()
    }

    pub fn pushed(&self) -> u64 {
        self.lock().pushed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn frame(seq: u64) -> Frame {
        Frame::new(seq, RgbImage::new(2, 2))
    }

    #[test]
    fn test_length_never_exceeds_capacity() {
        let mut buffer = FrameBuffer::new(5);
        for seq in 0..50 {
            buffer.try_push(frame(seq));
            assert!(buffer.len() <= 5);
        }
        assert_eq!(buffer.len(), 5);
        assert_eq!(buffer.pushed(), 50);
        assert_eq!(buffer.evicted(), 45);
    }

    #[test]
    fn test_overflow_evicts_exactly_the_oldest() {
        let mut buffer = FrameBuffer::new(3);
        assert!(buffer.try_push(frame(0)));
        assert!(buffer.try_push(frame(1)));
        assert!(buffer.try_push(frame(2)));
        assert!(!buffer.try_push(frame(3)));

        let order: Vec<u64> = std::iter::from_fn(|| buffer.pop_front())
            .map(|f| f.seq())
            .collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn test_fifo_order_with_interleaved_pops() {
        let mut buffer = FrameBuffer::new(8);
        let mut popped = Vec::new();
        for seq in 0..20 {
            buffer.try_push(frame(seq));
            if seq % 3 == 0 {
                popped.push(buffer.pop_front().map(|f| f.seq()));
            }
        }
        while let Some(f) = buffer.pop_front() {
            popped.push(Some(f.seq()));
        }
        let popped: Vec<u64> = popped.into_iter().flatten().collect();
        let mut sorted = popped.clone();
        sorted.sort_unstable();
        assert_eq!(popped, sorted, "pop order must follow push order");
    }

    #[test]
    fn test_pop_on_empty_signals_exhaustion() {
        let mut buffer = FrameBuffer::new(2);
        assert!(buffer.pop_front().is_none());
        buffer.try_push(frame(0));
        buffer.clear();
        assert!(buffer.is_empty());
        assert!(buffer.pop_front().is_none());
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut buffer = FrameBuffer::new(0);
        assert_eq!(buffer.capacity(), 1);
        buffer.try_push(frame(0));
        buffer.try_push(frame(1));
        assert_eq!(buffer.pop_front().map(|f| f.seq()), Some(1));
    }

    #[test]
    fn test_shared_buffer_concurrent_push_pop() {
        let shared = SharedFrameBuffer::new(16);
        let producer = shared.clone();
        let handle = std::thread::spawn(move || {
            for seq in 0..1_000 {
                producer.try_push(frame(seq));
            }
        });

        let mut last = None;
        let mut seen = 0;
        while !handle.is_finished() || !shared.is_empty() {
            if let Some(f) = shared.pop_front() {
                if let Some(prev) = last {
                    assert!(f.seq() > prev, "frames reordered: {} after {}", f.seq(), prev);
                }
                last = Some(f.seq());
                seen += 1;
            }
            assert!(shared.len() <= 16);
        }
        handle.join().unwrap();
        assert!(seen > 0);
        assert_eq!(shared.pushed(), 1_000);
    }
}
