//! Bounded frame queue between the receive task and the execution path
//!
//! Single producer, single consumer. The producer must never stall on a
//! slow consumer, so a full queue rejects the push and the frame is
//! dropped; under sustained overload frames are silently lost.

use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::VecDeque;

use crate::constants::DEFAULT_QUEUE_CAPACITY;

/// Fixed-capacity FIFO of raw received frames
///
/// All operations take one internal lock; none of them block beyond it.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use visca_core::FrameQueue;
///
/// let queue = FrameQueue::new(2);
/// assert!(queue.push(Bytes::from_static(&[0x90, 0x41, 0xFF])));
/// assert_eq!(queue.pop().unwrap().len(), 3);
/// assert!(queue.pop().is_none());
/// ```
#[derive(Debug)]
pub struct FrameQueue {
    frames: Mutex<VecDeque<Bytes>>,
    capacity: usize,
}

impl FrameQueue {
    /// Create a queue holding at most `capacity` frames
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Append a frame; returns false (frame dropped) when full
    pub fn push(&self, frame: Bytes) -> bool {
        let mut frames = self.frames.lock();
        if frames.len() >= self.capacity {
            return false;
        }
        frames.push_back(frame);
        true
    }

    /// Remove the oldest frame; `None` when empty, never blocks
    pub fn pop(&self) -> Option<Bytes> {
        self.frames.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.frames.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Discard all queued frames
    pub fn clear(&self) {
        self.frames.lock().clear();
    }
}

impl Default for FrameQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}
