//! FIFO buffer between the decoder and the consumer.
//!
//! The decode stage pushes every extracted frame; the consumer pops them in
//! the same order. The queue owns its frames, so a frame leaves it exactly
//! once.

use std::collections::VecDeque;

use crate::error::UnspoolError;
use crate::frame::ExtractedFrame;

/// Ordered queue of [`ExtractedFrame`]s.
///
/// Unbounded by default. A bounded queue rejects pushes once full instead
/// of growing; since everything runs on one thread there is nobody to wait
/// for, so rejection is the only form of backpressure.
#[derive(Debug, Default)]
pub struct FrameQueue {
    frames: VecDeque<ExtractedFrame>,
    capacity: Option<usize>,
}

impl FrameQueue {
    /// A queue that never rejects a push.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// A queue holding at most `capacity` frames (minimum 1).
    pub fn bounded(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity: Some(capacity),
        }
    }

    /// Append a frame at the tail.
    ///
    /// # Errors
    ///
    /// [`UnspoolError::QueueFull`] if the queue is bounded and full. The
    /// rejected frame is dropped.
    pub fn push(&mut self, frame: ExtractedFrame) -> Result<(), UnspoolError> {
        if let Some(capacity) = self.capacity {
            if self.frames.len() >= capacity {
                return Err(UnspoolError::QueueFull { capacity });
            }
        }
        self.frames.push_back(frame);
        Ok(())
    }

    /// Remove and return the oldest frame, or `None` when empty.
    pub fn pop(&mut self) -> Option<ExtractedFrame> {
        self.frames.pop_front()
    }

    /// Number of queued frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether no frames are queued.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Maximum number of frames, `None` when unbounded.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Whether a push would be rejected right now.
    pub fn is_full(&self) -> bool {
        self.capacity
            .is_some_and(|capacity| self.frames.len() >= capacity)
    }

    /// Pop every queued frame, oldest first.
    pub fn drain(&mut self) -> impl Iterator<Item = ExtractedFrame> + '_ {
        self.frames.drain(..)
    }
}
