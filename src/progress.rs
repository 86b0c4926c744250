//! Progress reporting, decode diagnostics, and cancellation.
//!
//! This module provides [`ProgressCallback`] for monitoring frames written
//! by the [driver](crate::driver), [`DecodeObserver`] for per-access-unit
//! and stream announcements from a [`DecodeSession`](crate::DecodeSession),
//! and [`CancellationToken`] for cooperative cancellation.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use unspool::{DriverOptions, ProgressCallback, ProgressInfo};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("{} frames written", info.frames_written);
//!     }
//! }
//!
//! let options = DriverOptions::new().with_progress(Arc::new(PrintProgress));
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::{Duration, Instant};

use crate::parser::AccessUnitInfo;
use crate::session::StreamInfo;

/// A snapshot of driver progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Frames written to the output so far.
    pub frames_written: u64,
    /// Bytes written to the output so far.
    pub bytes_written: u64,
    /// Frame limit, if one was set.
    pub frame_limit: Option<u64>,
    /// Completion percentage (0.0 – 100.0), if a limit is set.
    pub percentage: Option<f32>,
    /// Wall-clock time since the driver started.
    pub elapsed: Duration,
    /// Estimated time until the frame limit is reached.
    pub estimated_remaining: Option<Duration>,
}

/// Trait for receiving progress updates while frames are written.
///
/// Callbacks observe but cannot halt the operation. Use
/// [`CancellationToken`] for that.
pub trait ProgressCallback: Send + Sync {
    /// Called every `batch_size` written frames, and once at the end.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all progress notifications.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Receives diagnostics from a decode session.
///
/// Both methods default to doing nothing.
pub trait DecodeObserver: Send + Sync {
    /// Called for every access unit the parser delimits, before it is
    /// submitted to the decoder.
    fn on_access_unit(&self, _info: &AccessUnitInfo) {}

    /// Called once, when the first frame reveals the stream's resolution.
    fn on_stream_info(&self, _info: &StreamInfo) {}
}

pub(crate) struct NoOpObserver;

impl DecodeObserver for NoOpObserver {}

/// Cooperative cancellation token backed by an [`AtomicBool`].
///
/// Clone it and call [`cancel`](CancellationToken::cancel) from anywhere;
/// the driver checks it before reading each chunk.
///
/// ```
/// use unspool::CancellationToken;
///
/// let token = CancellationToken::new();
/// assert!(!token.is_cancelled());
/// token.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, non-cancelled token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. All clones observe it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks written frames and fires the progress callback in batches.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    frame_limit: Option<u64>,
    frames: u64,
    bytes: u64,
    batch_size: u64,
    start_time: Instant,
    since_last_report: u64,
}

impl ProgressTracker {
    pub(crate) fn new(
        callback: Arc<dyn ProgressCallback>,
        frame_limit: Option<u64>,
        batch_size: u64,
    ) -> Self {
        Self {
            callback,
            frame_limit,
            frames: 0,
            bytes: 0,
            batch_size: batch_size.max(1),
            start_time: Instant::now(),
            since_last_report: 0,
        }
    }

    /// Record one written frame of `bytes` bytes.
    pub(crate) fn advance(&mut self, bytes: usize) {
        self.frames += 1;
        self.bytes += bytes as u64;
        self.since_last_report += 1;

        if self.since_last_report >= self.batch_size {
            self.report();
            self.since_last_report = 0;
        }
    }

    pub(crate) fn frames(&self) -> u64 {
        self.frames
    }

    pub(crate) fn bytes(&self) -> u64 {
        self.bytes
    }

    pub(crate) fn limit_reached(&self) -> bool {
        self.frame_limit.is_some_and(|limit| self.frames >= limit)
    }

    /// Emit a final report unless the last frame already produced one.
    pub(crate) fn finish(&mut self) {
        if self.since_last_report > 0 || self.frames == 0 {
            self.report();
        }
    }

    fn report(&self) {
        let elapsed = self.start_time.elapsed();

        let percentage = self
            .frame_limit
            .filter(|&limit| limit > 0)
            .map(|limit| (self.frames.min(limit) as f32 / limit as f32) * 100.0);

        let estimated_remaining = if self.frames > 0 {
            self.frame_limit.map(|limit| {
                let remaining = limit.saturating_sub(self.frames);
                elapsed.mul_f64(remaining as f64 / self.frames as f64)
            })
        } else {
            None
        };

        self.callback.on_progress(&ProgressInfo {
            frames_written: self.frames,
            bytes_written: self.bytes,
            frame_limit: self.frame_limit,
            percentage,
            elapsed,
            estimated_remaining,
        });
    }
}
