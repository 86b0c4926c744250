//! Session and driver configuration.
//!
//! [`DecodeOptions`] configures a [`DecodeSession`](crate::DecodeSession):
//! codec, FFmpeg verbosity, error policy, queue bound, and diagnostics
//! observer. [`DriverOptions`] configures the read/decode/write loop: chunk
//! size, frame limit, progress callback, and cancellation.
//!
//! # Example
//!
//! ```no_run
//! use unspool::{CodecKind, DecodeErrorPolicy, DecodeOptions, DriverOptions, FfmpegLogLevel};
//!
//! let decode = DecodeOptions::new()
//!     .with_codec(CodecKind::Hevc)
//!     .with_ffmpeg_log_level(Some(FfmpegLogLevel::Warning))
//!     .with_error_policy(DecodeErrorPolicy::SkipUnit);
//!
//! let driver = DriverOptions::new()
//!     .with_chunk_size(64 * 1024)
//!     .with_frame_limit(100);
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use crate::codec::CodecKind;
use crate::ffmpeg::FfmpegLogLevel;
use crate::progress::{
    CancellationToken, DecodeObserver, NoOpObserver, NoOpProgress, ProgressCallback,
};

/// Default size of one input read: 256 KiB.
pub const DEFAULT_CHUNK_SIZE: usize = 256 * 1024;

/// What a decode call does when the decoder rejects data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeErrorPolicy {
    /// Stop processing the current input chunk and return the error. The
    /// rest of the chunk is discarded. This is the default.
    #[default]
    AbortChunk,
    /// Log recoverable errors, drop the offending access unit, and keep
    /// parsing the chunk. Non-recoverable errors still abort.
    SkipUnit,
}

/// Configuration for a [`DecodeSession`](crate::DecodeSession).
#[derive(Clone)]
pub struct DecodeOptions {
    pub(crate) codec: CodecKind,
    pub(crate) size_hint: Option<(u32, u32)>,
    pub(crate) ffmpeg_log_level: Option<FfmpegLogLevel>,
    pub(crate) error_policy: DecodeErrorPolicy,
    pub(crate) strict_errors: bool,
    pub(crate) queue_capacity: Option<usize>,
    pub(crate) observer: Arc<dyn DecodeObserver>,
}

impl Debug for DecodeOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("DecodeOptions")
            .field("codec", &self.codec)
            .field("size_hint", &self.size_hint)
            .field("ffmpeg_log_level", &self.ffmpeg_log_level)
            .field("error_policy", &self.error_policy)
            .field("strict_errors", &self.strict_errors)
            .field("queue_capacity", &self.queue_capacity)
            .field("has_observer", &true)
            .finish()
    }
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl DecodeOptions {
    /// Defaults: H.264, FFmpeg log level `Debug`, abort-chunk error policy,
    /// concealed decode errors, unbounded queue, no observer.
    pub fn new() -> Self {
        Self {
            codec: CodecKind::default(),
            size_hint: None,
            ffmpeg_log_level: Some(FfmpegLogLevel::Debug),
            error_policy: DecodeErrorPolicy::default(),
            strict_errors: false,
            queue_capacity: None,
            observer: Arc::new(NoOpObserver),
        }
    }

    /// Select the codec family of the input stream.
    #[must_use]
    pub fn with_codec(mut self, codec: CodecKind) -> Self {
        self.codec = codec;
        self
    }

    /// Record the resolution the caller expects.
    ///
    /// Advisory only: the decoder takes its dimensions from the stream and
    /// nothing is allocated from the hint. A mismatch is logged once the
    /// real size is known.
    #[must_use]
    pub fn with_size_hint(mut self, width: u32, height: u32) -> Self {
        self.size_hint = Some((width, height));
        self
    }

    /// FFmpeg log level applied when the session opens. `None` leaves the
    /// current process-wide level alone.
    #[must_use]
    pub fn with_ffmpeg_log_level(mut self, level: Option<FfmpegLogLevel>) -> Self {
        self.ffmpeg_log_level = level;
        self
    }

    /// Choose how decode errors inside a chunk are handled.
    #[must_use]
    pub fn with_error_policy(mut self, policy: DecodeErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    /// Make the decoder report damaged pictures as errors.
    ///
    /// Decoders conceal most bitstream damage by default, so the error
    /// policy rarely sees anything. With strict errors on, a corrupt slice
    /// fails the unit with `InvalidData`, which the policy then handles.
    #[must_use]
    pub fn with_strict_errors(mut self, strict: bool) -> Self {
        self.strict_errors = strict;
        self
    }

    /// Bound the frame queue. `None` (the default) leaves it unbounded.
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: Option<usize>) -> Self {
        self.queue_capacity = capacity.map(|value| value.max(1));
        self
    }

    /// Attach an observer for access-unit and stream diagnostics.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn DecodeObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// The configured codec.
    pub fn codec(&self) -> CodecKind {
        self.codec
    }

    /// The advisory size hint, if any.
    pub fn size_hint(&self) -> Option<(u32, u32)> {
        self.size_hint
    }
}

/// Configuration for the [driver](crate::driver) loop.
#[derive(Clone)]
pub struct DriverOptions {
    pub(crate) chunk_size: usize,
    pub(crate) frame_limit: Option<u64>,
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) batch_size: u64,
    pub(crate) cancellation: Option<CancellationToken>,
}

impl Debug for DriverOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("DriverOptions")
            .field("chunk_size", &self.chunk_size)
            .field("frame_limit", &self.frame_limit)
            .field("has_progress", &true)
            .field("batch_size", &self.batch_size)
            .field("has_cancellation", &self.cancellation.is_some())
            .finish()
    }
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl DriverOptions {
    /// Defaults: 256 KiB chunks, no frame limit, no progress callback,
    /// batch size 1, no cancellation.
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            frame_limit: None,
            progress: Arc::new(NoOpProgress),
            batch_size: 1,
            cancellation: None,
        }
    }

    /// Bytes read from the input per iteration. Clamped to a minimum of 1.
    #[must_use]
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Stop after writing `limit` frames. Zero means no limit.
    #[must_use]
    pub fn with_frame_limit(mut self, limit: u64) -> Self {
        self.frame_limit = (limit > 0).then_some(limit);
        self
    }

    /// Attach a progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Fire the progress callback every `size` frames (minimum 1).
    #[must_use]
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Attach a cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// The configured frame limit.
    pub fn frame_limit(&self) -> Option<u64> {
        self.frame_limit
    }

    /// The configured chunk size.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }
}
