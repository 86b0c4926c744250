//! Error types for the `unspool` crate.
//!
//! This module defines [`UnspoolError`], the unified error type returned by
//! all fallible operations in the crate. Variants keep the upstream FFmpeg
//! error where one exists so callers can tell a corrupt access unit apart
//! from a session that can no longer make progress.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use thiserror::Error;

/// The unified error type for all `unspool` operations.
///
/// Every public method that can fail returns `Result<T, UnspoolError>`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum UnspoolError {
    /// No decoder is registered for the requested codec.
    #[error("Decoder not found for codec {0}")]
    DecoderNotFound(String),

    /// FFmpeg could not allocate a codec context.
    #[error("Could not allocate a codec context for {0}")]
    ContextAllocation(String),

    /// FFmpeg has no bitstream parser for the requested codec.
    #[error("Could not initialise the stream parser for {0}")]
    ParserInit(String),

    /// The decoder was found but refused to open.
    #[error("Could not open codec {codec}: {reason}")]
    CodecOpen {
        /// Decoder name.
        codec: String,
        /// Underlying reason reported by FFmpeg.
        reason: String,
    },

    /// An input or output file could not be opened.
    #[error("Failed to open {path}: {reason}")]
    FileOpen {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The stream parser reported an error code.
    #[error("Stream parser failed with code {0}")]
    Parse(i32),

    /// The decoder rejected an access unit.
    #[error("Failed to submit access unit: {source}")]
    Submit {
        /// Error returned by `avcodec_send_packet`.
        #[source]
        source: FfmpegError,
    },

    /// The decoder failed while emitting a frame.
    #[error("Failed to receive decoded frame: {source}")]
    Receive {
        /// Error returned by `avcodec_receive_frame`.
        #[source]
        source: FfmpegError,
    },

    /// A destination buffer does not match the frame's planar size.
    #[error("Frame buffer holds {actual} bytes but {expected} are required")]
    FrameSizeMismatch {
        /// Bytes required for the frame's resolution.
        expected: usize,
        /// Bytes actually provided.
        actual: usize,
    },

    /// The decoded frame is not 8-bit planar 4:2:0.
    #[error("Unsupported pixel format for plane extraction: {0}")]
    UnsupportedPixelFormat(String),

    /// Pixel format conversion failed.
    #[error("Scaling error: {0}")]
    Scaling(String),

    /// A frame is structurally invalid (zero size, missing planes).
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    /// A bounded frame queue was full when a frame was produced.
    #[error("Frame queue is full (capacity {capacity})")]
    QueueFull {
        /// Configured queue capacity.
        capacity: usize,
    },

    /// The codec name is not one this crate can drive.
    #[error("Unknown codec: {0}")]
    UnknownCodec(String),

    /// The FFmpeg log level name is not recognised.
    #[error("Unknown FFmpeg log level: {0}")]
    UnknownLogLevel(String),

    /// The operation was cancelled via a [`CancellationToken`](crate::CancellationToken).
    #[error("Operation cancelled")]
    Cancelled,

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),
}

impl UnspoolError {
    /// Returns `true` if the error only affects the access unit (or chunk)
    /// being decoded, so decoding can continue with later input.
    ///
    /// Only decoder errors that signal corrupt data qualify. Everything
    /// else (allocation failures, I/O, a full queue) ends the stream.
    pub fn is_recoverable(&self) -> bool {
        match self {
            UnspoolError::Submit { source } | UnspoolError::Receive { source } => {
                matches!(source, FfmpegError::InvalidData | FfmpegError::Unknown)
            }
            _ => false,
        }
    }
}

impl From<FfmpegError> for UnspoolError {
    fn from(error: FfmpegError) -> Self {
        UnspoolError::FfmpegError(error.to_string())
    }
}
