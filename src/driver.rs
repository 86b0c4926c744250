//! The read → decode → write loop.
//!
//! [`run`] drives a [`DecodeSession`] over any reader and writer: it reads
//! fixed-size chunks, decodes each, and writes every queued frame to the
//! output until the input ends or the frame limit is reached.
//! [`decode_file`] is the file-to-file wrapper used by the command-line
//! tool.
//!
//! # Example
//!
//! ```no_run
//! use unspool::{CodecKind, DecodeOptions, DriverOptions, driver};
//!
//! let summary = driver::decode_file(
//!     "bigbuckbunny_480x272.h264",
//!     "bigbuckbunny_480x272.yuv",
//!     DecodeOptions::new().with_codec(CodecKind::H264),
//!     &DriverOptions::new().with_frame_limit(100),
//! )?;
//! println!("wrote {} frames", summary.frames_written);
//! # Ok::<(), unspool::UnspoolError>(())
//! ```

use std::fs::File;
use std::io::{BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use crate::config::{DecodeOptions, DriverOptions};
use crate::error::UnspoolError;
use crate::progress::ProgressTracker;
use crate::session::{DecodeSession, StreamInfo};

/// Why the driver stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The input was exhausted and the session flushed.
    EndOfInput,
    /// The configured frame limit was reached.
    FrameLimit,
}

/// Outcome of a completed driver run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeSummary {
    /// Frames written to the output.
    pub frames_written: u64,
    /// Bytes written to the output.
    pub bytes_written: u64,
    /// Non-empty chunks read from the input.
    pub chunks_read: u64,
    /// Chunks whose decode call failed with a recoverable error.
    pub failed_chunks: u64,
    /// Decoder and resolution, if at least one frame decoded.
    pub stream: Option<StreamInfo>,
    /// Why the loop ended.
    pub stop_reason: StopReason,
}

/// Decode `input` into `output` with a freshly opened session.
///
/// The session is opened before either file, and the input is opened
/// before the output is created, so an initialisation failure leaves no
/// output file behind. Everything is released in reverse order on return.
///
/// # Errors
///
/// Initialisation errors from [`DecodeSession::open`],
/// [`UnspoolError::FileOpen`] for either file, and any stream-fatal error
/// from [`run`].
pub fn decode_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    decode_options: DecodeOptions,
    options: &DriverOptions,
) -> Result<DecodeSummary, UnspoolError> {
    let input = input.as_ref();
    let output = output.as_ref();
    log::debug!("Decoding {} -> {}", input.display(), output.display());

    let mut session = DecodeSession::open(decode_options)?;

    let reader = File::open(input).map_err(|error| UnspoolError::FileOpen {
        path: input.to_path_buf(),
        reason: error.to_string(),
    })?;

    let writer = File::create(output).map_err(|error| UnspoolError::FileOpen {
        path: output.to_path_buf(),
        reason: error.to_string(),
    })?;

    run(&mut session, reader, BufWriter::new(writer), options)
}

/// Drive `session` from `reader` to `writer`.
///
/// Each iteration first checks the frame limit and cancellation, then
/// reads one chunk. A zero-length read flushes the session. Otherwise the
/// chunk is decoded and every queued frame is written. Once the limit is
/// reached no further input is read.
///
/// Recoverable decode errors (see [`UnspoolError::is_recoverable`]) skip
/// the rest of the chunk and are counted in
/// [`DecodeSummary::failed_chunks`]; any other error is returned.
pub fn run<R: Read, W: Write>(
    session: &mut DecodeSession,
    mut reader: R,
    mut writer: W,
    options: &DriverOptions,
) -> Result<DecodeSummary, UnspoolError> {
    let mut tracker = ProgressTracker::new(
        options.progress.clone(),
        options.frame_limit,
        options.batch_size,
    );
    let mut chunk = vec![0u8; options.chunk_size];
    let mut chunks_read = 0;
    let mut failed_chunks = 0;

    let stop_reason = loop {
        if tracker.limit_reached() {
            break StopReason::FrameLimit;
        }
        if options.is_cancelled() {
            return Err(UnspoolError::Cancelled);
        }

        let length = read_chunk(&mut reader, &mut chunk)?;
        if length == 0 {
            if let Err(error) = session.flush() {
                if !error.is_recoverable() {
                    return Err(error);
                }
                log::warn!("Error while flushing the decoder: {error}");
            }
            write_queued(session, &mut writer, &mut tracker)?;
            break if tracker.limit_reached() {
                StopReason::FrameLimit
            } else {
                StopReason::EndOfInput
            };
        }
        chunks_read += 1;

        match session.decode(&chunk[..length]) {
            Ok(produced) => log::debug!("Chunk {chunks_read}: {length} bytes, {produced} frames"),
            Err(error) if error.is_recoverable() => {
                log::warn!("Skipping rest of chunk {chunks_read}: {error}");
                failed_chunks += 1;
            }
            Err(error) => return Err(error),
        }

        write_queued(session, &mut writer, &mut tracker)?;
    };

    writer.flush()?;
    tracker.finish();

    let summary = DecodeSummary {
        frames_written: tracker.frames(),
        bytes_written: tracker.bytes(),
        chunks_read,
        failed_chunks,
        stream: session.stream_info().cloned(),
        stop_reason,
    };
    log::info!(
        "Wrote {} frames ({} bytes) from {} chunks, stopped on {:?}",
        summary.frames_written,
        summary.bytes_written,
        summary.chunks_read,
        summary.stop_reason,
    );
    Ok(summary)
}

/// Write queued frames until the queue is empty or the limit is reached.
fn write_queued<W: Write>(
    session: &mut DecodeSession,
    writer: &mut W,
    tracker: &mut ProgressTracker,
) -> Result<(), UnspoolError> {
    while !tracker.limit_reached() {
        let Some(frame) = session.pop_frame() else {
            break;
        };
        writer.write_all(frame.as_bytes())?;
        tracker.advance(frame.len());
        log::debug!(
            "Wrote frame {} ({}x{})",
            tracker.frames(),
            frame.width(),
            frame.height(),
        );
    }
    Ok(())
}

/// Fill `buffer` from `reader`, stopping early only at end of input.
fn read_chunk<R: Read>(reader: &mut R, buffer: &mut [u8]) -> Result<usize, UnspoolError> {
    let mut filled = 0;
    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(count) => filled += count,
            Err(error) if error.kind() == ErrorKind::Interrupted => continue,
            Err(error) => return Err(error.into()),
        }
    }
    Ok(filled)
}
