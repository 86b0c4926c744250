//! The decode session: parser, decoder, extraction, and frame queue.
//!
//! A [`DecodeSession`] turns arbitrary chunks of a raw elementary stream
//! into [`ExtractedFrame`]s. Each [`decode`](DecodeSession::decode) call
//! splits its input into access units, submits every unit to the decoder,
//! and drains whatever frames the decoder is ready to emit into the queue.
//! At end of input, [`flush`](DecodeSession::flush) releases the pictures
//! still held by the parser and the decoder.
//!
//! # Example
//!
//! ```no_run
//! use unspool::{CodecKind, DecodeOptions, DecodeSession};
//!
//! let mut session = DecodeSession::open(DecodeOptions::new().with_codec(CodecKind::H264))?;
//! let bytes = std::fs::read("input.h264")?;
//!
//! session.decode(&bytes)?;
//! session.flush()?;
//! while let Some(frame) = session.pop_frame() {
//!     println!("frame {} is {} bytes", frame.sequence(), frame.len());
//! }
//! # Ok::<(), unspool::UnspoolError>(())
//! ```

use ffmpeg_next::{
    Codec, Error as FfmpegError, Packet,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    frame::Video as VideoFrame,
    util::error::EAGAIN,
};

use crate::codec::CodecKind;
use crate::config::{DecodeErrorPolicy, DecodeOptions};
use crate::error::UnspoolError;
use crate::extract::FrameExtractor;
use crate::ffmpeg::{initialize, set_ffmpeg_log_level};
use crate::frame::{ExtractedFrame, planar_frame_size};
use crate::parser::{AccessUnitInfo, PaddedBuffer, StreamParser};
use crate::queue::FrameQueue;

/// Decoder and resolution details, known once the first frame decodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    /// Short decoder name, e.g. `h264`.
    pub decoder_name: String,
    /// Descriptive decoder name, e.g. `H.264 / AVC / MPEG-4 AVC / MPEG-4 part 10`.
    pub decoder_long_name: String,
    /// Luma width in pixels.
    pub width: u32,
    /// Luma height in pixels.
    pub height: u32,
    /// Pixel format the decoder produced, before any conversion.
    pub source_pixel_format: String,
}

impl StreamInfo {
    /// Bytes per written frame at this resolution.
    pub fn frame_size(&self) -> usize {
        planar_frame_size(self.width, self.height)
    }
}

/// One decoder, one parser, and the frames they have produced.
///
/// Not shareable across threads; open one session per stream.
pub struct DecodeSession {
    // Fields drop in declaration order: frame, parser, then decoder.
    decoded: VideoFrame,
    parser: StreamParser,
    decoder: VideoDecoder,
    staging: PaddedBuffer,
    extractor: FrameExtractor,
    queue: FrameQueue,
    options: DecodeOptions,
    decoder_name: String,
    decoder_long_name: String,
    stream_info: Option<StreamInfo>,
    frames_decoded: u64,
    finished: bool,
}

impl DecodeSession {
    /// Initialise FFmpeg and open a decoder and parser for the configured
    /// codec.
    ///
    /// Applies the configured FFmpeg log level first.
    ///
    /// # Errors
    ///
    /// In the order they are checked: [`UnspoolError::DecoderNotFound`],
    /// [`UnspoolError::ContextAllocation`], [`UnspoolError::ParserInit`],
    /// [`UnspoolError::CodecOpen`].
    pub fn open(options: DecodeOptions) -> Result<Self, UnspoolError> {
        initialize()?;
        if let Some(level) = options.ffmpeg_log_level {
            set_ffmpeg_log_level(level);
        }

        let kind = options.codec;
        let codec = kind.find_decoder()?;
        let decoder_name = codec.name().to_string();
        let decoder_long_name = codec.description().to_string();

        let mut context = allocate_context(codec, kind)?;
        if options.strict_errors {
            // Report damaged slices instead of concealing them.
            unsafe {
                (*context.as_mut_ptr()).err_recognition |=
                    ffmpeg_sys_next::AV_EF_EXPLODE as i32;
            }
        }
        let parser = StreamParser::new(kind)?;
        let decoder = context
            .decoder()
            .open_as(codec)
            .and_then(|opened| opened.video())
            .map_err(|error| UnspoolError::CodecOpen {
                codec: decoder_name.clone(),
                reason: error.to_string(),
            })?;

        if let Some((width, height)) = options.size_hint {
            log::debug!(
                "Size hint {width}x{height} recorded; the stream decides the real resolution"
            );
        }

        let queue = match options.queue_capacity {
            Some(capacity) => FrameQueue::bounded(capacity),
            None => FrameQueue::unbounded(),
        };

        log::info!("Opened {decoder_name} decoder ({decoder_long_name})");

        Ok(Self {
            decoded: VideoFrame::empty(),
            parser,
            decoder,
            staging: PaddedBuffer::new(),
            extractor: FrameExtractor::new(),
            queue,
            options,
            decoder_name,
            decoder_long_name,
            stream_info: None,
            frames_decoded: 0,
            finished: false,
        })
    }

    /// Parse and decode one chunk of the stream.
    ///
    /// Every frame the decoder emits is extracted and pushed onto the
    /// queue; pop them with [`pop_frame`](Self::pop_frame). Returns how
    /// many frames this call produced. Empty input is a no-op that leaves
    /// the parser untouched.
    ///
    /// # Errors
    ///
    /// Decoder errors abort the call according to the configured
    /// [`DecodeErrorPolicy`]. Frames queued before the error stay queued.
    pub fn decode(&mut self, input: &[u8]) -> Result<usize, UnspoolError> {
        if input.is_empty() || self.finished {
            return Ok(0);
        }

        self.staging.fill(input);
        let mut cursor = 0;
        let mut produced = 0;

        while cursor < self.staging.len() {
            let output = self
                .parser
                .parse(&mut self.decoder, &self.staging, cursor)?;
            cursor += output.consumed;

            let unit = match output.unit {
                Some(unit) => unit,
                None if output.consumed == 0 => break,
                None => continue,
            };

            let packet = Packet::copy(unit.data);
            let info = unit.info;
            produced += self.submit_unit(&packet, &info)?;
        }

        Ok(produced)
    }

    /// Drain the parser and decoder at end of input.
    ///
    /// Submits the access units still buffered in the parser, signals end
    /// of stream, and queues every remaining frame. Later calls to
    /// [`decode`](Self::decode) or `flush` return `Ok(0)`.
    ///
    /// # Errors
    ///
    /// A recoverable error on a buffered unit does not stop the flush: the
    /// decoder is still drained, and the first such error is returned
    /// afterwards with the drained frames queued.
    pub fn flush(&mut self) -> Result<usize, UnspoolError> {
        if self.finished {
            return Ok(0);
        }
        self.finished = true;

        let mut produced = 0;
        let mut deferred = None;
        loop {
            let output = match self.parser.flush(&mut self.decoder) {
                Ok(output) => output,
                Err(error) => {
                    deferred.get_or_insert(error);
                    break;
                }
            };
            let Some(unit) = output.unit else {
                break;
            };

            let packet = Packet::copy(unit.data);
            let info = unit.info;
            match self.submit_unit(&packet, &info) {
                Ok(count) => produced += count,
                Err(error) if error.is_recoverable() => {
                    deferred.get_or_insert(error);
                }
                Err(error) => return Err(error),
            }
        }

        self.decoder
            .send_eof()
            .map_err(|source| UnspoolError::Submit { source })?;
        for _ in 0..MAX_DRAIN_ATTEMPTS {
            match self.drain_decoder() {
                Ok(count) => {
                    produced += count;
                    break;
                }
                Err(error) if error.is_recoverable() => {
                    log::warn!("Decode error while draining: {error}");
                    deferred.get_or_insert(error);
                }
                Err(error) => return Err(error),
            }
        }

        log::debug!(
            "Flushed session, {} frames decoded in total",
            self.frames_decoded
        );
        match deferred {
            Some(error) => Err(error),
            None => Ok(produced),
        }
    }

    /// Take the oldest queued frame.
    pub fn pop_frame(&mut self) -> Option<ExtractedFrame> {
        self.queue.pop()
    }

    /// Number of frames waiting in the queue.
    pub fn queued_frames(&self) -> usize {
        self.queue.len()
    }

    /// Decoder and resolution details, once the first frame has decoded.
    pub fn stream_info(&self) -> Option<&StreamInfo> {
        self.stream_info.as_ref()
    }

    /// Codec this session decodes.
    pub fn codec(&self) -> CodecKind {
        self.options.codec
    }

    /// Short name of the opened decoder.
    pub fn decoder_name(&self) -> &str {
        &self.decoder_name
    }

    /// Frames decoded so far, including those still queued.
    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }

    /// Access units delimited so far.
    pub fn units_parsed(&self) -> u64 {
        self.parser.units_parsed()
    }

    /// Whether [`flush`](Self::flush) has run.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Submit one unit and apply the error policy to failures.
    fn submit_unit(
        &mut self,
        packet: &Packet,
        info: &AccessUnitInfo,
    ) -> Result<usize, UnspoolError> {
        log::debug!(
            "[unit {}] size {:6} type {:5} number {:4}",
            info.index,
            info.size,
            info.picture_type,
            info.picture_number,
        );
        self.options.observer.on_access_unit(info);

        match self.submit(packet) {
            Ok(count) => Ok(count),
            Err(error)
                if self.options.error_policy == DecodeErrorPolicy::SkipUnit
                    && error.is_recoverable() =>
            {
                log::warn!("Skipping access unit {}: {error}", info.index);
                Ok(0)
            }
            Err(error) => {
                log::warn!("Decode error on access unit {}: {error}", info.index);
                Err(error)
            }
        }
    }

    fn submit(&mut self, packet: &Packet) -> Result<usize, UnspoolError> {
        self.decoder
            .send_packet(packet)
            .map_err(|source| UnspoolError::Submit { source })?;
        self.drain_decoder()
    }

    /// Receive frames until the decoder wants more input or has ended.
    fn drain_decoder(&mut self) -> Result<usize, UnspoolError> {
        let mut produced = 0;
        loop {
            match self.decoder.receive_frame(&mut self.decoded) {
                Ok(()) => {
                    self.accept_frame()?;
                    produced += 1;
                }
                Err(FfmpegError::Other { errno }) if errno == EAGAIN => break,
                Err(FfmpegError::Eof) => break,
                Err(source) => return Err(UnspoolError::Receive { source }),
            }
        }
        Ok(produced)
    }

    fn accept_frame(&mut self) -> Result<(), UnspoolError> {
        self.update_stream_info();

        let frame = self
            .extractor
            .extract(&self.decoded)?
            .with_sequence(self.frames_decoded);
        self.frames_decoded += 1;
        self.queue.push(frame)
    }

    fn update_stream_info(&mut self) {
        let (width, height) = (self.decoded.width(), self.decoded.height());

        if let Some(info) = self.stream_info.as_mut() {
            if info.width != width || info.height != height {
                log::warn!(
                    "Resolution changed mid-stream from {}x{} to {width}x{height}",
                    info.width,
                    info.height,
                );
                info.width = width;
                info.height = height;
            }
            return;
        }

        let info = StreamInfo {
            decoder_name: self.decoder_name.clone(),
            decoder_long_name: self.decoder_long_name.clone(),
            width,
            height,
            source_pixel_format: format!("{:?}", self.decoded.format()),
        };
        log::info!(
            "Codec: {}, {}x{} ({})",
            info.decoder_long_name,
            info.width,
            info.height,
            info.source_pixel_format,
        );
        if let Some((hint_width, hint_height)) =
            self.options.size_hint.filter(|&hint| hint != (width, height))
        {
            log::debug!(
                "Stream resolution {width}x{height} differs from size hint \
                 {hint_width}x{hint_height}"
            );
        }
        self.options.observer.on_stream_info(&info);
        self.stream_info = Some(info);
    }
}

/// Receive attempts at end of stream before giving up on a decoder that
/// keeps reporting errors.
const MAX_DRAIN_ATTEMPTS: usize = 8;

/// Allocate a codec context bound to `codec`.
fn allocate_context(codec: Codec, kind: CodecKind) -> Result<CodecContext, UnspoolError> {
    let pointer = unsafe { ffmpeg_sys_next::avcodec_alloc_context3(codec.as_ptr()) };
    if pointer.is_null() {
        return Err(UnspoolError::ContextAllocation(kind.decoder_name().to_string()));
    }
    // The wrapper frees the context with `avcodec_free_context` on drop.
    Ok(unsafe { CodecContext::wrap(pointer, None) })
}
