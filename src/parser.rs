//! Access-unit parsing for raw elementary streams.
//!
//! A raw bitstream has no container to say where one coded picture ends
//! and the next begins. libavcodec's parsers find those boundaries by
//! scanning for start codes, buffering partial pictures across calls.
//! `ffmpeg-next` does not wrap the parser API, so [`StreamParser`] owns an
//! `AVCodecParserContext` through `ffmpeg-sys-next` and closes it on drop.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::os::raw::c_int;
use std::{ptr, slice};

use ffmpeg_next::codec::context::Context as CodecContext;
use ffmpeg_sys_next::{
    AV_INPUT_BUFFER_PADDING_SIZE, AV_NOPTS_VALUE, AVCodecID, AVCodecParserContext, AVPictureType,
};

use crate::codec::CodecKind;
use crate::error::UnspoolError;

/// Zeroed bytes FFmpeg requires after the end of any parser input.
pub const INPUT_PADDING: usize = AV_INPUT_BUFFER_PADDING_SIZE as usize;

/// Coding type of a parsed picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PictureType {
    /// Intra-coded picture (I).
    Intra,
    /// Forward-predicted picture (P).
    Predicted,
    /// Bidirectionally predicted picture (B).
    Bidirectional,
    /// Anything else, or not reported by the parser.
    Other,
}

impl PictureType {
    fn from_raw(value: c_int) -> Self {
        if value == AVPictureType::AV_PICTURE_TYPE_I as c_int {
            PictureType::Intra
        } else if value == AVPictureType::AV_PICTURE_TYPE_P as c_int {
            PictureType::Predicted
        } else if value == AVPictureType::AV_PICTURE_TYPE_B as c_int {
            PictureType::Bidirectional
        } else {
            PictureType::Other
        }
    }

    /// Single-letter label (`I`, `P`, `B`) or `Other`.
    pub fn label(self) -> &'static str {
        match self {
            PictureType::Intra => "I",
            PictureType::Predicted => "P",
            PictureType::Bidirectional => "B",
            PictureType::Other => "Other",
        }
    }
}

impl Display for PictureType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.pad(self.label())
    }
}

/// Diagnostic details of one access unit, as reported by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessUnitInfo {
    /// Zero-based index of the unit within the session.
    pub index: u64,
    /// Size of the unit in bytes.
    pub size: usize,
    /// Picture coding type.
    pub picture_type: PictureType,
    /// Output picture number, when the codec's parser tracks it.
    pub picture_number: i32,
    /// Whether the parser flagged a key frame. `None` if unknown.
    pub key_frame: Option<bool>,
}

/// One parser-delimited unit of compressed data.
///
/// Borrows either the caller's input or the parser's internal buffer and
/// is only valid until the next parse call.
#[derive(Debug)]
pub struct AccessUnit<'a> {
    /// Compressed bytes of the unit.
    pub data: &'a [u8],
    /// Parser diagnostics for the unit.
    pub info: AccessUnitInfo,
}

/// Result of a single parser invocation.
#[derive(Debug)]
pub struct ParseOutput<'a> {
    /// Input bytes consumed by this call.
    pub consumed: usize,
    /// A complete access unit, if one was delimited.
    pub unit: Option<AccessUnit<'a>>,
}

/// Byte buffer followed by [`INPUT_PADDING`] zeroed bytes.
///
/// Parsers may read a little past the logical end of their input, so
/// [`StreamParser::parse`] only accepts input held in this type.
#[derive(Debug, Default)]
pub struct PaddedBuffer {
    bytes: Vec<u8>,
    len: usize,
}

impl PaddedBuffer {
    /// An empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents with `data` and re-zero the padding.
    pub fn fill(&mut self, data: &[u8]) {
        self.bytes.clear();
        self.bytes.reserve(data.len() + INPUT_PADDING);
        self.bytes.extend_from_slice(data);
        self.bytes.resize(data.len() + INPUT_PADDING, 0);
        self.len = data.len();
    }

    /// Logical length, padding excluded.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the logical contents are empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Logical contents, padding excluded.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

/// Owned libavcodec stream parser.
///
/// Keeps partial access units between calls, so one parser must see the
/// whole stream in order.
pub struct StreamParser {
    context: *mut AVCodecParserContext,
    codec: CodecKind,
    units: u64,
}

impl StreamParser {
    /// Create a parser for `codec`.
    ///
    /// # Errors
    ///
    /// [`UnspoolError::ParserInit`] if FFmpeg has no parser for the codec.
    pub fn new(codec: CodecKind) -> Result<Self, UnspoolError> {
        let codec_id: AVCodecID = codec.id().into();
        let context = unsafe { ffmpeg_sys_next::av_parser_init(codec_id as c_int) };
        if context.is_null() {
            return Err(UnspoolError::ParserInit(codec.decoder_name().to_string()));
        }

        log::debug!("Initialised {codec} stream parser");
        Ok(Self {
            context,
            codec,
            units: 0,
        })
    }

    /// Codec this parser was created for.
    pub fn codec(&self) -> CodecKind {
        self.codec
    }

    /// Number of access units delimited so far.
    pub fn units_parsed(&self) -> u64 {
        self.units
    }

    /// Parse `input` from byte `offset` onwards.
    ///
    /// Returns how many bytes were consumed and, when a boundary was found,
    /// the completed access unit. Unconsumed data stays buffered inside the
    /// parser.
    pub fn parse<'p>(
        &'p mut self,
        codec_context: &mut CodecContext,
        input: &'p PaddedBuffer,
        offset: usize,
    ) -> Result<ParseOutput<'p>, UnspoolError> {
        let remaining = input.len().saturating_sub(offset);
        if remaining == 0 {
            return Ok(ParseOutput {
                consumed: 0,
                unit: None,
            });
        }

        let size = c_int::try_from(remaining).unwrap_or(c_int::MAX);
        let data = input.bytes[offset..].as_ptr();
        self.parse_raw(codec_context, data, size)
    }

    /// Signal end of input and return any access unit still buffered.
    ///
    /// Call repeatedly until no unit is returned.
    pub fn flush<'p>(
        &'p mut self,
        codec_context: &mut CodecContext,
    ) -> Result<ParseOutput<'p>, UnspoolError> {
        self.parse_raw(codec_context, ptr::null(), 0)
    }

    fn parse_raw<'p>(
        &'p mut self,
        codec_context: &mut CodecContext,
        data: *const u8,
        size: c_int,
    ) -> Result<ParseOutput<'p>, UnspoolError> {
        let mut out_data: *mut u8 = ptr::null_mut();
        let mut out_size: c_int = 0;

        // The caller guarantees `size` bytes plus padding are readable at
        // `data`, or `size == 0` for a flush.
        let consumed = unsafe {
            ffmpeg_sys_next::av_parser_parse2(
                self.context,
                codec_context.as_mut_ptr(),
                &mut out_data,
                &mut out_size,
                data,
                size,
                AV_NOPTS_VALUE,
                AV_NOPTS_VALUE,
                0,
            )
        };

        if consumed < 0 {
            return Err(UnspoolError::Parse(consumed));
        }

        let unit = if out_size > 0 && !out_data.is_null() {
            let (picture_type, picture_number, key_frame) = unsafe {
                (
                    (*self.context).pict_type,
                    (*self.context).output_picture_number,
                    (*self.context).key_frame,
                )
            };

            let info = AccessUnitInfo {
                index: self.units,
                size: out_size as usize,
                picture_type: PictureType::from_raw(picture_type),
                picture_number,
                key_frame: match key_frame {
                    1 => Some(true),
                    0 => Some(false),
                    _ => None,
                },
            };
            self.units += 1;

            // Valid until the next call on this parser, which needs `&mut self`.
            let data = unsafe { slice::from_raw_parts(out_data as *const u8, out_size as usize) };
            Some(AccessUnit { data, info })
        } else {
            None
        };

        Ok(ParseOutput {
            consumed: consumed as usize,
            unit,
        })
    }
}

impl Drop for StreamParser {
    fn drop(&mut self) {
        unsafe {
            ffmpeg_sys_next::av_parser_close(self.context);
        }
    }
}
