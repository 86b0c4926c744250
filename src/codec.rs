//! Supported elementary-stream codecs.
//!
//! A [`DecodeSession`](crate::DecodeSession) drives exactly one codec family
//! per stream. [`CodecKind`] names the families this crate has a parser and
//! decoder pairing for, and knows how to look the decoder up in FFmpeg.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::Path;
use std::str::FromStr;

use ffmpeg_next::{Codec, codec::Id, decoder};

use crate::error::UnspoolError;

/// Output path used when the caller does not name one.
pub const DEFAULT_OUTPUT_PATH: &str = "bigbuckbunny_480x272.yuv";

/// Codec family of a raw elementary bitstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CodecKind {
    /// H.264 / AVC Annex B byte stream.
    #[default]
    H264,
    /// H.265 / HEVC Annex B byte stream.
    Hevc,
    /// MPEG-2 (or MPEG-1) video elementary stream.
    Mpeg2Video,
}

impl CodecKind {
    /// All supported codecs.
    pub const ALL: [CodecKind; 3] = [CodecKind::H264, CodecKind::Hevc, CodecKind::Mpeg2Video];

    /// FFmpeg codec identifier.
    pub fn id(self) -> Id {
        match self {
            CodecKind::H264 => Id::H264,
            CodecKind::Hevc => Id::HEVC,
            CodecKind::Mpeg2Video => Id::MPEG2VIDEO,
        }
    }

    /// Name of FFmpeg's native software decoder for this codec.
    pub fn decoder_name(self) -> &'static str {
        match self {
            CodecKind::H264 => "h264",
            CodecKind::Hevc => "hevc",
            CodecKind::Mpeg2Video => "mpeg2video",
        }
    }

    /// Sample input read when no input path is given.
    pub fn sample_input(self) -> &'static str {
        match self {
            CodecKind::H264 => "bigbuckbunny_480x272.h264",
            CodecKind::Hevc => "bigbuckbunny_480x272.hevc",
            CodecKind::Mpeg2Video => "bigbuckbunny_480x272.m2v",
        }
    }

    /// Guess the codec from a file extension (`.h264`, `.hevc`, `.m2v`, ...).
    pub fn from_extension(path: impl AsRef<Path>) -> Option<CodecKind> {
        let extension = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "h264" | "264" | "avc" | "jsv" => Some(CodecKind::H264),
            "hevc" | "h265" | "265" => Some(CodecKind::Hevc),
            "m2v" | "mpv" | "mpeg2" | "m1v" => Some(CodecKind::Mpeg2Video),
            _ => None,
        }
    }

    /// Look up the decoder, by name first and by codec id second.
    pub(crate) fn find_decoder(self) -> Result<Codec, UnspoolError> {
        decoder::find_by_name(self.decoder_name())
            .or_else(|| decoder::find(self.id()))
            .ok_or_else(|| UnspoolError::DecoderNotFound(self.decoder_name().to_string()))
    }
}

impl Display for CodecKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.decoder_name())
    }
}

impl FromStr for CodecKind {
    type Err = UnspoolError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "h264" | "avc" | "h.264" => Ok(CodecKind::H264),
            "hevc" | "h265" | "h.265" => Ok(CodecKind::Hevc),
            "mpeg2video" | "mpeg2" | "m2v" => Ok(CodecKind::Mpeg2Video),
            _ => Err(UnspoolError::UnknownCodec(value.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_detection() {
        assert_eq!(CodecKind::from_extension("clip.h264"), Some(CodecKind::H264));
        assert_eq!(CodecKind::from_extension("clip.264"), Some(CodecKind::H264));
        assert_eq!(CodecKind::from_extension("dir/clip.HEVC"), Some(CodecKind::Hevc));
        assert_eq!(CodecKind::from_extension("clip.m2v"), Some(CodecKind::Mpeg2Video));
        assert_eq!(CodecKind::from_extension("clip.mp4"), None);
        assert_eq!(CodecKind::from_extension("clip"), None);
    }

    #[test]
    fn names_parse_back() {
        for codec in CodecKind::ALL {
            assert_eq!(codec.decoder_name().parse::<CodecKind>().unwrap(), codec);
        }
        assert!(matches!(
            "vp9".parse::<CodecKind>(),
            Err(UnspoolError::UnknownCodec(_))
        ));
    }

    #[test]
    fn sample_inputs_match_their_codec() {
        for codec in CodecKind::ALL {
            assert_eq!(CodecKind::from_extension(codec.sample_input()), Some(codec));
        }
    }
}
