//! Shared helpers for integration tests.
//!
//! Streams are generated with FFmpeg's built-in MPEG-2 encoder rather than
//! read from fixture files, so every test can run on a stock FFmpeg build.

#![allow(dead_code)]

use std::io::{self, Read};

use ffmpeg_next::{
    Packet, Rational,
    codec::{Id, context::Context as CodecContext},
    format::Pixel,
    frame::Video as VideoFrame,
};
use unspool::{CodecKind, DecodeOptions, FfmpegLogLevel};

/// Shape of a generated test stream.
#[derive(Debug, Clone, Copy)]
pub struct StreamShape {
    pub width: u32,
    pub height: u32,
    pub frames: usize,
    pub gop: u32,
    pub max_b_frames: usize,
}

impl StreamShape {
    pub fn new(width: u32, height: u32, frames: usize) -> Self {
        Self {
            width,
            height,
            frames,
            gop: 12,
            max_b_frames: 0,
        }
    }

    pub fn gop(mut self, gop: u32) -> Self {
        self.gop = gop;
        self
    }

    pub fn b_frames(mut self, count: usize) -> Self {
        self.max_b_frames = count;
        self
    }
}

/// Flat luma level used for frame `index` of a generated stream.
pub fn luma_level(index: usize) -> u8 {
    (32 + (index * 24) % 192) as u8
}

/// Encode `shape.frames` flat pictures into a raw MPEG-2 elementary stream.
///
/// Frame `i` has luma [`luma_level`]`(i)` and neutral chroma. Returns
/// `None` (after printing why) if the encoder is unavailable.
pub fn encode_mpeg2(shape: StreamShape) -> Option<Vec<u8>> {
    ffmpeg_next::init().ok()?;
    ffmpeg_next::util::log::set_level(ffmpeg_next::util::log::Level::Error);

    let Some(codec) = ffmpeg_next::encoder::find(Id::MPEG2VIDEO) else {
        eprintln!("Skipping: MPEG-2 encoder not available");
        return None;
    };

    let mut encoder = CodecContext::new_with_codec(codec)
        .encoder()
        .video()
        .ok()?;
    encoder.set_width(shape.width);
    encoder.set_height(shape.height);
    encoder.set_format(Pixel::YUV420P);
    encoder.set_time_base(Rational::new(1, 25));
    encoder.set_frame_rate(Some(Rational::new(25, 1)));
    encoder.set_gop(shape.gop);
    encoder.set_max_b_frames(shape.max_b_frames);
    encoder.set_bit_rate(4_000_000);

    let mut encoder = match encoder.open_as(codec) {
        Ok(encoder) => encoder,
        Err(error) => {
            eprintln!("Skipping: cannot open MPEG-2 encoder ({error})");
            return None;
        }
    };

    let mut stream = Vec::new();
    let mut packet = Packet::empty();

    for index in 0..shape.frames {
        let mut frame = VideoFrame::new(Pixel::YUV420P, shape.width, shape.height);
        fill_plane(&mut frame, 0, luma_level(index));
        fill_plane(&mut frame, 1, 128);
        fill_plane(&mut frame, 2, 128);
        frame.set_pts(Some(index as i64));

        encoder.send_frame(&frame).ok()?;
        while encoder.receive_packet(&mut packet).is_ok() {
            stream.extend_from_slice(packet.data().unwrap_or_default());
        }
    }

    encoder.send_eof().ok()?;
    while encoder.receive_packet(&mut packet).is_ok() {
        stream.extend_from_slice(packet.data().unwrap_or_default());
    }

    Some(stream)
}

fn fill_plane(frame: &mut VideoFrame, plane: usize, value: u8) {
    frame.data_mut(plane).fill(value);
}

/// Offsets and codes of every start code (`00 00 01 xx`) in `stream`.
fn start_codes(stream: &[u8]) -> Vec<(usize, u8)> {
    stream
        .windows(4)
        .enumerate()
        .filter(|(_, window)| window[..3] == [0, 0, 1])
        .map(|(offset, window)| (offset, window[3]))
        .collect()
}

/// Offset of the `picture`th picture start code.
fn picture_header(codes: &[(usize, u8)], picture: usize) -> Option<usize> {
    codes
        .iter()
        .filter(|&&(_, code)| code == 0x00)
        .nth(picture)
        .map(|&(offset, _)| offset)
}

/// Damage the first slice of picture `picture` in an MPEG-2 stream.
///
/// The slice's quantiser scale code is zeroed, which every MPEG-2 decoder
/// rejects. No start code is created or destroyed, so the parser still
/// delimits the same access units. Returns `false` if the stream has no
/// such picture.
pub fn damage_picture(stream: &mut [u8], picture: usize) -> bool {
    let codes = start_codes(stream);
    let Some(header) = picture_header(&codes, picture) else {
        return false;
    };

    let slice = codes
        .iter()
        .find(|&&(offset, code)| offset > header && (0x01..=0xAF).contains(&code));
    match slice {
        Some(&(offset, _)) if offset + 4 < stream.len() => {
            // quantiser_scale_code is the top five bits; 0x01 never forms a start code.
            stream[offset + 4] = 0x01;
            true
        }
        _ => false,
    }
}

/// Close the sequence right after picture `picture` and pad with zeros.
///
/// The parser ends an access unit at a sequence end code without waiting
/// for the next start code, so a caller that abandons the rest of a chunk
/// after that unit only loses stuffing bytes. Returns `None` if the stream
/// has no such picture.
pub fn end_sequence_after(stream: &[u8], picture: usize, stuffing: usize) -> Option<Vec<u8>> {
    let codes = start_codes(stream);
    let header = picture_header(&codes, picture)?;
    let boundary = codes
        .iter()
        .find(|&&(offset, code)| offset > header && matches!(code, 0x00 | 0xB3 | 0xB8))
        .map_or(stream.len(), |&(offset, _)| offset);

    let mut patched = Vec::with_capacity(stream.len() + 4 + stuffing);
    patched.extend_from_slice(&stream[..boundary]);
    patched.extend_from_slice(&[0x00, 0x00, 0x01, 0xB7]);
    patched.resize(patched.len() + stuffing, 0x00);
    patched.extend_from_slice(&stream[boundary..]);
    Some(patched)
}

/// Zero the picture coding type of picture `picture` in an MPEG-2 stream.
///
/// The decoder drops the picture's slices without starting a new picture.
pub fn clear_picture_type(stream: &mut [u8], picture: usize) -> bool {
    let codes = start_codes(stream);
    let Some(header) = picture_header(&codes, picture) else {
        return false;
    };
    if header + 5 >= stream.len() {
        return false;
    }
    // Bits 5..3 hold the coding type; bit 0 (vbv_delay) keeps the byte non-zero.
    stream[header + 5] = (stream[header + 5] & !0x38) | 0x01;
    true
}

/// Options for an MPEG-2 session that keeps FFmpeg's own logging quiet.
pub fn mpeg2_options() -> DecodeOptions {
    DecodeOptions::new()
        .with_codec(CodecKind::Mpeg2Video)
        .with_ffmpeg_log_level(Some(FfmpegLogLevel::Error))
}

/// MPEG-2 options whose decoder reports damaged pictures as errors.
pub fn strict_mpeg2_options() -> DecodeOptions {
    mpeg2_options()
        .with_ffmpeg_log_level(Some(FfmpegLogLevel::Quiet))
        .with_strict_errors(true)
}

/// Mean of a byte plane.
pub fn mean(bytes: &[u8]) -> f64 {
    if bytes.is_empty() {
        return 0.0;
    }
    bytes.iter().map(|&byte| byte as f64).sum::<f64>() / bytes.len() as f64
}

/// Reader that counts how many bytes were handed out.
pub struct CountingReader<R> {
    inner: R,
    pub bytes_read: usize,
}

impl<R> CountingReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            bytes_read: 0,
        }
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        let count = self.inner.read(buffer)?;
        self.bytes_read += count;
        Ok(count)
    }
}
