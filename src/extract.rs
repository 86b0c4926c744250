//! Plane extraction from decoded frames.
//!
//! Decoders hand out frames whose rows are padded for alignment: the
//! distance between two rows (the stride, or linesize) is often larger than
//! the visible width. [`extract_planes`] walks each plane row by row and
//! packs only the visible bytes into a caller buffer. [`FrameExtractor`]
//! adds allocation and a pixel-format conversion step for decoders that do
//! not output 8-bit 4:2:0.

use ffmpeg_next::{
    format::Pixel,
    frame::Video as VideoFrame,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};

use crate::error::UnspoolError;
use crate::frame::{ExtractedFrame, plane_dimensions, planar_frame_size};

/// Returns `true` for the pixel formats [`extract_planes`] copies directly.
pub fn is_planar_yuv420(format: Pixel) -> bool {
    matches!(format, Pixel::YUV420P | Pixel::YUVJ420P)
}

/// Copy the three planes of an 8-bit 4:2:0 frame into `dest`, dropping
/// row padding.
///
/// For each plane, `height >> shift` rows of `width >> shift` bytes are
/// copied, where `shift` is 0 for luma and 1 for chroma. Extracting the
/// same frame twice produces identical bytes.
///
/// # Errors
///
/// - [`UnspoolError::InvalidFrame`] if the frame has no pixels.
/// - [`UnspoolError::UnsupportedPixelFormat`] unless the frame is
///   `YUV420P` or `YUVJ420P`.
/// - [`UnspoolError::FrameSizeMismatch`] if `dest` is not exactly
///   [`planar_frame_size`] bytes.
pub fn extract_planes(dest: &mut [u8], frame: &VideoFrame) -> Result<(), UnspoolError> {
    let (width, height) = (frame.width(), frame.height());
    if width == 0 || height == 0 || frame.planes() < 3 {
        return Err(UnspoolError::InvalidFrame(format!(
            "decoded frame is {width}x{height} with {} planes",
            frame.planes()
        )));
    }

    if !is_planar_yuv420(frame.format()) {
        return Err(UnspoolError::UnsupportedPixelFormat(format!(
            "{:?}",
            frame.format()
        )));
    }

    let expected = planar_frame_size(width, height);
    if dest.len() != expected {
        return Err(UnspoolError::FrameSizeMismatch {
            expected,
            actual: dest.len(),
        });
    }

    let mut position = 0;
    for plane in 0..3 {
        let (row_width, rows) = plane_dimensions(width, height, plane);
        let stride = frame.stride(plane);
        let source = frame.data(plane);

        if stride == row_width {
            let length = row_width * rows;
            dest[position..position + length].copy_from_slice(&source[..length]);
            position += length;
            continue;
        }

        for row in 0..rows {
            let row_start = row * stride;
            dest[position..position + row_width]
                .copy_from_slice(&source[row_start..row_start + row_width]);
            position += row_width;
        }
    }

    Ok(())
}

/// Allocating extractor with on-demand pixel format conversion.
///
/// Frames already in 8-bit 4:2:0 are copied directly. Anything else
/// (4:2:2, 4:4:4, high bit depth) is first converted to `YUV420P` with a
/// cached software scaler.
pub struct FrameExtractor {
    scaler: Option<CachedScaler>,
    converted: VideoFrame,
}

struct CachedScaler {
    format: Pixel,
    width: u32,
    height: u32,
    context: ScalingContext,
}

impl Default for FrameExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameExtractor {
    /// Create an extractor with no scaler allocated yet.
    pub fn new() -> Self {
        Self {
            scaler: None,
            converted: VideoFrame::empty(),
        }
    }

    /// Copy `frame` into a newly allocated [`ExtractedFrame`].
    pub fn extract(&mut self, frame: &VideoFrame) -> Result<ExtractedFrame, UnspoolError> {
        let (width, height) = (frame.width(), frame.height());
        if width == 0 || height == 0 {
            return Err(UnspoolError::InvalidFrame(format!(
                "decoded frame is {width}x{height}"
            )));
        }

        let mut buffer = vec![0u8; planar_frame_size(width, height)];

        if is_planar_yuv420(frame.format()) {
            extract_planes(&mut buffer, frame)?;
        } else {
            self.convert(frame)?;
            extract_planes(&mut buffer, &self.converted)?;
        }

        ExtractedFrame::new(width, height, buffer)
    }

    fn convert(&mut self, frame: &VideoFrame) -> Result<(), UnspoolError> {
        let (format, width, height) = (frame.format(), frame.width(), frame.height());

        let reusable = self.scaler.as_ref().is_some_and(|cached| {
            cached.format == format && cached.width == width && cached.height == height
        });

        if !reusable {
            log::debug!("Creating scaler {format:?} {width}x{height} -> YUV420P");
            let context = ScalingContext::get(
                format,
                width,
                height,
                Pixel::YUV420P,
                width,
                height,
                ScalingFlags::BILINEAR,
            )
            .map_err(|error| {
                UnspoolError::Scaling(format!("cannot convert {format:?} to YUV420P: {error}"))
            })?;
            self.scaler = Some(CachedScaler {
                format,
                width,
                height,
                context,
            });
            // `run` only allocates an empty destination.
            self.converted = VideoFrame::empty();
        }

        let Some(cached) = self.scaler.as_mut() else {
            return Err(UnspoolError::Scaling("scaler unavailable".to_string()));
        };

        cached
            .context
            .run(frame, &mut self.converted)
            .map_err(|error| UnspoolError::Scaling(format!("conversion failed: {error}")))
    }
}
