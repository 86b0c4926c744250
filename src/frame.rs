//! Owned planar 4:2:0 frames.
//!
//! An [`ExtractedFrame`] is the unit that moves from the decoder to the
//! caller: a tightly packed luma plane followed by the two chroma planes at
//! half resolution in each dimension. The type is move-only so a buffer has
//! exactly one owner at a time, whether that is the
//! [`FrameQueue`](crate::FrameQueue) or the code that popped it.

use crate::error::UnspoolError;

/// Dimensions `(width, height)` of plane `plane` (0 = Y, 1 = U, 2 = V) in a
/// frame of `width × height`.
///
/// Chroma dimensions are the luma dimensions shifted right by one, so odd
/// sizes round down.
pub fn plane_dimensions(width: u32, height: u32, plane: usize) -> (usize, usize) {
    let shift = if plane == 0 { 0 } else { 1 };
    ((width >> shift) as usize, (height >> shift) as usize)
}

/// Number of bytes in a packed planar 4:2:0 frame of `width × height`.
///
/// Equal to `width * height * 3 / 2` whenever both dimensions are even.
pub fn planar_frame_size(width: u32, height: u32) -> usize {
    (0..3)
        .map(|plane| {
            let (plane_width, plane_height) = plane_dimensions(width, height, plane);
            plane_width * plane_height
        })
        .sum()
}

/// A decoded frame copied out of codec memory.
///
/// The buffer length always equals [`planar_frame_size`] for the frame's
/// dimensions.
#[derive(Debug, PartialEq, Eq)]
pub struct ExtractedFrame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    sequence: u64,
}

impl ExtractedFrame {
    /// Wrap a packed planar buffer.
    ///
    /// # Errors
    ///
    /// Returns [`UnspoolError::InvalidFrame`] for a zero dimension and
    /// [`UnspoolError::FrameSizeMismatch`] when `data` is not exactly one
    /// frame long.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, UnspoolError> {
        if width == 0 || height == 0 {
            return Err(UnspoolError::InvalidFrame(format!(
                "frame dimensions must be non-zero, got {width}x{height}"
            )));
        }

        let expected = planar_frame_size(width, height);
        if data.len() != expected {
            return Err(UnspoolError::FrameSizeMismatch {
                expected,
                actual: data.len(),
            });
        }

        Ok(Self {
            data,
            width,
            height,
            sequence: 0,
        })
    }

    pub(crate) fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    /// Luma width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Luma height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Zero-based position of this frame in the decoder's emission order.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Total size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always `false`: frames have non-zero dimensions.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The whole packed frame, Y then U then V.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// A single plane (0 = Y, 1 = U, 2 = V).
    ///
    /// # Panics
    ///
    /// Panics if `plane > 2`.
    pub fn plane(&self, plane: usize) -> &[u8] {
        assert!(plane < 3, "planar 4:2:0 frames have three planes");
        let offset: usize = (0..plane)
            .map(|index| {
                let (w, h) = plane_dimensions(self.width, self.height, index);
                w * h
            })
            .sum();
        let (w, h) = plane_dimensions(self.width, self.height, plane);
        &self.data[offset..offset + w * h]
    }

    /// Give up the frame and keep the buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

impl AsRef<[u8]> for ExtractedFrame {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}
