//! # unspool
//!
//! Unspool raw elementary video bitstreams into planar YUV 4:2:0 frames.
//!
//! `unspool` reads an H.264, HEVC, or MPEG-2 elementary stream (no
//! container), splits it into access units with libavcodec's parser,
//! decodes each unit, and hands back tightly packed `Y`, `U`, `V` planes,
//! powered by FFmpeg via the
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate.
//!
//! ## Quick Start
//!
//! ### Decode a File
//!
//! ```no_run
//! use unspool::{CodecKind, DecodeOptions, DriverOptions, decode_file};
//!
//! let summary = decode_file(
//!     "bigbuckbunny_480x272.h264",
//!     "bigbuckbunny_480x272.yuv",
//!     DecodeOptions::new().with_codec(CodecKind::H264),
//!     &DriverOptions::new(),
//! )
//! .unwrap();
//! println!("{} frames", summary.frames_written);
//! ```
//!
//! ### Drive a Session Yourself
//!
//! ```no_run
//! use unspool::{CodecKind, DecodeOptions, DecodeSession};
//!
//! let options = DecodeOptions::new().with_codec(CodecKind::Hevc);
//! let mut session = DecodeSession::open(options).unwrap();
//! for chunk in std::fs::read("input.hevc").unwrap().chunks(64 * 1024) {
//!     session.decode(chunk).unwrap();
//!     while let Some(frame) = session.pop_frame() {
//!         let luma = frame.plane(0);
//!         println!("frame {}: {} luma bytes", frame.sequence(), luma.len());
//!     }
//! }
//! session.flush().unwrap();
//! ```
//!
//! ## Features
//!
//! - **Access-unit parsing** of raw bitstreams fed in arbitrary chunks
//! - **Planar 4:2:0 extraction** with stride removal, and conversion from
//!   other pixel formats through the software scaler
//! - **Frame queue** with an optional bound
//! - **Error policy**: abort the chunk or skip the bad access unit
//! - **Progress, diagnostics, and cancellation** via callbacks and
//!   `CancellationToken`
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system. See the
//! [README](https://github.com/skanderjeddi/unspool#installation) for
//! platform-specific instructions.

pub mod codec;
pub mod config;
pub mod driver;
pub mod error;
pub mod extract;
pub mod ffmpeg;
pub mod frame;
pub mod parser;
pub mod progress;
pub mod queue;
pub mod session;

pub use codec::{CodecKind, DEFAULT_OUTPUT_PATH};
pub use config::{DEFAULT_CHUNK_SIZE, DecodeErrorPolicy, DecodeOptions, DriverOptions};
pub use driver::{DecodeSummary, StopReason, decode_file};
pub use error::UnspoolError;
pub use extract::{FrameExtractor, extract_planes, is_planar_yuv420};
pub use ffmpeg::{FfmpegLogLevel, get_ffmpeg_log_level, set_ffmpeg_log_level};
pub use frame::{ExtractedFrame, planar_frame_size, plane_dimensions};
pub use parser::{AccessUnit, AccessUnitInfo, PaddedBuffer, PictureType, StreamParser};
pub use progress::{CancellationToken, DecodeObserver, ProgressCallback, ProgressInfo};
pub use queue::FrameQueue;
pub use session::{DecodeSession, StreamInfo};
