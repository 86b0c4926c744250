//! Plane extraction integration tests.
//!
//! Frames are built in memory with `ffmpeg_next::frame::Video`, so no
//! decoder or fixture is required.

use ffmpeg_next::{format::Pixel, frame::Video as VideoFrame};
use unspool::{FrameExtractor, UnspoolError, extract_planes, is_planar_yuv420, planar_frame_size};

/// Fill each visible row with `row + plane * 64` and each padding byte with 0xEE.
fn patterned_frame(format: Pixel, width: u32, height: u32) -> VideoFrame {
    let mut frame = VideoFrame::new(format, width, height);
    for plane in 0..frame.planes() {
        let stride = frame.stride(plane);
        let visible = frame.plane_width(plane) as usize;
        let rows = frame.plane_height(plane) as usize;
        let data = frame.data_mut(plane);
        for row in 0..rows {
            let line = &mut data[row * stride..(row + 1) * stride];
            line[..visible].fill((row + plane * 64) as u8);
            line[visible..].fill(0xEE);
        }
    }
    frame
}

#[test]
fn strips_row_padding() {
    ffmpeg_next::init().expect("init ffmpeg");
    let frame = patterned_frame(Pixel::YUV420P, 100, 50);
    assert!(frame.stride(0) >= 100);

    let mut dest = vec![0u8; planar_frame_size(100, 50)];
    extract_planes(&mut dest, &frame).expect("extract");

    assert!(!dest.contains(&0xEE), "padding bytes leaked into the output");

    let (luma, chroma) = dest.split_at(100 * 50);
    assert!(luma[..100].iter().all(|&byte| byte == 0));
    assert!(luma[49 * 100..].iter().all(|&byte| byte == 49));

    let (u, v) = chroma.split_at(50 * 25);
    assert!(u[..50].iter().all(|&byte| byte == 64));
    assert!(v[24 * 50..].iter().all(|&byte| byte == 128 + 24));
}

#[test]
fn extraction_is_repeatable() {
    ffmpeg_next::init().expect("init ffmpeg");
    let frame = patterned_frame(Pixel::YUV420P, 64, 36);

    let mut first = vec![0u8; planar_frame_size(64, 36)];
    let mut second = vec![0xFFu8; planar_frame_size(64, 36)];
    extract_planes(&mut first, &frame).expect("first extract");
    extract_planes(&mut second, &frame).expect("second extract");

    assert_eq!(first, second);
}

#[test]
fn wrong_destination_size_is_rejected() {
    ffmpeg_next::init().expect("init ffmpeg");
    let frame = patterned_frame(Pixel::YUV420P, 32, 32);
    let mut dest = vec![0u8; 100];

    match extract_planes(&mut dest, &frame) {
        Err(UnspoolError::FrameSizeMismatch { expected, actual }) => {
            assert_eq!(expected, 1536);
            assert_eq!(actual, 100);
        }
        other => panic!("Expected FrameSizeMismatch, got: {other:?}"),
    }
}

#[test]
fn non_420_input_needs_conversion() {
    ffmpeg_next::init().expect("init ffmpeg");
    let frame = patterned_frame(Pixel::YUV444P, 32, 32);
    assert!(!is_planar_yuv420(frame.format()));

    let mut dest = vec![0u8; planar_frame_size(32, 32)];
    assert!(matches!(
        extract_planes(&mut dest, &frame),
        Err(UnspoolError::UnsupportedPixelFormat(_))
    ));
}

#[test]
fn extractor_converts_444_to_420() {
    ffmpeg_next::init().expect("init ffmpeg");
    let frame = patterned_frame(Pixel::YUV444P, 64, 32);

    let mut extractor = FrameExtractor::new();
    let extracted = extractor.extract(&frame).expect("convert and extract");

    assert_eq!(extracted.width(), 64);
    assert_eq!(extracted.height(), 32);
    assert_eq!(extracted.len(), planar_frame_size(64, 32));
    assert_eq!(extracted.plane(1).len(), 32 * 16);

    // Reusing the cached scaler gives the same bytes.
    let again = extractor.extract(&frame).expect("second conversion");
    assert_eq!(extracted.as_bytes(), again.as_bytes());
}

#[test]
fn extractor_follows_resolution_changes() {
    ffmpeg_next::init().expect("init ffmpeg");
    let mut extractor = FrameExtractor::new();

    let large = extractor
        .extract(&patterned_frame(Pixel::YUV444P, 64, 32))
        .expect("convert 64x32");
    assert_eq!((large.width(), large.height()), (64, 32));

    let small = extractor
        .extract(&patterned_frame(Pixel::YUV444P, 32, 16))
        .expect("convert 32x16 after 64x32");
    assert_eq!((small.width(), small.height()), (32, 16));
    assert_eq!(small.len(), planar_frame_size(32, 16));

    // And back up again.
    let restored = extractor
        .extract(&patterned_frame(Pixel::YUV444P, 64, 32))
        .expect("convert 64x32 again");
    assert_eq!(restored.as_bytes(), large.as_bytes());
}

#[test]
fn extractor_copies_420_directly() {
    ffmpeg_next::init().expect("init ffmpeg");
    let frame = patterned_frame(Pixel::YUVJ420P, 48, 16);

    let extracted = FrameExtractor::default().extract(&frame).expect("extract");
    let mut expected = vec![0u8; planar_frame_size(48, 16)];
    extract_planes(&mut expected, &frame).expect("extract planes");

    assert_eq!(extracted.as_bytes(), expected.as_slice());
}

#[test]
fn empty_frame_is_invalid() {
    ffmpeg_next::init().expect("init ffmpeg");
    let frame = VideoFrame::empty();

    assert!(matches!(
        FrameExtractor::new().extract(&frame),
        Err(UnspoolError::InvalidFrame(_))
    ));
}
