//! Driver loop integration tests.

mod common;

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use unspool::{
    CancellationToken, DecodeSession, DriverOptions, ProgressCallback, ProgressInfo, StopReason,
    UnspoolError, decode_file, driver,
};

use common::{
    CountingReader, StreamShape, damage_picture, encode_mpeg2, end_sequence_after, luma_level,
    mean, mpeg2_options, strict_mpeg2_options,
};

#[derive(Default)]
struct RecordingProgress {
    infos: Mutex<Vec<ProgressInfo>>,
}

impl ProgressCallback for RecordingProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.infos.lock().unwrap().push(info.clone());
    }
}

#[test]
fn zero_byte_input_writes_nothing() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = dir.path().join("empty.m2v");
    let output = dir.path().join("empty.yuv");
    std::fs::write(&input, b"").expect("write input");

    let summary = decode_file(&input, &output, mpeg2_options(), &DriverOptions::new())
        .expect("decode empty file");

    assert_eq!(summary.frames_written, 0);
    assert_eq!(summary.chunks_read, 0);
    assert_eq!(summary.stop_reason, StopReason::EndOfInput);
    assert!(summary.stream.is_none());
    assert_eq!(std::fs::metadata(&output).expect("output exists").len(), 0);
}

#[test]
fn single_intra_picture_yields_one_frame() {
    let Some(stream) = encode_mpeg2(StreamShape::new(480, 272, 1)) else {
        return;
    };

    let dir = tempfile::tempdir().expect("temp dir");
    let input = dir.path().join("single.m2v");
    let output = dir.path().join("single.yuv");
    std::fs::write(&input, &stream).expect("write input");

    let summary = decode_file(&input, &output, mpeg2_options(), &DriverOptions::new())
        .expect("decode single picture");

    assert_eq!(summary.frames_written, 1);
    assert_eq!(summary.bytes_written, 195_840);
    assert_eq!(std::fs::metadata(&output).expect("output exists").len(), 195_840);

    let stream_info = summary.stream.expect("stream info");
    assert_eq!((stream_info.width, stream_info.height), (480, 272));
}

#[test]
fn output_is_whole_frames() {
    let Some(stream) = encode_mpeg2(StreamShape::new(128, 80, 10).gop(5).b_frames(1)) else {
        return;
    };

    let mut session = DecodeSession::open(mpeg2_options()).expect("open session");
    let mut output = Vec::new();
    let options = DriverOptions::new().with_chunk_size(1000);

    let summary = driver::run(&mut session, Cursor::new(&stream), &mut output, &options)
        .expect("run driver");

    assert_eq!(summary.frames_written, 10);
    assert_eq!(output.len() as u64, summary.bytes_written);
    assert_eq!(output.len(), 10 * 128 * 80 * 3 / 2);
    assert_eq!(summary.chunks_read as usize, stream.len().div_ceil(1000));
    assert_eq!(summary.failed_chunks, 0);
}

#[test]
fn damaged_unit_fails_its_chunk_only() {
    let Some(mut stream) = encode_mpeg2(StreamShape::new(64, 48, 12).gop(1)) else {
        return;
    };
    assert!(damage_picture(&mut stream, 4), "stream has a fifth picture");
    // The failed chunk's remainder is then only stuffing.
    let stream = end_sequence_after(&stream, 4, 256).expect("stream has a fifth picture");

    let mut session = DecodeSession::open(strict_mpeg2_options()).expect("open session");
    let mut output = Vec::new();
    let options = DriverOptions::new().with_chunk_size(64);

    let summary = driver::run(&mut session, Cursor::new(&stream), &mut output, &options)
        .expect("recoverable errors do not stop the run");

    assert!(summary.failed_chunks >= 1, "no chunk failed: {summary:?}");
    assert_eq!(summary.stop_reason, StopReason::EndOfInput);
    assert!(summary.frames_written >= 8, "only {} frames written", summary.frames_written);

    let frame_size = 64 * 48 * 3 / 2;
    assert_eq!(output.len() as u64, summary.frames_written * frame_size as u64);

    // Pictures after the damaged one still reach the output.
    let last = &output[output.len() - frame_size..];
    let luma = mean(&last[..64 * 48]);
    let expected = luma_level(11) as f64;
    assert!(
        (luma - expected).abs() < 6.0,
        "last frame luma {luma:.1}, expected about {expected}"
    );
}

#[test]
fn frame_limit_stops_reading_early() {
    let Some(stream) = encode_mpeg2(StreamShape::new(176, 144, 10).gop(1)) else {
        return;
    };

    let mut session = DecodeSession::open(mpeg2_options()).expect("open session");
    let mut reader = CountingReader::new(Cursor::new(&stream));
    let mut output = Vec::new();
    let progress = Arc::new(RecordingProgress::default());
    let options = DriverOptions::new()
        .with_chunk_size(512)
        .with_frame_limit(3)
        .with_progress(progress.clone());

    let summary = driver::run(&mut session, &mut reader, &mut output, &options)
        .expect("run driver");

    assert_eq!(summary.stop_reason, StopReason::FrameLimit);
    assert_eq!(summary.frames_written, 3);
    assert_eq!(output.len(), 3 * 176 * 144 * 3 / 2);
    assert!(
        reader.bytes_read < stream.len(),
        "read {} of {} bytes",
        reader.bytes_read,
        stream.len()
    );

    let infos = progress.infos.lock().unwrap();
    let last = infos.last().expect("progress reported");
    assert_eq!(last.frames_written, 3);
    assert_eq!(last.frame_limit, Some(3));
    assert_eq!(last.percentage, Some(100.0));
}

#[test]
fn cancelled_run_returns_error() {
    let token = CancellationToken::new();
    token.cancel();

    let mut session = DecodeSession::open(mpeg2_options()).expect("open session");
    let options = DriverOptions::new().with_cancellation(token);
    let result = driver::run(&mut session, Cursor::new(vec![0u8; 64]), Vec::new(), &options);

    match result {
        Err(UnspoolError::Cancelled) => {}
        other => panic!("Expected Cancelled, got: {other:?}"),
    }
}

#[test]
fn missing_input_is_a_file_open_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = dir.path().join("does_not_exist.m2v");
    let output = dir.path().join("never.yuv");

    match decode_file(&input, &output, mpeg2_options(), &DriverOptions::new()) {
        Err(UnspoolError::FileOpen { path, .. }) => assert_eq!(path, input),
        other => panic!("Expected FileOpen, got: {other:?}"),
    }
    assert!(!output.exists(), "output must not be created when the input is missing");
}

#[test]
fn unwritable_output_is_a_file_open_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = dir.path().join("input.m2v");
    std::fs::write(&input, b"\0\0\x01\xb3").expect("write input");
    let output = dir.path().join("missing_dir").join("out.yuv");

    match decode_file(&input, &output, mpeg2_options(), &DriverOptions::new()) {
        Err(UnspoolError::FileOpen { path, .. }) => assert_eq!(path, output),
        other => panic!("Expected FileOpen, got: {other:?}"),
    }
}
