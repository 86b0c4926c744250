use std::{path::PathBuf, sync::Arc};

use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use unspool::{
    AccessUnitInfo, CodecKind, DEFAULT_OUTPUT_PATH, DecodeErrorPolicy, DecodeObserver,
    DecodeOptions, DecodeSummary, DriverOptions, FfmpegLogLevel, ProgressCallback, ProgressInfo,
    StopReason, StreamInfo,
};

const CLI_AFTER_HELP: &str = "Examples:\n  unspool\n  unspool input.hevc output.yuv 100\n  unspool input.m2v frames.yuv --strict --skip-corrupt --progress --quiet\n  unspool input.264 --codec h264 --log-level warning --json\n  unspool --completions zsh > _unspool";

#[derive(Debug, Parser)]
#[command(
    name = "unspool",
    version,
    about = "Decode a raw H.264, HEVC, or MPEG-2 bitstream into planar YUV 4:2:0 frames",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    /// Input elementary stream. Defaults to the codec's sample file.
    input: Option<PathBuf>,

    /// Output file for the raw YUV frames.
    output: Option<PathBuf>,

    /// Stop after this many frames (0 = no limit).
    #[arg(default_value_t = 0)]
    frame_count: u64,

    /// Codec of the input (h264, hevc, mpeg2video). Inferred from the input extension if omitted.
    #[arg(long)]
    codec: Option<CodecKind>,

    /// Bytes read from the input per iteration.
    #[arg(long, default_value_t = unspool::DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long)]
    log_level: Option<FfmpegLogLevel>,

    /// Drop access units the decoder rejects instead of abandoning the chunk.
    #[arg(long)]
    skip_corrupt: bool,

    /// Treat damaged pictures as decode errors instead of concealing them.
    #[arg(long)]
    strict: bool,

    /// Bound the number of decoded frames held before writing.
    #[arg(long)]
    max_queued: Option<usize>,

    /// Expected resolution as WIDTHxHEIGHT. Advisory only.
    #[arg(long, value_parser = parse_size_hint)]
    size_hint: Option<(u32, u32)>,

    /// Show a progress bar instead of per-frame lines.
    #[arg(long)]
    progress: bool,

    /// Suppress per-access-unit and per-frame output.
    #[arg(long)]
    quiet: bool,

    /// Print the final summary as JSON.
    #[arg(long)]
    json: bool,

    /// Print a shell completion script and exit.
    #[arg(long, value_enum, value_name = "SHELL")]
    completions: Option<Shell>,
}

fn parse_size_hint(value: &str) -> Result<(u32, u32), String> {
    let (width, height) = value
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {value:?}"))?;

    let width: u32 = width
        .parse()
        .map_err(|_| format!("invalid width in {value:?}"))?;
    let height: u32 = height
        .parse()
        .map_err(|_| format!("invalid height in {value:?}"))?;

    if width == 0 || height == 0 {
        return Err(format!("dimensions must be non-zero, got {value:?}"));
    }
    Ok((width, height))
}

/// Terminal reporting for both access-unit diagnostics and written frames.
struct Console {
    bar: Option<ProgressBar>,
    quiet: bool,
}

impl Console {
    fn new(
        progress: bool,
        quiet: bool,
        frame_limit: Option<u64>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let bar = if progress {
            let bar = match frame_limit {
                Some(limit) => {
                    let bar = ProgressBar::new(limit);
                    bar.set_style(
                        ProgressStyle::with_template(
                            "{spinner:.green} {bar:40.cyan/blue} {pos}/{len} frames {msg}",
                        )?
                        .progress_chars("##-"),
                    );
                    bar
                }
                None => {
                    let bar = ProgressBar::new_spinner();
                    bar.set_style(ProgressStyle::with_template(
                        "{spinner:.green} {pos} frames {msg}",
                    )?);
                    bar
                }
            };
            Some(bar)
        } else {
            None
        };

        Ok(Self { bar, quiet })
    }

    fn line(&self, text: String) {
        match &self.bar {
            Some(bar) => bar.println(text),
            None => println!("{text}"),
        }
    }

    fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_with_message("done");
        }
    }
}

impl DecodeObserver for Console {
    fn on_access_unit(&self, info: &AccessUnitInfo) {
        if self.quiet {
            return;
        }
        self.line(format!(
            "{} size: {:6}  type: {:5}  number: {:4}",
            "[unit]".dimmed(),
            info.size,
            info.picture_type,
            info.picture_number,
        ));
    }

    fn on_stream_info(&self, info: &StreamInfo) {
        self.line(format!("{} {}", "codec:".cyan().bold(), info.decoder_long_name));
        self.line(format!(
            "{} {}x{}",
            "resolution:".cyan().bold(),
            info.width,
            info.height,
        ));
    }
}

impl ProgressCallback for Console {
    fn on_progress(&self, info: &ProgressInfo) {
        if let Some(bar) = &self.bar {
            bar.set_position(info.frames_written);
            return;
        }
        if !self.quiet && info.frames_written > 0 {
            println!("{} {}", "decoded frame".green(), info.frames_written);
        }
    }
}

fn print_summary(
    summary: &DecodeSummary,
    output: &std::path::Path,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        let payload = json!({
            "output": output.display().to_string(),
            "frames_written": summary.frames_written,
            "bytes_written": summary.bytes_written,
            "chunks_read": summary.chunks_read,
            "failed_chunks": summary.failed_chunks,
            "stop_reason": match summary.stop_reason {
                StopReason::EndOfInput => "end_of_input",
                StopReason::FrameLimit => "frame_limit",
            },
            "stream": summary.stream.as_ref().map(|stream| json!({
                "decoder": stream.decoder_name,
                "decoder_long_name": stream.decoder_long_name,
                "width": stream.width,
                "height": stream.height,
                "source_pixel_format": stream.source_pixel_format,
                "frame_size": stream.frame_size(),
            })),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    if summary.failed_chunks > 0 {
        eprintln!(
            "{} {}",
            "warning:".yellow().bold(),
            format!("{} chunk(s) hit decode errors", summary.failed_chunks).yellow()
        );
    }
    println!(
        "{} {}",
        "success:".green().bold(),
        format!(
            "Succeed to decode {} frame(s) into {}",
            summary.frames_written,
            output.display()
        )
        .green()
    );
    if let Some(stream) = &summary.stream {
        println!(
            "Frames are {}x{} planar YUV 4:2:0, {} bytes each",
            stream.width,
            stream.height,
            stream.frame_size(),
        );
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        let mut command = Cli::command();
        clap_complete::generate(shell, &mut command, "unspool", &mut std::io::stdout());
        return Ok(());
    }

    let codec = cli
        .codec
        .or_else(|| cli.input.as_deref().and_then(CodecKind::from_extension))
        .unwrap_or_default();
    let input = cli
        .input
        .clone()
        .unwrap_or_else(|| PathBuf::from(codec.sample_input()));
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_PATH));

    let log_level = match (cli.log_level, cli.quiet) {
        (Some(level), _) => level,
        (None, true) => FfmpegLogLevel::Error,
        (None, false) => FfmpegLogLevel::Debug,
    };

    let frame_limit = (cli.frame_count > 0).then_some(cli.frame_count);
    let console = Arc::new(Console::new(cli.progress, cli.quiet, frame_limit)?);

    let mut decode_options = DecodeOptions::new()
        .with_codec(codec)
        .with_ffmpeg_log_level(Some(log_level))
        .with_queue_capacity(cli.max_queued)
        .with_strict_errors(cli.strict)
        .with_observer(console.clone());
    if cli.skip_corrupt {
        decode_options = decode_options.with_error_policy(DecodeErrorPolicy::SkipUnit);
    }
    if let Some((width, height)) = cli.size_hint {
        decode_options = decode_options.with_size_hint(width, height);
    }

    let driver_options = DriverOptions::new()
        .with_chunk_size(cli.chunk_size)
        .with_frame_limit(cli.frame_count)
        .with_progress(console.clone());

    if !cli.quiet && !cli.json {
        eprintln!(
            "{} {} ({}) -> {}",
            "decoding".cyan().bold(),
            input.display(),
            codec,
            output.display(),
        );
    }

    let result = unspool::decode_file(&input, &output, decode_options, &driver_options);
    console.finish();
    let summary = result?;

    print_summary(&summary, &output, cli.json)
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}
