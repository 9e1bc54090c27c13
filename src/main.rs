// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use framegrab::{
    BgrFrame, CaptureConfig, CaptureSession, CaptureSource, DecodeConfig, DecodeSession, Error,
};
use framegrab::constants::timing;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "framegrab")]
#[command(about = "Capture or decode video frames over GStreamer")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture frames from a local camera
    Camera {
        /// Video device node (e.g. /dev/video0); omit to autodetect
        #[arg(short, long)]
        device: Option<String>,

        /// Capture width
        #[arg(long, default_value = "1280")]
        width: u32,

        /// Capture height
        #[arg(long, default_value = "720")]
        height: u32,

        /// Capture framerate
        #[arg(long)]
        fps: Option<u32>,

        /// Number of frames to capture (0 runs until interrupted)
        #[arg(short = 'n', long, default_value = "0")]
        frames: u64,

        /// Save the last captured frame here (format from extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Read the full session config from a JSON file instead
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Decode frames from a stream URI or local file
    Play {
        /// rtsp:// URI, file path, or any URI GStreamer can source
        uri: String,

        /// Resize frames to WxH for presentation (e.g. 1280x720)
        #[arg(short, long, value_parser = parse_size)]
        size: Option<(u32, u32)>,

        /// Number of frames to decode (0 runs until EOS or interrupt)
        #[arg(short = 'n', long, default_value = "0")]
        frames: u64,

        /// Save the last decoded frame here (format from extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Read the full session config from a JSON file instead
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got '{}'", value))?;
    let width = w.parse().map_err(|_| format!("bad width '{}'", w))?;
    let height = h.parse().map_err(|_| format!("bad height '{}'", h))?;
    Ok((width, height))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=framegrab=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = Arc::clone(&interrupted);
        ctrlc::set_handler(move || {
            interrupted.store(true, Ordering::SeqCst);
        })?;
    }

    let cli = Cli::parse();
    match cli.command {
        Commands::Camera {
            device,
            width,
            height,
            fps,
            frames,
            output,
            config,
        } => {
            let config = match config {
                Some(path) => read_config(&path)?,
                None => CaptureConfig {
                    source: match device {
                        Some(device) => CaptureSource::V4l2 { device },
                        None => CaptureSource::Auto,
                    },
                    width,
                    height,
                    framerate: fps.or(Some(framegrab::constants::pipeline::DEFAULT_FRAMERATE)),
                    ..CaptureConfig::default()
                },
            };
            let mut session = CaptureSession::create(config)?;
            session.open()?;
            let result = run_loop(frames, output, &interrupted, |timeout| {
                session.capture(timeout)
            });
            session.close();
            result
        }
        Commands::Play {
            uri,
            size,
            frames,
            output,
            config,
        } => {
            let config = match config {
                Some(path) => read_config(&path)?,
                None => DecodeConfig {
                    presentation_size: size,
                    ..DecodeConfig::for_uri(uri)
                },
            };
            let mut session = DecodeSession::create(config)?;
            session.open()?;
            let result = run_loop(frames, output, &interrupted, |timeout| {
                session.capture(timeout)
            });
            session.close();
            result
        }
    }
}

fn read_config<T: serde::de::DeserializeOwned>(
    path: &PathBuf,
) -> Result<T, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Pull frames until the requested count, end of stream, or an interrupt.
fn run_loop(
    max_frames: u64,
    output: Option<PathBuf>,
    interrupted: &AtomicBool,
    mut next_frame: impl FnMut(Duration) -> Result<BgrFrame, Error>,
) -> Result<(), Box<dyn std::error::Error>> {
    let timeout = Duration::from_millis(timing::DEFAULT_CAPTURE_TIMEOUT_MS);
    let mut captured = 0u64;
    let mut last_frame: Option<BgrFrame> = None;

    while !interrupted.load(Ordering::SeqCst) && (max_frames == 0 || captured < max_frames) {
        match next_frame(timeout) {
            Ok(frame) => {
                captured += 1;
                if captured == 1 {
                    info!(width = frame.width, height = frame.height, "first frame");
                }
                last_frame = Some(frame);
            }
            Err(Error::CaptureTimeout) => {
                warn!("no frame within timeout, retrying");
            }
            Err(Error::EndOfStream) => {
                info!(captured, "stream ended");
                break;
            }
            Err(e) => {
                error!(error = %e, "capture failed");
                return Err(e.into());
            }
        }
    }

    info!(captured, "capture loop finished");
    if let Some(path) = output {
        match last_frame {
            Some(frame) => {
                frame.save(&path)?;
                info!(path = %path.display(), "saved last frame");
            }
            None => warn!("no frame captured, nothing to save"),
        }
    }
    Ok(())
}
