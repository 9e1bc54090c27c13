// SPDX-License-Identifier: GPL-3.0-only

//! framegrab - capture and decode sessions over GStreamer
//!
//! This library is a small abstraction over a streaming video pipeline: it
//! opens a device or network video source, receives decoded NV12 frame
//! buffers on the pipeline's delivery thread, converts them to interleaved
//! BGR, and hands them to the caller through a bounded queue.
//!
//! # Architecture
//!
//! - [`session`]: the capture/decode session lifecycle (open, close, capture)
//! - [`pipeline`]: declarative pipeline description builders and launch
//! - [`convert`]: NV12 to BGR conversion and presentation resize
//! - [`frame`]: the converted frame type and pixel format tags
//! - [`engine`]: process-wide GStreamer initialization
//! - [`config`]: session configuration types
//!
//! # Example
//!
//! ```no_run
//! use framegrab::{CaptureConfig, CaptureSession};
//! use std::time::Duration;
//!
//! let mut session = CaptureSession::create(CaptureConfig::default())?;
//! session.open()?;
//! let frame = session.capture(Duration::from_secs(2))?;
//! println!("{}x{}", frame.width, frame.height);
//! session.close();
//! # Ok::<(), framegrab::Error>(())
//! ```

pub mod config;
pub mod constants;
pub mod convert;
pub mod engine;
pub mod error;
pub mod frame;
pub mod pipeline;
pub mod session;

// Re-export commonly used types
pub use config::{CaptureConfig, CaptureSource, DecodeConfig, EosPolicy};
pub use error::Error;
pub use frame::{BgrFrame, PixelFormat};
pub use session::extract::{ExtractError, frame_from_sample};
pub use session::{CaptureSession, DecodeSession, FrameSink, SessionStats, SessionStatus};
