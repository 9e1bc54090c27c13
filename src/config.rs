// SPDX-License-Identifier: GPL-3.0-only

//! Session configuration types

use crate::constants::{pipeline, timing};
use serde::{Deserialize, Serialize};

/// What to do when the source reports end-of-stream
///
/// The pipeline engine keeps its handles alive either way; this only controls
/// whether the session marks itself stopped (so `capture()` reports
/// [`crate::Error::EndOfStream`]) or stays open for a possible seek/resume by
/// the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EosPolicy {
    /// Mark the session stopped when end-of-stream arrives (default)
    #[default]
    StopOnEos,
    /// Leave the session playing; the caller decides what to do
    Resumable,
}

/// Video source selection for a capture session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureSource {
    /// Let GStreamer pick a source element for the platform
    Auto,
    /// A V4L2 device node (e.g. "/dev/video0")
    V4l2 { device: String },
    /// A complete caller-supplied pipeline description. Must terminate in an
    /// appsink registered under the configured sink name.
    Custom(String),
}

impl CaptureSource {
    /// Source for the Nth video device on the system
    pub fn device_index(index: u32) -> Self {
        CaptureSource::V4l2 {
            device: format!("/dev/video{}", index),
        }
    }
}

impl Default for CaptureSource {
    fn default() -> Self {
        CaptureSource::Auto
    }
}

/// Configuration for a live capture session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Video source to open
    pub source: CaptureSource,
    /// Requested capture width
    pub width: u32,
    /// Requested capture height
    pub height: u32,
    /// Requested framerate; None lets the device pick
    pub framerate: Option<u32>,
    /// Name of the appsink element in the pipeline
    pub sink_name: String,
    /// End-of-stream handling
    pub eos_policy: EosPolicy,
    /// Capacity of the converted-frame hand-off queue
    pub queue_capacity: usize,
    /// Bounded wait for state-change confirmation, in milliseconds
    pub state_change_timeout_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            source: CaptureSource::default(),
            width: pipeline::DEFAULT_WIDTH,
            height: pipeline::DEFAULT_HEIGHT,
            framerate: Some(pipeline::DEFAULT_FRAMERATE),
            sink_name: pipeline::DEFAULT_SINK_NAME.to_string(),
            eos_policy: EosPolicy::default(),
            queue_capacity: pipeline::FRAME_QUEUE_CAPACITY,
            state_change_timeout_ms: timing::STATE_CHANGE_TIMEOUT_MS,
        }
    }
}

/// Configuration for a decode session bound to a compressed stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    /// Stream location: an rtsp:// URI, a local file path, or any URI
    /// GStreamer can source
    pub uri: String,
    /// Resize converted frames to this presentation size when the source
    /// resolution differs; None delivers frames at native resolution. Both
    /// dimensions must be nonzero.
    pub presentation_size: Option<(u32, u32)>,
    /// Name of the appsink element in the pipeline
    pub sink_name: String,
    /// End-of-stream handling
    pub eos_policy: EosPolicy,
    /// Capacity of the converted-frame hand-off queue
    pub queue_capacity: usize,
    /// Bounded wait for state-change confirmation, in milliseconds
    pub state_change_timeout_ms: u64,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            uri: String::new(),
            presentation_size: None,
            sink_name: pipeline::DEFAULT_SINK_NAME.to_string(),
            eos_policy: EosPolicy::default(),
            queue_capacity: pipeline::FRAME_QUEUE_CAPACITY,
            state_change_timeout_ms: timing::STATE_CHANGE_TIMEOUT_MS,
        }
    }
}

impl DecodeConfig {
    /// Config for a stream URI with all other settings at their defaults
    pub fn for_uri(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Self::default()
        }
    }
}
