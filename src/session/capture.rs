// SPDX-License-Identifier: GPL-3.0-only

//! Live capture session over a camera or caller-supplied source

use super::{FrameSink, PipelineSession, SessionOptions, SessionStats, SessionStatus};
use crate::config::{CaptureConfig, CaptureSource};
use crate::error::Result;
use crate::frame::BgrFrame;
use crate::pipeline;
use std::time::Duration;
use tracing::info;

/// A session that pulls frames from a live video source.
///
/// The pipeline prerolls through Paused before Playing, which is where live
/// sources negotiate caps and start their capture threads.
pub struct CaptureSession {
    inner: PipelineSession,
    config: CaptureConfig,
}

impl CaptureSession {
    /// Build and launch the capture pipeline. The session starts in NULL;
    /// call [`open`](Self::open) or the first [`capture`](Self::capture) to
    /// start frame delivery.
    pub fn create(config: CaptureConfig) -> Result<Self> {
        let description = pipeline::capture_description(&config);
        info!(
            source = ?config.source,
            width = config.width,
            height = config.height,
            "creating capture session"
        );

        let opts = SessionOptions {
            eos_policy: config.eos_policy,
            queue_capacity: config.queue_capacity,
            state_change_timeout: Duration::from_millis(config.state_change_timeout_ms),
            pause_before_play: !matches!(config.source, CaptureSource::Custom(_)),
            presentation_size: None,
        };
        let inner = PipelineSession::create(&description, &config.sink_name, opts)?;

        Ok(Self { inner, config })
    }

    /// Start frame delivery. Idempotent while playing.
    pub fn open(&mut self) -> Result<()> {
        self.inner.open()
    }

    /// Wait up to `timeout` for the next frame. Opens the session first when
    /// it was never opened.
    pub fn capture(&mut self, timeout: Duration) -> Result<BgrFrame> {
        self.inner.capture(timeout)
    }

    /// Stop delivery and tear the pipeline down. Idempotent; also runs on
    /// drop.
    pub fn close(&mut self) {
        self.inner.close();
    }

    pub fn status(&self) -> SessionStatus {
        self.inner.status()
    }

    pub fn stats(&self) -> SessionStats {
        self.inner.stats()
    }

    /// Install a delivery-thread observer for every converted frame.
    pub fn set_frame_sink(&self, sink: Box<dyn FrameSink>) {
        self.inner.set_frame_sink(sink);
    }

    /// The underlying pipeline, for callers that need direct element access.
    pub fn pipeline(&self) -> &gstreamer::Pipeline {
        self.inner.pipeline()
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }
}
