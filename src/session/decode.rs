// SPDX-License-Identifier: GPL-3.0-only

//! Decode session over a compressed stream URI

use super::{FrameSink, PipelineSession, SessionOptions, SessionStats, SessionStatus};
use crate::config::DecodeConfig;
use crate::error::{Error, Result};
use crate::frame::BgrFrame;
use crate::pipeline;
use std::time::Duration;
use tracing::info;

/// A session that decodes a network stream or local file.
///
/// Frames are delivered at the source's native resolution unless the config
/// sets a presentation size, in which case each frame is resized after
/// conversion.
pub struct DecodeSession {
    inner: PipelineSession,
    config: DecodeConfig,
}

impl DecodeSession {
    /// Build and launch the decode pipeline for the configured URI.
    ///
    /// Fails with [`Error::InvalidConfig`] when the presentation size has a
    /// zero dimension.
    pub fn create(config: DecodeConfig) -> Result<Self> {
        if let Some((width, height)) = config.presentation_size
            && (width == 0 || height == 0)
        {
            return Err(Error::InvalidConfig(format!(
                "presentation size {}x{} has a zero dimension",
                width, height
            )));
        }

        let description = pipeline::decode_description(&config);
        info!(
            uri = %config.uri,
            presentation_size = ?config.presentation_size,
            "creating decode session"
        );

        let opts = SessionOptions {
            eos_policy: config.eos_policy,
            queue_capacity: config.queue_capacity,
            state_change_timeout: Duration::from_millis(config.state_change_timeout_ms),
            pause_before_play: false,
            presentation_size: config.presentation_size,
        };
        let inner = PipelineSession::create(&description, &config.sink_name, opts)?;

        Ok(Self { inner, config })
    }

    /// Start frame delivery. Idempotent while playing.
    pub fn open(&mut self) -> Result<()> {
        self.inner.open()
    }

    /// Wait up to `timeout` for the next decoded frame. Opens the session
    /// first when it was never opened.
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

    pub fn config(&self) -> &DecodeConfig {
        &self.config
    }
}
