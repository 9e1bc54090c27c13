// SPDX-License-Identifier: GPL-3.0-only

//! Capture and decode session lifecycle
//!
//! A session owns a launched pipeline, its message bus, and the appsink that
//! delivers decoded frames. Frames arrive on the pipeline's delivery thread,
//! are converted to BGR there, and cross to the caller through a bounded
//! queue. [`CaptureSession`] and [`DecodeSession`] are thin variants over the
//! same core; they differ only in how the pipeline description is built and
//! whether frames are resized for presentation.

pub(crate) mod bus;
mod capture;
mod decode;
pub mod extract;
mod state;

pub use capture::CaptureSession;
pub use decode::DecodeSession;
pub use state::{SessionStats, SessionStatus};

use crate::config::EosPolicy;
use crate::constants::timing;
use crate::error::{Error, Result};
use crate::frame::BgrFrame;
use crate::{engine, pipeline};
use gstreamer::prelude::*;
use gstreamer_app::{AppSink, AppSinkCallbacks};
use state::SharedState;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender, TrySendError, sync_channel};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Observer invoked on the delivery thread for every converted frame.
///
/// Implementations must return quickly; the pipeline cannot deliver the next
/// frame until the callback returns. The bounded queue hand-off to
/// `capture()` runs regardless of whether a sink is installed.
pub trait FrameSink: Send {
    /// Called with each frame after conversion, before it is queued
    fn on_frame(&mut self, frame: &BgrFrame);

    /// Called once when the stream reports end-of-stream
    fn on_eos(&mut self) {}
}

type SharedFrameSink = Arc<Mutex<Option<Box<dyn FrameSink>>>>;

/// Per-variant knobs for the shared session core
pub(crate) struct SessionOptions {
    pub eos_policy: EosPolicy,
    pub queue_capacity: usize,
    pub state_change_timeout: Duration,
    /// Live sources preroll through Paused before Playing
    pub pause_before_play: bool,
    /// Resize converted frames to this size before delivery
    pub presentation_size: Option<(u32, u32)>,
}

/// The session core shared by capture and decode variants
pub(crate) struct PipelineSession {
    pipeline: gstreamer::Pipeline,
    bus: gstreamer::Bus,
    appsink: AppSink,
    shared: Arc<SharedState>,
    frames: Receiver<BgrFrame>,
    sink: SharedFrameSink,
    opts: SessionOptions,
}

impl PipelineSession {
    /// Launch the pipeline, configure the appsink, and install callbacks.
    ///
    /// The pipeline stays in NULL until [`open`](Self::open); construction
    /// only validates the description and wires up delivery.
    pub fn create(description: &str, sink_name: &str, opts: SessionOptions) -> Result<Self> {
        engine::ensure_init()?;

        let (pipeline, appsink) = pipeline::launch(description, sink_name)?;
        let bus = pipeline.bus().ok_or(Error::MissingBus)?;

        appsink.set_max_buffers(crate::constants::pipeline::MAX_BUFFERS);
        appsink.set_drop(true);
        appsink.set_property("sync", false);
        appsink.set_property("enable-last-sample", false);

        let shared = Arc::new(SharedState::new());
        let sink: SharedFrameSink = Arc::new(Mutex::new(None));
        let (tx, rx) = sync_channel(opts.queue_capacity);

        install_callbacks(
            &appsink,
            &bus,
            &shared,
            &sink,
            tx,
            opts.eos_policy,
            opts.presentation_size,
        );

        Ok(Self {
            pipeline,
            bus,
            appsink,
            shared,
            frames: rx,
            sink,
            opts,
        })
    }

    /// Transition the pipeline to Playing and confirm it within the bounded
    /// wait. Idempotent while playing; fails once the session has stopped or
    /// faulted.
    pub fn open(&mut self) -> Result<()> {
        match self.shared.status() {
            SessionStatus::Playing => return Ok(()),
            SessionStatus::Stopped => return Err(Error::SessionStopped),
            SessionStatus::Faulted(msg) => return Err(Error::Faulted(msg)),
            SessionStatus::Initializing => {}
        }

        if self.opts.pause_before_play {
            // Live sources preroll here; Async is expected and resolved by
            // the Playing transition below
            if let Err(e) = self.pipeline.set_state(gstreamer::State::Paused) {
                bus::drain(&self.bus, &self.shared, self.opts.eos_policy);
                return Err(self.fault_or(Error::StateChange(e.to_string())));
            }
        }

        match self.pipeline.set_state(gstreamer::State::Playing) {
            Ok(gstreamer::StateChangeSuccess::Success)
            | Ok(gstreamer::StateChangeSuccess::NoPreroll) => {}
            Ok(gstreamer::StateChangeSuccess::Async) => {
                let timeout = gstreamer::ClockTime::from_mseconds(
                    self.opts.state_change_timeout.as_millis() as u64,
                );
                let (result, state, pending) = self.pipeline.state(timeout);
                bus::drain(&self.bus, &self.shared, self.opts.eos_policy);
                if result.is_err() || state != gstreamer::State::Playing {
                    return Err(self.fault_or(Error::StateChangeTimeout {
                        state: format!("{:?}", state),
                        pending: format!("{:?}", pending),
                    }));
                }
            }
            Err(e) => {
                bus::drain(&self.bus, &self.shared, self.opts.eos_policy);
                return Err(self.fault_or(Error::StateChange(e.to_string())));
            }
        }

        bus::drain(&self.bus, &self.shared, self.opts.eos_policy);
        if let SessionStatus::Faulted(msg) = self.shared.status() {
            return Err(Error::Faulted(msg));
        }

        self.shared.promote_to_playing();
        info!("session playing");
        Ok(())
    }

    /// Wait up to `timeout` for the next converted frame.
    ///
    /// Frames already queued are returned immediately, even after the stream
    /// ended. Opens the session first when it was never opened.
    pub fn capture(&mut self, timeout: Duration) -> Result<BgrFrame> {
        if let Ok(frame) = self.frames.try_recv() {
            return Ok(frame);
        }

        match self.shared.status() {
            SessionStatus::Faulted(msg) => return Err(Error::Faulted(msg)),
            SessionStatus::Stopped => return Err(self.stopped_error()),
            SessionStatus::Initializing => self.open()?,
            SessionStatus::Playing => {}
        }

        match self.frames.recv_timeout(timeout) {
            Ok(frame) => Ok(frame),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                // The delivery thread may have raced us with a fault or EOS;
                // reflect that instead of a bare timeout
                bus::drain(&self.bus, &self.shared, self.opts.eos_policy);
                match self.shared.status() {
                    SessionStatus::Faulted(msg) => Err(Error::Faulted(msg)),
                    SessionStatus::Stopped => Err(self.stopped_error()),
                    _ => Err(Error::CaptureTimeout),
                }
            }
        }
    }

    /// Stop frame delivery and tear the pipeline down. Idempotent.
    ///
    /// Callbacks are detached before the state drops to NULL, so no frame
    /// callback runs concurrently with or after teardown; a callback already
    /// in flight finishes while the NULL transition waits on the streaming
    /// thread. Frames already queued remain readable through
    /// [`capture`](Self::capture) until the receiver drains.
    ///
    /// Replacing appsink callbacks requires a GStreamer runtime of 1.16.3 or
    /// newer; older runtimes are not supported.
    pub fn close(&mut self) {
        if !self.shared.begin_close() {
            return;
        }
        info!("closing session");

        // Detaching the callbacks drops the queue sender with them
        self.appsink.set_callbacks(AppSinkCallbacks::builder().build());

        if let Err(e) = self.pipeline.set_state(gstreamer::State::Null) {
            warn!(error = %e, "failed to request NULL state during close");
        }
        let timeout = gstreamer::ClockTime::from_seconds(timing::STOP_TIMEOUT_SECS);
        let (_, state, _) = self.pipeline.state(timeout);
        debug!(?state, "pipeline settled");

        bus::drain(&self.bus, &self.shared, self.opts.eos_policy);
        self.shared.set_stopped();

        let stats = self.shared.stats();
        info!(
            delivered = stats.frames_delivered,
            dropped = stats.frames_dropped,
            extract_failures = stats.extract_failures,
            "session closed"
        );
    }

    pub fn status(&self) -> SessionStatus {
        self.shared.status()
    }

    pub fn stats(&self) -> SessionStats {
        self.shared.stats()
    }

    /// Install or replace the delivery-thread frame observer.
    pub fn set_frame_sink(&self, frame_sink: Box<dyn FrameSink>) {
        if let Ok(mut guard) = self.sink.lock() {
            *guard = Some(frame_sink);
        }
    }

    pub fn pipeline(&self) -> &gstreamer::Pipeline {
        &self.pipeline
    }

    fn stopped_error(&self) -> Error {
        if self.shared.saw_eos() {
            Error::EndOfStream
        } else {
            Error::SessionStopped
        }
    }

    fn fault_or(&self, fallback: Error) -> Error {
        match self.shared.status() {
            SessionStatus::Faulted(msg) => Error::Faulted(msg),
            _ => fallback,
        }
    }
}

impl Drop for PipelineSession {
    fn drop(&mut self) {
        self.close();
    }
}

fn install_callbacks(
    appsink: &AppSink,
    bus: &gstreamer::Bus,
    shared: &Arc<SharedState>,
    sink: &SharedFrameSink,
    tx: SyncSender<BgrFrame>,
    eos_policy: EosPolicy,
    presentation_size: Option<(u32, u32)>,
) {
    let eos_shared = Arc::clone(shared);
    let eos_sink = Arc::clone(sink);

    let preroll_bus = bus.clone();
    let preroll_shared = Arc::clone(shared);

    let sample_bus = bus.clone();
    let sample_shared = Arc::clone(shared);
    let sample_sink = Arc::clone(sink);
    let dropped_since_log = AtomicU64::new(0);

    appsink.set_callbacks(
        AppSinkCallbacks::builder()
            .eos(move |_| {
                eos_shared.mark_eos(eos_policy);
                if let Ok(mut guard) = eos_sink.lock()
                    && let Some(observer) = guard.as_mut()
                {
                    observer.on_eos();
                }
            })
            .new_preroll(move |appsink| {
                // Release the preroll sample; delivery starts with new_sample
                let _ = appsink.pull_preroll();
                bus::drain(&preroll_bus, &preroll_shared, eos_policy);
                Ok(gstreamer::FlowSuccess::Ok)
            })
            .new_sample(move |appsink| {
                if sample_shared.is_closing() {
                    return Ok(gstreamer::FlowSuccess::Ok);
                }
                let Ok(sample) = appsink.pull_sample() else {
                    return Ok(gstreamer::FlowSuccess::Ok);
                };

                match extract::frame_from_sample(&sample, presentation_size) {
                    Ok(frame) => {
                        if let Ok(mut guard) = sample_sink.lock()
                            && let Some(observer) = guard.as_mut()
                        {
                            observer.on_frame(&frame);
                        }
                        match tx.try_send(frame) {
                            Ok(()) => {
                                let delivered = sample_shared.count_delivered();
                                if delivered % timing::FRAME_LOG_INTERVAL == 0 {
                                    debug!(frames = delivered, "frame delivery progressing");
                                }
                            }
                            Err(TrySendError::Full(_)) => {
                                // Consumer is behind; the newest frame goes
                                sample_shared.count_dropped();
                                let dropped =
                                    dropped_since_log.fetch_add(1, Ordering::Relaxed) + 1;
                                if dropped % timing::FRAME_LOG_INTERVAL == 1 {
                                    warn!(dropped, "hand-off queue full, dropping frames");
                                }
                            }
                            Err(TrySendError::Disconnected(_)) => {
                                trace!("frame receiver gone, discarding frame");
                            }
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "discarding undeliverable sample");
                        sample_shared.count_extract_failure();
                    }
                }

                bus::drain(&sample_bus, &sample_shared, eos_policy);
                Ok(gstreamer::FlowSuccess::Ok)
            })
            .build(),
    );
}
