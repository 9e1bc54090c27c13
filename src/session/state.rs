// SPDX-License-Identifier: GPL-3.0-only

//! Observable session state shared with the delivery thread

use crate::config::EosPolicy;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::info;

/// Lifecycle status of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    /// Created but not yet transitioned to playing
    Initializing,
    /// Pipeline is playing and the bridge delivers frames
    Playing,
    /// Closed, or end-of-stream under the stop-on-EOS policy; terminal
    Stopped,
    /// A fatal pipeline error was reported on the bus
    Faulted(String),
}

/// Counters exposed to the caller
///
/// Sample-path failures never unwind into the caller's stack; they show up
/// here instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionStats {
    /// Frames converted and queued for the consumer
    pub frames_delivered: u64,
    /// Frames discarded because the hand-off queue was full
    pub frames_dropped: u64,
    /// Samples that failed extraction or conversion
    pub extract_failures: u64,
}

/// State shared between the session owner and the delivery-thread callbacks
pub(crate) struct SharedState {
    status: Mutex<SessionStatus>,
    /// Set once close() begins; in-flight callbacks become no-ops
    closing: AtomicBool,
    saw_eos: AtomicBool,
    frames_delivered: AtomicU64,
    frames_dropped: AtomicU64,
    extract_failures: AtomicU64,
}

impl SharedState {
    pub fn new() -> Self {
        Self {
            status: Mutex::new(SessionStatus::Initializing),
            closing: AtomicBool::new(false),
            saw_eos: AtomicBool::new(false),
            frames_delivered: AtomicU64::new(0),
            frames_dropped: AtomicU64::new(0),
            extract_failures: AtomicU64::new(0),
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or(SessionStatus::Faulted("status lock poisoned".into()))
    }

    /// Transition to Playing, unless a fault or stop happened meanwhile
    pub fn promote_to_playing(&self) {
        if let Ok(mut guard) = self.status.lock()
            && *guard == SessionStatus::Initializing
        {
            *guard = SessionStatus::Playing;
        }
    }

    pub fn fault(&self, reason: String) {
        if let Ok(mut guard) = self.status.lock()
            && !matches!(*guard, SessionStatus::Faulted(_))
        {
            *guard = SessionStatus::Faulted(reason);
        }
    }

    pub fn mark_eos(&self, policy: EosPolicy) {
        if self.saw_eos.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(?policy, "stream reached end of stream");
        if policy == EosPolicy::StopOnEos
            && let Ok(mut guard) = self.status.lock()
            && !matches!(*guard, SessionStatus::Faulted(_))
        {
            *guard = SessionStatus::Stopped;
        }
    }

    pub fn saw_eos(&self) -> bool {
        self.saw_eos.load(Ordering::SeqCst)
    }

    /// Begin teardown; returns false when close already ran
    pub fn begin_close(&self) -> bool {
        !self.closing.swap(true, Ordering::SeqCst)
    }

    pub fn is_closing(&self) -> bool {
        self.closing.load(Ordering::SeqCst)
    }

    pub fn set_stopped(&self) {
        if let Ok(mut guard) = self.status.lock() {
            *guard = SessionStatus::Stopped;
        }
    }

    pub fn count_delivered(&self) -> u64 {
        self.frames_delivered.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn count_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count_extract_failure(&self) {
        self.extract_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            frames_delivered: self.frames_delivered.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            extract_failures: self.extract_failures.load(Ordering::Relaxed),
        }
    }
}
