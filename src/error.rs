// SPDX-License-Identifier: GPL-3.0-only

//! Error types for session construction and lifecycle operations
//!
//! Construction and explicit state transitions surface structured errors.
//! Failures inside the asynchronous sample path are never propagated through
//! a caller's stack; they are counted and reflected in the session status
//! instead (see [`crate::session::SessionStats`]).

use std::fmt;

/// Result type alias using the library error
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for session operations
#[derive(Debug, Clone)]
pub enum Error {
    /// Process-wide GStreamer initialization failed
    EngineInit(String),
    /// The session configuration is unusable (e.g. a zero dimension)
    InvalidConfig(String),
    /// The pipeline description failed to parse (e.g. unknown stage)
    PipelineParse(String),
    /// The parsed graph was not a pipeline
    PipelineCast,
    /// The pipeline has no message bus
    MissingBus,
    /// No element registered under the configured sink name
    SinkNotFound(String),
    /// The element under the sink name does not support pull-sample delivery
    SinkCast(String),
    /// A state transition reported failure
    StateChange(String),
    /// A state transition was not confirmed within the bounded wait
    StateChangeTimeout { state: String, pending: String },
    /// No frame arrived within the capture timeout
    CaptureTimeout,
    /// The stream reported end-of-stream and no frames remain queued
    EndOfStream,
    /// The session has been closed
    SessionStopped,
    /// The pipeline reported a fatal error on its bus
    Faulted(String),
    /// Frame export failed
    Image(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::EngineInit(msg) => write!(f, "GStreamer initialization failed: {}", msg),
            Error::InvalidConfig(msg) => write!(f, "Invalid session configuration: {}", msg),
            Error::PipelineParse(msg) => write!(f, "Failed to parse pipeline description: {}", msg),
            Error::PipelineCast => write!(f, "Parsed description is not a pipeline"),
            Error::MissingBus => write!(f, "Pipeline has no message bus"),
            Error::SinkNotFound(name) => write!(f, "No element named '{}' in pipeline", name),
            Error::SinkCast(name) => {
                write!(f, "Element '{}' is not a pull-sample sink", name)
            }
            Error::StateChange(msg) => write!(f, "State transition failed: {}", msg),
            Error::StateChangeTimeout { state, pending } => write!(
                f,
                "State transition not confirmed (state: {}, pending: {})",
                state, pending
            ),
            Error::CaptureTimeout => write!(f, "Timed out waiting for the next frame"),
            Error::EndOfStream => write!(f, "End of stream"),
            Error::SessionStopped => write!(f, "Session is stopped"),
            Error::Faulted(msg) => write!(f, "Pipeline faulted: {}", msg),
            Error::Image(msg) => write!(f, "Frame export failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Image(err.to_string())
    }
}
