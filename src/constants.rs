// SPDX-License-Identifier: GPL-3.0-only

//! Library-wide constants

/// Pipeline construction constants
pub mod pipeline {
    /// Name under which the appsink is registered in every built description.
    /// The sink retrieval contract requires the element to be found by this
    /// name after parsing, so custom descriptions must use it too (or override
    /// it in the session config).
    pub const DEFAULT_SINK_NAME: &str = "sink";

    /// Maximum buffers queued inside the appsink before old frames are dropped
    pub const MAX_BUFFERS: u32 = 4;

    /// Default capacity of the converted-frame hand-off queue
    pub const FRAME_QUEUE_CAPACITY: usize = 4;

    /// Default capture resolution
    pub const DEFAULT_WIDTH: u32 = 1280;
    pub const DEFAULT_HEIGHT: u32 = 720;

    /// Default capture framerate
    pub const DEFAULT_FRAMERATE: u32 = 30;
}

/// Timing constants for state transitions and frame delivery
pub mod timing {
    /// Bounded wait for an asynchronous state change to be confirmed
    pub const STATE_CHANGE_TIMEOUT_MS: u64 = 5_000;

    /// Bounded wait for the pipeline to reach NULL on close
    pub const STOP_TIMEOUT_SECS: u64 = 2;

    /// Default timeout for `capture()` when the caller does not specify one
    pub const DEFAULT_CAPTURE_TIMEOUT_MS: u64 = 2_000;

    /// Log frame statistics every N delivered frames
    pub const FRAME_LOG_INTERVAL: u64 = 60;
}
