// SPDX-License-Identifier: GPL-3.0-only

//! Process-wide GStreamer initialization
//!
//! GStreamer must be initialized exactly once per process before any pipeline
//! is constructed. [`ensure_init`] is safe to call redundantly; the first call
//! wins and later calls observe its outcome.

use crate::error::Error;
use std::sync::OnceLock;
use tracing::info;

static INIT: OnceLock<std::result::Result<(), String>> = OnceLock::new();

/// Initialize GStreamer if it has not been initialized yet.
///
/// Every session constructor calls this; applications embedding the library
/// in a larger GStreamer program may also call it up front.
pub fn ensure_init() -> Result<(), Error> {
    INIT.get_or_init(|| match gstreamer::init() {
        Ok(()) => {
            info!(version = %gstreamer::version_string(), "GStreamer initialized");
            Ok(())
        }
        Err(e) => Err(e.to_string()),
    })
    .clone()
    .map_err(Error::EngineInit)
}

/// Tear down the GStreamer library.
///
/// Optional counterpart to [`ensure_init`] for processes that want a clean
/// engine shutdown instead of relying on process exit.
///
/// # Safety
///
/// All pipelines, sessions, and other GStreamer objects must have been
/// dropped before calling this, and no GStreamer function may be called
/// afterwards. Re-initialization is not supported.
pub unsafe fn shutdown() {
    unsafe { gstreamer::deinit() };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_init_idempotent() {
        ensure_init().expect("first init");
        ensure_init().expect("second init");
    }
}
