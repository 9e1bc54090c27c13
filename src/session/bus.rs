// SPDX-License-Identifier: GPL-3.0-only

//! Bus drain between processing steps
//!
//! The pipeline engine posts state-change, error, and end-of-stream messages
//! on the bus; nothing else consumes them, so they are popped non-blocking
//! after every callback and state transition to keep the queue empty. Error
//! and end-of-stream content is acted on rather than discarded: errors fault
//! the session, end-of-stream is handled per the configured policy.

use super::state::SharedState;
use crate::config::EosPolicy;
use gstreamer::MessageView;
use gstreamer::prelude::GstObjectExt;
use tracing::{debug, error, trace, warn};

/// Pop and consume every currently queued message.
pub(crate) fn drain(bus: &gstreamer::Bus, shared: &SharedState, eos_policy: EosPolicy) {
    while let Some(msg) = bus.pop() {
        match msg.view() {
            MessageView::Error(err) => {
                let reason = format!(
                    "{} (from {:?})",
                    err.error(),
                    err.src().map(|s| s.name())
                );
                error!(
                    error = %err.error(),
                    debug = ?err.debug(),
                    source = ?err.src().map(|s| s.name()),
                    "pipeline error reported on bus"
                );
                shared.fault(reason);
            }
            MessageView::Eos(_) => {
                debug!("end of stream reported on bus");
                shared.mark_eos(eos_policy);
            }
            MessageView::Warning(warning) => {
                warn!(
                    warning = %warning.error(),
                    debug = ?warning.debug(),
                    "pipeline warning reported on bus"
                );
            }
            MessageView::StateChanged(change) => {
                trace!(
                    current = ?change.current(),
                    pending = ?change.pending(),
                    "state change reported on bus"
                );
            }
            _other => {
                trace!(message = ?msg.type_(), "discarding bus message");
            }
        }
    }
}
