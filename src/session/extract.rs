// SPDX-License-Identifier: GPL-3.0-only

//! Frame extraction from delivered samples
//!
//! Turns one appsink sample into a [`BgrFrame`]: validate the caps, gate on
//! the negotiated pixel format, map the backing buffer read-only, convert,
//! and optionally resize. The sample and the mapped view are released on
//! every path when they drop at the end of the enclosing scope.

use crate::convert;
use crate::frame::{BgrFrame, PixelFormat};
use gstreamer_video::VideoInfo;
use std::fmt;

/// Recoverable per-sample extraction failures
///
/// None of these are fatal to the session: the callback logs the failure,
/// bumps a counter, and waits for the next sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// The sample carried no format descriptor
    MissingCaps,
    /// The negotiated format is not the expected planar layout
    UnexpectedFormat(String),
    /// The caps could not be interpreted as video info
    BadVideoInfo(String),
    /// The sample carried no buffer
    MissingBuffer,
    /// The buffer could not be mapped for reading
    MapFailed(String),
    /// The mapped region was empty
    EmptyBuffer,
    /// The mapped region is smaller than the negotiated dimensions require
    ShortBuffer { expected: usize, actual: usize },
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractError::MissingCaps => write!(f, "sample has no caps"),
            ExtractError::UnexpectedFormat(fmt_str) => {
                write!(f, "unexpected pixel format '{}', expected NV12", fmt_str)
            }
            ExtractError::BadVideoInfo(msg) => write!(f, "could not read video info: {}", msg),
            ExtractError::MissingBuffer => write!(f, "sample has no buffer"),
            ExtractError::MapFailed(msg) => write!(f, "failed to map buffer: {}", msg),
            ExtractError::EmptyBuffer => write!(f, "mapped buffer is empty"),
            ExtractError::ShortBuffer { expected, actual } => write!(
                f,
                "mapped buffer too small: {} bytes, need {}",
                actual, expected
            ),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Convert one sample into a BGR frame.
///
/// Dimensions and strides are always read from the negotiated caps, never
/// assumed. When `presentation_size` is set and differs from the native
/// resolution, the converted frame is resized to it.
pub fn frame_from_sample(
    sample: &gstreamer::Sample,
    presentation_size: Option<(u32, u32)>,
) -> Result<BgrFrame, ExtractError> {
    let caps = sample.caps().ok_or(ExtractError::MissingCaps)?;
    let structure = caps.structure(0).ok_or(ExtractError::MissingCaps)?;

    // Format gate: reject anything that is not the expected planar layout
    // before touching pixel data
    let format = structure
        .get::<&str>("format")
        .map_err(|_| ExtractError::UnexpectedFormat("<missing>".into()))?;
    if PixelFormat::from_gst_format(format) != Some(PixelFormat::Nv12) {
        return Err(ExtractError::UnexpectedFormat(format.to_string()));
    }

    let info =
        VideoInfo::from_caps(caps).map_err(|e| ExtractError::BadVideoInfo(e.to_string()))?;
    let width = info.width() as usize;
    let height = info.height() as usize;
    if width == 0 || height == 0 {
        return Err(ExtractError::BadVideoInfo(format!(
            "degenerate dimensions {}x{}",
            width, height
        )));
    }

    let buffer = sample.buffer().ok_or(ExtractError::MissingBuffer)?;
    let map = buffer
        .map_readable()
        .map_err(|e| ExtractError::MapFailed(e.to_string()))?;
    let data = map.as_slice();
    if data.is_empty() {
        return Err(ExtractError::EmptyBuffer);
    }

    let y_stride = info.stride()[0] as usize;
    let uv_stride = info.stride()[1] as usize;
    let uv_offset = info.offset()[1];

    // The negotiated layout dictates how many bytes we will read; a shorter
    // buffer would mean reinterpreting foreign memory
    let uv_rows = height.div_ceil(2);
    let uv_row_bytes = 2 * width.div_ceil(2);
    let y_needed = (height - 1) * y_stride + width;
    let uv_needed = uv_offset + (uv_rows - 1) * uv_stride + uv_row_bytes;
    let needed = y_needed.max(uv_needed);
    if data.len() < needed {
        return Err(ExtractError::ShortBuffer {
            expected: needed,
            actual: data.len(),
        });
    }

    let y_plane = &data[..uv_offset];
    let uv_plane = &data[uv_offset..];
    let bgr = convert::nv12_to_bgr(y_plane, uv_plane, width, height, y_stride, uv_stride);
    let mut frame = BgrFrame {
        width: width as u32,
        height: height as u32,
        data: bgr,
    };

    if let Some((target_w, target_h)) = presentation_size
        && (target_w, target_h) != (frame.width, frame.height)
    {
        frame = convert::resize_bgr(&frame, target_w, target_h);
    }

    Ok(frame)
}
