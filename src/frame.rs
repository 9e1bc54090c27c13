// SPDX-License-Identifier: GPL-3.0-only

//! Converted frame type and pixel format tags

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Pixel formats the library understands
///
/// Only NV12 is accepted from the pipeline; everything the library produces
/// is interleaved BGR. Other raw formats negotiated by mistake are rejected
/// at extraction time instead of being blindly reinterpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    /// Semi-planar 4:2:0 - full-resolution Y plane followed by a
    /// half-resolution interleaved UV plane
    Nv12,
    /// Interleaved 3-channel BGR, 8 bits per channel
    Bgr,
}

impl PixelFormat {
    /// Parse a GStreamer video/x-raw format string
    pub fn from_gst_format(format: &str) -> Option<Self> {
        match format {
            "NV12" => Some(Self::Nv12),
            "BGR" => Some(Self::Bgr),
            _ => None,
        }
    }

    /// The GStreamer video/x-raw format string for this format
    pub fn as_gst_format(&self) -> &'static str {
        match self {
            Self::Nv12 => "NV12",
            Self::Bgr => "BGR",
        }
    }
}

/// One converted, display-ready frame
///
/// Row-major interleaved BGR with no row padding. Constructed fresh for every
/// delivered sample and handed to the consumer by value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BgrFrame {
    pub width: u32,
    pub height: u32,
    /// `width * height * 3` bytes, blue first
    pub data: Vec<u8>,
}

impl BgrFrame {
    /// Bytes per pixel of the interleaved layout
    pub const CHANNELS: usize = 3;

    /// The pixel format tag of this frame
    pub fn format(&self) -> PixelFormat {
        PixelFormat::Bgr
    }

    /// The `[b, g, r]` triple at the given position
    ///
    /// # Panics
    ///
    /// Panics if the position is out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        assert!(x < self.width && y < self.height, "pixel out of bounds");
        let offset = (y as usize * self.width as usize + x as usize) * Self::CHANNELS;
        [self.data[offset], self.data[offset + 1], self.data[offset + 2]]
    }

    /// Convert to an RGB image for export or further processing
    pub fn to_rgb_image(&self) -> image::RgbImage {
        let mut rgb = Vec::with_capacity(self.data.len());
        for bgr in self.data.chunks_exact(Self::CHANNELS) {
            rgb.push(bgr[2]);
            rgb.push(bgr[1]);
            rgb.push(bgr[0]);
        }
        // Length is width*height*3 by construction, so from_raw cannot fail
        image::RgbImage::from_raw(self.width, self.height, rgb)
            .unwrap_or_else(|| image::RgbImage::new(self.width, self.height))
    }

    /// Save the frame to disk; the format is inferred from the extension
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        self.to_rgb_image().save(path)?;
        Ok(())
    }
}
