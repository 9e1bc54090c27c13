// SPDX-License-Identifier: GPL-3.0-only

//! Declarative pipeline descriptions and launch
//!
//! Sessions are built from textual pipeline descriptions. Every built
//! description ends in `videoconvert ! video/x-raw,format=NV12 ! appsink`,
//! so the delivery format at the sink is NV12 regardless of what the source
//! produces. Custom capture descriptions bypass the builders entirely and
//! only go through [`launch`].

use crate::config::{CaptureConfig, CaptureSource, DecodeConfig};
use crate::error::{Error, Result};
use gstreamer::prelude::*;
use gstreamer_app::AppSink;
use tracing::debug;

/// Build the description for a capture session.
pub fn capture_description(config: &CaptureConfig) -> String {
    let source = match &config.source {
        CaptureSource::Auto => "autovideosrc do-timestamp=true".to_string(),
        CaptureSource::V4l2 { device } => {
            format!("v4l2src device={} do-timestamp=true", device)
        }
        CaptureSource::Custom(description) => return description.clone(),
    };

    format!(
        "{} ! videoconvert ! video/x-raw,format=NV12,{} ! appsink name={} sync=false",
        source,
        caps_filter(config.width, config.height, config.framerate),
        config.sink_name,
    )
}

/// Build the description for a decode session.
///
/// RTSP sources get an explicit H.264 depay/parse/decode chain; local files
/// and other URIs are handed to the autoplugging decoders.
pub fn decode_description(config: &DecodeConfig) -> String {
    let source = if config.uri.starts_with("rtsp://") {
        format!(
            "rtspsrc location={} ! rtph264depay ! h264parse ! avdec_h264 ! queue",
            config.uri
        )
    } else if let Some(path) = config.uri.strip_prefix("file://") {
        format!("filesrc location={} ! decodebin", path)
    } else if !config.uri.contains("://") {
        format!("filesrc location={} ! decodebin", config.uri)
    } else {
        format!("uridecodebin uri={}", config.uri)
    };

    format!(
        "{} ! videoconvert ! video/x-raw,format=NV12 ! appsink name={} sync=false",
        source, config.sink_name,
    )
}

fn caps_filter(width: u32, height: u32, framerate: Option<u32>) -> String {
    match framerate {
        Some(fps) => format!(
            "width=(int){},height=(int){},framerate=(fraction){}/1",
            width, height, fps
        ),
        None => format!("width=(int){},height=(int){}", width, height),
    }
}

/// Parse a description and retrieve its pull-sample sink.
///
/// Fails when the description does not parse, does not form a pipeline, has
/// no element under `sink_name`, or that element is not an appsink.
pub fn launch(description: &str, sink_name: &str) -> Result<(gstreamer::Pipeline, AppSink)> {
    debug!(%description, "launching pipeline");

    let element = gstreamer::parse::launch(description)
        .map_err(|e| Error::PipelineParse(e.to_string()))?;
    let pipeline = element
        .downcast::<gstreamer::Pipeline>()
        .map_err(|_| Error::PipelineCast)?;

    let sink = pipeline
        .by_name(sink_name)
        .ok_or_else(|| Error::SinkNotFound(sink_name.to_string()))?;
    let appsink = sink
        .downcast::<AppSink>()
        .map_err(|_| Error::SinkCast(sink_name.to_string()))?;

    Ok((pipeline, appsink))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EosPolicy;

    #[test]
    fn test_capture_description_auto() {
        let description = capture_description(&CaptureConfig::default());
        assert!(description.starts_with("autovideosrc do-timestamp=true"));
        assert!(description.contains("format=NV12"));
        assert!(description.contains("width=(int)1280"));
        assert!(description.contains("height=(int)720"));
        assert!(description.contains("framerate=(fraction)30/1"));
        assert!(description.ends_with("appsink name=sink sync=false"));
    }

    #[test]
    fn test_capture_description_v4l2() {
        let config = CaptureConfig {
            source: CaptureSource::device_index(1),
            framerate: None,
            ..CaptureConfig::default()
        };
        let description = capture_description(&config);
        assert!(description.starts_with("v4l2src device=/dev/video1"));
        assert!(!description.contains("framerate"));
    }

    #[test]
    fn test_capture_description_custom_is_verbatim() {
        let custom = "videotestsrc ! appsink name=sink";
        let config = CaptureConfig {
            source: CaptureSource::Custom(custom.into()),
            ..CaptureConfig::default()
        };
        assert_eq!(capture_description(&config), custom);
    }

    #[test]
    fn test_decode_description_rtsp() {
        let config = DecodeConfig::for_uri("rtsp://192.168.2.160/livestream/12");
        let description = decode_description(&config);
        assert!(description.starts_with("rtspsrc location=rtsp://192.168.2.160/livestream/12"));
        assert!(description.contains("rtph264depay ! h264parse ! avdec_h264 ! queue"));
        assert!(description.contains("format=NV12"));
        assert!(description.ends_with("appsink name=sink sync=false"));
    }

    #[test]
    fn test_decode_description_file() {
        let plain = decode_description(&DecodeConfig::for_uri("/tmp/clip.mp4"));
        assert!(plain.starts_with("filesrc location=/tmp/clip.mp4 ! decodebin"));

        let uri = decode_description(&DecodeConfig::for_uri("file:///tmp/clip.mp4"));
        assert!(uri.starts_with("filesrc location=/tmp/clip.mp4 ! decodebin"));
    }

    #[test]
    fn test_decode_description_other_uri() {
        let description = decode_description(&DecodeConfig::for_uri("https://example.com/a.mp4"));
        assert!(description.starts_with("uridecodebin uri=https://example.com/a.mp4"));
    }

    #[test]
    fn test_sink_name_override() {
        let config = DecodeConfig {
            sink_name: "mysink".into(),
            eos_policy: EosPolicy::Resumable,
            ..DecodeConfig::for_uri("/tmp/clip.mp4")
        };
        assert!(decode_description(&config).contains("appsink name=mysink"));
    }

    #[test]
    fn test_launch_rejects_garbage() {
        crate::engine::ensure_init().unwrap();
        assert!(matches!(
            launch("not ! a ! valid ! stage", "sink"),
            Err(Error::PipelineParse(_))
        ));
    }

    #[test]
    fn test_launch_missing_sink_name() {
        crate::engine::ensure_init().unwrap();
        let result = launch("videotestsrc ! fakesink name=other", "sink");
        assert!(matches!(result, Err(Error::SinkNotFound(name)) if name == "sink"));
    }

    #[test]
    fn test_launch_sink_is_not_appsink() {
        crate::engine::ensure_init().unwrap();
        let result = launch("videotestsrc ! fakesink name=sink", "sink");
        assert!(matches!(result, Err(Error::SinkCast(name)) if name == "sink"));
    }
}
