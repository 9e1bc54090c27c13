// SPDX-License-Identifier: GPL-3.0-only

//! Session lifecycle tests driven by an injected appsrc.
//!
//! Real devices and network streams are not available in CI, so these tests
//! build custom pipelines whose source is an appsrc and push hand-crafted
//! NV12 buffers through the same delivery path a camera or decoder would use.

use framegrab::{CaptureConfig, CaptureSession, CaptureSource, EosPolicy, Error, SessionStatus};
use gstreamer::prelude::*;
use gstreamer_app::AppSrc;
use std::time::{Duration, Instant};

const WIDTH: usize = 64;
const HEIGHT: usize = 48;

fn injection_description(format: &str) -> String {
    format!(
        "appsrc name=src is-live=true do-timestamp=true format=time \
         caps=\"video/x-raw,format={},width={},height={},framerate=30/1\" \
         ! appsink name=sink sync=false",
        format, WIDTH, HEIGHT
    )
}

fn injection_session(format: &str) -> CaptureSession {
    let config = CaptureConfig {
        source: CaptureSource::Custom(injection_description(format)),
        ..CaptureConfig::default()
    };
    CaptureSession::create(config).expect("create injection session")
}

fn source_of(session: &CaptureSession) -> AppSrc {
    session
        .pipeline()
        .by_name("src")
        .expect("appsrc present")
        .downcast::<AppSrc>()
        .expect("src is an appsrc")
}

fn nv12_buffer(luma: u8) -> gstreamer::Buffer {
    let mut data = vec![luma; WIDTH * HEIGHT];
    data.extend(std::iter::repeat(128u8).take(WIDTH * HEIGHT / 2));
    gstreamer::Buffer::from_mut_slice(data)
}

fn wait_until(deadline: Duration, mut done: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if done() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    done()
}

#[test]
fn test_malformed_description_fails_to_create() {
    let config = CaptureConfig {
        source: CaptureSource::Custom("not ! a ! valid ! stage".into()),
        ..CaptureConfig::default()
    };
    assert!(matches!(
        CaptureSession::create(config),
        Err(Error::PipelineParse(_))
    ));
}

#[test]
fn test_missing_sink_fails_to_create() {
    let config = CaptureConfig {
        source: CaptureSource::Custom("videotestsrc ! fakesink name=other".into()),
        ..CaptureConfig::default()
    };
    assert!(matches!(
        CaptureSession::create(config),
        Err(Error::SinkNotFound(name)) if name == "sink"
    ));
}

#[test]
fn test_frames_arrive_in_push_order() {
    let mut session = injection_session("NV12");
    session.open().expect("open");
    let src = source_of(&session);

    for luma in [30u8, 120, 210] {
        src.push_buffer(nv12_buffer(luma)).expect("push");
    }

    let mut lumas = Vec::new();
    for _ in 0..3 {
        let frame = session.capture(Duration::from_secs(2)).expect("frame");
        assert_eq!((frame.width, frame.height), (WIDTH as u32, HEIGHT as u32));
        // gray input, so any channel tracks the pushed luma
        lumas.push(frame.pixel(0, 0)[0]);
    }
    assert!(lumas[0] < lumas[1] && lumas[1] < lumas[2], "{:?}", lumas);

    assert_eq!(session.stats().frames_delivered, 3);
    session.close();
}

#[test]
fn test_capture_times_out_without_frames() {
    let mut session = injection_session("NV12");
    session.open().expect("open");
    assert!(matches!(
        session.capture(Duration::from_millis(100)),
        Err(Error::CaptureTimeout)
    ));
    assert_eq!(session.status(), SessionStatus::Playing);
    session.close();
}

#[test]
fn test_wrong_format_counts_failures_without_faulting() {
    let mut session = injection_session("YUY2");
    session.open().expect("open");
    let src = source_of(&session);

    for _ in 0..3 {
        let buffer = gstreamer::Buffer::from_mut_slice(vec![0u8; WIDTH * HEIGHT * 2]);
        src.push_buffer(buffer).expect("push");
    }

    assert!(
        wait_until(Duration::from_secs(2), || session.stats().extract_failures >= 3),
        "extract failures not counted: {:?}",
        session.stats()
    );
    assert_eq!(session.stats().frames_delivered, 0);
    assert_eq!(session.status(), SessionStatus::Playing);
    session.close();
}

#[test]
fn test_end_of_stream_stops_session() {
    let mut session = injection_session("NV12");
    session.open().expect("open");
    let src = source_of(&session);

    src.push_buffer(nv12_buffer(200)).expect("push");
    let frame = session.capture(Duration::from_secs(2)).expect("frame");
    assert!(frame.pixel(0, 0)[0] > 180);

    src.end_of_stream().expect("eos");
    assert!(
        wait_until(Duration::from_secs(2), || {
            session.status() == SessionStatus::Stopped
        }),
        "session did not stop on end of stream"
    );
    assert!(matches!(
        session.capture(Duration::from_millis(100)),
        Err(Error::EndOfStream)
    ));
    session.close();
}

#[test]
fn test_resumable_policy_keeps_session_playing_after_eos() {
    let config = CaptureConfig {
        source: CaptureSource::Custom(injection_description("NV12")),
        eos_policy: EosPolicy::Resumable,
        ..CaptureConfig::default()
    };
    let mut session = CaptureSession::create(config).expect("create");
    session.open().expect("open");
    let src = source_of(&session);

    src.end_of_stream().expect("eos");
    // Status stays Playing; the caller sees a timeout, not EndOfStream
    assert!(matches!(
        session.capture(Duration::from_millis(200)),
        Err(Error::CaptureTimeout)
    ));
    assert_eq!(session.status(), SessionStatus::Playing);
    session.close();
}

#[test]
fn test_close_is_idempotent() {
    let mut session = injection_session("NV12");
    session.open().expect("open");
    session.close();
    session.close();
    assert_eq!(session.status(), SessionStatus::Stopped);
}

#[test]
fn test_no_delivery_after_close() {
    let mut session = injection_session("NV12");
    session.open().expect("open");
    let src = source_of(&session);
    session.close();

    // Pushes after close must not reach the consumer; the flushing source
    // rejects them or the detached sink discards them
    let _ = src.push_buffer(nv12_buffer(100));
    std::thread::sleep(Duration::from_millis(100));

    assert_eq!(session.stats().frames_delivered, 0);
    assert!(matches!(
        session.capture(Duration::from_millis(100)),
        Err(Error::SessionStopped)
    ));
}

#[test]
fn test_close_waits_for_in_flight_delivery() {
    use framegrab::{BgrFrame, FrameSink};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct SlowObserver {
        entered: Arc<AtomicBool>,
        finished: Arc<AtomicBool>,
    }

    impl FrameSink for SlowObserver {
        fn on_frame(&mut self, _frame: &BgrFrame) {
            self.entered.store(true, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(300));
            self.finished.store(true, Ordering::SeqCst);
        }
    }

    let entered = Arc::new(AtomicBool::new(false));
    let finished = Arc::new(AtomicBool::new(false));

    let mut session = injection_session("NV12");
    session.set_frame_sink(Box::new(SlowObserver {
        entered: Arc::clone(&entered),
        finished: Arc::clone(&finished),
    }));
    session.open().expect("open");
    let src = source_of(&session);

    src.push_buffer(nv12_buffer(128)).expect("push");
    assert!(
        wait_until(Duration::from_secs(2), || entered.load(Ordering::SeqCst)),
        "delivery callback never entered"
    );

    // Close while the delivery thread is still inside the callback; the
    // NULL transition waits for the streaming thread to leave it, so the
    // in-flight frame completes before close() returns
    session.close();
    assert!(
        finished.load(Ordering::SeqCst),
        "close returned with the callback still running"
    );
    assert_eq!(session.status(), SessionStatus::Stopped);

    // Nothing runs through the delivery path once close has returned
    let delivered = session.stats().frames_delivered;
    assert!(delivered <= 1, "unexpected deliveries: {}", delivered);
    let _ = src.push_buffer(nv12_buffer(128));
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(session.stats().frames_delivered, delivered);
}

#[test]
fn test_zero_presentation_size_rejected() {
    use framegrab::{DecodeConfig, DecodeSession};

    for size in [(0, 720), (1280, 0), (0, 0)] {
        let config = DecodeConfig {
            presentation_size: Some(size),
            ..DecodeConfig::for_uri("/tmp/clip.mp4")
        };
        assert!(
            matches!(DecodeSession::create(config), Err(Error::InvalidConfig(_))),
            "size {:?} accepted",
            size
        );
    }
}

#[test]
fn test_open_after_close_fails() {
    let mut session = injection_session("NV12");
    session.open().expect("open");
    session.close();
    assert!(matches!(session.open(), Err(Error::SessionStopped)));
}

#[test]
fn test_capture_opens_unopened_session() {
    let mut session = injection_session("NV12");
    // Never opened explicitly; the first capture transitions to Playing
    let result = session.capture(Duration::from_millis(200));
    assert!(matches!(result, Err(Error::CaptureTimeout)));
    assert_eq!(session.status(), SessionStatus::Playing);

    let src = source_of(&session);
    src.push_buffer(nv12_buffer(128)).expect("push");
    session.capture(Duration::from_secs(2)).expect("frame");
    session.close();
}

#[test]
fn test_frame_sink_observes_delivery() {
    use framegrab::{BgrFrame, FrameSink};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorder {
        lumas: Arc<Mutex<Vec<u8>>>,
        eos: Arc<Mutex<bool>>,
    }

    impl FrameSink for Recorder {
        fn on_frame(&mut self, frame: &BgrFrame) {
            if let Ok(mut lumas) = self.lumas.lock() {
                lumas.push(frame.pixel(0, 0)[0]);
            }
        }

        fn on_eos(&mut self) {
            if let Ok(mut eos) = self.eos.lock() {
                *eos = true;
            }
        }
    }

    let recorder = Recorder::default();
    let lumas = Arc::clone(&recorder.lumas);
    let eos = Arc::clone(&recorder.eos);

    let mut session = injection_session("NV12");
    session.set_frame_sink(Box::new(recorder));
    session.open().expect("open");
    let src = source_of(&session);

    src.push_buffer(nv12_buffer(60)).expect("push");
    src.push_buffer(nv12_buffer(200)).expect("push");
    src.end_of_stream().expect("eos");

    assert!(
        wait_until(Duration::from_secs(2), || {
            eos.lock().map(|flag| *flag).unwrap_or(false)
        }),
        "observer did not see end of stream"
    );
    let seen = lumas.lock().expect("lock").clone();
    assert_eq!(seen.len(), 2);
    assert!(seen[0] < seen[1], "{:?}", seen);
    session.close();
}

#[test]
fn test_queued_frames_survive_eos() {
    let mut session = injection_session("NV12");
    session.open().expect("open");
    let src = source_of(&session);

    src.push_buffer(nv12_buffer(90)).expect("push");
    src.push_buffer(nv12_buffer(180)).expect("push");
    assert!(
        wait_until(Duration::from_secs(2), || {
            session.stats().frames_delivered == 2
        }),
        "frames not delivered"
    );
    src.end_of_stream().expect("eos");
    assert!(wait_until(Duration::from_secs(2), || {
        session.status() == SessionStatus::Stopped
    }));

    // Both queued frames drain before EndOfStream is reported
    session.capture(Duration::from_millis(100)).expect("first");
    session.capture(Duration::from_millis(100)).expect("second");
    assert!(matches!(
        session.capture(Duration::from_millis(100)),
        Err(Error::EndOfStream)
    ));
    session.close();
}
