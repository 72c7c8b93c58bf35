use camfan_camera::{Capture, CaptureError, CaptureSettings, SyntheticCamera, MAX_SYNTHETIC_SOURCES};
use serial_test::serial;
use std::time::{Duration, Instant};

fn small() -> CaptureSettings {
    CaptureSettings { width: 64, height: 48, fps: 100 }
}

#[test]
fn unknown_source_fails_to_open() {
    let err = SyntheticCamera::open(MAX_SYNTHETIC_SOURCES, small()).err().unwrap();
    assert!(matches!(err, CaptureError::NoSuchSource(s) if s == MAX_SYNTHETIC_SOURCES));
}

#[test]
fn frames_have_requested_geometry() {
    let mut cam = SyntheticCamera::open(1, small()).unwrap();
    assert_eq!(cam.source(), 1);
    let frame = cam.read().unwrap();
    assert_eq!((frame.width(), frame.height()), (64, 48));
}

#[test]
fn block_moves_between_frames() {
    let cam = SyntheticCamera::open(0, small()).unwrap();
    assert_ne!(cam.render(0), cam.render(1));
}

#[test]
#[serial]
fn reads_are_paced_by_frame_rate() {
    let settings = CaptureSettings { fps: 20, ..small() };
    let mut cam = SyntheticCamera::open(0, settings).unwrap();
    let started = Instant::now();
    for _ in 0..3 {
        cam.read().unwrap();
    }
    // three ticks at 50 ms
    assert!(started.elapsed() >= Duration::from_millis(140));
}

#[test]
fn settings_round_trip_through_json() {
    let json = serde_json::to_string(&small()).unwrap();
    let back: CaptureSettings = serde_json::from_str(&json).unwrap();
    assert_eq!(back, small());
}
