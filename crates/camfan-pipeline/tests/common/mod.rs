//! Test doubles for the capture and inference boundaries.

#![allow(dead_code)]

use camfan_camera::{Capture, CaptureError, Frame};
use camfan_detect::{DetectError, DetectionResults, EngineKind, ObjectDetector, Prediction};
use camfan_pipeline::{Backend, CameraWorker, WorkerOptions};
use image::Rgb;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Default)]
pub struct Counters {
    pub detectors_loaded: AtomicUsize,
    pub detectors_released: AtomicUsize,
    pub captures_opened: AtomicUsize,
    pub captures_released: AtomicUsize,
    pub frames_read: AtomicUsize,
}

impl Counters {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

pub struct MockCapture {
    source: usize,
    period: Duration,
    panic_after: Option<usize>,
    reads: usize,
    counters: Arc<Counters>,
}

impl Capture for MockCapture {
    fn source(&self) -> usize {
        self.source
    }

    fn read(&mut self) -> Result<Frame, CaptureError> {
        thread::sleep(self.period);
        self.reads += 1;
        if self.panic_after.is_some_and(|n| self.reads > n) {
            panic!("mock capture {} exploded", self.source);
        }
        self.counters.frames_read.fetch_add(1, Ordering::SeqCst);
        let shade = (self.source * 40) as u8;
        Ok(Frame::from_pixel(8, 6, Rgb([shade, shade, shade])))
    }
}

impl Drop for MockCapture {
    fn drop(&mut self) {
        self.counters.captures_released.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct MockDetector {
    labels: Vec<String>,
    colors: Vec<Rgb<u8>>,
    counters: Arc<Counters>,
}

impl ObjectDetector for MockDetector {
    fn model_id(&self) -> &str {
        "mock/model"
    }

    fn engine(&self) -> EngineKind {
        EngineKind::Generic
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn colors(&self) -> &[Rgb<u8>] {
        &self.colors
    }

    fn detect_objects(&mut self, _frame: &Frame, _confidence: f32) -> Result<DetectionResults, DetectError> {
        Ok(DetectionResults {
            predictions: vec![Prediction {
                label: "thing".into(),
                class: 0,
                confidence: 0.75,
                bbox: [0.25, 0.25, 0.75, 0.75],
            }],
            duration: Duration::from_millis(1),
        })
    }
}

impl Drop for MockDetector {
    fn drop(&mut self) {
        self.counters.detectors_released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Backend whose cameras publish every `period` (per source, defaulting to
/// `default_period`).
pub struct MockBackend {
    pub default_period: Duration,
    pub periods: Vec<(usize, Duration)>,
    pub fail_load: bool,
    pub fail_open: bool,
    pub panic_after: Option<usize>,
    pub counters: Arc<Counters>,
}

impl MockBackend {
    pub fn new(default_period: Duration) -> Self {
        Self {
            default_period,
            periods: Vec::new(),
            fail_load: false,
            fail_open: false,
            panic_after: None,
            counters: Arc::new(Counters::default()),
        }
    }
}

impl Backend for MockBackend {
    fn load_detector(&self, model_id: &str, _engine: EngineKind) -> camfan_detect::Result<Box<dyn ObjectDetector>> {
        if self.fail_load {
            return Err(DetectError::UnknownModel(model_id.to_string()));
        }
        self.counters.detectors_loaded.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockDetector {
            labels: vec!["thing".into()],
            colors: vec![Rgb([0, 255, 0])],
            counters: self.counters.clone(),
        }))
    }

    fn open_capture(&self, source: usize) -> camfan_camera::Result<Box<dyn Capture>> {
        if self.fail_open {
            return Err(CaptureError::NoSuchSource(source));
        }
        self.counters.captures_opened.fetch_add(1, Ordering::SeqCst);
        let period = self
            .periods
            .iter()
            .find(|(s, _)| *s == source)
            .map_or(self.default_period, |(_, p)| *p);
        Ok(Box::new(MockCapture {
            source,
            period,
            panic_after: self.panic_after,
            reads: 0,
            counters: self.counters.clone(),
        }))
    }
}

pub fn quick_options() -> WorkerOptions {
    WorkerOptions {
        queue_capacity: 2,
        warmup: Duration::ZERO,
        confidence: 0.5,
    }
}

pub fn worker(source: usize, backend: &Arc<MockBackend>) -> CameraWorker {
    let backend: Arc<dyn Backend> = backend.clone();
    CameraWorker::new(source, EngineKind::Generic, "mock/model", backend, quick_options()).unwrap()
}
