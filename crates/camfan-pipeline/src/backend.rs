use camfan_camera::{Capture, CaptureSettings, SyntheticCamera};
use camfan_detect::{EngineKind, ObjectDetector};

/// Where a worker gets its engine and capture device from during setup.
///
/// Both calls run on the worker thread, so whatever they return is owned by
/// that thread for its whole life.
pub trait Backend: Send + Sync {
    fn load_detector(&self, model_id: &str, engine: EngineKind) -> camfan_detect::Result<Box<dyn ObjectDetector>>;
    fn open_capture(&self, source: usize) -> camfan_camera::Result<Box<dyn Capture>>;
}

/// Model registry from `camfan-detect` plus synthetic cameras.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBackend {
    pub capture: CaptureSettings,
}

impl DefaultBackend {
    pub fn new(capture: CaptureSettings) -> Self {
        Self { capture }
    }
}

impl Backend for DefaultBackend {
    fn load_detector(&self, model_id: &str, engine: EngineKind) -> camfan_detect::Result<Box<dyn ObjectDetector>> {
        camfan_detect::load(model_id, engine)
    }

    fn open_capture(&self, source: usize) -> camfan_camera::Result<Box<dyn Capture>> {
        Ok(Box::new(SyntheticCamera::open(source, self.capture)?))
    }
}
