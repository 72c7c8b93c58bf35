use camfan_camera::Frame;
use camfan_detect::Prediction;
use std::time::Duration;

/// One published detection pass. Immutable once handed to the queue.
#[derive(Debug, Clone)]
pub struct FrameResult {
    pub source_index: usize,
    /// Per-worker publish counter, starting at 0.
    pub sequence: u64,
    pub frame: Frame,
    pub predictions: Vec<Prediction>,
    pub inference_duration: Duration,
    pub model_id: String,
}
