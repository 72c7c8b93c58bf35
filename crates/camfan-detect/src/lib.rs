// camfan-detect/src/lib.rs
// ============================================================
// camfan-detect  –  Object-detection stage for camfan
// Loads a detector by model id, runs it on an RGB frame at a
// confidence threshold, and draws the results back onto the
// frame for display.
// ------------------------------------------------------------
// Pipeline: Frame → DetectionResults { predictions, duration }
// ------------------------------------------------------------
// Public API
//   * load(model_id, engine)          – model registry
//   * ObjectDetector::detect_objects  – predictions + timing
//   * markup_image(frame, preds, map) – annotated frame
// ============================================================

//! camfan – detection layer
//!
//! Every engine sits behind the [`ObjectDetector`] trait so the camera
//! workers never care which model they run. [`load`] is the registry that
//! turns a model id plus an [`EngineKind`] into a ready detector; an unknown
//! id is a load failure, which the worker treats as a fatal setup error.
//!
//! The built-in model is [`LumaGridDetector`] (`camfan/luma-grid`), a
//! sliding-window brightness detector that needs no weights on disk.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use camfan_camera::Frame;
use image::Rgb;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod luma;
mod markup;

pub use luma::{LumaGridDetector, LUMA_GRID_MODEL_ID};
pub use markup::markup_image;

/// Confidence threshold the camera workers run detection at.
pub const DEFAULT_CONFIDENCE: f32 = 0.5;

// ------------------------------------------------------------
// helpers: IoU • NMS
// ------------------------------------------------------------
pub(crate) fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let ix1 = a[0].max(b[0]);
    let iy1 = a[1].max(b[1]);
    let ix2 = a[2].min(b[2]);
    let iy2 = a[3].min(b[3]);
    let iw = (ix2 - ix1).max(0.0);
    let ih = (iy2 - iy1).max(0.0);
    let inter = iw * ih;
    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    inter / (area_a + area_b - inter + 1e-6)
}

pub(crate) fn non_max_suppression(preds: Vec<Prediction>, iou_thr: f32, max_keep: usize) -> Vec<Prediction> {
    let mut preds = preds;
    preds.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<Prediction> = Vec::with_capacity(preds.len());

    'outer: for p in preds {
        for k in &keep {
            if k.class == p.class && iou(&p.bbox, &k.bbox) > iou_thr {
                continue 'outer;
            }
        }
        keep.push(p);
        if keep.len() >= max_keep {
            break;
        }
    }
    keep
}

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("Unknown model id: {0}")]
    UnknownModel(String),
    #[error("Unknown engine kind: {0}")]
    UnknownEngine(String),
    #[error("Confidence threshold must be within [0, 1], got {0}")]
    InvalidConfidence(f32),
    #[error("Cannot run detection on an empty {0}x{1} frame")]
    EmptyFrame(u32, u32),
}

pub type Result<T> = std::result::Result<T, DetectError>;

/// Inference engine flavour requested at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    #[default]
    Generic,
    Accelerated,
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineKind::Generic => f.write_str("generic"),
            EngineKind::Accelerated => f.write_str("accelerated"),
        }
    }
}

impl FromStr for EngineKind {
    type Err = DetectError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "generic" | "cpu" => Ok(EngineKind::Generic),
            "accelerated" | "gpu" => Ok(EngineKind::Accelerated),
            other => Err(DetectError::UnknownEngine(other.to_string())),
        }
    }
}

/// A single labelled prediction: box [x1,y1,x2,y2] in normalised coords.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    pub class: usize,
    pub confidence: f32,
    pub bbox: [f32; 4],
}

/// Output of one detection pass.
#[derive(Debug, Clone, Default)]
pub struct DetectionResults {
    pub predictions: Vec<Prediction>,
    pub duration: Duration,
}

/// Trait for object detectors.
pub trait ObjectDetector: Send {
    fn model_id(&self) -> &str;
    fn engine(&self) -> EngineKind;
    fn accelerator(&self) -> &str {
        "cpu"
    }
    fn labels(&self) -> &[String];
    /// Box colour per class index.
    fn colors(&self) -> &[Rgb<u8>];
    fn detect_objects(&mut self, frame: &Frame, confidence: f32) -> Result<DetectionResults>;
}

impl<D: ObjectDetector + ?Sized> ObjectDetector for Box<D> {
    fn model_id(&self) -> &str {
        (**self).model_id()
    }
    fn engine(&self) -> EngineKind {
        (**self).engine()
    }
    fn accelerator(&self) -> &str {
        (**self).accelerator()
    }
    fn labels(&self) -> &[String] {
        (**self).labels()
    }
    fn colors(&self) -> &[Rgb<u8>] {
        (**self).colors()
    }
    fn detect_objects(&mut self, frame: &Frame, confidence: f32) -> Result<DetectionResults> {
        (**self).detect_objects(frame, confidence)
    }
}

/// Load the detector registered under `model_id` for `engine`.
pub fn load(model_id: &str, engine: EngineKind) -> Result<Box<dyn ObjectDetector>> {
    let detector: Box<dyn ObjectDetector> = match model_id {
        LUMA_GRID_MODEL_ID => Box::new(LumaGridDetector::new(engine)),
        other => return Err(DetectError::UnknownModel(other.to_string())),
    };

    if engine == EngineKind::Accelerated && detector.accelerator() == "cpu" {
        warn!("No accelerator available for {model_id}; running on cpu");
    }
    info!("Loaded model: {}", detector.model_id());
    info!("Engine: {}", detector.engine());
    info!("Accelerator: {}", detector.accelerator());
    info!("Labels: {:?}", detector.labels());
    Ok(detector)
}

pub(crate) fn check_confidence(confidence: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&confidence) {
        return Err(DetectError::InvalidConfidence(confidence));
    }
    Ok(())
}
