// camfan-detect/src/luma.rs
use crate::{check_confidence, non_max_suppression, DetectError, DetectionResults, EngineKind, ObjectDetector, Prediction, Result};
use camfan_camera::Frame;
use image::Rgb;
use std::time::Instant;

pub const LUMA_GRID_MODEL_ID: &str = "camfan/luma-grid";

const GRID_COLS: u32 = 8;
const GRID_ROWS: u32 = 6;
const NMS_IOU: f32 = 0.3;
/// Per class, so a dark background never crowds out bright hits.
const MAX_DETECTIONS: usize = 16;

const BRIGHT: usize = 0;
const DARK: usize = 1;

/// Sliding-window brightness detector with two classes.
///
/// Windows are one grid cell large and step half a cell, so neighbouring
/// windows overlap and NMS collapses them onto the strongest one. With `m`
/// the window's mean luma in `[0, 1]`, a `bright` window scores `m` and a
/// `dark` window scores `1 - m`.
pub struct LumaGridDetector {
    engine: EngineKind,
    labels: Vec<String>,
    colors: Vec<Rgb<u8>>,
}

impl LumaGridDetector {
    pub fn new(engine: EngineKind) -> Self {
        Self {
            engine,
            labels: vec!["bright".to_string(), "dark".to_string()],
            colors: vec![Rgb([255, 0, 0]), Rgb([0, 0, 255])],
        }
    }
}

/// Summed-area table over BT.601 luma, one extra row/column of zeros.
fn integral_luma(frame: &Frame) -> Vec<f64> {
    let (w, h) = (frame.width() as usize, frame.height() as usize);
    let stride = w + 1;
    let mut table = vec![0.0f64; stride * (h + 1)];
    for y in 0..h {
        let mut row_sum = 0.0;
        for x in 0..w {
            let Rgb([r, g, b]) = *frame.get_pixel(x as u32, y as u32);
            row_sum += 0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b);
            table[(y + 1) * stride + x + 1] = table[y * stride + x + 1] + row_sum;
        }
    }
    table
}

fn window_mean(table: &[f64], stride: usize, x0: usize, y0: usize, x1: usize, y1: usize) -> f64 {
    let sum = table[y1 * stride + x1] - table[y0 * stride + x1] - table[y1 * stride + x0]
        + table[y0 * stride + x0];
    let area = ((x1 - x0) * (y1 - y0)).max(1) as f64;
    sum / area / 255.0
}

impl ObjectDetector for LumaGridDetector {
    fn model_id(&self) -> &str {
        LUMA_GRID_MODEL_ID
    }

    fn engine(&self) -> EngineKind {
        self.engine
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn colors(&self) -> &[Rgb<u8>] {
        &self.colors
    }

    fn detect_objects(&mut self, frame: &Frame, confidence: f32) -> Result<DetectionResults> {
        check_confidence(confidence)?;
        let (w, h) = (frame.width(), frame.height());
        if w == 0 || h == 0 {
            return Err(DetectError::EmptyFrame(w, h));
        }

        let started = Instant::now();
        let table = integral_luma(frame);
        let stride = w as usize + 1;

        let cell_w = (w / GRID_COLS).max(1) as usize;
        let cell_h = (h / GRID_ROWS).max(1) as usize;
        let step_x = (cell_w / 2).max(1);
        let step_y = (cell_h / 2).max(1);
        let (w, h) = (w as usize, h as usize);

        let mut candidates: [Vec<Prediction>; 2] = [Vec::new(), Vec::new()];
        let mut y0 = 0;
        while y0 + cell_h <= h {
            let mut x0 = 0;
            while x0 + cell_w <= w {
                let (x1, y1) = (x0 + cell_w, y0 + cell_h);
                let mean = (window_mean(&table, stride, x0, y0, x1, y1) as f32).clamp(0.0, 1.0);
                let bbox = [
                    x0 as f32 / w as f32,
                    y0 as f32 / h as f32,
                    x1 as f32 / w as f32,
                    y1 as f32 / h as f32,
                ];
                for (class, score) in [(BRIGHT, mean), (DARK, 1.0 - mean)] {
                    if score >= confidence {
                        candidates[class].push(Prediction {
                            label: self.labels[class].clone(),
                            class,
                            confidence: score,
                            bbox,
                        });
                    }
                }
                x0 += step_x;
            }
            y0 += step_y;
        }

        let predictions = candidates
            .into_iter()
            .flat_map(|class| non_max_suppression(class, NMS_IOU, MAX_DETECTIONS))
            .collect();
        Ok(DetectionResults {
            predictions,
            duration: started.elapsed(),
        })
    }
}
