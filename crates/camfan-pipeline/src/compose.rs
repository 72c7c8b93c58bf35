use std::sync::Arc;

use camfan_camera::Frame;
use image::imageops;

use crate::frame::FrameResult;

/// What the orchestrator hands to the output sink each iteration.
#[derive(Debug, Clone)]
pub struct Composite {
    pub frame: Frame,
    pub text: Vec<String>,
}

/// Stack frames left to right in the given order and build the text block.
///
/// Frames shorter than the tallest one are padded with black underneath.
pub fn compose(results: &[Arc<FrameResult>]) -> Composite {
    let width: u32 = results.iter().map(|r| r.frame.width()).sum();
    let height = results.iter().map(|r| r.frame.height()).max().unwrap_or(0);

    let mut frame = Frame::new(width, height);
    let mut x = 0i64;
    for r in results {
        imageops::replace(&mut frame, &r.frame, x, 0);
        x += i64::from(r.frame.width());
    }

    let mut text = Vec::new();
    for (i, r) in results.iter().enumerate() {
        if i > 0 {
            text.push(String::new());
        }
        text.push(format!("Camera {}:", r.source_index));
        text.push(format!("Model: {}", r.model_id));
        text.push(format!("Inference time: {:1.3} s", r.inference_duration.as_secs_f64()));
        text.push("Objects:".to_string());
        for p in &r.predictions {
            text.push(format!("{}: {:2.2}%", p.label, p.confidence * 100.0));
        }
    }

    Composite { frame, text }
}
