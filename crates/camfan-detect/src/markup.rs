// camfan-detect/src/markup.rs
use crate::Prediction;
use camfan_camera::Frame;
use image::Rgb;
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

const FALLBACK_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// Draw a two-pixel box for every prediction, coloured by class index.
pub fn markup_image(mut frame: Frame, predictions: &[Prediction], colors: &[Rgb<u8>]) -> Frame {
    let (fw, fh) = (frame.width() as f32, frame.height() as f32);
    for p in predictions {
        let color = if colors.is_empty() {
            FALLBACK_COLOR
        } else {
            colors[p.class % colors.len()]
        };

        let [x1, y1, x2, y2] = p.bbox;
        let x = (x1 * fw) as i32;
        let y = (y1 * fh) as i32;
        let width = ((x2 - x1) * fw).max(0.0) as u32;
        let height = ((y2 - y1) * fh).max(0.0) as u32;

        if width > 0 && height > 0 {
            draw_hollow_rect_mut(&mut frame, Rect::at(x, y).of_size(width, height), color);
        }
        if width > 2 && height > 2 {
            draw_hollow_rect_mut(&mut frame, Rect::at(x + 1, y + 1).of_size(width - 2, height - 2), color);
        }
    }
    frame
}
