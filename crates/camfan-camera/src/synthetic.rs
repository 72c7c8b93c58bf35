// camfan-camera/src/synthetic.rs
use crate::{Capture, CaptureError, CaptureSettings, Frame, Result};
use crossbeam_channel::{tick, Receiver};
use image::Rgb;
use log::info;
use std::time::{Duration, Instant};

/// Source indices a synthetic rig can serve (`0..MAX_SYNTHETIC_SOURCES`).
pub const MAX_SYNTHETIC_SOURCES: usize = 8;

/// Test-card camera: a per-source gradient with a bright block sweeping
/// across it, one frame per tick of the configured frame rate.
pub struct SyntheticCamera {
    source: usize,
    settings: CaptureSettings,
    ticker: Receiver<Instant>,
    frame_index: u64,
}

impl SyntheticCamera {
    pub fn open(source: usize, settings: CaptureSettings) -> Result<Self> {
        if source >= MAX_SYNTHETIC_SOURCES {
            return Err(CaptureError::NoSuchSource(source));
        }
        settings.validate()?;

        let period = Duration::from_secs_f64(1.0 / f64::from(settings.fps));
        info!(
            "Opened synthetic camera {} ({}x{}@{})",
            source, settings.width, settings.height, settings.fps
        );
        Ok(Self {
            source,
            settings,
            ticker: tick(period),
            frame_index: 0,
        })
    }

    pub fn settings(&self) -> CaptureSettings {
        self.settings
    }

    /// Render frame `index` without waiting for the pacing tick.
    pub fn render(&self, index: u64) -> Frame {
        let CaptureSettings { width, height, .. } = self.settings;
        let block_w = (width / 4).max(1);
        let block_h = (height / 4).max(1);
        let travel = u64::from(width.saturating_sub(block_w).max(1));
        let block_x = ((index * 8) % travel) as u32;
        let block_y = (height - block_h) / 2;
        let tint = (self.source as u32 * 53) % 256;

        Frame::from_fn(width, height, |x, y| {
            let inside = x >= block_x && x < block_x + block_w && y >= block_y && y < block_y + block_h;
            if inside {
                Rgb([250, 250, 250])
            } else {
                // dim gradient keeps the background well below the block
                let gx = (x * 64 / width) as u8;
                let gy = (y * 64 / height) as u8;
                Rgb([gx, gy, tint as u8 / 4])
            }
        })
    }
}

impl Capture for SyntheticCamera {
    fn source(&self) -> usize {
        self.source
    }

    fn read(&mut self) -> Result<Frame> {
        self.ticker
            .recv()
            .map_err(|_| CaptureError::Closed(self.source))?;
        let frame = self.render(self.frame_index);
        self.frame_index += 1;
        Ok(frame)
    }
}

impl Drop for SyntheticCamera {
    fn drop(&mut self) {
        info!(
            "Released synthetic camera {} after {} frames",
            self.source, self.frame_index
        );
    }
}
