// camfan-camera/src/lib.rs
// ============================================================
// Capture layer for camfan
// A capture handle is opened for one source index, hands out
// RGB frames with a blocking read(), and releases the device
// when dropped – on every exit path of the owning scope.
// ------------------------------------------------------------
// Public API:
//   * Capture                 – trait every device implements
//   * SyntheticCamera::open() – paced test-card device
// ============================================================

//! camfan – camera capture layer
//!
//! The pipeline only ever talks to a [`Capture`]: `read()` blocks until the
//! next frame is ready, and `Drop` gives the device back. [`SyntheticCamera`]
//! is a deterministic device that renders a per-source test card at a fixed
//! frame rate, which is what the default backend and the demos run on.

use thiserror::Error;

mod synthetic;
pub use synthetic::{SyntheticCamera, MAX_SYNTHETIC_SOURCES};

use serde::{Deserialize, Serialize};

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("No capture device for source {0}")]
    NoSuchSource(usize),
    #[error("Invalid capture geometry {width}x{height}@{fps}")]
    InvalidGeometry { width: u32, height: u32, fps: u32 },
    #[error("Capture device for source {0} is closed")]
    Closed(usize),
}

pub type Result<T> = std::result::Result<T, CaptureError>;

/// A captured RGB frame.
pub type Frame = image::RgbImage;

/// Requested frame geometry and rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}

impl CaptureSettings {
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 || self.fps == 0 {
            return Err(CaptureError::InvalidGeometry {
                width: self.width,
                height: self.height,
                fps: self.fps,
            });
        }
        Ok(())
    }
}

/// An open capture device bound to one source index.
///
/// Implementations release the underlying device in `Drop`.
pub trait Capture: Send {
    /// Source index this handle was opened for.
    fn source(&self) -> usize;

    /// Block until the next frame is available.
    fn read(&mut self) -> Result<Frame>;
}

impl<C: Capture + ?Sized> Capture for Box<C> {
    fn source(&self) -> usize {
        (**self).source()
    }

    fn read(&mut self) -> Result<Frame> {
        (**self).read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_fps_is_invalid() {
        let settings = CaptureSettings { fps: 0, ..Default::default() };
        assert!(matches!(
            settings.validate(),
            Err(CaptureError::InvalidGeometry { fps: 0, .. })
        ));
        assert!(CaptureSettings::default().validate().is_ok());
    }
}
