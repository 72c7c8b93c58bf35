use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info};
use thiserror::Error;

use crate::compose::Composite;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Failed to write snapshot {}: {error}", path.display())]
    Snapshot {
        path: PathBuf,
        #[source]
        error: image::ImageError,
    },
}

/// Where composites go. Also the place the user asks the pipeline to exit.
pub trait OutputSink {
    fn send(&mut self, composite: &Composite) -> Result<(), SinkError>;
    fn check_exit(&self) -> bool;
}

impl<S: OutputSink + ?Sized> OutputSink for &mut S {
    fn send(&mut self, composite: &Composite) -> Result<(), SinkError> {
        (**self).send(composite)
    }

    fn check_exit(&self) -> bool {
        (**self).check_exit()
    }
}

impl<S: OutputSink + ?Sized> OutputSink for Box<S> {
    fn send(&mut self, composite: &Composite) -> Result<(), SinkError> {
        (**self).send(composite)
    }

    fn check_exit(&self) -> bool {
        (**self).check_exit()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConsoleSinkOptions {
    /// Exit after this many composites.
    pub frame_limit: Option<u64>,
    /// Overwrite this image file with the latest composite.
    pub snapshot: Option<PathBuf>,
    /// Write the snapshot every N composites (0 or 1 = every composite).
    pub snapshot_every: u64,
    /// Log the text block at info level every N composites; debug otherwise.
    pub log_every: u64,
}

/// Logs each composite's text and optionally snapshots the frame to disk.
///
/// Exits when the shared exit flag is raised (e.g. from a Ctrl+C handler)
/// or the frame limit is reached.
pub struct ConsoleSink {
    options: ConsoleSinkOptions,
    exit: Arc<AtomicBool>,
    frames: u64,
}

impl ConsoleSink {
    pub fn open(options: ConsoleSinkOptions) -> Self {
        info!("Output sink opened");
        Self {
            options,
            exit: Arc::new(AtomicBool::new(false)),
            frames: 0,
        }
    }

    /// Flag that, once set, makes [`check_exit`](OutputSink::check_exit) true.
    pub fn exit_flag(&self) -> Arc<AtomicBool> {
        self.exit.clone()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl OutputSink for ConsoleSink {
    fn send(&mut self, composite: &Composite) -> Result<(), SinkError> {
        self.frames += 1;

        let loud = self.options.log_every > 0 && self.frames % self.options.log_every == 0;
        for line in &composite.text {
            if loud {
                info!("{line}");
            } else {
                debug!("{line}");
            }
        }

        if let Some(path) = &self.options.snapshot {
            let every = self.options.snapshot_every.max(1);
            if self.frames % every == 0 && composite.frame.width() > 0 {
                composite.frame.save(path).map_err(|error| SinkError::Snapshot {
                    path: path.clone(),
                    error,
                })?;
            }
        }
        Ok(())
    }

    fn check_exit(&self) -> bool {
        self.exit.load(Ordering::SeqCst)
            || self.options.frame_limit.is_some_and(|limit| self.frames >= limit)
    }
}

impl Drop for ConsoleSink {
    fn drop(&mut self) {
        info!("Output sink closed after {} frames", self.frames);
    }
}
