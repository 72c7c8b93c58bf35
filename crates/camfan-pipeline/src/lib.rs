// camfan-pipeline/src/lib.rs
// ============================================================
// camfan-pipeline  –  N camera workers fanned into one display
// Each CameraWorker runs capture → detect → markup → publish on
// its own thread into a LatestQueue; the Orchestrator waits on
// every worker in registration order, stacks the frames, and
// hands the composite to an OutputSink.
// ------------------------------------------------------------
// Public API
//   * CameraWorker::{start, stop, join, get_result}
//   * Orchestrator::run(&mut sink)   – barrier loop + shutdown
//   * PipelineConfig                 – compiled-in defaults / JSON
// ============================================================

//! camfan – pipeline layer
//!
//! Workers and the orchestrator share nothing but the per-worker queue.
//! A worker publishes [`FrameResult`]s, never blocking on a slow consumer;
//! the orchestrator takes one result per worker per iteration, so the
//! display rate is gated by the slowest camera.
//!
//! Shutdown is cooperative: [`CameraWorker::stop`] disconnects a stop
//! channel the loop checks once per iteration, and [`CameraWorker::join`]
//! waits for the thread to release its capture and engine resources. When a worker thread
//! ends for any reason its queue is closed, so a blocked orchestrator sees
//! [`WorkerError::Terminated`] rather than waiting forever.

use thiserror::Error;

mod backend;
mod compose;
mod config;
mod fps;
mod frame;
mod orchestrator;
mod sink;
mod worker;

pub use backend::{Backend, DefaultBackend};
pub use compose::{compose, Composite};
pub use config::{ConfigError, PipelineConfig};
pub use fps::{FpsCounter, FpsSummary};
pub use frame::FrameResult;
pub use orchestrator::{Orchestrator, RunReport};
pub use sink::{ConsoleSink, ConsoleSinkOptions, OutputSink, SinkError};
pub use worker::{CameraWorker, WorkerError, WorkerOptions, WorkerState};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Worker(#[from] WorkerError),
    #[error(transparent)]
    Sink(#[from] SinkError),
    #[error("Orchestrator has no camera workers")]
    NoWorkers,
}

pub type Result<T> = std::result::Result<T, PipelineError>;
