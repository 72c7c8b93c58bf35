//! Consumer loop: start every worker, fan in one result per worker per
//! iteration, display, and shut everything down in registration order.

use std::sync::Arc;

use log::{debug, info, warn};

use crate::backend::Backend;
use crate::compose::compose;
use crate::config::PipelineConfig;
use crate::fps::FpsSummary;
use crate::sink::OutputSink;
use crate::worker::{CameraWorker, WorkerError};
use crate::{PipelineError, Result};

/// Outcome of [`Orchestrator::run`].
#[derive(Debug, Default)]
pub struct RunReport {
    /// Composites handed to the sink.
    pub iterations: u64,
    /// Per-source FPS summary, `None` for workers that never ran their loop.
    pub summaries: Vec<(usize, Option<FpsSummary>)>,
    /// Failures reported by workers while they were joined.
    pub worker_errors: Vec<WorkerError>,
}

/// Owns an ordered set of camera workers and drives them in lockstep.
pub struct Orchestrator {
    workers: Vec<CameraWorker>,
}

impl Orchestrator {
    pub fn new(workers: Vec<CameraWorker>) -> Self {
        Self { workers }
    }

    /// One worker per configured source, in the configured order.
    pub fn from_config(config: &PipelineConfig, backend: Arc<dyn Backend>) -> Result<Self> {
        config.validate()?;
        let workers = config
            .sources
            .iter()
            .map(|&source| {
                CameraWorker::new(
                    source,
                    config.engine,
                    config.model_id.clone(),
                    backend.clone(),
                    config.worker_options(),
                )
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self::new(workers))
    }

    pub fn workers(&self) -> &[CameraWorker] {
        &self.workers
    }

    /// Run until the sink asks to exit or a worker or the sink fails.
    ///
    /// Every worker is stopped and joined before this returns, whatever the
    /// outcome. A loop failure is returned after that shutdown; failures seen
    /// only while joining are collected in [`RunReport::worker_errors`].
    pub fn run<S: OutputSink + ?Sized>(&mut self, sink: &mut S) -> Result<RunReport> {
        if self.workers.is_empty() {
            return Err(PipelineError::NoWorkers);
        }

        let outcome = self.start_all().and_then(|()| self.drive(sink));
        let (summaries, worker_errors) = self.shutdown();

        match outcome {
            Ok(iterations) => Ok(RunReport {
                iterations,
                summaries,
                worker_errors,
            }),
            // report why the worker went away rather than just that it did
            Err(PipelineError::Worker(WorkerError::Terminated(camera))) => {
                let cause = worker_errors
                    .into_iter()
                    .find(|err| err.camera() == Some(camera))
                    .unwrap_or(WorkerError::Terminated(camera));
                Err(cause.into())
            }
            Err(err) => Err(err),
        }
    }

    fn start_all(&mut self) -> Result<()> {
        for worker in &mut self.workers {
            worker.start()?;
        }
        Ok(())
    }

    fn drive<S: OutputSink + ?Sized>(&mut self, sink: &mut S) -> Result<u64> {
        let mut iterations = 0u64;
        let mut batch = Vec::with_capacity(self.workers.len());
        loop {
            batch.clear();
            // barrier: each worker in turn must deliver a result
            for worker in &mut self.workers {
                if let Some(result) = worker.get_result(true)? {
                    batch.push(result);
                }
            }

            let composite = compose(&batch);
            sink.send(&composite)?;
            iterations += 1;
            debug!("Iteration {iterations}: {} results", batch.len());

            if sink.check_exit() {
                info!("Exit requested after {iterations} iterations");
                return Ok(iterations);
            }
        }
    }

    /// Stop every worker, then join every worker, both in registration order.
    fn shutdown(&mut self) -> (Vec<(usize, Option<FpsSummary>)>, Vec<WorkerError>) {
        for worker in &mut self.workers {
            worker.stop();
        }

        let mut summaries = Vec::with_capacity(self.workers.len());
        let mut errors = Vec::new();
        for worker in &mut self.workers {
            let source = worker.source_index();
            match worker.join() {
                Ok(summary) => summaries.push((source, summary)),
                Err(err) => {
                    warn!("Camera {source} worker failed: {err}");
                    summaries.push((source, None));
                    errors.push(err);
                }
            }
        }
        (summaries, errors)
    }
}
