//! One camera, one thread: capture → detect → markup → publish.

use std::io;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use camfan_camera::CaptureError;
use camfan_detect::{markup_image, DetectError, EngineKind, DEFAULT_CONFIDENCE};
use camfan_queue::{LatestQueue, QueueError};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use log::{error, info};
use thiserror::Error;

use crate::backend::Backend;
use crate::fps::{FpsCounter, FpsSummary};
use crate::frame::FrameResult;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Camera {camera} failed to load its detector: {error}")]
    Detect {
        camera: usize,
        #[source]
        error: DetectError,
    },
    #[error("Camera {camera} capture failed: {error}")]
    Capture {
        camera: usize,
        #[source]
        error: CaptureError,
    },
    #[error("Camera {camera} detection failed: {error}")]
    Inference {
        camera: usize,
        #[source]
        error: DetectError,
    },
    #[error("Invalid worker queue: {0}")]
    Queue(#[from] QueueError),
    #[error("Camera {0} worker was already started")]
    AlreadyStarted(usize),
    #[error("Camera {0} worker was never started")]
    NotStarted(usize),
    #[error("Failed to spawn thread for camera {camera}: {error}")]
    Spawn {
        camera: usize,
        #[source]
        error: io::Error,
    },
    #[error("Camera {0} worker terminated and has no more results")]
    Terminated(usize),
    #[error("Camera {0} worker thread panicked")]
    Panicked(usize),
}

impl WorkerError {
    /// Source index of the camera the error belongs to, if any.
    pub fn camera(&self) -> Option<usize> {
        match self {
            WorkerError::Detect { camera, .. }
            | WorkerError::Capture { camera, .. }
            | WorkerError::Inference { camera, .. }
            | WorkerError::Spawn { camera, .. } => Some(*camera),
            WorkerError::AlreadyStarted(camera)
            | WorkerError::NotStarted(camera)
            | WorkerError::Terminated(camera)
            | WorkerError::Panicked(camera) => Some(*camera),
            WorkerError::Queue(_) => None,
        }
    }
}

/// Lifecycle of a worker. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum WorkerState {
    Starting = 0,
    Running = 1,
    StopRequested = 2,
    Stopped = 3,
}

impl WorkerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => WorkerState::Starting,
            1 => WorkerState::Running,
            2 => WorkerState::StopRequested,
            _ => WorkerState::Stopped,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkerOptions {
    pub queue_capacity: usize,
    /// Pause between opening the capture device and the first read.
    pub warmup: Duration,
    pub confidence: f32,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            queue_capacity: 2,
            warmup: Duration::from_secs(2),
            confidence: DEFAULT_CONFIDENCE,
        }
    }
}

/// Lifecycle state shared between the owning handle and the worker thread.
struct Control {
    state: AtomicU8,
}

impl Control {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(WorkerState::Starting as u8),
        }
    }

    fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Move to `next` unless the worker is already at or past it.
    fn advance(&self, next: WorkerState) -> bool {
        self.state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                (current < next as u8).then_some(next as u8)
            })
            .is_ok()
    }
}

/// Worker side of the stop channel. Nothing is ever sent on it; the handle
/// drops its sender to ask for a stop, which disconnects the channel for good.
struct StopSignal {
    rx: Receiver<()>,
}

impl StopSignal {
    fn requested(&self) -> bool {
        !matches!(self.rx.try_recv(), Err(TryRecvError::Empty))
    }

    /// Sleep for `duration` unless a stop arrives first. Returns `false` on stop.
    fn sleep(&self, duration: Duration) -> bool {
        matches!(self.rx.recv_timeout(duration), Err(RecvTimeoutError::Timeout))
    }
}

/// Everything the worker thread owns.
struct WorkerContext {
    camera: usize,
    engine: EngineKind,
    model_id: String,
    options: WorkerOptions,
    backend: Arc<dyn Backend>,
    queue: Arc<LatestQueue<Arc<FrameResult>>>,
    control: Arc<Control>,
    stop: StopSignal,
}

/// Runs on every exit path of the worker thread, unwinding included.
struct ExitGuard<'a> {
    ctx: &'a WorkerContext,
}

impl Drop for ExitGuard<'_> {
    fn drop(&mut self) {
        self.ctx.control.advance(WorkerState::Stopped);
        self.ctx.queue.close();
        info!("Camera {} exited", self.ctx.camera);
    }
}

/// Handle to one camera worker thread plus the consumer-side result cache.
pub struct CameraWorker {
    camera: usize,
    engine: EngineKind,
    model_id: String,
    options: WorkerOptions,
    backend: Arc<dyn Backend>,
    queue: Arc<LatestQueue<Arc<FrameResult>>>,
    control: Arc<Control>,
    stop_tx: Option<Sender<()>>,
    stop_rx: Option<Receiver<()>>,
    handle: Option<JoinHandle<Result<FpsSummary, WorkerError>>>,
    started: bool,
    cached: Option<Arc<FrameResult>>,
}

impl CameraWorker {
    pub fn new(
        camera: usize,
        engine: EngineKind,
        model_id: impl Into<String>,
        backend: Arc<dyn Backend>,
        options: WorkerOptions,
    ) -> Result<Self, WorkerError> {
        let (stop_tx, stop_rx) = bounded(0);
        Ok(Self {
            camera,
            engine,
            model_id: model_id.into(),
            options,
            backend,
            queue: Arc::new(LatestQueue::new(options.queue_capacity)?),
            control: Arc::new(Control::new()),
            stop_tx: Some(stop_tx),
            stop_rx: Some(stop_rx),
            handle: None,
            started: false,
            cached: None,
        })
    }

    pub fn source_index(&self) -> usize {
        self.camera
    }

    pub fn state(&self) -> WorkerState {
        self.control.state()
    }

    /// `true` once the worker thread has returned (or was never spawned).
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Spawn the worker thread. A worker can only be started once.
    pub fn start(&mut self) -> Result<(), WorkerError> {
        if self.started {
            return Err(WorkerError::AlreadyStarted(self.camera));
        }
        self.started = true;
        info!("Starting camera {} worker ({})", self.camera, self.model_id);

        let Some(stop_rx) = self.stop_rx.take() else {
            return Err(WorkerError::AlreadyStarted(self.camera));
        };

        let ctx = WorkerContext {
            camera: self.camera,
            engine: self.engine,
            model_id: self.model_id.clone(),
            options: self.options,
            backend: self.backend.clone(),
            queue: self.queue.clone(),
            control: self.control.clone(),
            stop: StopSignal { rx: stop_rx },
        };
        let handle = thread::Builder::new()
            .name(format!("camera-{}", self.camera))
            .spawn(move || run_worker(ctx))
            .map_err(|error| {
                self.control.advance(WorkerState::Stopped);
                self.queue.close();
                WorkerError::Spawn { camera: self.camera, error }
            })?;
        self.handle = Some(handle);
        Ok(())
    }

    /// Ask the loop to exit at its next iteration boundary. Never blocks.
    pub fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            drop(stop_tx);
            self.control.advance(WorkerState::StopRequested);
            info!("Stopping camera {} worker...", self.camera);
        }
    }

    /// Wait for the worker thread to exit and return its outcome.
    ///
    /// `Ok(None)` if the worker never ran or was already joined.
    pub fn join(&mut self) -> Result<Option<FpsSummary>, WorkerError> {
        let Some(handle) = self.handle.take() else {
            return Ok(None);
        };
        match handle.join() {
            Ok(outcome) => outcome.map(Some),
            Err(_) => Err(WorkerError::Panicked(self.camera)),
        }
    }

    /// Latest result from this worker.
    ///
    /// With `wait`, blocks until the worker publishes (or terminates). Without
    /// it, returns a fresh result if one is queued and otherwise the last one
    /// seen by a non-blocking read, which is `None` before the first publish.
    pub fn get_result(&mut self, wait: bool) -> Result<Option<Arc<FrameResult>>, WorkerError> {
        if wait {
            if !self.started {
                return Err(WorkerError::NotStarted(self.camera));
            }
            return self
                .queue
                .take_blocking()
                .map(Some)
                .map_err(|_| WorkerError::Terminated(self.camera));
        }

        let result = match self.queue.try_take() {
            Ok(fresh) => Some(fresh),
            Err(_) => self.cached.clone(),
        };
        self.cached = result.clone();
        Ok(result)
    }
}

impl Drop for CameraWorker {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.stop();
            let _ = self.join();
        }
    }
}

fn run_worker(ctx: WorkerContext) -> Result<FpsSummary, WorkerError> {
    let _exit = ExitGuard { ctx: &ctx };
    let mut fps = FpsCounter::new();

    let outcome = run_detection(&ctx, &mut fps);
    fps.stop();

    let summary = fps.summary(ctx.queue.dropped());
    info!(
        "Camera {}: {} frames in {:.2} s, approx. FPS {:.2} ({} results dropped)",
        ctx.camera,
        summary.frames,
        summary.elapsed.as_secs_f64(),
        summary.fps,
        summary.dropped
    );
    if let Err(err) = &outcome {
        error!("{err}");
    }
    outcome.map(|()| summary)
}

fn run_detection(ctx: &WorkerContext, fps: &mut FpsCounter) -> Result<(), WorkerError> {
    let camera = ctx.camera;
    if ctx.stop.requested() {
        return Ok(());
    }

    let mut detector = ctx
        .backend
        .load_detector(&ctx.model_id, ctx.engine)
        .map_err(|error| WorkerError::Detect { camera, error })?;
    let mut capture = ctx
        .backend
        .open_capture(camera)
        .map_err(|error| WorkerError::Capture { camera, error })?;

    if !ctx.stop.sleep(ctx.options.warmup) {
        return Ok(());
    }
    ctx.control.advance(WorkerState::Running);
    fps.start();

    let mut sequence = 0u64;
    loop {
        let frame = capture
            .read()
            .map_err(|error| WorkerError::Capture { camera, error })?;

        if ctx.stop.requested() {
            break;
        }

        let results = detector
            .detect_objects(&frame, ctx.options.confidence)
            .map_err(|error| WorkerError::Inference { camera, error })?;
        let frame = markup_image(frame, &results.predictions, detector.colors());

        ctx.queue.publish(Arc::new(FrameResult {
            source_index: camera,
            sequence,
            frame,
            predictions: results.predictions,
            inference_duration: results.duration,
            model_id: detector.model_id().to_string(),
        }));
        sequence += 1;
        fps.update();
    }
    Ok(())
}
