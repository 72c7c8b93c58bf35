mod common;

use camfan_camera::CaptureSettings;
use camfan_pipeline::{
    Composite, ConsoleSink, ConsoleSinkOptions, DefaultBackend, Orchestrator, OutputSink, PipelineConfig,
    PipelineError, SinkError, WorkerError,
};
use common::{worker, Counters, MockBackend};
use serial_test::serial;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Records what it is sent and asks to exit after `limit` composites.
struct RecordingSink {
    limit: usize,
    sent_at: Vec<Instant>,
    payloads: Vec<Composite>,
}

impl RecordingSink {
    fn new(limit: usize) -> Self {
        Self { limit, sent_at: Vec::new(), payloads: Vec::new() }
    }
}

impl OutputSink for RecordingSink {
    fn send(&mut self, composite: &Composite) -> Result<(), SinkError> {
        self.sent_at.push(Instant::now());
        self.payloads.push(composite.clone());
        Ok(())
    }

    fn check_exit(&self) -> bool {
        self.payloads.len() >= self.limit
    }
}

#[test]
#[serial]
fn slowest_worker_gates_every_iteration() {
    let mut backend = MockBackend::new(Duration::from_millis(50));
    backend.periods.push((1, Duration::from_millis(200)));
    let backend = Arc::new(backend);
    let mut orchestrator = Orchestrator::new(vec![worker(0, &backend), worker(1, &backend)]);

    let mut sink = RecordingSink::new(5);
    let report = orchestrator.run(&mut sink).unwrap();
    assert_eq!(report.iterations, 5);

    // skip the first interval, which includes startup
    let gaps: Vec<Duration> = sink.sent_at.windows(2).skip(1).map(|w| w[1] - w[0]).collect();
    let mean = gaps.iter().sum::<Duration>() / gaps.len() as u32;
    assert!(mean >= Duration::from_millis(180), "mean cycle {mean:?}");
}

#[test]
#[serial]
fn composite_is_stacked_in_registration_order() {
    let backend = Arc::new(MockBackend::new(Duration::from_millis(10)));
    let mut orchestrator = Orchestrator::new(vec![worker(2, &backend), worker(0, &backend)]);

    let mut sink = RecordingSink::new(2);
    orchestrator.run(&mut sink).unwrap();

    let payload = &sink.payloads[0];
    assert_eq!(payload.frame.dimensions(), (16, 6));
    assert_eq!(payload.text[0], "Camera 2:");
    assert!(payload.text.contains(&"Camera 0:".to_string()));
    assert!(payload.text.iter().any(|l| l == "thing: 75.00%"));
    // source 2 renders shade 80 on the left half, source 0 shade 0 on the right
    assert_eq!(payload.frame.get_pixel(0, 0).0[0], 80);
    assert_eq!(payload.frame.get_pixel(9, 0).0[0], 0);
}

#[test]
#[serial]
fn shutdown_stops_and_joins_every_worker() {
    let backend = Arc::new(MockBackend::new(Duration::from_millis(10)));
    let mut orchestrator =
        Orchestrator::new(vec![worker(0, &backend), worker(1, &backend), worker(2, &backend)]);

    let report = orchestrator.run(&mut RecordingSink::new(3)).unwrap();

    assert_eq!(report.iterations, 3);
    assert!(report.worker_errors.is_empty());
    let order: Vec<usize> = report.summaries.iter().map(|(s, _)| *s).collect();
    assert_eq!(order, vec![0, 1, 2]);
    assert!(report.summaries.iter().all(|(_, s)| s.is_some_and(|s| s.frames >= 3)));
    assert!(orchestrator.workers().iter().all(|w| w.is_finished()));
    assert_eq!(Counters::get(&backend.counters.captures_released), 3);
    assert_eq!(Counters::get(&backend.counters.detectors_released), 3);
}

#[test]
#[serial]
fn dead_worker_fails_the_run_after_full_shutdown() {
    let healthy = Arc::new(MockBackend::new(Duration::from_millis(10)));
    let mut broken = MockBackend::new(Duration::from_millis(10));
    broken.fail_load = true;
    let broken = Arc::new(broken);

    let mut orchestrator = Orchestrator::new(vec![worker(0, &healthy), worker(1, &broken)]);
    let err = orchestrator.run(&mut RecordingSink::new(100)).unwrap_err();

    assert!(matches!(err, PipelineError::Worker(WorkerError::Detect { camera: 1, .. })));
    // the healthy worker was still stopped and released
    assert_eq!(Counters::get(&healthy.counters.captures_released), 1);
    assert!(orchestrator.workers().iter().all(|w| w.is_finished()));
}

#[test]
fn empty_orchestrator_is_rejected() {
    let mut orchestrator = Orchestrator::new(Vec::new());
    assert!(matches!(
        orchestrator.run(&mut RecordingSink::new(1)),
        Err(PipelineError::NoWorkers)
    ));
}

#[test]
fn invalid_config_is_rejected_up_front() {
    let config = PipelineConfig { sources: vec![1, 1], ..Default::default() };
    let backend = Arc::new(DefaultBackend::default());
    assert!(matches!(
        Orchestrator::from_config(&config, backend),
        Err(PipelineError::Config(_))
    ));
}

#[test]
#[serial]
fn synthetic_rig_runs_end_to_end() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let snapshot = dir.path().join("latest.png");
    let config = PipelineConfig {
        sources: vec![0, 1],
        warmup_ms: 0,
        capture: CaptureSettings { width: 80, height: 60, fps: 60 },
        ..Default::default()
    };
    let backend = Arc::new(DefaultBackend::new(config.capture));
    let mut orchestrator = Orchestrator::from_config(&config, backend)?;

    let mut sink = ConsoleSink::open(ConsoleSinkOptions {
        frame_limit: Some(4),
        snapshot: Some(snapshot.clone()),
        snapshot_every: 2,
        log_every: 2,
    });
    let report = orchestrator.run(&mut sink)?;

    assert_eq!(report.iterations, 4);
    assert_eq!(sink.frames(), 4);
    let written = image::open(&snapshot)?;
    assert_eq!((written.width(), written.height()), (160, 60));
    Ok(())
}

#[test]
#[serial]
fn exit_flag_stops_the_console_sink() {
    let backend = Arc::new(MockBackend::new(Duration::from_millis(10)));
    let mut orchestrator = Orchestrator::new(vec![worker(0, &backend)]);
    let mut sink = ConsoleSink::open(ConsoleSinkOptions::default());
    sink.exit_flag().store(true, Ordering::SeqCst);

    let report = orchestrator.run(&mut sink).unwrap();
    assert_eq!(report.iterations, 1);
}
