use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};

use camfan_pipeline::{ConsoleSink, DefaultBackend, Orchestrator};

mod cli;

use cli::CliArgs;

fn main() -> Result<()> {
    // 1) Logging and CLI
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = CliArgs::parse();
    let config = args.pipeline_config()?;
    info!(
        "Cameras {:?}, model {} on {} engine",
        config.sources, config.model_id, config.engine
    );

    // 2) One worker per source
    let backend = Arc::new(DefaultBackend::new(config.capture));
    let mut orchestrator =
        Orchestrator::from_config(&config, backend).context("Building camera workers")?;

    // 3) Output, with Ctrl+C wired to its exit flag
    let mut sink = ConsoleSink::open(args.sink_options());
    let exit = sink.exit_flag();
    ctrlc::set_handler(move || {
        info!("Ctrl+C received, stopping");
        exit.store(true, Ordering::SeqCst);
    })
    .context("Installing Ctrl+C handler")?;

    // 4) Run until exit, then report
    let report = orchestrator.run(&mut sink).context("Pipeline failed")?;
    info!("Displayed {} composites", report.iterations);
    for (source, summary) in &report.summaries {
        match summary {
            Some(s) => info!(
                "Camera {source}: {} frames in {:.2?} ({:.1} fps, {} dropped)",
                s.frames, s.elapsed, s.fps, s.dropped
            ),
            None => info!("Camera {source}: no frames processed"),
        }
    }
    for err in &report.worker_errors {
        warn!("{err}");
    }

    info!("Program ending");
    Ok(())
}
