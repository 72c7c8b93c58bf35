use std::path::PathBuf;

use anyhow::{Context, Result};
use camfan_detect::EngineKind;
use camfan_pipeline::{ConsoleSinkOptions, PipelineConfig};
use clap::Parser;

/// Run N camera workers and show their latest results side by side.
#[derive(Debug, Parser)]
#[command(name = "camfan", version)]
pub struct CliArgs {
    /// JSON config file; flags below override its values.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Camera source indices in display order, e.g. `--sources 0,1,2`.
    #[arg(long, value_delimiter = ',')]
    pub sources: Vec<usize>,

    /// Inference engine: generic (cpu) or accelerated (gpu).
    #[arg(long)]
    pub engine: Option<EngineKind>,

    #[arg(long)]
    pub model: Option<String>,

    /// Stop after this many composites. Runs until Ctrl+C when omitted.
    #[arg(long)]
    pub num_frames: Option<u64>,

    /// Keep the latest composite in this image file.
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    #[arg(long)]
    pub warmup_ms: Option<u64>,
}

impl CliArgs {
    /// Defaults, then the config file, then any flags given.
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)
                .with_context(|| format!("Loading config {}", path.display()))?,
            None => PipelineConfig::default(),
        };

        if !self.sources.is_empty() {
            config.sources = self.sources.clone();
        }
        if let Some(engine) = self.engine {
            config.engine = engine;
        }
        if let Some(model) = &self.model {
            config.model_id = model.clone();
        }
        if let Some(warmup_ms) = self.warmup_ms {
            config.warmup_ms = warmup_ms;
        }
        Ok(config)
    }

    pub fn sink_options(&self) -> ConsoleSinkOptions {
        ConsoleSinkOptions {
            frame_limit: self.num_frames,
            snapshot: self.snapshot.clone(),
            snapshot_every: 1,
            log_every: 30,
        }
    }
}
