use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use camfan_camera::CaptureSettings;
use camfan_detect::{EngineKind, DEFAULT_CONFIDENCE, LUMA_GRID_MODEL_ID};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::worker::WorkerOptions;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {}: {error}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("At least one camera source is required")]
    NoSources,
    #[error("Camera source {0} is listed more than once")]
    DuplicateSource(usize),
    #[error("Queue capacity must be at least 1")]
    ZeroCapacity,
    #[error("Confidence threshold must be within [0, 1], got {0}")]
    InvalidConfidence(f32),
}

/// Process-level configuration for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Camera source indices, in display order.
    pub sources: Vec<usize>,
    pub engine: EngineKind,
    pub model_id: String,
    pub queue_capacity: usize,
    pub warmup_ms: u64,
    pub confidence: f32,
    pub capture: CaptureSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sources: vec![0, 1],
            engine: EngineKind::Generic,
            model_id: LUMA_GRID_MODEL_ID.to_string(),
            queue_capacity: 2,
            warmup_ms: 2_000,
            confidence: DEFAULT_CONFIDENCE,
            capture: CaptureSettings::default(),
        }
    }
}

impl PipelineConfig {
    /// Read a JSON config; missing fields take their default values.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
            path: path.to_path_buf(),
            error,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::NoSources);
        }
        let mut seen = HashSet::new();
        for &source in &self.sources {
            if !seen.insert(source) {
                return Err(ConfigError::DuplicateSource(source));
            }
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(ConfigError::InvalidConfidence(self.confidence));
        }
        Ok(())
    }

    pub fn worker_options(&self) -> WorkerOptions {
        WorkerOptions {
            queue_capacity: self.queue_capacity,
            warmup: Duration::from_millis(self.warmup_ms),
            confidence: self.confidence,
        }
    }
}
