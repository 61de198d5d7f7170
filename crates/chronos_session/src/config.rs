use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chronos_core::biosphere::{DEFAULT_DIMENSION, DEFAULT_FILL_PERCENT};
use chronos_core::{SimulationParams, DEFAULT_SEED};
use serde::Deserialize;

pub const SEED_ENV: &str = "CHRONOS_SEED";
pub const DEFAULT_SAVE_PATH: &str = ".chronos/save.dat";
pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 5_000;

#[derive(Debug, Deserialize, Default, Clone)]
pub struct SessionConfig {
    #[serde(default)]
    pub session: SessionSection,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub world: WorldConfig,
}

impl SessionConfig {
    pub fn from_path(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml(&data).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_toml(data: &str) -> Result<Self> {
        let cfg: SessionConfig = toml::from_str(data)?;
        Ok(cfg)
    }

    /// Seed from `CHRONOS_SEED` when it parses, else from the file.
    pub fn simulation_params(&self) -> SimulationParams {
        self.simulation_params_with(std::env::var(SEED_ENV).ok().as_deref())
    }

    pub fn simulation_params_with(&self, env_seed: Option<&str>) -> SimulationParams {
        let seed = env_seed
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or_else(|| self.session.seed());
        SimulationParams::from_seed(seed)
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct SessionSection {
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub save_path: Option<PathBuf>,
}

impl SessionSection {
    pub fn seed(&self) -> u64 {
        self.seed.unwrap_or(DEFAULT_SEED)
    }
    pub fn save_path(&self) -> PathBuf {
        self.save_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SAVE_PATH))
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct TelemetryConfig {
    #[serde(default)]
    pub batch_size: Option<usize>,
    #[serde(default)]
    pub flush_interval_ms: Option<u64>,
    #[serde(default)]
    pub enable_trace: Option<bool>,
    #[serde(default)]
    pub trace_filter: Option<String>,
}

impl TelemetryConfig {
    pub fn batch_size(&self) -> usize {
        self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE).max(1)
    }
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms.unwrap_or(DEFAULT_FLUSH_INTERVAL_MS).max(1))
    }
    pub fn trace_enabled(&self) -> bool {
        self.enable_trace.unwrap_or(true)
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct WorldConfig {
    #[serde(default)]
    pub width: Option<usize>,
    #[serde(default)]
    pub height: Option<usize>,
    #[serde(default)]
    pub fill_percent: Option<u32>,
}

impl WorldConfig {
    pub fn width(&self) -> usize {
        self.width.unwrap_or(DEFAULT_DIMENSION)
    }
    pub fn height(&self) -> usize {
        self.height.unwrap_or(DEFAULT_DIMENSION)
    }
    pub fn fill_percent(&self) -> u32 {
        self.fill_percent.unwrap_or(DEFAULT_FILL_PERCENT).min(100)
    }
}
