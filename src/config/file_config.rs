use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::evaluation::WeightTable;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub lock_timeout_ms: Option<u64>,
    pub history_retention: Option<usize>,
    pub stats_window_days: Option<u32>,
    pub event_channel_capacity: Option<usize>,

    pub scoring: Option<ScoringConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ScoringConfig {
    /// Per-sport weight tables replacing the built-in ones, keyed by sport name.
    pub weights: HashMap<String, WeightTable>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
