use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::groove::Groove;
use crate::pattern::DEFAULT_STEPS;
use crate::session::SessionOptions;
use crate::time::{Seconds, TimeSignature, DEFAULT_BPM};

/// Persisted sequencer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequencerConfig {
    #[serde(default = "default_bpm")]
    pub bpm: f32,
    #[serde(default = "default_time_signature")]
    pub time_signature: TimeSignature,
    #[serde(default)]
    pub groove: Groove,
    /// How far ahead of the playhead ticks are scheduled.
    #[serde(default = "default_lookahead_ms")]
    pub lookahead_ms: u32,
    /// Fixed RNG seed; entropy is used when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_steps")]
    pub default_steps: u32,
    #[serde(default)]
    pub song_mode: bool,
}

fn default_bpm() -> f32 {
    DEFAULT_BPM
}

fn default_time_signature() -> TimeSignature {
    TimeSignature::four_four()
}

fn default_lookahead_ms() -> u32 {
    100
}

fn default_steps() -> u32 {
    DEFAULT_STEPS
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            bpm: default_bpm(),
            time_signature: default_time_signature(),
            groove: Groove::default(),
            lookahead_ms: default_lookahead_ms(),
            seed: None,
            default_steps: default_steps(),
            song_mode: false,
        }
    }
}

impl SequencerConfig {
    pub fn lookahead(&self) -> Seconds {
        f64::from(self.lookahead_ms) / 1000.0
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            song_mode: self.song_mode,
            time_signature: self.time_signature,
            lookahead: self.lookahead(),
        }
    }
}

/// `<config dir>/Synthwave/sequencer.json`, if the platform has a config dir.
pub fn default_path() -> Option<PathBuf> {
    let mut base = dirs::config_dir()?;
    base.push("Synthwave");
    base.push("sequencer.json");
    Some(base)
}

/// Read a config file. A missing file yields defaults.
pub fn load(path: &Path) -> Result<SequencerConfig> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no sequencer config; using defaults");
        return Ok(SequencerConfig::default());
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse config {}", path.display()))
}

/// Load from [`default_path`], falling back to defaults on any error.
pub fn load_default() -> SequencerConfig {
    let Some(path) = default_path() else {
        return SequencerConfig::default();
    };
    match load(&path) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(?err, "failed to load sequencer config");
            SequencerConfig::default()
        }
    }
}

pub fn save(path: &Path, config: &SequencerConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(config).context("failed to serialize config")?;
    fs::write(path, json).with_context(|| format!("failed to write config {}", path.display()))
}
